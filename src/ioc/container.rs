//! Default in-process service container.
//!
//! # Responsibilities
//! - Register services as transient, scoped or singleton
//! - Register keyed variants of each lifetime
//! - Resolve registrations through the [`ServiceProvider`] contract
//!
//! # Design Decisions
//! - Registration happens at startup through `&self`, so the container can be
//!   shared (`Arc`) before every service is known
//! - Factories are never invoked while a map guard is held; a factory may
//!   resolve its own dependencies from the same scope
//! - Re-registering a key replaces the previous registration

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;

use super::{Instance, ResolveError, Scope, ServiceKey, ServiceProvider};

type Factory = Arc<dyn Fn(&Scope) -> Result<Instance, ResolveError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// New instance on every resolution.
    Transient,
    /// One instance per [`Scope`].
    Scoped,
    /// One instance for the process.
    Singleton,
}

#[derive(Clone)]
struct Registration {
    lifetime: Lifetime,
    type_name: &'static str,
    factory: Factory,
}

#[derive(Default)]
pub struct Container {
    registrations: DashMap<ServiceKey, Registration>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_transient<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.insert::<T, F>(ServiceKey::Type(TypeId::of::<T>()), Lifetime::Transient, factory);
    }

    pub fn register_keyed_transient<T, F>(&self, key: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.insert::<T, F>(ServiceKey::Keyed(key.into()), Lifetime::Transient, factory);
    }

    pub fn register_scoped<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.insert::<T, F>(ServiceKey::Type(TypeId::of::<T>()), Lifetime::Scoped, factory);
    }

    pub fn register_keyed_scoped<T, F>(&self, key: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.insert::<T, F>(ServiceKey::Keyed(key.into()), Lifetime::Scoped, factory);
    }

    pub fn register_singleton<T: Any + Send + Sync>(&self, instance: T) {
        self.insert_singleton(ServiceKey::Type(TypeId::of::<T>()), instance);
    }

    pub fn register_keyed_singleton<T: Any + Send + Sync>(&self, key: impl Into<String>, instance: T) {
        self.insert_singleton(ServiceKey::Keyed(key.into()), instance);
    }

    /// Lifetime of the registration under `key`, if any.
    pub fn lifetime(&self, key: &ServiceKey) -> Option<Lifetime> {
        self.registrations.get(key).map(|r| r.lifetime)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn insert<T, F>(&self, key: ServiceKey, lifetime: Lifetime, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |scope: &Scope| -> Result<Instance, ResolveError> {
            let instance: Instance = Arc::new(factory(scope)?);
            Ok(instance)
        });
        self.replace(key, Registration {
            lifetime,
            type_name: std::any::type_name::<T>(),
            factory,
        });
    }

    fn insert_singleton<T: Any + Send + Sync>(&self, key: ServiceKey, instance: T) {
        let instance: Instance = Arc::new(instance);
        self.replace(key, Registration {
            lifetime: Lifetime::Singleton,
            type_name: std::any::type_name::<T>(),
            factory: Arc::new(move |_: &Scope| -> Result<Instance, ResolveError> {
                Ok(Arc::clone(&instance))
            }),
        });
    }

    fn replace(&self, key: ServiceKey, registration: Registration) {
        tracing::debug!(
            service = registration.type_name,
            lifetime = ?registration.lifetime,
            "Service registered"
        );
        if self.registrations.insert(key, registration).is_some() {
            tracing::debug!("Previous registration replaced");
        }
    }

    fn resolve(&self, scope: &Scope, key: ServiceKey, service: &str) -> Result<Instance, ResolveError> {
        // Clone out of the map so the guard is released before the factory runs.
        let registration = self
            .registrations
            .get(&key)
            .map(|r| r.value().clone())
            .ok_or_else(|| ResolveError::NotRegistered {
                service: service.to_string(),
            })?;

        match registration.lifetime {
            Lifetime::Transient | Lifetime::Singleton => (registration.factory)(scope),
            Lifetime::Scoped => {
                if let Some(instance) = scope.cached(&key) {
                    return Ok(instance);
                }
                let instance = (registration.factory)(scope)?;
                Ok(scope.store(key, instance))
            }
        }
    }
}

impl ServiceProvider for Container {
    fn resolve_scoped(
        &self,
        scope: &Scope,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<Instance, ResolveError> {
        self.resolve(scope, ServiceKey::Type(type_id), type_name)
    }

    fn resolve_keyed_scoped(&self, scope: &Scope, key: &str) -> Result<Instance, ResolveError> {
        self.resolve(scope, ServiceKey::Keyed(key.to_string()), key)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.registrations.len())
            .finish()
    }
}
