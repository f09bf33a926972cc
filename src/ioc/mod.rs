//! Service resolution contract.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Container::register_* (transient / scoped / singleton, keyed or typed)
//!
//! Per request:
//!     adapter creates Scope(provider)
//!     → router resolves controller: scope.resolve_keyed(name)
//!     → policies resolve services:  scope.resolve::<T>()
//!     → Scope dropped with the request (scoped instances released)
//! ```
//!
//! # Design Decisions
//! - The router only sees [`ServiceProvider`]; lifetimes are the provider's concern
//! - Scoped instances are cached on the [`Scope`], never globally
//! - Instances are `Arc<dyn Any>` and downcast at the call site

pub mod container;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use uuid::Uuid;

pub use container::Container;

/// A resolved service instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Identifies a registration: by concrete type or by string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceKey {
    Type(TypeId),
    Keyed(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no service registered for `{service}`")]
    NotRegistered { service: String },

    #[error("service `{service}` is not a `{expected}`")]
    TypeMismatch {
        service: String,
        expected: &'static str,
    },

    #[error("failed to construct `{service}`: {reason}")]
    Construction { service: String, reason: String },
}

/// The capability the core consumes from the application's container.
pub trait ServiceProvider: Send + Sync {
    /// Resolve the service registered for `type_id`, bound to `scope`.
    fn resolve_scoped(
        &self,
        scope: &Scope,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<Instance, ResolveError>;

    /// Resolve the service registered under `key`, bound to `scope`.
    fn resolve_keyed_scoped(&self, scope: &Scope, key: &str) -> Result<Instance, ResolveError>;
}

/// Provider with no registrations.
#[derive(Debug, Default)]
pub struct NoServices;

impl ServiceProvider for NoServices {
    fn resolve_scoped(
        &self,
        _scope: &Scope,
        _type_id: TypeId,
        type_name: &'static str,
    ) -> Result<Instance, ResolveError> {
        Err(ResolveError::NotRegistered {
            service: type_name.to_string(),
        })
    }

    fn resolve_keyed_scoped(&self, _scope: &Scope, key: &str) -> Result<Instance, ResolveError> {
        Err(ResolveError::NotRegistered {
            service: key.to_string(),
        })
    }
}

/// Resolution scope for one request.
pub struct Scope {
    id: Uuid,
    provider: Arc<dyn ServiceProvider>,
    cache: Mutex<HashMap<ServiceKey, Instance>>,
}

impl Scope {
    pub fn new(provider: Arc<dyn ServiceProvider>) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// A scope that resolves nothing.
    pub fn detached() -> Self {
        Self::new(Arc::new(NoServices))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Resolve a service by its concrete type.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError> {
        let type_name = std::any::type_name::<T>();
        let instance = self
            .provider
            .resolve_scoped(self, TypeId::of::<T>(), type_name)?;
        instance
            .downcast::<T>()
            .map_err(|_| ResolveError::TypeMismatch {
                service: type_name.to_string(),
                expected: type_name,
            })
    }

    /// Resolve a service by key without downcasting.
    pub fn resolve_keyed(&self, key: &str) -> Result<Instance, ResolveError> {
        self.provider.resolve_keyed_scoped(self, key)
    }

    /// Resolve a service by key and downcast it to `T`.
    pub fn resolve_keyed_as<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>, ResolveError> {
        self.resolve_keyed(key)?
            .downcast::<T>()
            .map_err(|_| ResolveError::TypeMismatch {
                service: key.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Instance cached in this scope for `key`, if any.
    pub fn cached(&self, key: &ServiceKey) -> Option<Instance> {
        self.cache
            .lock()
            .expect("scope cache mutex poisoned")
            .get(key)
            .cloned()
    }

    /// Cache `instance` under `key`. If another instance won the race, that one is returned.
    pub fn store(&self, key: ServiceKey, instance: Instance) -> Instance {
        self.cache
            .lock()
            .expect("scope cache mutex poisoned")
            .entry(key)
            .or_insert(instance)
            .clone()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope").field("id", &self.id).finish_non_exhaustive()
    }
}
