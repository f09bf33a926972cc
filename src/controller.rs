//! Controller declaration.
//!
//! A controller is a plain struct that lists its handler methods by name.
//! Names follow the verb convention (`GetUserByID`, `ListUsers`, ...) and are
//! turned into routes at registration time.
//!
//! ```ignore
//! struct UsersController { repo: Arc<UserRepo> }
//!
//! impl UsersController {
//!     async fn get_user_by_id(self: Arc<Self>, req: Request) -> Response { ... }
//! }
//!
//! impl Controller for UsersController {
//!     fn routes() -> Routes<Self> {
//!         Routes::new().route("GetUserByID", Self::get_user_by_id)
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::http::handler::BoxFuture;
use crate::http::{Request, Response};
use crate::ioc::Instance;
use crate::routing::index::Invoker;
use crate::security::Policies;

type Method<C> = Arc<dyn Fn(Arc<C>, Request) -> BoxFuture<Response> + Send + Sync>;

pub trait Controller: Send + Sync + Sized + 'static {
    /// Type name used for the derived base path and in logs.
    fn type_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Explicit base path. `None` derives one from the type name.
    fn base_path(&self) -> Option<String> {
        None
    }

    fn policies(&self) -> Policies {
        Policies::new()
    }

    /// Handler methods, in declaration order.
    fn routes() -> Routes<Self>;
}

/// Ordered list of named handler methods of `C`.
pub struct Routes<C> {
    entries: Vec<(String, Method<C>)>,
}

impl<C: Controller> Routes<C> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn route<F, Fut>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Arc<C>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let method: Method<C> = Arc::new(move |controller: Arc<C>, req: Request| -> BoxFuture<Response> {
            Box::pin(method(controller, req))
        });
        self.entries.push((name.into(), method));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Type-erased invokers: each downcasts the resolved instance back to `C`.
    pub(crate) fn into_invokers(self) -> impl Iterator<Item = (String, Invoker)> {
        self.entries.into_iter().map(|(name, method)| {
            let handler = name.clone();
            let invoker: Invoker = Arc::new(move |instance: Instance, req: Request| -> BoxFuture<Response> {
                match instance.downcast::<C>() {
                    Ok(controller) => method(controller, req),
                    Err(_) => {
                        tracing::error!(
                            controller = C::type_name(),
                            handler = %handler,
                            "Resolved instance has the wrong controller type"
                        );
                        Box::pin(async { Response::internal_error("error getting controller") })
                    }
                }
            });
            (name, invoker)
        })
    }
}

impl<C: Controller> Default for Routes<C> {
    fn default() -> Self {
        Self::new()
    }
}
