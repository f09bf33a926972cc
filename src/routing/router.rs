//! Request dispatch.
//!
//! # Responsibilities
//! - Pick the controller from the first path segment
//! - Look up the handler (exact table, then parameterized scan)
//! - Bind path parameters onto the request
//! - Resolve the controller instance from the request scope
//! - Run the handler wrapped in its policies
//!
//! # Data Flow
//! ```text
//! GET /users/42
//!     → registry.resolve("/users/42")          → entry "users"    (404 if none)
//!     → entry.index.lookup("GET", "/users/42") → GetUserByID      (404 if none)
//!     → req.path_params = {id: "42"}
//!     → scope.resolve_keyed("users")           → instance         (500 on failure)
//!     → policies(wildcard.., GetUserByID..) → invoker(instance, req)
//! ```
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Unknown controller and unknown route are both a plain 404
//! - The handler chain is composed per request; composition is a few `Arc`s

use std::sync::Arc;

use crate::http::handler::{handler_fn, BoxedHandler};
use crate::http::{Request, Response};
use crate::routing::registry::{ControllerRegistry, RouteTableRow};
use crate::security::compose;

#[derive(Debug)]
pub struct Router {
    registry: ControllerRegistry,
}

impl Router {
    pub fn new(registry: ControllerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    pub fn route_table(&self) -> Vec<RouteTableRow> {
        self.registry.route_table()
    }

    /// Dispatch one request to its controller method.
    pub async fn handle(&self, mut req: Request) -> Response {
        let trace_id = req.context().trace_id().unwrap_or_default().to_string();

        let Some(entry) = self.registry.resolve(&req.path) else {
            tracing::debug!(trace_id = %trace_id, path = %req.path, "No controller for path");
            return Response::not_found();
        };

        let Some(matched) = entry.index().lookup(&req.method, &req.path) else {
            tracing::debug!(
                trace_id = %trace_id,
                controller = entry.type_name(),
                method = %req.method,
                path = %req.path,
                "No route matched"
            );
            return Response::not_found();
        };
        req.path_params = matched.params;
        let record = matched.record;

        let instance = match req.context().scope().resolve_keyed(entry.name()) {
            Ok(instance) => instance,
            Err(e) => {
                tracing::error!(
                    trace_id = %trace_id,
                    controller = entry.type_name(),
                    error = %e,
                    "Failed to resolve controller"
                );
                return Response::internal_error("error getting controller");
            }
        };

        tracing::debug!(
            trace_id = %trace_id,
            controller = entry.type_name(),
            handler = record.name(),
            "Dispatching"
        );

        let invoker = record.invoker().clone();
        let terminal = handler_fn(move |req: Request| invoker(instance.clone(), req));
        let handler = compose(terminal, &entry.policies_for(record.name()));
        handler.call(req).await
    }

    /// The router as a shareable handler, ready for middleware wrapping.
    pub fn into_handler(self: Arc<Self>) -> BoxedHandler {
        handler_fn(move |req: Request| {
            let router = self.clone();
            async move { router.handle(req).await }
        })
    }
}
