//! Handler and middleware capabilities.
//!
//! # Data Flow
//! ```text
//! middleware[0] → middleware[1] → ... → router → policies → controller method
//! ```
//!
//! # Design Decisions
//! - A handler is anything `Fn(Request) -> Future<Output = Response>`
//! - Handlers are shared as `Arc<dyn Handler>`; wrapping never copies state
//! - Middleware wraps a handler into a new handler; first declared = outermost

use std::future::Future;
use std::sync::Arc;

use crate::http::{Request, Response};

pub type BoxFuture<T> = futures_util::future::BoxFuture<'static, T>;

pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture<Response>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<Response> {
        Box::pin(self(req))
    }
}

pub type BoxedHandler = Arc<dyn Handler>;

/// Box a closure or async fn as a shared handler.
pub fn handler_fn<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(f)
}

/// Wraps the rest of the pipeline.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

/// Wrap `handler` so that `middlewares[0]` runs first.
pub fn chain(handler: BoxedHandler, middlewares: &[Arc<dyn Middleware>]) -> BoxedHandler {
    middlewares
        .iter()
        .rev()
        .fold(handler, |next, middleware| middleware.wrap(next))
}
