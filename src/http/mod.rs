//! HTTP-facing subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → adapter.rs (axum → Request, trace id, cancellation)
//!     → server.rs (App: fresh scope, middleware chain)
//!     → middleware/ (request id, logging, panic recovery)
//!     → routing::Router (controller, route, policies)
//!     → response.rs (status + payload)
//!     → adapter.rs (Response → axum, JSON encoding)
//! ```

mod adapter;
pub mod handler;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{chain, handler_fn, BoxFuture, BoxedHandler, Handler, Middleware};
pub use request::{Request, RequestContext};
pub use response::{Payload, Response};
pub use server::{ApiServer, App, ServerError};
