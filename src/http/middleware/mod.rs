//! Built-in middlewares.
//!
//! Each constructor returns a [`Middleware`](crate::http::handler::Middleware)
//! that the application installs with `ApiServer::use_middleware`.

pub mod logging;
pub mod recover;
pub mod request_id;

pub use logging::request_logging;
pub use recover::{recover, recover_with, PanicReport};
pub use request_id::{request_id, X_REQUEST_ID};
