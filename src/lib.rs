//! Convention-based controller routing for HTTP APIs.
//!
//! Controllers list their handler methods by name; names such as
//! `GetUserByID` or `ListUsers` are mapped to `GET /users/:id` and
//! `GET /users` at startup. Requests are dispatched through application
//! middleware, per-handler authorization policies and a request-scoped
//! controller instance resolved from the service container.

pub mod config;
pub mod controller;
pub mod http;
pub mod ioc;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::ServerConfig;
pub use controller::{Controller, Routes};
pub use http::{ApiServer, App, Payload, Request, RequestContext, Response};
pub use ioc::{Container, ResolveError, Scope};
pub use routing::RegistrationError;
pub use security::{Policies, Policy};
