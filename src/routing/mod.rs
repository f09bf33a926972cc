//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     Controller::routes() (named methods, declaration order)
//!     → convention.rs (GetUserByID → GET /users/:id)
//!     → template.rs (parse, reject duplicate parameters)
//!     → index.rs (exact table or ordered parameterized list)
//!     → registry.rs (keyed by first base-path segment)
//!
//! Dispatch (per request):
//!     → router.rs (controller by first segment, then route lookup)
//!     → matcher.rs (segment-wise template match, bind parameters)
//!     → policies → controller method
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (hash lookup, then segment comparison)
//! - Deterministic: exact routes win, then first declared template wins

pub mod convention;
pub mod error;
pub mod index;
pub mod matcher;
pub mod registry;
pub mod router;
pub mod template;

pub use convention::{map_method, Verb};
pub use error::RegistrationError;
pub use matcher::PathParams;
pub use registry::{ControllerEntry, ControllerRegistry, RouteTableRow};
pub use router::Router;
