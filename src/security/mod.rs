//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Router resolved handler "GetUserByID" on controller "users":
//!     → policy.rs (wildcard policies, then handler policies, declared order)
//!     → authorization.rs (require_role / require_claim / authenticated)
//!     → session.rs (SessionValidator resolved from the request scope)
//!     → controller method
//! ```
//!
//! # Design Decisions
//! - Fail closed: a policy that cannot validate the caller answers 401
//! - Token cryptography is the validator's concern, never the router's
//! - Policies are plain handler wrappers; the router knows nothing about auth

pub mod authorization;
pub mod policy;
pub mod session;

pub use authorization::{authenticated, require_claim, require_role};
pub use policy::{authorize, compose, Policies, Policy, WILDCARD};
pub use session::{BearerTokenValidator, Claims, SessionError, SessionValidator};
