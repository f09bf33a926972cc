//! Registration-time configuration errors.
//!
//! Every variant is fatal: startup must abort rather than serve with a
//! partially built route table.

use thiserror::Error;

use crate::ioc::ResolveError;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("controller `{controller}` declares {method} {path} more than once")]
    DuplicateRoute {
        controller: String,
        method: String,
        path: String,
    },

    #[error("route template `{template}` binds parameter `{name}` more than once")]
    DuplicateParameter { template: String, name: String },

    #[error("controllers `{existing}` and `{incoming}` both claim base path segment `{name}`")]
    DuplicateController {
        name: String,
        existing: String,
        incoming: String,
    },

    #[error("controller `{controller}` has an invalid base path `{base_path}`")]
    InvalidBasePath {
        controller: String,
        base_path: String,
    },

    #[error("failed to instantiate controller `{controller}`")]
    Instantiate {
        controller: String,
        #[source]
        source: ResolveError,
    },
}
