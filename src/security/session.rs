//! Session validation contract.
//!
//! Applications register an `Arc<dyn SessionValidator>` in the container;
//! the built-in authorizers resolve it from the request scope.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::http::Request;

/// Validated session claims, e.g. `{"sub": "42", "role": "admin"}`.
pub type Claims = Map<String, Value>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("session expired")]
    Expired,
}

pub trait SessionValidator: Send + Sync {
    /// Validate the caller's session and return its claims.
    fn validate(&self, req: &Request) -> Result<Claims, SessionError>;
}

type Decoder = Arc<dyn Fn(&str) -> Result<Claims, SessionError> + Send + Sync>;

/// Reads `Authorization: Bearer <token>` and hands the token to a decoder.
#[derive(Clone)]
pub struct BearerTokenValidator {
    decoder: Decoder,
}

impl BearerTokenValidator {
    pub fn new<F>(decoder: F) -> Self
    where
        F: Fn(&str) -> Result<Claims, SessionError> + Send + Sync + 'static,
    {
        Self {
            decoder: Arc::new(decoder),
        }
    }
}

impl SessionValidator for BearerTokenValidator {
    fn validate(&self, req: &Request) -> Result<Claims, SessionError> {
        let token = bearer_token(req).ok_or(SessionError::MissingCredentials)?;
        (self.decoder)(token)
    }
}

/// Token from an `Authorization: Bearer` header.
pub fn bearer_token(req: &Request) -> Option<&str> {
    let header = req.header("authorization")?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
