//! Framework response value.
//!
//! # Responsibilities
//! - Carry an explicit status code and a typed payload
//! - Carry extra response headers (e.g. `x-request-id`)
//! - Provide the canonical terminal responses (404, 401, 500, ...)
//!
//! # Design Decisions
//! - Payload is a sum type; the adapter decides the wire encoding
//! - Serialization failures become a 500 instead of a panic

use serde::Serialize;
use serde_json::Value;

pub const OK: u16 = 200;
pub const BAD_REQUEST: u16 = 400;
pub const UNAUTHORIZED: u16 = 401;
pub const NOT_FOUND: u16 = 404;
pub const INTERNAL_SERVER_ERROR: u16 = 500;

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Text(String),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub payload: Payload,
    pub headers: Vec<(String, String)>,
}

impl Response {
    pub fn new(status: u16, payload: Payload) -> Self {
        Self {
            status,
            payload,
            headers: Vec::new(),
        }
    }

    /// JSON response with the given status.
    pub fn json<T: Serialize>(status: u16, data: T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::new(status, Payload::Json(value)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response payload");
                Self::new(
                    INTERNAL_SERVER_ERROR,
                    Payload::Text("error serializing response".to_string()),
                )
            }
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, Payload::Text(body.into()))
    }

    pub fn empty(status: u16) -> Self {
        Self::new(status, Payload::Empty)
    }

    pub fn ok<T: Serialize>(data: T) -> Self {
        Self::json(OK, data)
    }

    pub fn bad_request<T: Serialize>(data: T) -> Self {
        Self::json(BAD_REQUEST, data)
    }

    pub fn internal_error<T: Serialize>(data: T) -> Self {
        Self::json(INTERNAL_SERVER_ERROR, data)
    }

    pub fn not_found() -> Self {
        Self::json(NOT_FOUND, "resource not found")
    }

    pub fn unauthorized() -> Self {
        Self::json(UNAUTHORIZED, "Unauthorized")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
