//! Request ID middleware.
//!
//! # Responsibilities
//! - Reuse an incoming `x-request-id` header or generate a UUID v4
//! - Store the id in the request context
//! - Echo it back on the response

use std::sync::Arc;

use uuid::Uuid;

use crate::http::handler::{BoxedHandler, Middleware};
use crate::http::Request;

pub const X_REQUEST_ID: &str = "x-request-id";

pub fn request_id() -> impl Middleware {
    |next: BoxedHandler| -> BoxedHandler {
        Arc::new(move |req: Request| {
            let next = next.clone();
            async move {
                let id = req
                    .header(X_REQUEST_ID)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().to_string());

                let context = req.context().with_request_id(id.clone());
                let response = next.call(req.with_context(context)).await;
                response.with_header(X_REQUEST_ID, id)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::handler_fn;
    use crate::http::Response;

    fn echo_request_id() -> BoxedHandler {
        handler_fn(|req: Request| async move {
            Response::ok(req.context().request_id().map(str::to_string))
        })
    }

    #[tokio::test]
    async fn test_generates_id_when_missing() {
        let handler = request_id().wrap(echo_request_id());
        let response = handler.call(Request::new("GET", "/")).await;

        let id = response.header(X_REQUEST_ID).unwrap().to_string();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(response.payload, crate::http::Payload::Json(id.into()));
    }

    #[tokio::test]
    async fn test_preserves_incoming_id() {
        let handler = request_id().wrap(echo_request_id());
        let req = Request::new("GET", "/").with_header("X-Request-ID", "abc-123");
        let response = handler.call(req).await;

        assert_eq!(response.header(X_REQUEST_ID), Some("abc-123"));
    }
}
