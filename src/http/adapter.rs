//! Axum transport adapter.
//!
//! # Responsibilities
//! - Convert an axum request into a framework [`Request`]
//! - Attach per-request context (trace id, cancellation); `App::handle` binds the scope
//! - Run the [`App`] pipeline and encode the [`Response`]
//! - Record request metrics
//!
//! # Design Decisions
//! - One catch-all route; all routing happens in the framework router
//! - Bodies are buffered up to `limits.max_body_size`
//! - The path is percent-decoded before routing, so parameters arrive decoded
//! - The cancellation token fires when the connection task drops the request
//!   future (client gone, timeout)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use percent_encoding::percent_decode_str;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::http::server::App;
use crate::http::{Payload, Request, RequestContext, Response};
use crate::observability::metrics;

/// Build the axum router serving `app`.
#[allow(deprecated)]
pub(crate) fn router(app: Arc<App>) -> axum::Router {
    let timeout = Duration::from_secs(app.config().timeouts.request_secs);
    axum::Router::new()
        .fallback(dispatch)
        .with_state(app)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}

async fn dispatch(State(app): State<Arc<App>>, request: axum::extract::Request) -> axum::response::Response {
    let start = Instant::now();
    let method = request.method().as_str().to_string();

    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, app.config().limits.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(method = %method, path = %parts.uri.path(), error = %e, "Failed to read request body");
            metrics::record_request(&method, 400, start);
            return encode(Response::bad_request("error reading request body"));
        }
    };

    let path = match percent_decode_str(parts.uri.path()).decode_utf8() {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(method = %method, path = %parts.uri.path(), error = %e, "Request path is not valid UTF-8");
            metrics::record_request(&method, 400, start);
            return encode(Response::bad_request("invalid request path"));
        }
    };

    let mut req = Request::new(method.clone(), path).with_body(body);
    if let Some(query) = parts.uri.query() {
        req = req.with_query_string(query);
    }
    for (name, value) in &parts.headers {
        match value.to_str() {
            Ok(value) => req = req.with_header(name.as_str(), value),
            Err(_) => tracing::debug!(header = %name, "Skipping non-UTF-8 header"),
        }
    }
    req.remote_addr = remote_addr;

    let cancellation = CancellationToken::new();
    let _cancel_on_drop = cancellation.clone().drop_guard();
    let context = RequestContext::default()
        .with_trace_id(Uuid::new_v4().to_string())
        .with_cancellation(cancellation);
    let req = req.with_context(context);

    let response = app.handle(req).await;
    metrics::record_request(&method, response.status, start);
    encode(response)
}

fn encode(response: Response) -> axum::response::Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let (content_type, body) = match response.payload {
        Payload::Empty => (None, Body::empty()),
        Payload::Text(text) => (Some("text/plain; charset=utf-8"), Body::from(text)),
        Payload::Json(value) => match serde_json::to_vec(&value) {
            Ok(bytes) => (Some("application/json"), Body::from(bytes)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode response body");
                return (StatusCode::INTERNAL_SERVER_ERROR, "error serializing response").into_response();
            }
        },
    };

    let mut out = (status, body).into_response();
    let headers = out.headers_mut();
    if let Some(content_type) = content_type {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    for (name, value) in response.headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::controller::{Controller, Routes};
    use crate::http::ApiServer;
    use crate::ioc::Scope;
    use tower::ServiceExt;

    struct Echo;

    impl Controller for Echo {
        fn routes() -> Routes<Self> {
            Routes::new().route("PostByName", |_c: Arc<Self>, req: Request| async move {
                Response::ok(serde_json::json!({
                    "name": req.param("name"),
                    "tags": req.query.get("tag"),
                    "agent": req.user_agent,
                    "body": String::from_utf8_lossy(&req.body),
                    "traced": req.context().trace_id().is_some(),
                }))
            })
        }
    }

    fn app() -> Arc<App> {
        let mut server = ApiServer::new(ServerConfig::default());
        server.map_controller(|_: &Scope| Ok(Echo)).unwrap();
        Arc::new(server.build())
    }

    #[tokio::test]
    async fn test_wire_request_is_translated() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/echo/ada?tag=a&tag=b")
            .header("User-Agent", "tests/1.0")
            .body(Body::from("hello"))
            .unwrap();

        let response = router(app()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "ada",
                "tags": ["a", "b"],
                "agent": "tests/1.0",
                "body": "hello",
                "traced": true,
            })
        );
    }

    #[tokio::test]
    async fn test_encoded_path_parameter_is_decoded() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/echo/john%20doe")
            .body(Body::empty())
            .unwrap();

        let response = router(app()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["name"], "john doe");
    }

    #[tokio::test]
    async fn test_path_with_invalid_utf8_is_400() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/echo/%FF%FE")
            .body(Body::empty())
            .unwrap();

        let response = router(app()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let request = axum::http::Request::builder()
            .uri("/nothing")
            .body(Body::empty())
            .unwrap();
        let response = router(app()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_encode_json() {
        let out = encode(Response::ok(serde_json::json!({ "id": 1 })).with_header("x-request-id", "abc"));
        assert_eq!(out.status(), StatusCode::OK);
        assert_eq!(out.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(out.headers()["x-request-id"], "abc");
    }

    #[test]
    fn test_encode_empty_and_text() {
        let out = encode(Response::empty(204));
        assert_eq!(out.status(), StatusCode::NO_CONTENT);
        assert!(out.headers().get(header::CONTENT_TYPE).is_none());

        let out = encode(Response::text(200, "pong"));
        assert_eq!(out.headers()[header::CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[test]
    fn test_encode_drops_invalid_headers_and_status() {
        let out = encode(Response::empty(1000).with_header("bad header", "x"));
        assert_eq!(out.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(out.headers().get("bad header").is_none());
    }
}
