//! Request logging middleware.

use std::sync::Arc;
use std::time::Instant;

use crate::http::handler::{BoxedHandler, Middleware};
use crate::http::Request;

/// Logs every request on receipt and on completion.
pub fn request_logging() -> impl Middleware {
    |next: BoxedHandler| -> BoxedHandler {
        Arc::new(move |req: Request| {
            let next = next.clone();
            async move {
                let start = Instant::now();
                let method = req.method.clone();
                let url = req.url();
                let trace_id = req.context().trace_id().unwrap_or_default().to_string();

                tracing::debug!(
                    trace_id = %trace_id,
                    method = %method,
                    url = %url,
                    user_agent = req.user_agent.as_deref().unwrap_or_default(),
                    "Request received"
                );

                let response = next.call(req).await;

                tracing::info!(
                    trace_id = %trace_id,
                    method = %method,
                    url = %url,
                    status = response.status,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Request completed"
                );
                response
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::handler_fn;
    use crate::http::Response;

    #[tokio::test]
    async fn test_passes_response_through() {
        let handler = request_logging().wrap(handler_fn(|_req: Request| async { Response::not_found() }));
        let response = handler.call(Request::new("GET", "/missing")).await;
        assert_eq!(response, Response::not_found());
    }
}
