//! Metrics collection and exposition.
//!
//! # Metrics
//! - `comet_requests_total` (counter): requests by method, status
//! - `comet_request_duration_seconds` (histogram): latency by method
//! - `comet_authorization_denied_total` (counter): rejections by policy

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "comet_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("comet_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_denied(policy: &'static str) {
    metrics::counter!("comet_authorization_denied_total", "policy" => policy).increment(1);
}
