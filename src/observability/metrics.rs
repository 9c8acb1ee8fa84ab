//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method and status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rejections_total` (counter): terminal policy responses by reason
//! - `gateway_upstream_errors_total` (counter): failed upstream exchanges
//! - `gateway_in_flight_requests` (gauge): requests currently being served
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing when the exporter is disabled.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Count a terminal rejection (`block_list`, `allow_list`, `auth`, `rate_limit`).
pub fn record_rejection(reason: &'static str) {
    ::metrics::counter!("gateway_rejections_total", "reason" => reason).increment(1);
}

pub fn record_upstream_error() {
    ::metrics::counter!("gateway_upstream_errors_total").increment(1);
}

pub fn record_in_flight(count: u64) {
    ::metrics::gauge!("gateway_in_flight_requests").set(count as f64);
}

/// Outermost layer: counts every response and its latency.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    record_request(&method, response.status().as_u16(), start);
    response
}
