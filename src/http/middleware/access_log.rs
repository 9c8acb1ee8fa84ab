//! Access logging stage.
//!
//! Logs one line when a request arrives and one when its response leaves.
//! Bodies are logged only when enabled and the declared length is small.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::AccessLogConfig;
use crate::http::request::{client_ip, request_id};
use crate::http::response::error_response;

#[derive(Debug, Clone)]
pub struct AccessLog {
    log_body: bool,
    max_body_size: usize,
    exclude_paths: Vec<String>,
}

impl AccessLog {
    pub fn new(config: &AccessLogConfig) -> Self {
        Self {
            log_body: config.log_body,
            max_body_size: config.max_body_size,
            exclude_paths: config.exclude_paths.clone(),
        }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Whether the body of a request declaring `content_length` is logged.
    pub fn should_log_body(&self, content_length: Option<usize>) -> bool {
        self.log_body && matches!(content_length, Some(len) if len > 0 && len <= self.max_body_size)
    }
}

fn content_length(request: &Request<Body>) -> Option<usize> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

pub async fn access_log_middleware(
    State(log): State<Arc<AccessLog>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if log.is_excluded(request.uri().path()) {
        return next.run(request).await;
    }

    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = client_ip(&request);
    let id = request_id(&request);

    let request = if log.should_log_body(content_length(&request)) {
        let (parts, body) = request.into_parts();
        let bytes = match axum::body::to_bytes(body, log.max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(request_id = %id, error = %e, "Failed to read request body");
                return error_response(StatusCode::BAD_REQUEST, "Unreadable request body");
            }
        };
        tracing::info!(
            request_id = %id,
            method = %method,
            path = %path,
            client_ip = %client,
            body = %String::from_utf8_lossy(&bytes),
            "Incoming request"
        );
        Request::from_parts(parts, Body::from(bytes))
    } else {
        tracing::info!(
            request_id = %id,
            method = %method,
            path = %path,
            client_ip = %client,
            "Incoming request"
        );
        request
    };

    let response = next.run(request).await;

    tracing::info!(
        request_id = %id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );
    response
}
