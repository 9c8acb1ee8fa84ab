//! Block and allow lists.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::request::request_host;
use crate::http::response::error_response;
use crate::observability::metrics;
use crate::routing::AccessPattern;

/// Compiled list of glob patterns.
#[derive(Debug, Default)]
pub struct AccessList {
    patterns: Vec<AccessPattern>,
}

impl AccessList {
    /// Compile `patterns`, skipping any that do not compile.
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|raw| match AccessPattern::new(raw) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %raw, error = %e, "Skipping invalid access pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First pattern matching the request.
    pub fn first_match(&self, request: &Request<Body>) -> Option<&AccessPattern> {
        let host = request_host(request);
        let path = request.uri().path();
        self.patterns
            .iter()
            .find(|p| p.matches_parts(host.as_deref(), path))
    }
}

pub fn forbidden() -> Response {
    error_response(StatusCode::FORBIDDEN, "Access denied")
}

/// Reject requests matching any blocked pattern.
pub async fn block_list_middleware(
    State(list): State<Arc<AccessList>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(pattern) = list.first_match(&request) {
        tracing::warn!(
            pattern = pattern.as_str(),
            path = %request.uri().path(),
            "Request blocked"
        );
        metrics::record_rejection("block_list");
        return forbidden();
    }
    next.run(request).await
}

/// Reject requests matching no allowed pattern.
pub async fn allow_list_middleware(
    State(list): State<Arc<AccessList>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if list.is_empty() || list.first_match(&request).is_some() {
        return next.run(request).await;
    }
    tracing::warn!(path = %request.uri().path(), "Request not in allow list");
    metrics::record_rejection("allow_list");
    forbidden()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(host: &str, path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header("host", host)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn first_matching_pattern_wins() {
        let list = AccessList::new(&["/admin/*".to_string(), "*/admin/*".to_string()]);
        let matched = list.first_match(&request("h", "/admin/x")).unwrap();
        assert_eq!(matched.as_str(), "/admin/*");
        assert!(list.first_match(&request("h", "/public")).is_none());
    }

    #[test]
    fn host_patterns_ignore_port() {
        let list = AccessList::new(&["api.example.com/v1/*".to_string()]);
        assert!(list.first_match(&request("api.example.com:8080", "/v1/users")).is_some());
        assert!(list.first_match(&request("web.example.com", "/v1/users")).is_none());
    }

    #[test]
    fn empty_list() {
        let list = AccessList::new(&[]);
        assert!(list.is_empty());
        assert!(list.first_match(&request("h", "/")).is_none());
    }
}
