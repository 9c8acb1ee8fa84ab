//! Request and response header mutation.
//!
//! # Design Decisions
//! - Removal runs before addition, so a configured add always wins
//! - Names and values are validated once at build time

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use indexmap::IndexMap;

use crate::config::HeadersConfig;

/// One direction's remove-then-add rules.
#[derive(Debug, Clone, Default)]
pub struct HeaderRules {
    remove: Vec<HeaderName>,
    add: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderRules {
    pub fn new(add: &IndexMap<String, String>, remove: &[String]) -> Self {
        let remove = remove
            .iter()
            .filter_map(|name| match HeaderName::from_bytes(name.as_bytes()) {
                Ok(name) => Some(name),
                Err(_) => {
                    tracing::warn!(header = %name, "Skipping invalid header name");
                    None
                }
            })
            .collect();

        let add = add
            .iter()
            .filter_map(|(name, value)| {
                let parsed = HeaderName::from_bytes(name.as_bytes())
                    .ok()
                    .zip(HeaderValue::from_str(value).ok());
                if parsed.is_none() {
                    tracing::warn!(header = %name, "Skipping invalid header");
                }
                parsed
            })
            .collect();

        Self { remove, add }
    }

    pub fn request(config: &HeadersConfig) -> Self {
        Self::new(&config.add_request, &config.remove_request)
    }

    pub fn response(config: &HeadersConfig) -> Self {
        Self::new(&config.add_response, &config.remove_response)
    }

    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        for name in &self.remove {
            headers.remove(name);
        }
        for (name, value) in &self.add {
            headers.insert(name.clone(), value.clone());
        }
    }
}

pub async fn request_headers_middleware(
    State(rules): State<Arc<HeaderRules>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    rules.apply(request.headers_mut());
    next.run(request).await
}

pub async fn response_headers_middleware(
    State(rules): State<Arc<HeaderRules>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    rules.apply(response.headers_mut());
    response
}
