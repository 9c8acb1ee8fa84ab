//! Provider registry and dynamic target resolution.
//!
//! # Responsibilities
//! - Map a provider marker on the request to a configured provider
//! - Attach the resolved target to the request for the dispatch stage
//! - Answer "where does this request go" at dispatch time
//!
//! # Design Decisions
//! - The `server.providerHeader` header wins over the first path segment
//! - A path-segment marker is stripped before forwarding
//! - Unknown markers fall through to the static default target untouched
//! - TLS verification is decided per target, not process-wide

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Extensions, HeaderMap, HeaderName, Request},
    middleware::Next,
    response::Response,
};
use indexmap::IndexMap;

use crate::config::{Config, Provider};
use crate::http::request::{path_and_query, set_path_and_query};
use crate::routing::target::{ResolvedTarget, TargetError, TlsPolicy};

/// Outcome of provider selection for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub target: ResolvedTarget,
    /// New path and query when the marker was a path segment.
    pub forwarded_path: Option<String>,
}

/// Immutable registry built once from configuration.
#[derive(Debug)]
pub struct ProviderRegistry {
    providers: IndexMap<String, Provider>,
    targets: HashMap<String, ResolvedTarget>,
    marker_header: Option<HeaderName>,
    default_target: ResolvedTarget,
}

impl ProviderRegistry {
    pub fn from_config(config: &Config) -> Result<Self, TargetError> {
        let default_target = ResolvedTarget::from_url(&config.server.target)?;
        let targets = config
            .providers
            .iter()
            .map(|(key, provider)| (key.clone(), ResolvedTarget::for_provider(key, provider)))
            .collect();

        let marker_header = HeaderName::from_bytes(config.server.provider_header.as_bytes()).ok();
        if marker_header.is_none() {
            tracing::warn!(
                header = %config.server.provider_header,
                "Invalid provider header name, only path markers will be used"
            );
        }

        Ok(Self {
            providers: config.providers.clone(),
            targets,
            marker_header,
            default_target,
        })
    }

    /// True when providers are configured (reverse-proxy mode).
    pub fn is_reverse_proxy(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Provider keys in configuration order.
    pub fn keys(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Keys of providers that opted out of certificate verification, in
    /// configuration order.
    pub fn insecure_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|(key, _)| {
                self.targets
                    .get(*key)
                    .is_some_and(|target| target.tls == TlsPolicy::SkipVerify)
            })
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Target for a provider identifier, case-insensitively.
    pub fn lookup(&self, identifier: &str) -> Option<&ResolvedTarget> {
        self.targets.get(&identifier.trim().to_uppercase())
    }

    /// Select a provider for a request, if any marker names a known one.
    pub fn resolve(&self, headers: &HeaderMap, path_and_query: &str) -> Option<Resolution> {
        let from_header = self
            .marker_header
            .as_ref()
            .and_then(|name| headers.get(name))
            .and_then(|v| v.to_str().ok())
            .and_then(|id| self.lookup(id));
        if let Some(target) = from_header {
            return Some(Resolution {
                target: target.clone(),
                forwarded_path: None,
            });
        }

        let (segment, rest) = split_first_segment(path_and_query)?;
        let target = self.lookup(segment)?;
        Some(Resolution {
            target: target.clone(),
            forwarded_path: Some(rest),
        })
    }

    /// Router consulted by the dispatch stage: the target attached by the
    /// provider stage, or the static default.
    pub fn route(&self, extensions: &Extensions) -> ResolvedTarget {
        extensions
            .get::<ResolvedTarget>()
            .cloned()
            .unwrap_or_else(|| self.default_target.clone())
    }
}

/// Split `/seg/rest?q` into (`seg`, `/rest?q`).
fn split_first_segment(path_and_query: &str) -> Option<(&str, String)> {
    let trimmed = path_and_query.strip_prefix('/')?;
    let end = trimmed.find(['/', '?']).unwrap_or(trimmed.len());
    let segment = &trimmed[..end];
    if segment.is_empty() {
        return None;
    }
    let remainder = &trimmed[end..];
    let rest = if remainder.starts_with('/') {
        remainder.to_string()
    } else {
        format!("/{remainder}")
    };
    Some((segment, rest))
}

/// Pipeline stage: resolve the provider and attach the target.
pub async fn provider_middleware(
    State(registry): State<Arc<ProviderRegistry>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let resolution = registry.resolve(request.headers(), path_and_query(&request));

    if let Some(Resolution {
        target,
        forwarded_path,
    }) = resolution
    {
        if let Some(path) = forwarded_path {
            if let Err(e) = set_path_and_query(&mut request, &path) {
                tracing::debug!(error = %e, path = %path, "Could not strip provider segment");
            }
        }
        tracing::debug!(
            provider = target.provider.as_deref().unwrap_or("-"),
            target = %target,
            "Resolved provider target"
        );
        request.extensions_mut().insert(target);
    }

    next.run(request).await
}
