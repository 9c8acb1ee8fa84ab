//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{Body, HttpBody},
    http::{Request, StatusCode},
    response::Response,
};
use url::Url;

use crate::http::request::path_and_query;
use crate::routing::{ProviderRegistry, ResolvedTarget, TlsPolicy};
use crate::transport::{Transport, TransportError, UpstreamUpgrade};

/// HTTP/HTTPS client pair: one verifying certificates, one not.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    verified: reqwest::Client,
    /// Only built when some target opts out of verification.
    insecure: Option<reqwest::Client>,
}

impl HttpTransport {
    pub fn new(timeout: Duration, allow_insecure: bool) -> Result<Self, TransportError> {
        let verified = Self::builder(timeout)
            .build()
            .map_err(TransportError::Client)?;
        let insecure = if allow_insecure {
            Some(
                Self::builder(timeout)
                    .danger_accept_invalid_certs(true)
                    .build()
                    .map_err(TransportError::Client)?,
            )
        } else {
            None
        };
        Ok(Self { verified, insecure })
    }

    /// Clients for the targets in `registry`; the insecure client exists only
    /// if a provider asks for it.
    pub fn for_registry(registry: &ProviderRegistry, timeout: Duration) -> Result<Self, TransportError> {
        let insecure = registry.insecure_providers();
        if !insecure.is_empty() {
            tracing::warn!(providers = ?insecure, "TLS verification disabled for providers");
        }
        Self::new(timeout, !insecure.is_empty())
    }

    fn builder(timeout: Duration) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
    }

    fn client_for(&self, target: &ResolvedTarget) -> &reqwest::Client {
        match (target.tls, &self.insecure) {
            (TlsPolicy::SkipVerify, Some(insecure)) => insecure,
            (TlsPolicy::SkipVerify, None) => {
                tracing::warn!(target = %target, "No insecure client configured, verifying certificates");
                &self.verified
            }
            (TlsPolicy::Verify, _) => &self.verified,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn forward(
        &self,
        request: Request<Body>,
        target: &ResolvedTarget,
    ) -> Result<Response<Body>, TransportError> {
        let raw = target.url_for(path_and_query(&request));
        let url = Url::parse(&raw).map_err(|source| TransportError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;

        let (parts, body) = request.into_parts();
        let mut outbound = self
            .client_for(target)
            .request(parts.method, url)
            .headers(parts.headers);
        if body.size_hint().exact() != Some(0) {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let mut upstream = outbound.send().await?;

        let status = upstream.status();
        let mut response = Response::builder().status(status);
        if let Some(headers) = response.headers_mut() {
            *headers = std::mem::take(upstream.headers_mut());
        }

        if status == StatusCode::SWITCHING_PROTOCOLS {
            let upgraded = upstream.upgrade().await?;
            return Ok(response
                .extension(UpstreamUpgrade::new(upgraded))
                .body(Body::empty())
                .unwrap_or_default());
        }

        Ok(response
            .body(Body::from_stream(upstream.bytes_stream()))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Provider};

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[test]
    fn insecure_client_only_when_needed() {
        let registry = ProviderRegistry::from_config(&Config::default()).unwrap();
        let transport = HttpTransport::for_registry(&registry, TIMEOUT).unwrap();
        assert!(transport.insecure.is_none());

        let mut config = Config::default();
        config.providers.insert(
            "LAB".into(),
            Provider {
                name: "LAB".into(),
                host: "lab".into(),
                port: 0,
                region: String::new(),
                use_https: true,
                skip_tls_verify: true,
            },
        );
        let registry = ProviderRegistry::from_config(&config).unwrap();
        let transport = HttpTransport::for_registry(&registry, TIMEOUT).unwrap();
        assert!(transport.insecure.is_some());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_error() {
        let transport = HttpTransport::new(Duration::from_secs(2), false).unwrap();
        let target = ResolvedTarget::from_url("http://127.0.0.1:1").unwrap();
        let request = Request::builder().uri("/x").body(Body::empty()).unwrap();
        let err = transport.forward(request, &target).await.unwrap_err();
        assert!(matches!(err, TransportError::Upstream(_)));
    }
}
