//! Upstream targets and their TLS policy.

use std::fmt;

use thiserror::Error;
use url::Url;

use crate::config::Provider;

/// Whether the upstream certificate is verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsPolicy {
    #[default]
    Verify,
    SkipVerify,
}

#[derive(Debug, Error, PartialEq)]
pub enum TargetError {
    #[error("invalid target URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Where a single request is sent.
///
/// Resolved per request and carried in the request's extensions; never
/// shared between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub https: bool,
    pub host: String,
    /// `None` means the scheme's default port.
    pub port: Option<u16>,
    /// Prefix prepended to every forwarded path, without trailing slash.
    pub base_path: String,
    pub tls: TlsPolicy,
    /// Uppercased provider key, `None` for the static default target.
    pub provider: Option<String>,
}

impl ResolvedTarget {
    /// Parse a static target such as `https://httpbin.org` or `http://10.0.0.2:8000/api`.
    pub fn from_url(raw: &str) -> Result<Self, TargetError> {
        let invalid = |reason: &str| TargetError::InvalidUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };
        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        let https = match url.scheme() {
            "http" => false,
            "https" => true,
            _ => return Err(invalid("scheme must be http or https")),
        };
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;

        Ok(Self {
            https,
            host: host.to_string(),
            port: url.port(),
            base_path: url.path().trim_end_matches('/').to_string(),
            tls: TlsPolicy::Verify,
            provider: None,
        })
    }

    /// Target for a configured provider stored under `key`.
    pub fn for_provider(key: &str, provider: &Provider) -> Self {
        Self {
            https: provider.use_https,
            host: provider.host.clone(),
            port: (provider.port != 0).then_some(provider.port),
            base_path: String::new(),
            tls: if provider.skip_tls_verify {
                TlsPolicy::SkipVerify
            } else {
                TlsPolicy::Verify
            },
            provider: Some(key.to_string()),
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }

    /// Scheme, host and optional port, e.g. `https://a.example.com`.
    pub fn origin(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme(), self.host, port),
            None => format!("{}://{}", self.scheme(), self.host),
        }
    }

    /// Absolute upstream URL for an inbound path and query.
    pub fn url_for(&self, path_and_query: &str) -> String {
        let path = if path_and_query.starts_with('/') {
            path_and_query.to_string()
        } else {
            format!("/{path_and_query}")
        };
        format!("{}{}{}", self.origin(), self.base_path, path)
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin(), self.base_path)
    }
}
