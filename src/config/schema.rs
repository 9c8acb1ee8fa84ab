//! Configuration schema definitions.
//!
//! These are the normalised, fully-defaulted types the rest of the proxy
//! consumes. They are produced by [`merge`](crate::config::merge) from a
//! parsed [`ConfigDocument`](crate::config::document::ConfigDocument) and are
//! never mutated after startup.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Listener and default target settings.
    pub server: ServerConfig,

    /// Log level and output format.
    pub logging: LoggingConfig,

    /// Per-request middleware policies.
    pub middleware: MiddlewareConfig,

    /// Block and allow lists.
    pub handlers: HandlersConfig,

    /// Named upstream providers, keyed by uppercased name.
    pub providers: IndexMap<String, Provider>,

    /// Prometheus exporter settings.
    pub metrics: MetricsConfig,
}

impl Config {
    /// True when at least one provider is configured (reverse-proxy mode).
    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Mode label reported by the health endpoint and startup logs.
    pub fn mode(&self) -> &'static str {
        if self.has_providers() {
            "reverse-proxy"
        } else {
            "forward-proxy"
        }
    }
}

/// Listener and default target settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port to listen on (all interfaces).
    pub port: u16,

    /// Static upstream used when no provider matches.
    pub target: String,

    /// Log transport activity at debug level.
    pub verbose: bool,

    /// Request header that names a provider.
    pub provider_header: String,

    /// Upper bound on a single upstream exchange, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            target: "https://httpbin.org".to_string(),
            verbose: false,
            provider_header: "X-Provider".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingConfig {
    /// Level or `EnvFilter` directive string (trace, debug, info, warn, error).
    pub level: String,

    /// `json` or `text`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// The five toggleable middleware policies.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareConfig {
    pub logging: AccessLogConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub headers: HeadersConfig,
    pub rewrite: RewriteConfig,
}

/// Access logging policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogConfig {
    pub enabled: bool,

    /// Include the request body in the log line.
    pub log_body: bool,

    /// Bodies with a declared length above this are not logged.
    pub max_body_size: usize,

    /// Path prefixes that are never logged.
    pub exclude_paths: Vec<String>,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_body: false,
            max_body_size: 1024,
            exclude_paths: Vec::new(),
        }
    }
}

/// Credential scheme checked by the auth stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    #[default]
    Basic,
    Bearer,
    ApiKey,
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthType::Basic => write!(f, "basic"),
            AuthType::Bearer => write!(f, "bearer"),
            AuthType::ApiKey => write!(f, "api_key"),
        }
    }
}

/// Authentication policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    pub enabled: bool,

    #[serde(rename = "type")]
    pub auth_type: AuthType,

    /// Username → password for `basic`.
    pub users: IndexMap<String, String>,

    /// Accepted tokens for `bearer` and `api_key`.
    pub api_keys: Vec<String>,

    /// Header carrying the key for `api_key`.
    pub header_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auth_type: AuthType::Basic,
            users: IndexMap::new(),
            api_keys: Vec::new(),
            header_name: "X-API-Key".to_string(),
        }
    }
}

/// Rate limiting policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    pub enabled: bool,

    /// Token refill rate.
    pub requests_per_sec: f64,

    /// Bucket capacity.
    pub burst_size: u32,

    /// Key buckets by client IP instead of one global bucket.
    #[serde(rename = "byIP")]
    pub by_ip: bool,

    /// Buckets untouched for longer than this are evicted.
    pub idle_eviction_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_sec: 100.0,
            burst_size: 50,
            by_ip: true,
            idle_eviction_secs: 600,
        }
    }
}

/// Header add/remove policy.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HeadersConfig {
    pub enabled: bool,
    pub add_request: IndexMap<String, String>,
    pub remove_request: Vec<String>,
    pub add_response: IndexMap<String, String>,
    pub remove_response: Vec<String>,
}

/// One URL rewrite rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Regular expression matched against path and query.
    #[serde(rename = "match")]
    pub pattern: String,

    /// Replacement, may reference capture groups (`$1`, `${name}`).
    pub replace: String,
}

/// How multiple rewrite rules combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMode {
    /// Every rule runs against the previous rule's output.
    #[default]
    Chain,
    /// Only the first matching rule runs.
    FirstMatch,
}

/// URL rewrite policy.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct RewriteConfig {
    pub enabled: bool,
    pub rules: Vec<RewriteRule>,
    pub mode: RewriteMode,
}

/// Access list handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HandlersConfig {
    pub block_list: Vec<String>,
    pub allow_list: Vec<String>,
}

/// A named upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub name: String,
    pub host: String,
    /// Zero means the scheme's default port.
    pub port: u16,
    pub region: String,
    pub use_https: bool,
    pub skip_tls_verify: bool,
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}
