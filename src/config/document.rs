//! Raw configuration document as written by operators.
//!
//! Every field is optional so that the merge step can tell "absent" apart from
//! "set to the default value". Unknown keys are ignored.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::config::schema::{AuthType, RewriteMode, RewriteRule};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigDocument {
    pub server: Option<ServerSection>,
    pub logging: Option<LoggingSection>,
    pub middleware: Option<MiddlewareSection>,
    pub handlers: Option<HandlersSection>,
    pub providers: Option<IndexMap<String, Option<ProviderEntry>>>,
    pub metrics: Option<MetricsSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSection {
    pub port: Option<u16>,
    pub target: Option<String>,
    pub verbose: Option<bool>,
    pub provider_header: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareSection {
    pub logging: Option<AccessLogSection>,
    pub auth: Option<AuthSection>,
    pub rate_limit: Option<RateLimitSection>,
    pub headers: Option<HeadersSection>,
    pub rewrite: Option<RewriteSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogSection {
    pub enabled: Option<bool>,
    pub log_body: Option<bool>,
    pub max_body_size: Option<usize>,
    pub exclude_paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSection {
    pub enabled: Option<bool>,
    #[serde(rename = "type")]
    pub auth_type: Option<AuthType>,
    pub users: Option<IndexMap<String, String>>,
    pub api_keys: Option<Vec<String>>,
    pub header_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSection {
    pub enabled: Option<bool>,
    pub requests_per_sec: Option<f64>,
    pub burst_size: Option<u32>,
    #[serde(rename = "byIP")]
    pub by_ip: Option<bool>,
    pub idle_eviction_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadersSection {
    pub enabled: Option<bool>,
    pub add_request: Option<IndexMap<String, String>>,
    pub remove_request: Option<Vec<String>>,
    pub add_response: Option<IndexMap<String, String>>,
    pub remove_response: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RewriteSection {
    pub enabled: Option<bool>,
    pub rules: Option<Vec<RewriteRule>>,
    pub mode: Option<RewriteMode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlersSection {
    pub block_list: Option<Vec<String>>,
    pub allow_list: Option<Vec<String>>,
}

/// A provider entry. Boolean flags exist in two spellings: the camel-style
/// one and the snake-style one used by older config files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderEntry {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub region: Option<String>,
    #[serde(rename = "useHttps")]
    pub use_https: Option<bool>,
    #[serde(rename = "use_https")]
    pub use_https_legacy: Option<bool>,
    #[serde(rename = "skipTlsVerify")]
    pub skip_tls_verify: Option<bool>,
    #[serde(rename = "skip_tls_verify")]
    pub skip_tls_verify_legacy: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSection {
    pub enabled: Option<bool>,
    pub address: Option<String>,
}
