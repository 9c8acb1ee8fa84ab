//! Section-by-section merge of a parsed document over defaults.
//!
//! Each policy section is merged field by field: a field present in the
//! document replaces the default, an absent field keeps it. Values nested
//! inside a section (maps, lists, rule lists) are replaced as a whole.

use indexmap::IndexMap;

use crate::config::document::{
    AccessLogSection, AuthSection, ConfigDocument, HandlersSection, HeadersSection, LoggingSection,
    MetricsSection, MiddlewareSection, ProviderEntry, RateLimitSection, RewriteSection,
    ServerSection,
};
use crate::config::schema::{
    AccessLogConfig, AuthConfig, Config, HandlersConfig, HeadersConfig, LoggingConfig,
    MetricsConfig, MiddlewareConfig, Provider, RateLimitConfig, RewriteConfig, ServerConfig,
};

/// Merge `loaded` over `defaults`.
pub fn merge(defaults: &Config, loaded: ConfigDocument) -> Config {
    Config {
        server: merge_server(&defaults.server, loaded.server),
        logging: merge_logging(&defaults.logging, loaded.logging),
        middleware: merge_middleware(&defaults.middleware, loaded.middleware),
        handlers: merge_handlers(&defaults.handlers, loaded.handlers),
        providers: normalize_providers(loaded.providers.unwrap_or_default()),
        metrics: merge_metrics(&defaults.metrics, loaded.metrics),
    }
}

pub fn merge_server(d: &ServerConfig, loaded: Option<ServerSection>) -> ServerConfig {
    let Some(s) = loaded else { return d.clone() };
    ServerConfig {
        port: s.port.unwrap_or(d.port),
        target: s.target.unwrap_or_else(|| d.target.clone()),
        verbose: s.verbose.unwrap_or(d.verbose),
        provider_header: s.provider_header.unwrap_or_else(|| d.provider_header.clone()),
        request_timeout_secs: s.request_timeout_secs.unwrap_or(d.request_timeout_secs),
    }
}

pub fn merge_logging(d: &LoggingConfig, loaded: Option<LoggingSection>) -> LoggingConfig {
    let Some(s) = loaded else { return d.clone() };
    LoggingConfig {
        level: s.level.unwrap_or_else(|| d.level.clone()),
        format: s.format.unwrap_or_else(|| d.format.clone()),
    }
}

fn merge_middleware(d: &MiddlewareConfig, loaded: Option<MiddlewareSection>) -> MiddlewareConfig {
    let s = loaded.unwrap_or_default();
    MiddlewareConfig {
        logging: merge_access_log(&d.logging, s.logging),
        auth: merge_auth(&d.auth, s.auth),
        rate_limit: merge_rate_limit(&d.rate_limit, s.rate_limit),
        headers: merge_headers(&d.headers, s.headers),
        rewrite: merge_rewrite(&d.rewrite, s.rewrite),
    }
}

pub fn merge_access_log(d: &AccessLogConfig, loaded: Option<AccessLogSection>) -> AccessLogConfig {
    let Some(s) = loaded else { return d.clone() };
    AccessLogConfig {
        enabled: s.enabled.unwrap_or(d.enabled),
        log_body: s.log_body.unwrap_or(d.log_body),
        max_body_size: s.max_body_size.unwrap_or(d.max_body_size),
        exclude_paths: s.exclude_paths.unwrap_or_else(|| d.exclude_paths.clone()),
    }
}

pub fn merge_auth(d: &AuthConfig, loaded: Option<AuthSection>) -> AuthConfig {
    let Some(s) = loaded else { return d.clone() };
    AuthConfig {
        enabled: s.enabled.unwrap_or(d.enabled),
        auth_type: s.auth_type.unwrap_or(d.auth_type),
        users: s.users.unwrap_or_else(|| d.users.clone()),
        api_keys: s.api_keys.unwrap_or_else(|| d.api_keys.clone()),
        header_name: s.header_name.unwrap_or_else(|| d.header_name.clone()),
    }
}

pub fn merge_rate_limit(d: &RateLimitConfig, loaded: Option<RateLimitSection>) -> RateLimitConfig {
    let Some(s) = loaded else { return d.clone() };
    RateLimitConfig {
        enabled: s.enabled.unwrap_or(d.enabled),
        requests_per_sec: s.requests_per_sec.unwrap_or(d.requests_per_sec),
        burst_size: s.burst_size.unwrap_or(d.burst_size),
        by_ip: s.by_ip.unwrap_or(d.by_ip),
        idle_eviction_secs: s.idle_eviction_secs.unwrap_or(d.idle_eviction_secs),
    }
}

pub fn merge_headers(d: &HeadersConfig, loaded: Option<HeadersSection>) -> HeadersConfig {
    let Some(s) = loaded else { return d.clone() };
    HeadersConfig {
        enabled: s.enabled.unwrap_or(d.enabled),
        add_request: s.add_request.unwrap_or_else(|| d.add_request.clone()),
        remove_request: s.remove_request.unwrap_or_else(|| d.remove_request.clone()),
        add_response: s.add_response.unwrap_or_else(|| d.add_response.clone()),
        remove_response: s.remove_response.unwrap_or_else(|| d.remove_response.clone()),
    }
}

pub fn merge_rewrite(d: &RewriteConfig, loaded: Option<RewriteSection>) -> RewriteConfig {
    let Some(s) = loaded else { return d.clone() };
    RewriteConfig {
        enabled: s.enabled.unwrap_or(d.enabled),
        rules: s.rules.unwrap_or_else(|| d.rules.clone()),
        mode: s.mode.unwrap_or(d.mode),
    }
}

pub fn merge_handlers(d: &HandlersConfig, loaded: Option<HandlersSection>) -> HandlersConfig {
    let Some(s) = loaded else { return d.clone() };
    HandlersConfig {
        block_list: s.block_list.unwrap_or_else(|| d.block_list.clone()),
        allow_list: s.allow_list.unwrap_or_else(|| d.allow_list.clone()),
    }
}

pub fn merge_metrics(d: &MetricsConfig, loaded: Option<MetricsSection>) -> MetricsConfig {
    let Some(s) = loaded else { return d.clone() };
    MetricsConfig {
        enabled: s.enabled.unwrap_or(d.enabled),
        address: s.address.unwrap_or_else(|| d.address.clone()),
    }
}

/// Uppercase provider keys and fill per-provider defaults.
///
/// Later entries whose keys collide after uppercasing replace earlier ones.
pub fn normalize_providers(
    raw: IndexMap<String, Option<ProviderEntry>>,
) -> IndexMap<String, Provider> {
    raw.into_iter()
        .map(|(key, entry)| {
            let provider = normalize_provider(&key, entry.unwrap_or_default());
            (key.to_uppercase(), provider)
        })
        .collect()
}

fn normalize_provider(key: &str, entry: ProviderEntry) -> Provider {
    Provider {
        name: non_empty(entry.name).unwrap_or_else(|| key.to_string()),
        host: non_empty(entry.host).unwrap_or_else(|| "localhost".to_string()),
        port: entry.port.unwrap_or(0),
        region: entry.region.unwrap_or_default(),
        use_https: entry.use_https.or(entry.use_https_legacy).unwrap_or(false),
        skip_tls_verify: entry
            .skip_tls_verify
            .or(entry.skip_tls_verify_legacy)
            .unwrap_or(false),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ProviderEntry {
        ProviderEntry::default()
    }

    #[test]
    fn empty_document_yields_defaults() {
        let merged = merge(&Config::default(), ConfigDocument::default());
        assert_eq!(merged, Config::default());
    }

    #[test]
    fn section_fields_merge_individually() {
        let doc = ConfigDocument {
            middleware: Some(MiddlewareSection {
                rate_limit: Some(RateLimitSection {
                    enabled: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = merge(&Config::default(), doc);
        assert!(merged.middleware.rate_limit.enabled);
        assert_eq!(merged.middleware.rate_limit.burst_size, 50);
        assert_eq!(merged.middleware.rate_limit.requests_per_sec, 100.0);
        assert!(merged.middleware.logging.enabled);
    }

    #[test]
    fn nested_maps_are_replaced_not_merged() {
        let mut defaults = Config::default();
        defaults
            .middleware
            .headers
            .add_request
            .insert("X-Default".into(), "1".into());

        let mut add = IndexMap::new();
        add.insert("X-Custom".to_string(), "2".to_string());
        let merged = merge_headers(
            &defaults.middleware.headers,
            Some(HeadersSection {
                add_request: Some(add),
                ..Default::default()
            }),
        );

        assert_eq!(merged.add_request.len(), 1);
        assert_eq!(merged.add_request.get("X-Custom").map(String::as_str), Some("2"));
    }

    #[test]
    fn provider_keys_are_uppercased_with_defaults() {
        let mut raw = IndexMap::new();
        raw.insert("aws".to_string(), Some(entry()));

        let providers = normalize_providers(raw);
        let aws = &providers["AWS"];
        assert_eq!(aws.name, "aws");
        assert_eq!(aws.host, "localhost");
        assert_eq!(aws.port, 0);
        assert_eq!(aws.region, "");
        assert!(!aws.use_https);
        assert!(!aws.skip_tls_verify);
    }

    #[test]
    fn null_provider_entry_is_defaulted() {
        let mut raw = IndexMap::new();
        raw.insert("gcp".to_string(), None);

        let providers = normalize_providers(raw);
        assert_eq!(providers["GCP"].host, "localhost");
    }

    #[test]
    fn empty_name_and_host_fall_back() {
        let mut raw = IndexMap::new();
        raw.insert(
            "azure".to_string(),
            Some(ProviderEntry {
                name: Some(String::new()),
                host: Some(String::new()),
                ..entry()
            }),
        );

        let providers = normalize_providers(raw);
        assert_eq!(providers["AZURE"].name, "azure");
        assert_eq!(providers["AZURE"].host, "localhost");
    }

    #[test]
    fn camel_style_flags_win_over_snake_style() {
        let mut raw = IndexMap::new();
        raw.insert(
            "edge".to_string(),
            Some(ProviderEntry {
                use_https: Some(false),
                use_https_legacy: Some(true),
                skip_tls_verify_legacy: Some(true),
                ..entry()
            }),
        );

        let providers = normalize_providers(raw);
        assert!(!providers["EDGE"].use_https);
        assert!(providers["EDGE"].skip_tls_verify);
    }
}
