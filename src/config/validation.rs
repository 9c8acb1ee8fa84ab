//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (rates > 0, burst >= 1)
//! - Check the default target is a usable absolute URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>

use thiserror::Error;
use url::Url;

use crate::config::schema::Config;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("server.target must be an absolute http(s) URL, got {0:?}")]
    InvalidTarget(String),

    #[error("middleware.rateLimit.requestsPerSec must be positive, got {0}")]
    InvalidRate(f64),

    #[error("middleware.rateLimit.burstSize must be at least 1, got {0}")]
    InvalidBurst(u32),

    #[error("logging.format must be \"json\" or \"text\", got {0:?}")]
    InvalidLogFormat(String),

    #[error("server.providerHeader is not a valid header name: {0:?}")]
    InvalidProviderHeader(String),
}

/// Validate a merged configuration.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let target_ok = Url::parse(&config.server.target)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false);
    if !target_ok {
        errors.push(ValidationError::InvalidTarget(config.server.target.clone()));
    }

    if axum::http::HeaderName::from_bytes(config.server.provider_header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidProviderHeader(
            config.server.provider_header.clone(),
        ));
    }

    let rate_limit = &config.middleware.rate_limit;
    if rate_limit.enabled {
        if !(rate_limit.requests_per_sec > 0.0 && rate_limit.requests_per_sec.is_finite()) {
            errors.push(ValidationError::InvalidRate(rate_limit.requests_per_sec));
        }
        if rate_limit.burst_size < 1 {
            errors.push(ValidationError::InvalidBurst(rate_limit.burst_size));
        }
    }

    if !matches!(config.logging.format.as_str(), "json" | "text") {
        errors.push(ValidationError::InvalidLogFormat(config.logging.format.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = Config::default();
        config.server.target = "not a url".into();
        config.logging.format = "xml".into();
        config.middleware.rate_limit.enabled = true;
        config.middleware.rate_limit.requests_per_sec = 0.0;
        config.middleware.rate_limit.burst_size = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::InvalidBurst(0)));
    }

    #[test]
    fn disabled_rate_limit_is_not_checked() {
        let mut config = Config::default();
        config.middleware.rate_limit.burst_size = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_non_http_target() {
        let mut config = Config::default();
        config.server.target = "ftp://files.example.com".into();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidTarget("ftp://files.example.com".into())])
        );
    }
}
