//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::document::ConfigDocument;
use crate::config::merge::merge;
use crate::config::schema::Config;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "Validation failed: {}",
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    Validation(Vec<ValidationError>),
}

/// Syntax of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick a format from the file extension; YAML when unknown.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("toml") => ConfigFormat::Toml,
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Parse a document without merging or validating it.
pub fn parse_document(content: &str, format: ConfigFormat) -> Result<ConfigDocument, ConfigError> {
    // An empty YAML file is a null document, not an error.
    if content.trim().is_empty() {
        return Ok(ConfigDocument::default());
    }
    let document = match format {
        ConfigFormat::Yaml => serde_yaml::from_str::<Option<ConfigDocument>>(content)?.unwrap_or_default(),
        ConfigFormat::Toml => toml::from_str(content)?,
        ConfigFormat::Json => serde_json::from_str(content)?,
    };
    Ok(document)
}

/// Parse, merge over defaults and validate a document held in memory.
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let document = parse_document(content, format)?;
    let config = merge(&Config::default(), document);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a file, reporting failures.
pub fn try_load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&content, ConfigFormat::from_path(path))
}

/// Load configuration from a file, falling back to defaults on any failure.
pub fn load_config(path: &Path) -> Config {
    match try_load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Could not load config file, using defaults"
            );
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn port_only_document_keeps_other_defaults() {
        let config = load_from_str("server:\n  port: 9000\n", ConfigFormat::Yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.target, "https://httpbin.org");
        assert_eq!(config.middleware.rate_limit.burst_size, 50);
        assert_eq!(config.middleware.auth.header_name, "X-API-Key");
        assert!(config.providers.is_empty());
    }

    #[test]
    fn parses_full_yaml_document() {
        let yaml = r#"
server:
  port: 3000
  target: http://backend.internal:8000
middleware:
  auth:
    enabled: true
    type: api_key
    apiKeys: ["k1"]
  rateLimit:
    enabled: true
    requestsPerSec: 5
    burstSize: 10
    byIP: false
  rewrite:
    enabled: true
    mode: first_match
    rules:
      - match: "^/old/(.*)"
        replace: "/new/$1"
handlers:
  blockList: ["/admin*"]
providers:
  aws:
    host: a.example.com
    use_https: true
"#;
        let config = load_from_str(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.middleware.auth.enabled);
        assert_eq!(config.middleware.auth.auth_type, crate::config::AuthType::ApiKey);
        assert!(!config.middleware.rate_limit.by_ip);
        assert_eq!(config.middleware.rate_limit.requests_per_sec, 5.0);
        assert_eq!(config.middleware.rewrite.rules[0].replace, "/new/$1");
        assert_eq!(config.middleware.rewrite.mode, crate::config::RewriteMode::FirstMatch);
        assert_eq!(config.handlers.block_list, vec!["/admin*".to_string()]);
        assert!(config.providers["AWS"].use_https);
    }

    #[test]
    fn parses_toml_and_json() {
        let toml = "[server]\nport = 7000\n\n[providers.gcp]\nhost = \"g.example.com\"\n";
        let config = load_from_str(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.providers["GCP"].host, "g.example.com");

        let json = r#"{"middleware": {"logging": {"logBody": true}}}"#;
        let config = load_from_str(json, ConfigFormat::Json).unwrap();
        assert!(config.middleware.logging.log_body);
        assert!(config.middleware.logging.enabled);
    }

    #[test]
    fn empty_document_is_default() {
        let config = load_from_str("", ConfigFormat::Yaml).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn malformed_section_is_an_error() {
        let err = load_from_str("server:\n  port: not-a-number\n", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let err = load_from_str("server:\n  target: nowhere\n", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("server.target"));
    }

    #[test]
    fn load_config_falls_back_to_defaults() {
        let config = load_config(Path::new("/definitely/not/here/config.yaml"));
        assert_eq!(config, Config::default());

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "server: [this is: not valid").unwrap();
        assert_eq!(load_config(file.path()), Config::default());
    }

    #[test]
    fn load_config_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "server:\n  verbose: true").unwrap();
        let config = load_config(file.path());
        assert!(config.server.verbose);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Yaml);
    }
}
