//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber from the `logging` config section
//! - Honour `RUST_LOG` over the configured level
//!
//! # Design Decisions
//! - JSON format for production, plain text for development
//! - `server.verbose` turns on debug output for the upstream transport

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LoggingConfig, ServerConfig};

/// Build the filter directive string for a configuration.
pub fn filter_directives(logging: &LoggingConfig, server: &ServerConfig) -> String {
    let mut directives = logging.level.clone();
    if server.verbose {
        directives.push_str(",proxy_gateway::transport=debug,proxy_gateway::http::pipeline=debug");
    }
    directives
}

/// Install the global subscriber.
pub fn init_logging(
    logging: &LoggingConfig,
    server: &ServerConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(logging, server)));

    let json = logging.format == "json";
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_current_span(false)))
        .with((!json).then(fmt::layer))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_adds_transport_debug() {
        let mut server = ServerConfig::default();
        assert_eq!(filter_directives(&LoggingConfig::default(), &server), "info");

        server.verbose = true;
        let directives = filter_directives(&LoggingConfig::default(), &server);
        assert!(directives.starts_with("info,"));
        assert!(directives.contains("proxy_gateway::transport=debug"));
    }
}
