//! Configurable HTTP proxy gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────────────┐
//!                  │                        PROXY GATEWAY                          │
//!                  │                                                               │
//!  Client Request  │  ┌──────────┐   ┌──────────────────────────────┐   ┌────────┐ │
//!  ────────────────┼─▶│ listener │──▶│ pipeline                     │──▶│routing │ │
//!                  │  └──────────┘   │ log → block → allow → auth → │   │provider│ │
//!                  │                 │ rate → headers → rewrite     │   └───┬────┘ │
//!                  │                 └──────────────────────────────┘       │      │
//!                  │                                                        ▼      │
//!  Client Response │  ┌──────────┐   ┌──────────┐                    ┌──────────┐  │
//!  ◀───────────────┼──│ response │◀──│ headers  │◀───────────────────│transport │◀─┼── Upstream
//!                  │  └──────────┘   └──────────┘                    └──────────┘  │
//!                  │                                                               │
//!                  │   config · observability · lifecycle (signals, drain)         │
//!                  └──────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use proxy_gateway::config::{try_load_config, Config, ConfigError};
use proxy_gateway::http::HttpServer;
use proxy_gateway::lifecycle::{spawn_signal_handler, Shutdown, ShutdownOutcome};
use proxy_gateway::net;
use proxy_gateway::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "proxy-gateway", version, about = "Configurable HTTP proxy gateway")]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(default_value = "config.yaml")]
    config: PathBuf,

    /// Validate the configuration, print a summary and exit
    #[arg(short, long)]
    test: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.test {
        return Ok(check_config(&cli.config));
    }

    // Logging depends on the config, so load failures are reported once it is up.
    let (config, load_error) = match try_load_config(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    if let Err(e) = logging::init_logging(&config.logging, &config.server) {
        eprintln!("failed to initialise logging: {e}");
    }
    if let Some(e) = load_error {
        tracing::warn!(
            path = %cli.config.display(),
            error = %e,
            "Could not load config file, using defaults"
        );
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = config.mode(),
        port = config.server.port,
        target = %config.server.target,
        providers = ?config.providers.keys().collect::<Vec<_>>(),
        "proxy-gateway starting"
    );

    if config.metrics.enabled {
        match config.metrics.address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.metrics.address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = match HttpServer::new(&config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build server");
            return Ok(ExitCode::FAILURE);
        }
    };

    let listener = match net::bind(config.server.port).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Failed to bind listener");
            return Ok(ExitCode::FAILURE);
        }
    };

    let shutdown = Shutdown::new();
    let running = server.run(listener, shutdown.clone());
    spawn_signal_handler(shutdown);

    let outcome = running.await?;
    match outcome {
        ShutdownOutcome::Graceful => tracing::info!("Shutdown complete"),
        ShutdownOutcome::Forced => tracing::warn!("Shutdown forced"),
    }
    Ok(ExitCode::from(outcome.exit_code()))
}

/// `--test`: load, validate and summarise the configuration.
fn check_config(path: &std::path::Path) -> ExitCode {
    let config = match try_load_config(path) {
        Ok(config) => config,
        Err(ConfigError::Validation(errors)) => {
            eprintln!("configuration {} is invalid:", path.display());
            for error in errors {
                eprintln!("  - {error}");
            }
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("configuration {} could not be loaded: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    let mw = &config.middleware;
    println!("configuration {} is valid", path.display());
    println!("  mode:        {}", config.mode());
    println!("  port:        {}", config.server.port);
    println!("  target:      {}", config.server.target);
    println!("  providers:   {:?}", config.providers.keys().collect::<Vec<_>>());
    println!("  access log:  {}", mw.logging.enabled);
    println!("  auth:        {} ({})", mw.auth.enabled, mw.auth.auth_type);
    println!(
        "  rate limit:  {} ({} rps, burst {})",
        mw.rate_limit.enabled, mw.rate_limit.requests_per_sec, mw.rate_limit.burst_size
    );
    println!("  headers:     {}", mw.headers.enabled);
    println!("  rewrite:     {} ({} rules)", mw.rewrite.enabled, mw.rewrite.rules.len());
    println!(
        "  lists:       {} blocked, {} allowed",
        config.handlers.block_list.len(),
        config.handlers.allow_list.len()
    );
    ExitCode::SUCCESS
}
