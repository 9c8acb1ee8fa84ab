//! HTTP server setup and shutdown.
//!
//! # Responsibilities
//! - Build the pipeline and its transport from configuration
//! - Bind the router to a listener with peer addresses available
//! - Run background maintenance (rate limiter eviction)
//! - Drain in-flight requests on shutdown, bounded by the grace period

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::Config;
use crate::http::pipeline::{Pipeline, PipelineError};
use crate::lifecycle::{Shutdown, ShutdownOutcome, DEFAULT_GRACE_PERIOD};
use crate::net::InFlightTracker;
use crate::routing::ProviderRegistry;
use crate::transport::{HttpTransport, TransportError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the gateway.
pub struct HttpServer {
    pipeline: Pipeline,
    grace_period: Duration,
}

impl HttpServer {
    /// Server using the reqwest transport configured from `config`.
    pub fn new(config: &Config) -> Result<Self, ServerError> {
        let registry = Arc::new(ProviderRegistry::from_config(config).map_err(PipelineError::from)?);
        let transport = Arc::new(HttpTransport::for_registry(
            &registry,
            Duration::from_secs(config.server.request_timeout_secs),
        )?);
        Ok(Self {
            pipeline: Pipeline::with_registry(config, registry, transport),
            grace_period: DEFAULT_GRACE_PERIOD,
        })
    }

    /// Override how long in-flight requests may drain.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn tracker(&self) -> &InFlightTracker {
        &self.pipeline.tracker
    }

    /// Serve until `shutdown` triggers, then drain.
    ///
    /// Subscribes before returning, so a trigger sent after this call is never missed.
    pub fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> impl Future<Output = Result<ShutdownOutcome, ServerError>> + Send {
        let mut signal = shutdown.subscribe();
        let eviction_stop = shutdown.subscribe();

        async move {
            let addr = listener.local_addr()?;
            tracing::info!(address = %addr, stages = ?self.pipeline.stages, "HTTP server starting");

            if let Some(limiter) = self.pipeline.rate_limiter.clone() {
                limiter.spawn_eviction(eviction_stop);
            }

            let tracker = self.pipeline.tracker.clone();
            let drain = Arc::new(Notify::new());
            let drain_signal = drain.clone();

            let app = self
                .pipeline
                .router
                .into_make_service_with_connect_info::<SocketAddr>();
            let server = axum::serve(listener, app)
                .with_graceful_shutdown(async move { drain_signal.notified().await })
                .into_future();
            tokio::pin!(server);

            tokio::select! {
                result = &mut server => {
                    result?;
                    tracing::info!("HTTP server stopped");
                    return Ok(ShutdownOutcome::Graceful);
                }
                _ = signal.recv() => {}
            }

            tracing::info!(
                in_flight = tracker.active_count(),
                grace_period_ms = self.grace_period.as_millis() as u64,
                "Draining in-flight requests"
            );
            drain.notify_one();

            match tokio::time::timeout(self.grace_period, &mut server).await {
                Ok(result) => {
                    result?;
                    tracing::info!("All requests drained");
                    Ok(ShutdownOutcome::Graceful)
                }
                Err(_) => {
                    tracing::warn!(
                        remaining = tracker.active_count(),
                        "Grace period elapsed, dropping remaining connections"
                    );
                    Ok(ShutdownOutcome::Forced)
                }
            }
        }
    }
}
