//! Upstream transport subsystem.
//!
//! # Data Flow
//! ```text
//! dispatch stage (pipeline.rs)
//!     → Transport::forward(request, ResolvedTarget)
//!     → http_client.rs (reqwest, TLS chosen by the target's policy)
//!     → streamed upstream response
//! ```
//!
//! # Design Decisions
//! - The transport is a trait object so tests can record what would be sent
//! - Bodies stream in both directions; nothing is buffered here
//! - Redirects are returned to the client, never followed
//! - A `101` response carries the upstream's switched stream as an extension

pub mod http_client;

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::routing::ResolvedTarget;

pub use http_client::HttpTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid upstream URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Upstream(#[from] reqwest::Error),
}

/// Sends one request to one resolved target.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Forward `request`, whose URI holds only the path and query to use.
    async fn forward(
        &self,
        request: Request<Body>,
        target: &ResolvedTarget,
    ) -> Result<Response<Body>, TransportError>;
}

/// Byte stream of a connection that switched protocols.
pub trait UpgradedIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> UpgradedIo for T {}

/// Upstream side of a `101 Switching Protocols` exchange.
///
/// Travels in the response extensions until the dispatch stage takes it.
#[derive(Clone)]
pub struct UpstreamUpgrade(Arc<Mutex<Option<Box<dyn UpgradedIo>>>>);

impl UpstreamUpgrade {
    pub fn new(io: impl UpgradedIo + 'static) -> Self {
        Self(Arc::new(Mutex::new(Some(Box::new(io)))))
    }

    /// The stream, on the first call only.
    pub fn take(&self) -> Option<Box<dyn UpgradedIo>> {
        self.0.lock().ok()?.take()
    }
}

impl fmt::Debug for UpstreamUpgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamUpgrade").finish_non_exhaustive()
    }
}
