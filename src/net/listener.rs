//! TCP listener setup.
//!
//! # Responsibilities
//! - Bind the configured port on all interfaces
//! - Surface bind failures as the one fatal startup error

use std::net::{Ipv4Addr, SocketAddr};

use thiserror::Error;
use tokio::net::TcpListener;

#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind `0.0.0.0:port`. Port 0 picks an ephemeral port.
pub async fn bind(port: u16) -> Result<TcpListener, ListenerError> {
    bind_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await
}

pub async fn bind_addr(addr: SocketAddr) -> Result<TcpListener, ListenerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;

    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(address = %local_addr, "Listener bound");
    }
    Ok(listener)
}
