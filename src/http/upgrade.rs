//! Protocol upgrades such as WebSocket.
//!
//! # Responsibilities
//! - Detect upgrade requests before hop-by-hop headers are stripped
//! - Keep `Connection: upgrade` and `Upgrade` on the forwarded request
//! - Splice the client and upstream connections once both sides switched
//!
//! # Data Flow
//! ```text
//! Client ←──── upgraded bytes ────→ Proxy ←──── upgraded bytes ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Bytes are relayed as they are; frames are never parsed
//! - The relay outlives the HTTP exchange and ends when either side closes

use axum::http::{header, HeaderMap, HeaderValue};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;

use crate::transport::UpstreamUpgrade;

/// The protocol the client asked to switch to, if it asked.
pub fn requested_upgrade(headers: &HeaderMap) -> Option<HeaderValue> {
    let wants_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    if wants_upgrade {
        headers.get(header::UPGRADE).cloned()
    } else {
        None
    }
}

/// Put back the headers an upgrade needs after hop-by-hop stripping.
pub fn restore_upgrade_headers(headers: &mut HeaderMap, protocol: HeaderValue) {
    headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    headers.insert(header::UPGRADE, protocol);
}

/// Relay bytes between client and upstream until either side closes.
pub fn spawn_relay(client: OnUpgrade, upstream: UpstreamUpgrade, url: String) {
    tokio::spawn(async move {
        let Some(mut upstream_io) = upstream.take() else {
            tracing::warn!(url = %url, "Upstream connection already taken");
            return;
        };
        let mut client_io = match client.await {
            Ok(upgraded) => TokioIo::new(upgraded),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Client upgrade failed");
                return;
            }
        };

        match tokio::io::copy_bidirectional(&mut client_io, &mut upstream_io).await {
            Ok((to_upstream, to_client)) => {
                tracing::debug!(url = %url, to_upstream, to_client, "Upgraded connection closed");
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Upgraded connection ended with error");
            }
        }
    });
}
