//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently being served
//! - Give each tracked request a sequential id for trace output
//! - Report what is still running when the drain deadline passes

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use crate::observability::metrics;

/// Global atomic counter for request sequence ids.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static SEQUENCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique, process-local identifier of a tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceId(u64);

impl SequenceId {
    pub fn new() -> Self {
        Self(SEQUENCE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SequenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Tracks requests that are being served.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    active_count: Arc<AtomicU64>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new in-flight request. Returns a guard that decrements on drop.
    pub fn track(&self) -> InFlightGuard {
        let count = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_in_flight(count);
        InFlightGuard {
            active_count: Arc::clone(&self.active_count),
            id: SequenceId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a request's lifetime.
/// Decrements the active count when dropped, including on cancellation.
#[derive(Debug)]
pub struct InFlightGuard {
    active_count: Arc<AtomicU64>,
    id: SequenceId,
}

impl InFlightGuard {
    pub fn id(&self) -> SequenceId {
        self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let remaining = self.active_count.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::record_in_flight(remaining);
        tracing::trace!(sequence = %self.id, "Request finished");
    }
}

/// Layer that keeps the tracker current for every request.
pub async fn track_in_flight(
    State(tracker): State<InFlightTracker>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let guard = tracker.track();
    tracing::trace!(sequence = %guard.id(), "Request started");
    let response = next.run(request).await;
    drop(guard);
    response
}
