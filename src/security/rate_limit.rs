//! Token-bucket rate limiting keyed by client IP or a single global key.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::http::request::client_ip;
use crate::http::response::error_response;
use crate::observability::metrics;

/// Key shared by every client when `byIP` is off.
pub const GLOBAL_KEY: &str = "global";

/// How often idle buckets are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A simple token bucket.
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// True once `idle` worth of refill brings the bucket back to capacity.
    fn refilled_after(&self, idle: Duration, capacity: f64, refill_rate: f64) -> bool {
        self.tokens + idle.as_secs_f64() * refill_rate >= capacity
    }
}

/// Per-key token buckets. Entries of the map lock independently.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    requests_per_sec: f64,
    burst_size: f64,
    by_ip: bool,
    idle_eviction: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            requests_per_sec: config.requests_per_sec,
            burst_size: f64::from(config.burst_size),
            by_ip: config.by_ip,
            idle_eviction: Duration::from_secs(config.idle_eviction_secs),
        }
    }

    /// Bucket key for a request.
    pub fn key_for(&self, request: &Request<Body>) -> String {
        if self.by_ip {
            client_ip(request)
        } else {
            GLOBAL_KEY.to_string()
        }
    }

    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    /// Admit or reject one request for `key` as of `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::full(self.burst_size, now));
        bucket.try_acquire(self.burst_size, self.requests_per_sec, now)
    }

    /// Drop buckets untouched for longer than `max_idle` that have also
    /// refilled to capacity, so a recreated bucket grants nothing extra.
    /// Returns how many went.
    pub fn sweep_idle(&self, now: Instant, max_idle: Duration) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            let idle = now.saturating_duration_since(bucket.last_refill);
            idle <= max_idle || !bucket.refilled_after(idle, self.burst_size, self.requests_per_sec)
        });
        before.saturating_sub(self.buckets.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    /// Sweep idle buckets every [`SWEEP_INTERVAL`] until shutdown.
    pub fn spawn_eviction(
        self: Arc<Self>,
        mut stop: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = self.sweep_idle(Instant::now(), self.idle_eviction);
                        if evicted > 0 {
                            tracing::debug!(evicted, remaining = self.tracked_keys(), "Evicted idle rate limit buckets");
                        }
                    }
                    _ = stop.recv() => break,
                }
            }
        })
    }
}

/// 429 with a one second retry hint.
pub fn too_many_requests() -> Response {
    let mut response = error_response(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded");
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
    response
}

/// Middleware function for rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = limiter.key_for(&request);

    if limiter.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rejection("rate_limit");
        too_many_requests()
    }
}
