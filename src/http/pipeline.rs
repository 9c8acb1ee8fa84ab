//! Request pipeline assembly and upstream dispatch.
//!
//! # Responsibilities
//! - Install the configured stages in their fixed order
//! - Serve `/health` outside the stages
//! - Forward whatever survives the stages to the routed target
//!
//! # Design Decisions
//! - Stages are `from_fn_with_state` middleware; disabled stages are not installed
//! - `Router::layer` wraps outside-in, so stages are added innermost first
//! - Any stage may answer on its own; later stages and dispatch are then skipped

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::Response,
    routing::{any, get},
    Router,
};
use hyper::upgrade::OnUpgrade;
use thiserror::Error;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::http::health::health_handler;
use crate::http::middleware::{
    access_log_middleware, request_headers_middleware, response_headers_middleware,
    rewrite_middleware, AccessLog, HeaderRules, RewriteEngine,
};
use crate::http::request::path_and_query;
use crate::http::response::{error_response, response_modifier_middleware, strip_hop_by_hop};
use crate::http::upgrade::{requested_upgrade, restore_upgrade_headers, spawn_relay};
use crate::net::{track_in_flight, InFlightTracker};
use crate::observability::metrics;
use crate::routing::{provider_middleware, ProviderRegistry, TargetError};
use crate::security::{
    allow_list_middleware, auth_middleware, block_list_middleware, rate_limit_middleware,
    AccessList, AuthVerifier, RateLimiter,
};
use crate::transport::{Transport, UpstreamUpgrade};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Target(#[from] TargetError),
}

#[derive(Clone)]
struct DispatchState {
    registry: Arc<ProviderRegistry>,
    transport: Arc<dyn Transport>,
}

/// The assembled application plus the shared state the server needs.
pub struct Pipeline {
    pub router: Router,
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub tracker: InFlightTracker,
    /// Names of the installed stages, outermost first.
    pub stages: Vec<&'static str>,
}

impl Pipeline {
    pub fn build(config: &Config, transport: Arc<dyn Transport>) -> Result<Self, PipelineError> {
        let registry = Arc::new(ProviderRegistry::from_config(config)?);
        Ok(Self::with_registry(config, registry, transport))
    }

    /// Assemble around an already built provider registry.
    pub fn with_registry(
        config: &Config,
        registry: Arc<ProviderRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let tracker = InFlightTracker::new();
        let mw = &config.middleware;
        let mut stages = Vec::new();

        let mut proxy = Router::new()
            .route("/", any(dispatch))
            .route("/{*path}", any(dispatch))
            .with_state(DispatchState {
                registry: registry.clone(),
                transport,
            })
            .layer(from_fn(response_modifier_middleware));
        stages.push("response");

        if registry.is_reverse_proxy() {
            proxy = proxy.layer(from_fn_with_state(registry.clone(), provider_middleware));
            stages.push("provider");
        }

        if mw.rewrite.enabled {
            let engine = Arc::new(RewriteEngine::new(&mw.rewrite));
            proxy = proxy.layer(from_fn_with_state(engine, rewrite_middleware));
            stages.push("rewrite");
        }

        if mw.headers.enabled {
            let response_rules = Arc::new(HeaderRules::response(&mw.headers));
            proxy = proxy.layer(from_fn_with_state(response_rules, response_headers_middleware));
            let request_rules = Arc::new(HeaderRules::request(&mw.headers));
            proxy = proxy.layer(from_fn_with_state(request_rules, request_headers_middleware));
            stages.extend(["response_headers", "request_headers"]);
        }

        let rate_limiter = mw.rate_limit.enabled.then(|| Arc::new(RateLimiter::new(&mw.rate_limit)));
        if let Some(limiter) = &rate_limiter {
            proxy = proxy.layer(from_fn_with_state(limiter.clone(), rate_limit_middleware));
            stages.push("rate_limit");
        }

        if mw.auth.enabled {
            let verifier = Arc::new(AuthVerifier::new(&mw.auth));
            proxy = proxy.layer(from_fn_with_state(verifier, auth_middleware));
            stages.push("auth");
        }

        let allow = AccessList::new(&config.handlers.allow_list);
        if !allow.is_empty() {
            proxy = proxy.layer(from_fn_with_state(Arc::new(allow), allow_list_middleware));
            stages.push("allow_list");
        }

        let block = AccessList::new(&config.handlers.block_list);
        if !block.is_empty() {
            proxy = proxy.layer(from_fn_with_state(Arc::new(block), block_list_middleware));
            stages.push("block_list");
        }

        if mw.logging.enabled {
            let log = Arc::new(AccessLog::new(&mw.logging));
            proxy = proxy.layer(from_fn_with_state(log, access_log_middleware));
            stages.push("access_log");
        }

        stages.reverse();
        tracing::debug!(stages = ?stages, "Pipeline assembled");

        let router = Router::new()
            .route(
                "/health",
                get(health_handler).fallback_service(proxy.clone()),
            )
            .with_state(registry)
            .fallback_service(proxy)
            .layer(from_fn_with_state(tracker.clone(), track_in_flight))
            .layer(from_fn(metrics::track_requests))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http());

        Self {
            router,
            rate_limiter,
            tracker,
            stages,
        }
    }
}

/// Final stage: send the request to the routed target.
async fn dispatch(State(state): State<DispatchState>, mut request: Request<Body>) -> Response {
    let target = state.registry.route(request.extensions());
    let upgrade = requested_upgrade(request.headers());

    strip_hop_by_hop(request.headers_mut());
    request.headers_mut().remove(header::HOST);
    let client_upgrade = match upgrade {
        Some(protocol) => {
            restore_upgrade_headers(request.headers_mut(), protocol);
            request.extensions_mut().remove::<OnUpgrade>()
        }
        None => None,
    };

    let method = request.method().clone();
    let url = target.url_for(path_and_query(&request));
    tracing::debug!(
        method = %method,
        url = %url,
        provider = target.provider.as_deref().unwrap_or("-"),
        "Forwarding request"
    );

    match state.transport.forward(request, &target).await {
        Ok(response) if response.status() != StatusCode::SWITCHING_PROTOCOLS => response,
        Ok(mut response) => {
            let upstream = response.extensions_mut().remove::<UpstreamUpgrade>();
            match (client_upgrade, upstream) {
                (Some(client), Some(upstream)) => {
                    tracing::debug!(url = %url, "Relaying upgraded connection");
                    spawn_relay(client, upstream, url);
                    response
                }
                _ => {
                    tracing::warn!(method = %method, url = %url, "Upstream switched protocols on a connection that cannot be relayed");
                    metrics::record_upstream_error();
                    error_response(StatusCode::BAD_GATEWAY, "Upgraded connection cannot be relayed")
                }
            }
        }
        Err(e) => {
            tracing::error!(method = %method, url = %url, error = %e, "Upstream request failed");
            metrics::record_upstream_error();
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}
