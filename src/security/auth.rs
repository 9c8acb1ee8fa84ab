//! Client authentication.
//!
//! # Responsibilities
//! - Verify `basic`, `bearer` and `api_key` credentials against the config
//! - Reject with 401 before anything is forwarded
//!
//! # Design Decisions
//! - Credentials live in the gateway config; there is no external store
//! - Any malformed credential is a plain rejection, never an error
//! - The authorization scheme name is matched case-insensitively

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use indexmap::IndexMap;

use crate::config::{AuthConfig, AuthType};
use crate::http::response::error_response;
use crate::observability::metrics;

/// Why a request was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingCredentials,
    Malformed,
    InvalidCredentials,
}

impl RejectReason {
    fn as_str(self) -> &'static str {
        match self {
            RejectReason::MissingCredentials => "missing credentials",
            RejectReason::Malformed => "malformed credentials",
            RejectReason::InvalidCredentials => "invalid credentials",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Admit,
    Reject(RejectReason),
}

/// Credential check for one auth mode.
#[derive(Debug)]
pub struct AuthVerifier {
    mode: AuthType,
    users: IndexMap<String, String>,
    api_keys: HashSet<String>,
    /// `None` when the configured header name is unusable.
    header_name: Option<HeaderName>,
}

impl AuthVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let header_name = HeaderName::from_bytes(config.header_name.as_bytes()).ok();
        if config.auth_type == AuthType::ApiKey && header_name.is_none() {
            tracing::warn!(
                header = %config.header_name,
                "Invalid api key header name, every request will be rejected"
            );
        }

        Self {
            mode: config.auth_type,
            users: config.users.clone(),
            api_keys: config.api_keys.iter().cloned().collect(),
            header_name,
        }
    }

    pub fn mode(&self) -> AuthType {
        self.mode
    }

    pub fn verify(&self, headers: &HeaderMap) -> AuthDecision {
        match self.mode {
            AuthType::Basic => self.verify_basic(headers),
            AuthType::Bearer => self.verify_bearer(headers),
            AuthType::ApiKey => self.verify_api_key(headers),
        }
    }

    fn verify_basic(&self, headers: &HeaderMap) -> AuthDecision {
        let encoded = match authorization(headers, "Basic") {
            Ok(encoded) => encoded,
            Err(reason) => return AuthDecision::Reject(reason),
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return AuthDecision::Reject(RejectReason::Malformed);
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return AuthDecision::Reject(RejectReason::Malformed);
        };
        let Some((user, password)) = decoded.split_once(':') else {
            return AuthDecision::Reject(RejectReason::Malformed);
        };

        match self.users.get(user) {
            Some(expected) if expected == password => AuthDecision::Admit,
            _ => AuthDecision::Reject(RejectReason::InvalidCredentials),
        }
    }

    fn verify_bearer(&self, headers: &HeaderMap) -> AuthDecision {
        match authorization(headers, "Bearer") {
            Ok(token) => self.check_key(token.trim()),
            Err(reason) => AuthDecision::Reject(reason),
        }
    }

    fn verify_api_key(&self, headers: &HeaderMap) -> AuthDecision {
        let Some(name) = &self.header_name else {
            return AuthDecision::Reject(RejectReason::InvalidCredentials);
        };
        match headers.get(name).map(HeaderValue::to_str) {
            None => AuthDecision::Reject(RejectReason::MissingCredentials),
            Some(Err(_)) => AuthDecision::Reject(RejectReason::Malformed),
            Some(Ok(key)) => self.check_key(key),
        }
    }

    fn check_key(&self, key: &str) -> AuthDecision {
        if !key.is_empty() && self.api_keys.contains(key) {
            AuthDecision::Admit
        } else {
            AuthDecision::Reject(RejectReason::InvalidCredentials)
        }
    }
}

/// Credentials following `scheme` in the `Authorization` header.
fn authorization<'a>(headers: &'a HeaderMap, scheme: &str) -> Result<&'a str, RejectReason> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(RejectReason::MissingCredentials)?
        .to_str()
        .map_err(|_| RejectReason::Malformed)?;
    let (given, credentials) = value.split_once(' ').ok_or(RejectReason::Malformed)?;
    if given.eq_ignore_ascii_case(scheme) {
        Ok(credentials)
    } else {
        Err(RejectReason::Malformed)
    }
}

/// 401 response, with a Basic challenge when that mode is active.
pub fn unauthorized(mode: AuthType) -> Response {
    let mut response = error_response(StatusCode::UNAUTHORIZED, "Authentication required");
    if mode == AuthType::Basic {
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=\"proxy\""),
        );
    }
    response
}

pub async fn auth_middleware(
    State(verifier): State<Arc<AuthVerifier>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match verifier.verify(request.headers()) {
        AuthDecision::Admit => next.run(request).await,
        AuthDecision::Reject(reason) => {
            tracing::debug!(
                mode = %verifier.mode(),
                reason = reason.as_str(),
                path = %request.uri().path(),
                "Authentication failed"
            );
            metrics::record_rejection("auth");
            unauthorized(verifier.mode())
        }
    }
}
