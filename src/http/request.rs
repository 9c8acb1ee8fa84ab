//! Request inspection and transformation helpers.
//!
//! # Responsibilities
//! - Resolve the client address behind trusted proxies
//! - Extract routing-relevant information (host, path)
//! - Replace the path and query while keeping the rest of the URI

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, uri::PathAndQuery, HeaderName, Request, Uri},
};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Client address with trust-proxy semantics.
///
/// The first entry of `X-Forwarded-For` wins, then the socket peer address,
/// then `"unknown"` when neither is available.
pub fn client_ip(req: &Request<Body>) -> String {
    let forwarded = req
        .headers()
        .get(&X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Request host without port, lowercased.
///
/// Absolute-form URIs (forward-proxy requests) take precedence over `Host`.
pub fn request_host(req: &Request<Body>) -> Option<String> {
    if let Some(host) = req.uri().host() {
        return Some(host.to_ascii_lowercase());
    }
    let raw = req.headers().get(header::HOST)?.to_str().ok()?;
    let host = match raw.strip_prefix('[') {
        // IPv6 literal: keep the brackets, drop the port.
        Some(rest) => rest.split(']').next().map(|h| format!("[{h}]"))?,
        None => raw.split(':').next()?.to_string(),
    };
    Some(host.to_ascii_lowercase())
}

/// Path and query of the request, `/` when absent.
pub fn path_and_query(req: &Request<Body>) -> &str {
    req.uri().path_and_query().map(PathAndQuery::as_str).unwrap_or("/")
}

/// Request id assigned by the request-id layer, if any.
pub fn request_id(req: &Request<Body>) -> String {
    req.headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Replace the request's path and query, keeping scheme and authority.
pub fn set_path_and_query(req: &mut Request<Body>, value: &str) -> Result<(), axum::http::Error> {
    let mut parts = req.uri().clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(value)?);
    *req.uri_mut() = Uri::from_parts(parts)?;
    Ok(())
}
