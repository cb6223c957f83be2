//! Outbound request construction.
//!
//! # Responsibilities
//! - Rewrite path and query against the matched backend origin
//! - Copy inbound headers and set forwarding headers
//! - Move the inbound body into the outbound request unbuffered
//!
//! # Design Decisions
//! - The route's backend URL is never mutated; each request gets a fresh URI
//! - Query strings are merged, not overridden: origin parameters may collide
//!   with caller parameters and both are sent
//! - The inbound `Host` is not copied; the client derives it from the
//!   backend authority and the original travels in `X-Forwarded-Host`

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, Request, Uri};
use url::Url;

use crate::error::GatewayError;
use crate::routing::Route;
use crate::security::headers::{set_forwarding_headers, ForwardedInfo};

/// Build the request sent to `route`'s backend, consuming `inbound`.
pub fn build_outbound(
    inbound: Request<Body>,
    route: &Route,
    peer: SocketAddr,
) -> Result<Request<Body>, GatewayError> {
    let (parts, body) = inbound.into_parts();

    let uri = rewrite_uri(&parts.uri, route.backend())?;

    let mut headers = parts.headers;
    let host = headers
        .remove(header::HOST)
        .or_else(|| parts.uri.authority().and_then(|a| a.as_str().parse().ok()));
    let info = ForwardedInfo {
        client: peer,
        host,
        proto: parts.uri.scheme_str().unwrap_or("http").to_string(),
    };
    set_forwarding_headers(&mut headers, &info)
        .map_err(|e| GatewayError::OutboundRequestBuildFailed(e.to_string()))?;

    let mut outbound = Request::new(body);
    *outbound.method_mut() = parts.method;
    *outbound.uri_mut() = uri;
    *outbound.headers_mut() = headers;
    Ok(outbound)
}

/// Absolute backend URI for an inbound request-target.
pub fn rewrite_uri(inbound: &Uri, backend: &Url) -> Result<Uri, GatewayError> {
    let host = backend.host_str().ok_or_else(|| {
        GatewayError::OutboundRequestBuildFailed(format!("backend {backend} has no host"))
    })?;

    let mut target = format!("{}://{}", backend.scheme(), host);
    if let Some(port) = backend.port() {
        target.push_str(&format!(":{port}"));
    }
    target.push_str(&rewrite_path(inbound.path(), backend.path()));

    let query = merge_query(inbound.query().unwrap_or(""), backend.query().unwrap_or(""));
    if !query.is_empty() {
        target.push('?');
        target.push_str(&query);
    }

    target
        .parse()
        .map_err(|e: axum::http::uri::InvalidUri| {
            GatewayError::OutboundRequestBuildFailed(format!("{target}: {e}"))
        })
}

/// Outbound path for `inbound` given the backend base path.
///
/// The outbound path starts where `base` first occurs in `inbound` and keeps
/// the rest. When `base` does not occur the request goes to `base` itself.
/// A bare origin has base `/`, which leaves the inbound path unchanged.
pub fn rewrite_path<'a>(inbound: &'a str, base: &'a str) -> &'a str {
    match inbound.find(base) {
        Some(idx) => &inbound[idx..],
        None => base,
    }
}

/// Join the inbound query with the backend origin's own query.
pub fn merge_query<'a>(inbound: &'a str, origin: &'a str) -> Cow<'a, str> {
    match (inbound.is_empty(), origin.is_empty()) {
        (false, false) => Cow::Owned(format!("{inbound}&{origin}")),
        (false, true) => Cow::Borrowed(inbound),
        (true, _) => Cow::Borrowed(origin),
    }
}
