//! Forwarding headers.
//!
//! # Responsibilities
//! - Set X-Forwarded-For, X-Forwarded-Host, X-Forwarded-Proto
//!
//! # Design Decisions
//! - Values come from the inbound connection only
//! - Existing X-Forwarded-* values from the client are overwritten, never trusted

use std::net::SocketAddr;

use axum::http::header::InvalidHeaderValue;
use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// What the backend is told about the original connection.
#[derive(Debug, Clone)]
pub struct ForwardedInfo {
    pub client: SocketAddr,
    pub host: Option<HeaderValue>,
    pub proto: String,
}

pub fn set_forwarding_headers(
    headers: &mut HeaderMap,
    info: &ForwardedInfo,
) -> Result<(), InvalidHeaderValue> {
    headers.insert(
        X_FORWARDED_FOR,
        HeaderValue::from_str(&info.client.ip().to_canonical().to_string())?,
    );
    match &info.host {
        Some(host) => {
            headers.insert(X_FORWARDED_HOST, host.clone());
        }
        None => {
            headers.remove(X_FORWARDED_HOST);
        }
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_str(&info.proto)?);
    Ok(())
}
