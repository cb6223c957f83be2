//! Client identity used as the rate limiter key.
//!
//! Keys are namespaced by source so a header value can never collide with
//! an address.

use std::net::SocketAddr;

use axum::http::HeaderMap;

use crate::config::ClientKeySource;

impl ClientKeySource {
    /// Derive the limiter key for a request from `peer`.
    pub fn client_key(&self, headers: &HeaderMap, peer: SocketAddr) -> String {
        match self {
            ClientKeySource::RemoteAddr => ip_key(peer),
            ClientKeySource::Header(name) => headers
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| format!("header:{v}"))
                .unwrap_or_else(|| ip_key(peer)),
        }
    }
}

// The port is ignored: every connection from one host shares a window.
// IPv4-mapped addresses from a dual-stack listener collapse to plain IPv4.
fn ip_key(peer: SocketAddr) -> String {
    format!("ip:{}", peer.ip().to_canonical())
}
