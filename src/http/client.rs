//! Outbound HTTP client.
//!
//! `http` backends are dialed in plaintext and `https` backends over rustls
//! with the webpki root store.

use std::time::Duration;

use axum::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};

use crate::config::{PoolConfig, TimeoutConfig};

/// Pooled client shared by every forwarded request.
pub type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

pub fn build_client(timeouts: &TimeoutConfig, pool: &PoolConfig) -> HttpClient {
    let mut http = HttpConnector::new();
    http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
    http.set_nodelay(true);
    // The TLS layer needs to see `https` URIs.
    http.enforce_http(false);

    let connector = HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Client::builder(TokioExecutor::new())
        .pool_timer(TokioTimer::new())
        .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
        .pool_max_idle_per_host(pool.max_idle_per_host)
        .build(connector)
}
