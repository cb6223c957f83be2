//! Request pipeline: admission → routing → rewrite → forward.
//!
//! Each stage returns `Result<_, GatewayError>` and the pipeline is a plain
//! `?` chain, so a rejected request cannot fall through to a later stage.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tokio::time::Instant;

use crate::config::{ClientKeySource, GatewayConfig};
use crate::error::{GatewayError, RouteError};
use crate::http::client::build_client;
use crate::http::forwarder::{Forwarder, RequestInfo};
use crate::http::request::build_outbound;
use crate::http::X_REQUEST_ID;
use crate::observability::metrics;
use crate::routing::Router;
use crate::security::{Decision, SlidingWindowLimiter};

/// The rate limiter and the key it is consulted with.
pub struct AdmissionGate {
    limiter: Arc<SlidingWindowLimiter>,
    key_source: ClientKeySource,
}

impl AdmissionGate {
    pub fn new(limiter: Arc<SlidingWindowLimiter>, key_source: ClientKeySource) -> Self {
        Self {
            limiter,
            key_source,
        }
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }

    fn admit(&self, request: &Request<Body>, peer: SocketAddr) -> Result<(), GatewayError> {
        let key = self.key_source.client_key(request.headers(), peer);
        match self.limiter.admit(&key) {
            Decision::Allow { .. } => Ok(()),
            Decision::Deny { retry_after } => {
                tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
                metrics::record_rate_limited();
                Err(GatewayError::RateLimited { retry_after })
            }
        }
    }
}

/// Single inbound entry point composing every stage.
pub struct Gateway {
    gate: Option<AdmissionGate>,
    router: Router,
    forwarder: Forwarder,
}

impl Gateway {
    pub fn new(gate: Option<AdmissionGate>, router: Router, forwarder: Forwarder) -> Self {
        Self {
            gate,
            router,
            forwarder,
        }
    }

    /// Build the gateway described by `config`, including its outbound client.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, RouteError> {
        let router = Router::from_config(&config.routes)?;
        let client = build_client(&config.timeouts, &config.pool);
        let forwarder = Forwarder::new(client, config.timeouts.request());

        let gate = config.rate_limit.enabled.then(|| {
            AdmissionGate::new(
                Arc::new(SlidingWindowLimiter::new(
                    config.rate_limit.window(),
                    config.rate_limit.limit,
                )),
                config.rate_limit.client_key.clone(),
            )
        });

        Ok(Self::new(gate, router, forwarder))
    }

    pub fn gate(&self) -> Option<&AdmissionGate> {
        self.gate.as_ref()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle one inbound request from `peer`.
    pub async fn handle(&self, request: Request<Body>, peer: SocketAddr) -> Response {
        match self.dispatch(request, peer).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        }
    }

    async fn dispatch(
        &self,
        request: Request<Body>,
        peer: SocketAddr,
    ) -> Result<Response, GatewayError> {
        if let Some(gate) = &self.gate {
            gate.admit(&request, peer)?;
        }

        let info = RequestInfo {
            request_id: request
                .headers()
                .get(X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string(),
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            started: Instant::now(),
        };

        let route = self.router.resolve(&info.path).ok_or_else(|| {
            tracing::warn!(request_id = %info.request_id, path = %info.path, "No route matched");
            GatewayError::NoRouteFound
        })?;

        let outbound = build_outbound(request, route, peer).map_err(|e| {
            tracing::error!(request_id = %info.request_id, error = %e, "Failed to build outbound request");
            e
        })?;

        Ok(self.forwarder.forward(outbound, info).await)
    }
}
