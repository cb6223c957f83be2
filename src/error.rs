//! Error taxonomy for request handling and route registration.
//!
//! Every [`GatewayError`] is scoped to a single request: it is turned into a
//! plain-text response for that caller and never escapes the handler.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Per-request failures, each mapped to the status the caller receives.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("service not found")]
    NoRouteFound,

    #[error("failed to build outbound request: {0}")]
    OutboundRequestBuildFailed(String),

    #[error("failed to execute request: {0}")]
    BackendUnreachable(String),

    #[error("backend did not respond within {0:?}")]
    BackendTimeout(Duration),

    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoRouteFound => StatusCode::NOT_FOUND,
            GatewayError::OutboundRequestBuildFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::BackendUnreachable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::BackendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, self.to_string()).into_response();

        if let GatewayError::RateLimited { retry_after } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
        }

        response
    }
}

/// Whole seconds for `Retry-After`, rounded up and never zero.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

/// Route registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route prefix must not be empty")]
    EmptyPrefix,

    #[error("prefix {0:?} is already registered")]
    DuplicatePrefix(String),

    #[error("invalid backend URL {url:?}: {reason}")]
    InvalidBackendUrl { url: String, reason: String },
}
