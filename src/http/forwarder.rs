//! Backend request execution and access logging.

use std::fmt::Display;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tokio::time::Instant;

use crate::http::client::HttpClient;
use crate::http::response;
use crate::observability::metrics;
use crate::resilience::timeouts::call_with_deadline;

/// Inbound request facts captured before the request is consumed.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    pub started: Instant,
}

/// One access log entry, written exactly once when the exchange ends.
///
/// Dropping a record that was never completed logs it with `aborted = true`,
/// which covers relays cut short by the caller going away.
pub struct AccessRecord {
    info: RequestInfo,
    target: String,
    backend: String,
    status: StatusCode,
    completed: bool,
    error: Option<String>,
}

impl AccessRecord {
    pub fn new(info: RequestInfo, target: &Uri, status: StatusCode) -> Self {
        Self {
            info,
            target: target.to_string(),
            backend: target
                .authority()
                .map(|a| a.to_string())
                .unwrap_or_default(),
            status,
            completed: false,
            error: None,
        }
    }

    /// The response was delivered in full.
    pub fn complete(mut self) {
        self.completed = true;
    }

    /// The relay stopped early because of `error`.
    pub fn fail(mut self, error: impl Display) {
        self.error = Some(error.to_string());
    }
}

impl Drop for AccessRecord {
    fn drop(&mut self) {
        let latency = self.info.started.elapsed();
        let aborted = !self.completed;

        if let Some(error) = &self.error {
            tracing::warn!(
                request_id = %self.info.request_id,
                target = %self.target,
                error = %error,
                "Response relay interrupted"
            );
        }
        tracing::info!(
            request_id = %self.info.request_id,
            method = %self.info.method,
            path = %self.info.path,
            target = %self.target,
            status = self.status.as_u16(),
            latency_ms = latency.as_secs_f64() * 1000.0,
            aborted,
            "Proxy request"
        );
        metrics::record_request(
            self.info.method.as_str(),
            self.status.as_u16(),
            &self.backend,
            latency,
        );
    }
}

/// Executes outbound requests, one attempt each.
#[derive(Clone)]
pub struct Forwarder {
    client: HttpClient,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(client: HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Send `outbound` and relay the backend's answer.
    ///
    /// Transport failures become 502 and an expired deadline 504. Retries are
    /// intentionally absent. The access record for a relayed response is
    /// written once its body has finished streaming.
    pub async fn forward(&self, outbound: Request<Body>, info: RequestInfo) -> Response {
        let deadline = info.started + self.timeout;
        let target = outbound.uri().clone();

        match call_with_deadline(deadline, self.timeout, self.client.request(outbound)).await {
            Ok(backend_response) => {
                let record = AccessRecord::new(info, &target, backend_response.status());
                response::relay(backend_response, deadline, record)
            }
            Err(e) => {
                tracing::error!(
                    request_id = %info.request_id,
                    target = %target,
                    error = %e,
                    "Upstream error"
                );
                let response = e.into_response();
                AccessRecord::new(info, &target, response.status()).complete();
                response
            }
        }
    }
}
