//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls with the per-request deadline
//! - Bound the relayed response body by the same deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use axum::body::{Body, Bytes};
use futures_util::{stream, Stream, StreamExt};
use thiserror::Error;
use tokio::time::{self, Instant};

use crate::error::GatewayError;

/// Errors surfaced while streaming a relayed body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request deadline exceeded while streaming body")]
    DeadlineExceeded,

    #[error("backend body error: {0}")]
    Backend(#[from] axum::Error),
}

/// Run a backend call, mapping its failure and deadline expiry.
///
/// `timeout` is only used to describe the deadline in the error.
pub async fn call_with_deadline<F, T, E>(
    deadline: Instant,
    timeout: Duration,
    call: F,
) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match time::timeout_at(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(GatewayError::BackendUnreachable(e.to_string())),
        Err(_) => Err(GatewayError::BackendTimeout(timeout)),
    }
}

/// Re-stream `body`, failing with [`BodyError::DeadlineExceeded`] once
/// `deadline` passes. The inner body is dropped as soon as the stream ends
/// or errors.
pub fn bounded_stream(
    body: Body,
    deadline: Instant,
) -> impl Stream<Item = Result<Bytes, BodyError>> + Send + 'static {
    stream::unfold(Some(body.into_data_stream()), move |state| async move {
        let mut data = state?;
        match time::timeout_at(deadline, data.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(data))),
            Ok(Some(Err(e))) => Some((Err(BodyError::Backend(e)), None)),
            Ok(None) => None,
            Err(_) => Some((Err(BodyError::DeadlineExceeded), None)),
        }
    })
}
