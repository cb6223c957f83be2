//! Response relay.
//!
//! # Responsibilities
//! - Hand the backend's status and headers to the caller unchanged
//! - Stream the backend body through without buffering
//! - Close the access record when the body ends
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Headers are committed before the body, so a failure mid-body leaves the
//!   caller with the original status and a truncated body (the connection is
//!   aborted rather than completed)

use axum::body::{Body, Bytes};
use axum::http::Response as HttpResponse;
use axum::response::Response;
use axum::BoxError;
use futures_util::{stream, StreamExt};
use hyper::body::Body as HttpBody;
use tokio::time::Instant;

use crate::http::forwarder::AccessRecord;
use crate::resilience::timeouts::bounded_stream;

/// Convert a backend response into the caller's response.
///
/// `record` is completed when the body has been relayed in full and marked
/// aborted if the stream errors or is dropped first.
pub fn relay<B>(backend: HttpResponse<B>, deadline: Instant, record: AccessRecord) -> Response
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let (parts, body) = backend.into_parts();

    // Nothing to stream (HEAD, 204, empty bodies).
    if body.is_end_stream() {
        record.complete();
        return Response::from_parts(parts, Body::new(body));
    }

    let chunks = Box::pin(bounded_stream(Body::new(body), deadline));
    let body = stream::unfold(Some((chunks, record)), |state| async move {
        let (mut chunks, record) = state?;
        match chunks.next().await {
            Some(Ok(chunk)) => Some((Ok(chunk), Some((chunks, record)))),
            Some(Err(e)) => {
                record.fail(&e);
                Some((Err(e), None))
            }
            None => {
                record.complete();
                None
            }
        }
    });

    Response::from_parts(parts, Body::from_stream(body))
}
