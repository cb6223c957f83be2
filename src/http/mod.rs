//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → gateway pipeline (admission, routing)
//!     → request.rs (rewrite path/query/headers)
//!     → forwarder.rs (client.rs pool, deadline, access log)
//!     → response.rs (relay status, headers, streamed body)
//!     → Send to client
//! ```

pub mod client;
pub mod forwarder;
pub mod request;
pub mod response;
pub mod server;

use axum::http::HeaderName;

pub use server::HttpServer;

/// Request ID header, set on entry and propagated to backends and responses.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
