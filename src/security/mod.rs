//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_key.rs (derive limiter key)
//!     → rate_limit.rs (sliding-window admission, 429 on deny)
//!     → Pass to routing
//!     → headers.rs (set X-Forwarded-* on the outbound request)
//! ```
//!
//! # Design Decisions
//! - Admission runs before any routing or backend I/O
//! - Fail closed: a denied request never reaches a backend
//! - No trust in client-supplied forwarding headers

pub mod client_key;
pub mod headers;
pub mod rate_limit;

pub use rate_limit::{Decision, SlidingWindowLimiter};
