//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (enforce request deadline on the call and the body)
//!     → On failure: map to 502/504, single attempt
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - No retries: each request makes exactly one backend attempt

pub mod timeouts;
