//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (longest-prefix lookup)
//!     → Return: matched Route or NoMatch
//!
//! Route Registration (at startup):
//!     RouteConfig[]
//!     → Parse backend origins
//!     → Reject empty/duplicate prefixes
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - No regex in hot path (literal prefix matching only)
//! - Deterministic: same input always matches same route
//! - Longest prefix wins

pub mod router;

pub use router::{Route, Router};
