//! Prefix-routing API gateway library.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use error::{GatewayError, RouteError};
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
