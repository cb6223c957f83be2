//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate backend origins and route prefixes
//! - Validate value ranges (timeouts > 0, window > 0)
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::{ClientKeySource, GatewayConfig};
use crate::routing::router::parse_backend;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route #{index} has an empty prefix")]
    EmptyPrefix { index: usize },

    #[error("prefix {0:?} is configured more than once")]
    DuplicatePrefix(String),

    #[error("route {prefix:?} has invalid backend: {reason}")]
    InvalidBackend { prefix: String, reason: String },

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("rate_limit.window_ms must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.reap_interval_secs must be greater than zero")]
    ZeroReapInterval,

    #[error("rate_limit.client_key header {0:?} is not a valid header name")]
    InvalidKeyHeader(String),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.prefix.is_empty() {
            errors.push(ValidationError::EmptyPrefix { index });
        } else if !seen.insert(route.prefix.as_str()) {
            errors.push(ValidationError::DuplicatePrefix(route.prefix.clone()));
        }

        if let Err(reason) = parse_backend(&route.backend) {
            errors.push(ValidationError::InvalidBackend {
                prefix: route.prefix.clone(),
                reason,
            });
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.enabled {
        if rate_limit.window_ms == 0 {
            errors.push(ValidationError::ZeroWindow);
        }
        if rate_limit.reap_interval_secs == 0 {
            errors.push(ValidationError::ZeroReapInterval);
        }
        if let ClientKeySource::Header(name) = &rate_limit.client_key {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidKeyHeader(name.clone()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
