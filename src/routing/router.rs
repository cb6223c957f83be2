//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store registered prefix routes
//! - Look up the longest matching prefix for a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes kept sorted by descending prefix length, so the first hit of the
//!   O(n) scan is the longest match
//! - Duplicate prefixes are rejected: two distinct prefixes of equal length can
//!   never both match the same path, so this removes every possible tie
//! - Explicit NoMatch rather than silent default

use url::Url;

use crate::config::RouteConfig;
use crate::error::RouteError;

/// A prefix mapped to an immutable backend origin.
#[derive(Debug, Clone)]
pub struct Route {
    prefix: String,
    backend: Url,
}

impl Route {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn backend(&self) -> &Url {
        &self.backend
    }
}

/// Parse a backend origin, requiring an absolute `http` or `https` URL with
/// a host.
pub(crate) fn parse_backend(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {:?}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(url)
}

/// Longest-prefix route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a router from configured routes, failing on the first bad entry.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, RouteError> {
        let mut router = Self::new();
        for config in configs {
            router.add_route(&config.prefix, &config.backend)?;
        }
        Ok(router)
    }

    /// Register `prefix` → `backend`.
    pub fn add_route(&mut self, prefix: &str, backend: &str) -> Result<(), RouteError> {
        if prefix.is_empty() {
            return Err(RouteError::EmptyPrefix);
        }
        if self.routes.iter().any(|r| r.prefix == prefix) {
            return Err(RouteError::DuplicatePrefix(prefix.to_string()));
        }
        let backend = parse_backend(backend).map_err(|reason| RouteError::InvalidBackendUrl {
            url: backend.to_string(),
            reason,
        })?;

        // Insert after every prefix at least as long to keep the order stable.
        let position = self
            .routes
            .iter()
            .position(|r| r.prefix.len() < prefix.len())
            .unwrap_or(self.routes.len());
        self.routes.insert(
            position,
            Route {
                prefix: prefix.to_string(),
                backend,
            },
        );
        Ok(())
    }

    /// Find the route with the longest prefix of `path`.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| path.starts_with(&r.prefix))
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
