//! Runtime configuration.
//!
//! Defaults suit a server on the local machine and can be overridden per field or from the
//! environment:
//!
//! - `SERVER_API_ORIGIN` (default `http://127.0.0.1:45457`)
//! - `SERVER_API_GRAPHQL_PATH` (default `/`)
//! - `SERVER_API_HTTP_TIMEOUT_SECS` (default 30)
//! - `SERVER_API_PROBE_DELAY_MS` (default 100)
//! - `SERVER_API_REST_SUPPORTED` (default `>=1.13.0`)
//! - `SERVER_API_KEYRING_SERVICE` (default `server-api`)

use crate::negotiation::policy::DEFAULT_REST_API_SUPPORTED;
use std::env;
use std::time::Duration;

pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:45457";
pub const DEFAULT_GRAPHQL_PATH: &str = "/";
pub const DEFAULT_KEYRING_SERVICE: &str = "server-api";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerApiConfig {
    /// Origin both protocol clients talk to.
    pub origin: String,
    /// Path of the GraphQL endpoint, relative to `origin`.
    pub graphql_path: String,
    /// Per-request timeout for forwarded calls (and connect timeout for all calls).
    pub http_timeout: Duration,
    /// Fixed pause between failed negotiation probe rounds.
    pub probe_retry_delay: Duration,
    /// Version range from which the server speaks the REST API.
    pub rest_supported: String,
    /// Keychain service name used by [`crate::auth::KeyringStore`].
    pub keyring_service: String,
}

impl Default for ServerApiConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            graphql_path: DEFAULT_GRAPHQL_PATH.to_string(),
            http_timeout: Duration::from_secs(30),
            probe_retry_delay: Duration::from_millis(100),
            rest_supported: DEFAULT_REST_API_SUPPORTED.to_string(),
            keyring_service: DEFAULT_KEYRING_SERVICE.to_string(),
        }
    }
}

impl ServerApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, overridden by any valid `SERVER_API_*` environment variables.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(origin) = non_empty_var("SERVER_API_ORIGIN") {
            cfg.origin = origin;
        }
        if let Some(path) = non_empty_var("SERVER_API_GRAPHQL_PATH") {
            cfg.graphql_path = path;
        }
        if let Some(secs) = env::var("SERVER_API_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
        {
            cfg.http_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env::var("SERVER_API_PROBE_DELAY_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            cfg.probe_retry_delay = Duration::from_millis(ms);
        }
        if let Some(range) = non_empty_var("SERVER_API_REST_SUPPORTED") {
            cfg.rest_supported = range;
        }
        if let Some(service) = non_empty_var("SERVER_API_KEYRING_SERVICE") {
            cfg.keyring_service = service;
        }

        cfg
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_graphql_path(mut self, path: impl Into<String>) -> Self {
        self.graphql_path = path.into();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_probe_retry_delay(mut self, delay: Duration) -> Self {
        self.probe_retry_delay = delay;
        self
    }

    pub fn with_rest_supported(mut self, range: impl Into<String>) -> Self {
        self.rest_supported = range.into();
        self
    }

    pub fn with_keyring_service(mut self, service: impl Into<String>) -> Self {
        self.keyring_service = service.into();
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
