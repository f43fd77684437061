//! Credential resolution.
//!
//! The token a session authenticates with comes from different places depending on
//! where the code runs:
//!
//! | Context | Source |
//! |---------|--------|
//! | [`ExecutionContext::Foreground`] | `authToken` query parameter of the current location |
//! | [`ExecutionContext::Worker`] | shared store key `latest-auth-token`, then the worker location's `authToken` |
//!
//! A missing token is a valid outcome (older hosts never shared one with workers) and is
//! never an error.

pub mod store;

pub use store::{InMemoryStore, KeyValueStore, KeyringStore};

use crate::config::ServerApiConfig;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::Url;

/// Query parameter carrying the token on a location URL.
pub const AUTH_TOKEN_QUERY_PARAM: &str = "authToken";

/// Store key under which the most recently published token is kept.
pub const LATEST_AUTH_TOKEN_KEY: &str = "latest-auth-token";

/// Opaque bearer credential. Never printed in full.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AuthToken(String);

impl AuthToken {
    /// Returns `None` for empty (or whitespace-only) values.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.trim().is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Where this process is running, and what it can read credentials from.
#[derive(Clone)]
pub enum ExecutionContext {
    /// A foreground session with direct access to its own location.
    Foreground { location: Url },
    /// A background worker; shares state with the foreground through `store`.
    Worker {
        location: Url,
        store: Arc<dyn KeyValueStore>,
    },
}

impl ExecutionContext {
    pub fn foreground(location: Url) -> Self {
        Self::Foreground { location }
    }

    pub fn worker(location: Url, store: Arc<dyn KeyValueStore>) -> Self {
        Self::Worker { location, store }
    }

    /// A worker reading the shared token from the OS keychain service named in `config`.
    pub fn keyring_worker(location: Url, config: &ServerApiConfig) -> Self {
        Self::worker(location, Arc::new(KeyringStore::from_config(config)))
    }

    pub fn location(&self) -> &Url {
        match self {
            Self::Foreground { location } | Self::Worker { location, .. } => location,
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Foreground { .. } => f.write_str("Foreground"),
            Self::Worker { .. } => f.write_str("Worker"),
        }
    }
}

/// Read the `authToken` query parameter from a location.
pub fn token_from_location(location: &Url) -> Option<AuthToken> {
    location
        .query_pairs()
        .find(|(k, _)| k == AUTH_TOKEN_QUERY_PARAM)
        .and_then(|(_, v)| AuthToken::new(v.into_owned()))
}

/// Resolves the session credential once and hands out the same value afterwards.
pub struct CredentialResolver {
    context: ExecutionContext,
    resolved: OnceCell<Option<AuthToken>>,
}

impl CredentialResolver {
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            resolved: OnceCell::new(),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Resolve the token for this context. Only the first call does any work.
    pub async fn resolve(&self) -> Option<AuthToken> {
        self.resolved
            .get_or_init(|| Self::lookup(&self.context))
            .await
            .clone()
    }

    async fn lookup(context: &ExecutionContext) -> Option<AuthToken> {
        match context {
            ExecutionContext::Foreground { location } => token_from_location(location),
            ExecutionContext::Worker { location, store } => {
                let stored = match store.get(LATEST_AUTH_TOKEN_KEY).await {
                    Ok(value) => value.and_then(AuthToken::new),
                    Err(e) => {
                        warn!(error = %e, "Failed to read shared auth token, falling back to location");
                        None
                    }
                };

                let token = stored.or_else(|| token_from_location(location));
                if token.is_none() {
                    debug!("No auth token available to worker, continuing unauthenticated");
                }
                token
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Result};
    use async_trait::async_trait;

    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Storage("backend unavailable".to_string()))
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_auth_token_rejects_empty() {
        assert!(AuthToken::new("").is_none());
        assert!(AuthToken::new("   ").is_none());
        assert_eq!(AuthToken::new("t0k").unwrap().as_str(), "t0k");
    }

    #[test]
    fn test_auth_token_debug_is_redacted() {
        let token = AuthToken::new("super-secret").unwrap();
        assert!(!format!("{:?}", token).contains("super-secret"));
    }

    #[test]
    fn test_token_from_location() {
        let loc = url("http://localhost:8080/view?mode=x&authToken=abc%20def");
        assert_eq!(token_from_location(&loc).unwrap().as_str(), "abc def");
        assert!(token_from_location(&url("http://localhost/")).is_none());
        assert!(token_from_location(&url("http://localhost/?authToken=")).is_none());
    }

    #[tokio::test]
    async fn test_foreground_reads_location() {
        let resolver = CredentialResolver::new(ExecutionContext::foreground(url(
            "http://localhost/?authToken=fg-token",
        )));
        assert_eq!(resolver.resolve().await.unwrap().as_str(), "fg-token");
    }

    #[tokio::test]
    async fn test_worker_store_failure_falls_back_to_location() {
        let resolver = CredentialResolver::new(ExecutionContext::worker(
            url("http://localhost/worker.js?authToken=loc-token"),
            Arc::new(FailingStore),
        ));
        assert_eq!(resolver.resolve().await.unwrap().as_str(), "loc-token");
    }

    #[test]
    fn test_keyring_worker_context() {
        let config = ServerApiConfig::new().with_keyring_service("desktop-shell");
        let context = ExecutionContext::keyring_worker(url("http://localhost/worker.js"), &config);
        assert!(matches!(context, ExecutionContext::Worker { .. }));
        assert_eq!(context.location().as_str(), "http://localhost/worker.js");
    }

    #[tokio::test]
    async fn test_resolution_is_memoized() {
        let store = Arc::new(InMemoryStore::new().with_entry(LATEST_AUTH_TOKEN_KEY, "first"));
        let resolver = CredentialResolver::new(ExecutionContext::worker(
            url("http://localhost/worker.js"),
            store.clone(),
        ));

        assert_eq!(resolver.resolve().await.unwrap().as_str(), "first");
        store.insert(LATEST_AUTH_TOKEN_KEY, "second");
        assert_eq!(resolver.resolve().await.unwrap().as_str(), "first");
        assert_eq!(store.reads(), 1);
    }
}
