//! Persistent key-value stores the worker context reads shared state from.

use crate::config::ServerApiConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use keyring::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// Read side of a key-value store shared between execution contexts.
///
/// Writers (whoever publishes the latest token) live outside this crate.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// OS keychain backed store; each key is an entry under one service name.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Store under the configured keychain service name.
    pub fn from_config(config: &ServerApiConfig) -> Self {
        Self::new(config.keyring_service.clone())
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

#[async_trait]
impl KeyValueStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = Entry::new(&self.service, key).map_err(|e| Error::Storage(e.to_string()))?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }
}

/// Map-backed store.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
    reads: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), value.into());
        }
    }

    /// Number of `get` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::Storage("in-memory store poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }
}
