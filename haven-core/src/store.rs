//! Key/value durability layer
//!
//! [`PersistentStore`] is the only thing the repositories talk to. It wraps a
//! [`StoreBackend`] and swallows every backend failure: a failed read is
//! `None`, a failed write is a no-op. Callers treat absence as a fresh install.

use crate::db::Database;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Well-known keys, one per repository.
pub mod keys {
    /// EventLog, serialized as one JSON array.
    pub const EVENT_LOG: &str = "haven.log";
    /// Aggregate rollups.
    pub const MEMORY: &str = "haven.memory";
    /// Pending intent envelope.
    pub const INTENT: &str = "haven.intent";
    /// Day-stamp of the last stabilize credit.
    pub const STABILIZE_CREDIT: &str = "haven.credit.stabilize";
    /// Snooze deadline in epoch milliseconds.
    pub const SNOOZE_UNTIL: &str = "haven.snooze_until";
}

/// A fallible key/value backend.
pub trait StoreBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl StoreBackend for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.remove_value(key)
    }
}

/// Process-local backend; nothing survives the process.
#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| Error::Storage("memory backend mutex poisoned".to_string()))
    }
}

impl StoreBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Degrading wrapper around a [`StoreBackend`].
pub struct PersistentStore {
    backend: Box<dyn StoreBackend>,
}

impl PersistentStore {
    pub fn new(backend: Box<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Store backed by a fresh [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Read `key`. Backend failures read as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "store read failed, treating as absent");
                None
            }
        }
    }

    /// Write `key`. Backend failures are logged and dropped; the return value
    /// says whether the write landed.
    pub fn set(&self, key: &str, value: &str) -> bool {
        match self.backend.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "store write failed, ignoring");
                false
            }
        }
    }

    /// Delete `key`. Backend failures are logged and dropped.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            tracing::warn!(key, error = %e, "store remove failed, ignoring");
        }
    }
}
