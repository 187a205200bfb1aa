//! Append-only interaction log
//!
//! Newest-first, capped at [`LOG_CAPACITY`] entries, stored as one JSON array
//! under [`keys::EVENT_LOG`]. "Newest" means most recently appended: the log
//! never re-sorts by `when`, so an entry appended with an older timestamp
//! still sits at the front.

use crate::store::{keys, PersistentStore};
use crate::types::LogEntry;

/// Maximum number of entries kept; older ones are evicted silently.
pub const LOG_CAPACITY: usize = 300;

/// Repository over the persisted log.
pub struct EventLog<'a> {
    store: &'a PersistentStore,
}

impl<'a> EventLog<'a> {
    pub fn new(store: &'a PersistentStore) -> Self {
        Self { store }
    }

    /// Prepend `entry` and persist the first [`LOG_CAPACITY`] entries.
    ///
    /// Entries with a blank `kind` or an unparseable `when` are dropped.
    /// Returns whether the entry was accepted and persisted.
    pub fn append(&self, entry: LogEntry) -> bool {
        if !entry.is_valid() {
            tracing::debug!(kind = %entry.kind, "rejected invalid log entry");
            return false;
        }

        let mut entries = self.load();
        entries.insert(0, entry);
        entries.truncate(LOG_CAPACITY);

        let json = match serde_json::to_string(&entries) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize event log");
                return false;
            }
        };
        if !self.store.set(keys::EVENT_LOG, &json) {
            return false;
        }

        tracing::debug!(kind = %entries[0].kind, len = entries.len(), "appended log entry");
        true
    }

    /// Up to `limit` entries, newest first. `None` means all stored entries.
    pub fn read(&self, limit: Option<usize>) -> Vec<LogEntry> {
        let mut entries = self.load();
        let limit = limit.unwrap_or(LOG_CAPACITY).min(LOG_CAPACITY);
        entries.truncate(limit);
        entries
    }

    fn load(&self) -> Vec<LogEntry> {
        let Some(raw) = self.store.get(keys::EVENT_LOG) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<LogEntry>>(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "stored event log is malformed, reading as empty");
                Vec::new()
            }
        }
    }
}
