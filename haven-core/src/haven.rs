//! Entry point tying the repositories to one store and one clock.

use crate::clock::{Clock, SystemClock};
use crate::credit::CreditFlags;
use crate::db::Database;
use crate::error::Result;
use crate::event_log::EventLog;
use crate::intent::IntentChannel;
use crate::memory::AggregateStore;
use crate::store::PersistentStore;
use crate::suggest::{compute_suggestion, Suggestion, SUGGESTION_WINDOW};
use crate::types::LogEntry;
use std::path::Path;

/// Owns the [`PersistentStore`] and hands out repositories over it.
///
/// Concurrent writers from separate processes are not coordinated: each
/// repository does read-modify-write on its key, so the last writer wins.
pub struct Haven {
    store: PersistentStore,
    clock: Box<dyn Clock>,
}

impl Haven {
    pub fn new(store: PersistentStore, clock: Box<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Open (creating and migrating if needed) the SQLite store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::open(path)?;
        db.migrate()?;
        tracing::info!(path = %path.display(), "opened haven store");
        Ok(Self::new(
            PersistentStore::new(Box::new(db)),
            Box::new(SystemClock),
        ))
    }

    /// In-memory store on the wall clock.
    pub fn in_memory() -> Self {
        Self::new(PersistentStore::in_memory(), Box::new(SystemClock))
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn event_log(&self) -> EventLog<'_> {
        EventLog::new(&self.store)
    }

    pub fn memory(&self) -> AggregateStore<'_> {
        AggregateStore::new(&self.store, self.clock.as_ref())
    }

    pub fn intents(&self) -> IntentChannel<'_> {
        IntentChannel::new(&self.store)
    }

    pub fn credits(&self) -> CreditFlags<'_> {
        CreditFlags::new(&self.store, self.clock.as_ref())
    }

    /// Append `entry` and, if the log accepted and stored it, ingest it
    /// exactly once. A dropped log write leaves the counters untouched.
    pub fn record(&self, entry: LogEntry) -> bool {
        let accepted = self.event_log().append(entry.clone());
        if accepted {
            self.memory().ingest(&entry);
        }
        accepted
    }

    /// Credit or a stabilizing entry today.
    pub fn is_stabilized_today(&self) -> bool {
        self.credits().is_stabilized_today(&self.event_log())
    }

    /// Suggestion for right now, honouring any snooze.
    pub fn suggestion(&self) -> Option<Suggestion> {
        compute_suggestion(
            self.clock.now(),
            self.credits().snooze_until(),
            &self.event_log().read(Some(SUGGESTION_WINDOW)),
        )
    }
}
