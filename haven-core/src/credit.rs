//! Day-scoped flags: stabilize credit and suggestion snooze
//!
//! The credit is a fast-path cache for "already stabilized today". The log
//! stays authoritative: [`stabilized_today`] is true with or without the
//! credit as long as a stabilizing entry was recorded today.

use crate::clock::{day_stamp, Clock};
use crate::event_log::EventLog;
use crate::store::{keys, PersistentStore};
use crate::types::{kinds, LogEntry};
use chrono::{DateTime, Duration, Local, TimeZone, Utc};

/// Repository over the credit stamp and the snooze deadline.
pub struct CreditFlags<'a> {
    store: &'a PersistentStore,
    clock: &'a dyn Clock,
}

impl<'a> CreditFlags<'a> {
    pub fn new(store: &'a PersistentStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    // ============================================
    // Stabilize credit
    // ============================================

    pub fn has_stabilize_credit_today(&self) -> bool {
        let today = day_stamp(self.clock.now());
        self.store
            .get(keys::STABILIZE_CREDIT)
            .map(|stamp| stamp.trim() == today)
            .unwrap_or(false)
    }

    pub fn grant_stabilize_credit_today(&self) {
        let today = day_stamp(self.clock.now());
        self.store.set(keys::STABILIZE_CREDIT, &today);
        tracing::debug!(day = %today, "granted stabilize credit");
    }

    pub fn clear_stabilize_credit(&self) {
        self.store.remove(keys::STABILIZE_CREDIT);
    }

    /// Credit, or a stabilizing entry in `log` dated today.
    pub fn is_stabilized_today(&self, log: &EventLog<'_>) -> bool {
        stabilized_today(
            self.has_stabilize_credit_today(),
            &log.read(None),
            self.clock.now(),
        )
    }

    // ============================================
    // Snooze
    // ============================================

    /// Suppress suggestions for `duration` from now.
    pub fn snooze_for(&self, duration: Duration) -> DateTime<Utc> {
        let until = self.clock.now().with_timezone(&Utc) + duration;
        self.store
            .set(keys::SNOOZE_UNTIL, &until.timestamp_millis().to_string());
        tracing::debug!(until = %until, "snoozed suggestions");
        until
    }

    /// Stored snooze deadline, if any and well-formed.
    pub fn snooze_until(&self) -> Option<DateTime<Utc>> {
        let raw = self.store.get(keys::SNOOZE_UNTIL)?;
        let millis = raw.trim().parse::<i64>().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    pub fn is_snoozed(&self) -> bool {
        self.snooze_until()
            .map(|until| self.clock.now().with_timezone(&Utc) < until)
            .unwrap_or(false)
    }

    pub fn clear_snooze(&self) {
        self.store.remove(keys::SNOOZE_UNTIL);
    }
}

/// True if `has_credit`, or some entry dated today (local) has a
/// stabilizing kind (`calm`, `stop_urge`, `move_forward`).
pub fn stabilized_today(has_credit: bool, entries: &[LogEntry], now: DateTime<Local>) -> bool {
    has_credit
        || entries
            .iter()
            .any(|e| kinds::STABILIZING.contains(&e.kind.as_str()) && e.is_on_day_of(now))
}
