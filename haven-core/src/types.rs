//! Core domain types for haven
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Entry** | One recorded interaction ([`LogEntry`]) |
//! | **Kind** | The entry's type tag, e.g. `calm`, `stop_urge`, `clarify` |
//! | **Bucket** | Coarse tool category a kind rolls up into |
//! | **Pair key** | `"A|B"` string naming a co-occurrence counter |
//! | **Day-stamp** | Local `YYYY-MM-DD`, used instead of exact timestamps |
//!
//! Kind-specific fields are free-form JSON. At most one of them may carry
//! text the user typed (e.g. `statement`); nothing else identifying belongs
//! in an entry.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================
// Kinds
// ============================================

/// Kind tags the core itself reasons about. The vocabulary is open; screens
/// may record other kinds and they roll up into the `other` bucket.
pub mod kinds {
    pub const CALM: &str = "calm";
    pub const STOP_URGE: &str = "stop_urge";
    pub const MOVE_FORWARD: &str = "move_forward";
    pub const TODAY_PLAN: &str = "today_plan";
    pub const REFLECT: &str = "reflect";
    pub const EMERGENCY: &str = "emergency";
    pub const CLARIFY: &str = "clarify";
    pub const DIRECTION: &str = "direction";

    /// Reflect flow: a loop/lens/ask combination was locked in.
    pub const REFLECT_LOCKS: &[&str] = &[
        "reflect_lock",
        "reflect_lock_v2",
        "reflect_lock_v3",
        "reflect_lock_v4",
    ];

    /// Reflect flow: the user opened one of the "more" modes.
    pub const REFLECT_MORE: &[&str] = &["reflect_more"];

    /// Kinds that count as having stabilized.
    pub const STABILIZING: &[&str] = &[CALM, STOP_URGE, MOVE_FORWARD];
}

/// Outcome value a stop-urge entry reports when the urge did not pass.
pub const OUTCOME_STILL_PRESENT: &str = "still_present";

// ============================================
// LogEntry
// ============================================

/// The atomic unit of history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Interaction type tag
    pub kind: String,
    /// Client-local ISO-8601 timestamp
    pub when: String,
    /// Kind-specific fields (`minutes`, `outcome`, `statement`, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogEntry {
    /// Entry stamped at `at`.
    pub fn new(kind: impl Into<String>, at: DateTime<Local>) -> Self {
        Self {
            kind: kind.into(),
            when: at.to_rfc3339(),
            fields: Map::new(),
        }
    }

    /// Entry with a caller-supplied `when` string, validated on append.
    pub fn with_when(kind: impl Into<String>, when: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            when: when.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// String field, trimmed; `None` if missing, not a string, or blank.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Parsed `when`, in local time.
    pub fn timestamp(&self) -> Option<DateTime<Local>> {
        parse_when(&self.when)
    }

    /// True when `kind` is non-blank and `when` parses.
    pub fn is_valid(&self) -> bool {
        !self.kind.trim().is_empty() && self.timestamp().is_some()
    }

    /// True when `when` falls on the same local calendar day as `now`.
    pub fn is_on_day_of(&self, now: DateTime<Local>) -> bool {
        self.timestamp()
            .map(|ts| ts.date_naive() == now.date_naive())
            .unwrap_or(false)
    }
}

/// Parse an entry timestamp.
///
/// Accepts RFC 3339 with an offset, or a naive `YYYY-MM-DDTHH:MM:SS[.fff]`
/// read as local time.
pub fn parse_when(when: &str) -> Option<DateTime<Local>> {
    let when = when.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(when) {
        return Some(dt.with_timezone(&Local));
    }
    NaiveDateTime::parse_from_str(when, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}
