//! # haven-core
//!
//! Local state substrate for haven, a client-resident behavioral-support
//! tool. Screens record interactions here and read back suggestions.
//!
//! This library provides:
//! - [`PersistentStore`]: key/value durability that degrades instead of failing
//! - [`EventLog`]: append-only, bounded, newest-first interaction history
//! - [`AggregateStore`]: privacy-safe counters derived from the log
//! - [`IntentChannel`]: one-shot context handoff between screens
//! - [`CreditFlags`]: "stabilized today" credit and suggestion snooze
//! - [`compute_suggestion`]: rule cascade picking the next intervention
//! - Configuration and logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use haven_core::{Config, Haven, LogEntry};
//!
//! let config = Config::load().expect("failed to load config");
//! let haven = Haven::open(&config.database_path()).expect("failed to open store");
//!
//! haven.record(LogEntry::new("calm", chrono::Local::now()).field("minutes", 2));
//! if let Some(suggestion) = haven.suggestion() {
//!     println!("{} -> {}", suggestion.title, suggestion.primary.route.as_fragment());
//! }
//! ```

// Re-export commonly used items at the crate root
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use credit::CreditFlags;
pub use error::{Error, Result};
pub use event_log::{EventLog, LOG_CAPACITY};
pub use haven::Haven;
pub use intent::{IntentChannel, IntentEnvelope};
pub use memory::{Aggregate, AggregateStore, MemorySnapshot};
pub use store::{MemoryBackend, PersistentStore, StoreBackend};
pub use suggest::{compute_suggestion, Action, Route, Suggestion, SuggestionRule};
pub use types::LogEntry;

// Public modules
pub mod clock;
pub mod config;
pub mod credit;
pub mod db;
pub mod error;
pub mod event_log;
pub mod haven;
pub mod intent;
pub mod logging;
pub mod memory;
pub mod store;
pub mod suggest;
pub mod types;
