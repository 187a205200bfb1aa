//! Time source and day-stamps
//!
//! Every "now" in the core comes from a [`Clock`] so rules and counters can be
//! exercised against a fixed instant.

use chrono::{DateTime, Local, NaiveDate};

/// Source of the current client-local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Local calendar date as `YYYY-MM-DD`.
pub fn day_stamp(at: DateTime<Local>) -> String {
    format_day(at.date_naive())
}

pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}
