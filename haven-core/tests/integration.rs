//! Integration tests for the haven state substrate
//!
//! These run against an on-disk SQLite store in a temp directory, through the
//! same public surface the screens use.

use chrono::{DateTime, Duration, Local, TimeZone};
use haven_core::db::Database;
use haven_core::memory::pair_key;
use haven_core::store::keys;
use haven_core::{
    FixedClock, Haven, LogEntry, PersistentStore, Route, SuggestionRule, LOG_CAPACITY,
};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn noon() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

fn open_at(path: &Path, now: DateTime<Local>) -> Haven {
    let db = Database::open(path).expect("open database");
    db.migrate().expect("migrate schema");
    Haven::new(PersistentStore::new(Box::new(db)), Box::new(FixedClock(now)))
}

fn temp_haven() -> (TempDir, Haven) {
    haven_core::logging::init_test();
    let dir = TempDir::new().expect("failed to create temp dir");
    let haven = open_at(&dir.path().join("haven.db"), noon());
    (dir, haven)
}

// ============================================
// Event log
// ============================================

#[test]
fn test_log_survives_reopen_in_reverse_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("haven.db");

    {
        let haven = open_at(&path, noon());
        for kind in ["calm", "", "stop_urge", "direction"] {
            haven.record(LogEntry::new(kind, noon()));
        }
    }

    let haven = open_at(&path, noon());
    let kinds: Vec<_> = haven
        .event_log()
        .read(None)
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds, vec!["direction", "stop_urge", "calm"]);
}

#[test]
fn test_log_truncates_to_capacity() {
    let (_dir, haven) = temp_haven();
    for i in 0..(LOG_CAPACITY + 20) {
        haven
            .event_log()
            .append(LogEntry::new("calm", noon()).field("seq", i as u64));
    }

    let entries = haven.event_log().read(None);
    assert_eq!(entries.len(), LOG_CAPACITY);
    assert_eq!(entries[0].fields["seq"], (LOG_CAPACITY + 19) as u64);
}

#[test]
fn test_out_of_order_timestamps_keep_insertion_order() {
    let (_dir, haven) = temp_haven();
    haven.record(LogEntry::new("move_forward", noon()));
    haven.record(LogEntry::new("direction", noon() - Duration::hours(3)));

    let entries = haven.event_log().read(None);
    assert_eq!(entries[0].kind, "direction");

    // The suggestion engine follows insertion order too.
    assert_eq!(haven.suggestion().unwrap().rule, SuggestionRule::BuildPlan);
}

// ============================================
// Memory
// ============================================

#[test]
fn test_memory_get_is_idempotent() {
    let (_dir, haven) = temp_haven();
    haven.record(LogEntry::new("today_plan", noon()));
    assert_eq!(haven.memory().get(), haven.memory().get());
}

#[test]
fn test_reflect_lock_pattern_note_after_three() {
    let (_dir, haven) = temp_haven();
    let lock = || {
        LogEntry::new("reflect_lock_v4", noon())
            .field("loop", "tension")
            .field("lens", "fear")
            .field("spiralAsk", "control")
    };

    haven.record(lock());
    haven.record(lock());
    assert_eq!(
        haven
            .memory()
            .pattern_note(Some("tension"), None, Some("control")),
        ""
    );

    haven.record(lock());
    let agg = haven.memory().get();
    assert_eq!(agg.reflect.loop_lens[&pair_key("tension", "fear")], 3);
    assert_eq!(agg.reflect.loop_ask[&pair_key("tension", "control")], 3);
    assert_eq!(agg.reflect.lens_ask[&pair_key("fear", "control")], 3);

    let note = haven
        .memory()
        .pattern_note(Some("tension"), None, Some("control"));
    assert!(note.contains("tension"), "{note}");
    assert!(note.contains("control"), "{note}");
}

#[test]
fn test_memory_self_heals_corrupted_value() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("haven.db");
    let db = Database::open(&path).unwrap();
    db.migrate().unwrap();
    db.set_value(
        keys::MEMORY,
        r#"{"totals":{"calm":"2","oops":-4},"reflect":7,"daysUsed":{"2026-10-15":1}}"#,
    )
    .unwrap();
    drop(db);

    let haven = open_at(&path, noon());
    let agg = haven.memory().get();
    assert_eq!(agg.totals["calm"], 2);
    assert!(!agg.totals.contains_key("oops"));
    assert!(agg.reflect.loops.is_empty());
    assert_eq!(haven.memory().snapshot().days_used_count, 1);

    haven.record(LogEntry::new("calm", noon()));
    assert_eq!(haven.memory().get().totals["calm"], 3);
}

#[test]
fn test_rebuild_matches_recorded_counts() {
    let (_dir, haven) = temp_haven();
    haven.record(LogEntry::new("calm", noon()));
    haven.record(LogEntry::new("stop_urge", noon()).field("outcome", "passed"));
    let recorded = haven.memory().get();

    haven.memory().reset();
    let rebuilt = haven.memory().rebuild_from(&haven.event_log().read(None));

    assert_eq!(rebuilt.totals, recorded.totals);
    assert_eq!(rebuilt.tools, recorded.tools);
    assert_eq!(rebuilt.stop, recorded.stop);
}

// ============================================
// Intents and credits
// ============================================

#[test]
fn test_intent_consumed_once_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("haven.db");

    open_at(&path, noon())
        .intents()
        .set_next_intent("plan_from_direction", json!({ "direction": "steady" }));

    let haven = open_at(&path, noon());
    let envelope = haven.intents().consume_next_intent().unwrap();
    assert_eq!(envelope.payload["direction"], "steady");
    assert!(haven.intents().consume_next_intent().is_none());
}

#[test]
fn test_credit_expires_next_day() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("haven.db");

    let today = open_at(&path, noon());
    today.credits().grant_stabilize_credit_today();
    assert!(today.is_stabilized_today());

    let tomorrow = open_at(&path, noon() + Duration::days(1));
    assert!(!tomorrow.credits().has_stabilize_credit_today());
    assert!(!tomorrow.is_stabilized_today());
}

// ============================================
// Suggestions
// ============================================

#[test]
fn test_cold_start_suggestion() {
    let (_dir, haven) = temp_haven();
    let suggestion = haven.suggestion().unwrap();
    assert_eq!(suggestion.title, "Start with Calm");
    assert_eq!(suggestion.primary.route, Route::Calm);
}

#[test]
fn test_locked_move_suggestion() {
    let (_dir, haven) = temp_haven();
    haven.record(
        LogEntry::new("clarify", noon() - Duration::minutes(10))
            .field("statement", "do X")
            .field("move", "calm"),
    );

    let suggestion = haven.suggestion().unwrap();
    assert_eq!(suggestion.rule, SuggestionRule::LockedMove);
    assert_eq!(suggestion.primary.route.as_fragment(), "#/calm");
}

#[test]
fn test_stop_urge_loop_suggestion() {
    let (_dir, haven) = temp_haven();
    for minutes in [50, 30, 10] {
        haven.record(
            LogEntry::new("stop_urge", noon() - Duration::minutes(minutes))
                .field("outcome", "still_present"),
        );
    }

    let suggestion = haven.suggestion().unwrap();
    assert_eq!(suggestion.rule, SuggestionRule::BreakLoop);
    assert_eq!(suggestion.primary.route, Route::Calm);
    assert_eq!(suggestion.secondary.route, Route::StopUrge);
}

#[test]
fn test_snooze_then_expire() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("haven.db");

    let now = open_at(&path, noon());
    now.credits().snooze_for(Duration::minutes(60));
    assert!(now.suggestion().is_none());

    let later = open_at(&path, noon() + Duration::minutes(61));
    assert!(later.suggestion().is_some());
}
