//! Aggregate rollups ("memory") derived from the event log
//!
//! Only counters live here: no raw text, no names, no exact timestamps (a
//! local day-stamp at most). The stored value is never trusted as-is:
//! [`normalize`] rebuilds a fully-shaped [`Aggregate`] from whatever JSON is
//! stored, dropping anything that is not a non-negative integer counter.
//!
//! Ingestion is not idempotent. Ingesting the same entry twice counts it
//! twice; [`crate::Haven::record`] appends and ingests exactly once.

use crate::clock::{day_stamp, format_day, Clock};
use crate::store::{keys, PersistentStore};
use crate::types::{kinds, LogEntry};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Layout version of the stored aggregate. Reserved; nothing migrates on it yet.
pub const MEMORY_VERSION: u32 = 1;

/// Minimum co-occurrence count before a pattern is mentioned.
pub const PATTERN_THRESHOLD: u64 = 3;

/// `tools.reflect` count at which the generic "you return here" note applies.
pub const REFLECT_RETURN_THRESHOLD: u64 = 5;

/// Bucket for kinds no prefix claims.
pub const OTHER_BUCKET: &str = "other";

/// Kind prefix → tool bucket. Longest matching prefix wins.
const BUCKET_PREFIXES: &[(&str, &str)] = &[
    ("calm", "calm"),
    ("stop_urge", "stop"),
    ("move_forward", "move"),
    ("today_plan", "today"),
    ("reflect", "reflect"),
    ("emergency", "emergency"),
];

pub type Counter = BTreeMap<String, u64>;

fn build_tag() -> String {
    format!("haven-{}", env!("CARGO_PKG_VERSION"))
}

// ============================================
// Aggregate
// ============================================

/// Counters for the reflect flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectRollup {
    pub loops: Counter,
    pub lenses: Counter,
    pub asks: Counter,
    pub more_modes: Counter,
    /// `"loop|lens"` co-occurrences
    pub loop_lens: Counter,
    /// `"loop|ask"` co-occurrences
    pub loop_ask: Counter,
    /// `"lens|ask"` co-occurrences
    pub lens_ask: Counter,
}

/// Counters for the stop-urge flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRollup {
    pub outcomes: Counter,
    pub script_sets: Counter,
}

/// The full, always-normalized rollup structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub version: u32,
    pub build: String,
    pub created_day: String,
    pub updated_day: String,
    /// kind → count
    pub totals: Counter,
    /// bucket → count
    pub tools: Counter,
    /// day-stamp → count
    pub days_used: Counter,
    pub reflect: ReflectRollup,
    pub stop: StopRollup,
}

impl Aggregate {
    /// Zeroed structure created on `today`.
    pub fn zeroed(today: &str) -> Self {
        Self {
            version: MEMORY_VERSION,
            build: build_tag(),
            created_day: today.to_string(),
            updated_day: today.to_string(),
            totals: Counter::new(),
            tools: Counter::new(),
            days_used: Counter::new(),
            reflect: ReflectRollup::default(),
            stop: StopRollup::default(),
        }
    }

    /// Apply the fixed increment sequence for one accepted entry.
    ///
    /// `day` is the day-stamp credited in `days_used` and written to
    /// `updated_day`.
    pub fn apply(&mut self, entry: &LogEntry, day: &str) {
        bump(&mut self.totals, &entry.kind);
        bump(&mut self.tools, bucket_for(&entry.kind));
        bump(&mut self.days_used, day);

        let kind = entry.kind.as_str();
        if kinds::REFLECT_LOCKS.contains(&kind) {
            let lp = entry.text("loop");
            let lens = entry.text("lens");
            let ask = entry.text("spiralAsk");

            bump_opt(&mut self.reflect.loops, lp);
            bump_opt(&mut self.reflect.lenses, lens);
            bump_opt(&mut self.reflect.asks, ask);
            bump_pair(&mut self.reflect.loop_lens, lp, lens);
            bump_pair(&mut self.reflect.loop_ask, lp, ask);
            bump_pair(&mut self.reflect.lens_ask, lens, ask);
        } else if kinds::REFLECT_MORE.contains(&kind) {
            bump_opt(&mut self.reflect.more_modes, entry.text("mode"));
        } else if kind == kinds::STOP_URGE {
            bump_opt(&mut self.stop.outcomes, entry.text("outcome"));
            bump_opt(&mut self.stop.script_sets, entry.text("scriptSetId"));
        }

        self.updated_day = day.to_string();
    }

    /// Display-safe reduced view.
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            version: self.version,
            created_day: self.created_day.clone(),
            updated_day: self.updated_day.clone(),
            totals: self.totals.clone(),
            tools: self.tools.clone(),
            days_used_count: self.days_used.len(),
            reflect: self.reflect.clone(),
            stop: self.stop.clone(),
        }
    }

    /// Threshold-only pattern sentence for the reflect flow.
    ///
    /// Checks loop+ask, then loop+lens, then lens+ask. Falls back to a generic
    /// note once the reflect bucket reaches [`REFLECT_RETURN_THRESHOLD`], else
    /// returns an empty string.
    pub fn pattern_note(
        &self,
        loop_id: Option<&str>,
        lens_id: Option<&str>,
        ask_id: Option<&str>,
    ) -> String {
        let loop_id = clean(loop_id);
        let lens_id = clean(lens_id);
        let ask_id = clean(ask_id);

        if let (Some(lp), Some(ask)) = (loop_id, ask_id) {
            if count_pair(&self.reflect.loop_ask, lp, ask) >= PATTERN_THRESHOLD {
                return format!(
                    "When the {lp} loop shows up, you often end up asking about {ask}. Seeing that is enough for now."
                );
            }
        }
        if let (Some(lp), Some(lens)) = (loop_id, lens_id) {
            if count_pair(&self.reflect.loop_lens, lp, lens) >= PATTERN_THRESHOLD {
                return format!(
                    "The {lp} loop keeps arriving with the {lens} lens. You have named this pairing before."
                );
            }
        }
        if let (Some(lens), Some(ask)) = (lens_id, ask_id) {
            if count_pair(&self.reflect.lens_ask, lens, ask) >= PATTERN_THRESHOLD {
                return format!(
                    "Looking through the {lens} lens, you often reach for {ask}."
                );
            }
        }

        if self.tools.get("reflect").copied().unwrap_or(0) >= REFLECT_RETURN_THRESHOLD {
            return "You return here often. Coming back is part of the work.".to_string();
        }

        String::new()
    }
}

/// Reduced view of an [`Aggregate`] for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub version: u32,
    pub created_day: String,
    pub updated_day: String,
    pub totals: Counter,
    pub tools: Counter,
    /// Number of distinct days with activity
    pub days_used_count: usize,
    pub reflect: ReflectRollup,
    pub stop: StopRollup,
}

/// Tool bucket for a kind, by longest matching prefix.
pub fn bucket_for(kind: &str) -> &'static str {
    BUCKET_PREFIXES
        .iter()
        .filter(|(prefix, _)| kind.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, bucket)| *bucket)
        .unwrap_or(OTHER_BUCKET)
}

/// `"A|B"` key for a co-occurrence counter.
pub fn pair_key(a: &str, b: &str) -> String {
    format!("{a}|{b}")
}

fn clean(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|s| !s.is_empty())
}

/// Counters saturate at `u64::MAX`; a healed store may already hold it.
fn bump(counter: &mut Counter, key: &str) {
    let count = counter.entry(key.to_string()).or_insert(0);
    *count = count.saturating_add(1);
}

fn bump_opt(counter: &mut Counter, key: Option<&str>) {
    if let Some(key) = key {
        bump(counter, key);
    }
}

fn bump_pair(counter: &mut Counter, a: Option<&str>, b: Option<&str>) {
    if let (Some(a), Some(b)) = (a, b) {
        bump(counter, &pair_key(a, b));
    }
}

fn count_pair(counter: &Counter, a: &str, b: &str) -> u64 {
    counter.get(&pair_key(a, b)).copied().unwrap_or(0)
}

// ============================================
// Normalization
// ============================================

/// Rebuild a fully-shaped [`Aggregate`] from arbitrary stored JSON.
///
/// Never fails. Missing or wrong-typed sections become empty. Counters that
/// are not non-negative integers within `u64` are dropped. Invalid day-stamps
/// fall back to `today`.
pub fn normalize(value: &Value, today: &str) -> Aggregate {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);

    let created_day = day_field(obj.get("createdDay")).unwrap_or_else(|| today.to_string());
    let updated_day = day_field(obj.get("updatedDay")).unwrap_or_else(|| created_day.clone());

    let reflect = obj.get("reflect").and_then(Value::as_object).unwrap_or(&empty);
    let stop = obj.get("stop").and_then(Value::as_object).unwrap_or(&empty);

    Aggregate {
        version: obj
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(MEMORY_VERSION),
        build: obj
            .get("build")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(build_tag),
        created_day,
        updated_day,
        totals: counter_field(obj.get("totals")),
        tools: counter_field(obj.get("tools")),
        days_used: counter_field(obj.get("daysUsed")),
        reflect: ReflectRollup {
            loops: counter_field(reflect.get("loops")),
            lenses: counter_field(reflect.get("lenses")),
            asks: counter_field(reflect.get("asks")),
            more_modes: counter_field(reflect.get("moreModes")),
            loop_lens: counter_field(reflect.get("loopLens")),
            loop_ask: counter_field(reflect.get("loopAsk")),
            lens_ask: counter_field(reflect.get("lensAsk")),
        },
        stop: StopRollup {
            outcomes: counter_field(stop.get("outcomes")),
            script_sets: counter_field(stop.get("scriptSets")),
        },
    }
}

fn day_field(value: Option<&Value>) -> Option<String> {
    let raw = value?.as_str()?.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(format_day)
}

fn counter_field(value: Option<&Value>) -> Counter {
    let Some(obj) = value.and_then(Value::as_object) else {
        return Counter::new();
    };
    obj.iter()
        .filter(|(key, _)| !key.is_empty())
        .filter_map(|(key, v)| count_value(v).map(|n| (key.clone(), n)))
        .collect()
}

fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .filter(|f| *f < u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

// ============================================
// Repository
// ============================================

/// Repository over the persisted [`Aggregate`].
pub struct AggregateStore<'a> {
    store: &'a PersistentStore,
    clock: &'a dyn Clock,
}

impl<'a> AggregateStore<'a> {
    pub fn new(store: &'a PersistentStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    fn today(&self) -> String {
        day_stamp(self.clock.now())
    }

    /// Current rollups, normalized. Creates the zeroed structure on first use.
    pub fn get(&self) -> Aggregate {
        let today = self.today();
        match self.store.get(keys::MEMORY) {
            None => {
                let fresh = Aggregate::zeroed(&today);
                self.save(&fresh);
                fresh
            }
            Some(raw) => {
                let value = serde_json::from_str::<Value>(&raw).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "stored memory is malformed, starting fresh");
                    Value::Null
                });
                normalize(&value, &today)
            }
        }
    }

    /// Replace the rollups with the zeroed structure.
    pub fn reset(&self) {
        tracing::info!("resetting memory rollups");
        self.save(&Aggregate::zeroed(&self.today()));
    }

    /// Count one accepted entry.
    pub fn ingest(&self, entry: &LogEntry) {
        let today = self.today();
        let mut aggregate = self.get();
        aggregate.apply(entry, &today);
        self.save(&aggregate);
    }

    /// Display-safe view of the current rollups.
    pub fn snapshot(&self) -> MemorySnapshot {
        self.get().snapshot()
    }

    /// See [`Aggregate::pattern_note`].
    pub fn pattern_note(
        &self,
        loop_id: Option<&str>,
        lens_id: Option<&str>,
        ask_id: Option<&str>,
    ) -> String {
        self.get().pattern_note(loop_id, lens_id, ask_id)
    }

    /// Reset, then replay `entries` (newest first, as [`crate::EventLog::read`]
    /// returns them) oldest first. Each entry credits its own day in
    /// `days_used`.
    pub fn rebuild_from(&self, entries: &[LogEntry]) -> Aggregate {
        let today = self.today();
        let mut aggregate = Aggregate::zeroed(&today);
        for entry in entries.iter().rev() {
            let day = entry
                .timestamp()
                .map(day_stamp)
                .unwrap_or_else(|| today.clone());
            aggregate.apply(entry, &day);
        }
        aggregate.updated_day = today;
        self.save(&aggregate);

        tracing::info!(entries = entries.len(), "rebuilt memory from log");
        aggregate
    }

    fn save(&self, aggregate: &Aggregate) {
        match serde_json::to_string(aggregate) {
            Ok(json) => {
                self.store.set(keys::MEMORY, &json);
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize memory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::tests::unavailable_store;
    use chrono::{DateTime, Duration, Local, TimeZone};
    use serde_json::json;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    const TODAY: &str = "2026-10-16";

    fn counter(pairs: &[(&str, u64)]) -> Counter {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_bucket_prefixes() {
        assert_eq!(bucket_for("calm"), "calm");
        assert_eq!(bucket_for("calm_timer_done"), "calm");
        assert_eq!(bucket_for("stop_urge"), "stop");
        assert_eq!(bucket_for("move_forward_step"), "move");
        assert_eq!(bucket_for("today_plan"), "today");
        assert_eq!(bucket_for("reflect_lock_v4"), "reflect");
        assert_eq!(bucket_for("emergency_open"), "emergency");
        assert_eq!(bucket_for("clarify"), "other");
        assert_eq!(bucket_for("stop"), "other");
    }

    #[test]
    fn test_get_creates_zeroed_and_is_idempotent() {
        let store = PersistentStore::in_memory();
        let clock = FixedClock(noon());
        let memory = AggregateStore::new(&store, &clock);

        let first = memory.get();
        assert_eq!(first, Aggregate::zeroed(TODAY));
        assert!(store.get(keys::MEMORY).is_some());
        assert_eq!(memory.get(), first);
    }

    #[test]
    fn test_ingest_calm_touches_only_its_counters() {
        let store = PersistentStore::in_memory();
        let clock = FixedClock(noon());
        let memory = AggregateStore::new(&store, &clock);
        let before = memory.get();

        memory.ingest(&LogEntry::new("calm", noon()));

        let mut expected = before;
        expected.totals = counter(&[("calm", 1)]);
        expected.tools = counter(&[("calm", 1)]);
        expected.days_used = counter(&[(TODAY, 1)]);
        assert_eq!(memory.get(), expected);
    }

    #[test]
    fn test_ingest_reflect_lock_pairs() {
        let store = PersistentStore::in_memory();
        let clock = FixedClock(noon());
        let memory = AggregateStore::new(&store, &clock);

        let entry = LogEntry::new("reflect_lock_v4", noon())
            .field("loop", "tension")
            .field("lens", "fear")
            .field("spiralAsk", "control");
        for _ in 0..3 {
            memory.ingest(&entry);
        }

        let agg = memory.get();
        assert_eq!(agg.reflect.loop_lens["tension|fear"], 3);
        assert_eq!(agg.reflect.loop_ask["tension|control"], 3);
        assert_eq!(agg.reflect.lens_ask["fear|control"], 3);
        assert_eq!(agg.reflect.loops["tension"], 3);
        assert_eq!(agg.reflect.lenses["fear"], 3);
        assert_eq!(agg.reflect.asks["control"], 3);
        assert_eq!(agg.tools["reflect"], 3);
    }

    #[test]
    fn test_ingest_skips_blank_subflow_fields() {
        let mut agg = Aggregate::zeroed(TODAY);
        let entry = LogEntry::new("reflect_lock", noon())
            .field("loop", "tension")
            .field("lens", "   ")
            .field("spiralAsk", "control");
        agg.apply(&entry, TODAY);

        assert_eq!(agg.reflect.loops, counter(&[("tension", 1)]));
        assert!(agg.reflect.lenses.is_empty());
        assert!(agg.reflect.loop_lens.is_empty());
        assert!(agg.reflect.lens_ask.is_empty());
        assert_eq!(agg.reflect.loop_ask, counter(&[("tension|control", 1)]));
        assert_eq!(agg.totals["reflect_lock"], 1);
    }

    #[test]
    fn test_ingest_reflect_more_and_stop() {
        let mut agg = Aggregate::zeroed(TODAY);
        agg.apply(&LogEntry::new("reflect_more", noon()).field("mode", "zoom_out"), TODAY);
        agg.apply(
            &LogEntry::new("stop_urge", noon())
                .field("outcome", "still_present")
                .field("scriptSetId", "breath_v2"),
            TODAY,
        );
        agg.apply(&LogEntry::new("stop_urge", noon()).field("outcome", ""), TODAY);

        assert_eq!(agg.reflect.more_modes, counter(&[("zoom_out", 1)]));
        assert_eq!(agg.stop.outcomes, counter(&[("still_present", 1)]));
        assert_eq!(agg.stop.script_sets, counter(&[("breath_v2", 1)]));
        assert_eq!(agg.totals["stop_urge"], 2);
        assert_eq!(agg.tools["stop"], 2);
    }

    #[test]
    fn test_ingest_updates_updated_day() {
        let store = PersistentStore::in_memory();
        let monday = FixedClock(noon());
        AggregateStore::new(&store, &monday).get();

        let tuesday = FixedClock(noon() + Duration::days(1));
        let memory = AggregateStore::new(&store, &tuesday);
        memory.ingest(&LogEntry::new("calm", noon()));

        let agg = memory.get();
        assert_eq!(agg.created_day, TODAY);
        assert_eq!(agg.updated_day, "2026-10-17");
        assert_eq!(agg.days_used, counter(&[("2026-10-17", 1)]));
    }

    #[test]
    fn test_normalize_heals_malformed_shapes() {
        let raw = json!({
            "version": "one",
            "createdDay": "16/10/2026",
            "totals": { "calm": 2, "bad": -1, "frac": 1.5, "str": "4", "": 9, "null": null },
            "tools": [1, 2, 3],
            "reflect": { "loops": { "tension": 1 }, "loopAsk": "nope" },
            "stop": null
        });

        let agg = normalize(&raw, TODAY);
        assert_eq!(agg.version, MEMORY_VERSION);
        assert_eq!(agg.created_day, TODAY);
        assert_eq!(agg.updated_day, TODAY);
        assert_eq!(agg.totals, counter(&[("calm", 2), ("str", 4)]));
        assert!(agg.tools.is_empty());
        assert_eq!(agg.reflect.loops, counter(&[("tension", 1)]));
        assert!(agg.reflect.loop_ask.is_empty());
        assert_eq!(agg.stop, StopRollup::default());
    }

    #[test]
    fn test_normalize_drops_out_of_range_counters() {
        let raw = json!({
            "totals": { "calm": 1e30, "max": u64::MAX, "big": "99999999999999999999" }
        });
        let agg = normalize(&raw, TODAY);
        assert_eq!(agg.totals, counter(&[("max", u64::MAX)]));
    }

    #[test]
    fn test_ingest_saturates_stored_counters() {
        let store = PersistentStore::in_memory();
        store.set(
            keys::MEMORY,
            r#"{"totals":{"calm":1e30},"tools":{"calm":18446744073709551615}}"#,
        );
        let clock = FixedClock(noon());
        let memory = AggregateStore::new(&store, &clock);

        memory.ingest(&LogEntry::new("calm", noon()));
        memory.ingest(&LogEntry::new("calm", noon()));

        let agg = memory.get();
        assert_eq!(agg.totals["calm"], 2);
        assert_eq!(agg.tools["calm"], u64::MAX);
        assert_eq!(agg.days_used[TODAY], 2);
    }

    #[test]
    fn test_normalize_non_object_is_zeroed() {
        assert_eq!(normalize(&json!(42), TODAY), Aggregate::zeroed(TODAY));
        assert_eq!(normalize(&Value::Null, TODAY), Aggregate::zeroed(TODAY));
    }

    #[test]
    fn test_normalize_roundtrips_serialized_aggregate() {
        let mut agg = Aggregate::zeroed("2026-01-02");
        agg.apply(
            &LogEntry::new("reflect_lock_v4", noon())
                .field("loop", "a")
                .field("lens", "b")
                .field("spiralAsk", "c"),
            TODAY,
        );
        let value = serde_json::to_value(&agg).unwrap();
        assert_eq!(normalize(&value, "2030-01-01"), agg);
    }

    #[test]
    fn test_get_heals_garbage() {
        let store = PersistentStore::in_memory();
        store.set(keys::MEMORY, "][");
        let clock = FixedClock(noon());
        let memory = AggregateStore::new(&store, &clock);

        assert_eq!(memory.get(), Aggregate::zeroed(TODAY));
        memory.ingest(&LogEntry::new("calm", noon()));
        assert_eq!(memory.get().totals["calm"], 1);
    }

    #[test]
    fn test_reset() {
        let store = PersistentStore::in_memory();
        let clock = FixedClock(noon());
        let memory = AggregateStore::new(&store, &clock);
        memory.ingest(&LogEntry::new("calm", noon()));

        memory.reset();
        assert_eq!(memory.get(), Aggregate::zeroed(TODAY));
    }

    #[test]
    fn test_snapshot_counts_days() {
        let mut agg = Aggregate::zeroed(TODAY);
        agg.apply(&LogEntry::new("calm", noon()), "2026-10-14");
        agg.apply(&LogEntry::new("calm", noon()), "2026-10-15");
        agg.apply(&LogEntry::new("calm", noon()), "2026-10-15");

        let snap = agg.snapshot();
        assert_eq!(snap.days_used_count, 2);
        assert_eq!(snap.totals["calm"], 3);
        let value = serde_json::to_value(&snap).unwrap();
        assert!(value.get("daysUsed").is_none());
        assert_eq!(value["daysUsedCount"], 2);
    }

    fn with_loop_ask(count: u64) -> Aggregate {
        let mut agg = Aggregate::zeroed(TODAY);
        agg.reflect.loop_ask.insert(pair_key("X", "Y"), count);
        agg
    }

    #[test]
    fn test_pattern_note_threshold() {
        assert_eq!(with_loop_ask(2).pattern_note(Some("X"), None, Some("Y")), "");

        let note = with_loop_ask(3).pattern_note(Some("X"), None, Some("Y"));
        assert!(note.contains("X loop"), "{note}");
        assert!(note.contains("asking about Y"), "{note}");
    }

    #[test]
    fn test_pattern_note_priority() {
        let mut agg = with_loop_ask(3);
        agg.reflect.loop_lens.insert(pair_key("X", "L"), 5);
        agg.reflect.lens_ask.insert(pair_key("L", "Y"), 5);

        let loop_ask = agg.pattern_note(Some("X"), Some("L"), Some("Y"));
        assert!(loop_ask.contains("asking about Y"));

        let loop_lens = agg.pattern_note(Some("X"), Some("L"), None);
        assert!(loop_lens.contains("L lens"));

        let lens_ask = agg.pattern_note(None, Some("L"), Some("Y"));
        assert!(lens_ask.contains("reach for Y"));
    }

    #[test]
    fn test_pattern_note_generic_fallback() {
        let mut agg = Aggregate::zeroed(TODAY);
        agg.tools.insert("reflect".to_string(), 4);
        assert_eq!(agg.pattern_note(Some("X"), Some("L"), Some("Y")), "");

        agg.tools.insert("reflect".to_string(), 5);
        assert!(agg.pattern_note(None, None, None).contains("return here often"));
    }

    #[test]
    fn test_pattern_note_blank_ids_are_ignored() {
        let mut agg = with_loop_ask(9);
        agg.reflect.loop_ask.insert(pair_key("", "Y"), 9);
        assert_eq!(agg.pattern_note(Some("  "), None, Some("Y")), "");
    }

    #[test]
    fn test_rebuild_from_log() {
        let store = PersistentStore::in_memory();
        let clock = FixedClock(noon());
        let memory = AggregateStore::new(&store, &clock);
        memory.ingest(&LogEntry::new("calm", noon()));
        memory.ingest(&LogEntry::new("calm", noon()));

        let entries = vec![
            LogEntry::new("stop_urge", noon()).field("outcome", "passed"),
            LogEntry::new("calm", noon() - Duration::days(1)),
        ];
        let agg = memory.rebuild_from(&entries);

        assert_eq!(agg.totals, counter(&[("calm", 1), ("stop_urge", 1)]));
        assert_eq!(agg.days_used, counter(&[("2026-10-15", 1), (TODAY, 1)]));
        assert_eq!(agg.stop.outcomes, counter(&[("passed", 1)]));
        assert_eq!(agg.updated_day, TODAY);
        assert_eq!(memory.get(), agg);
    }

    #[test]
    fn test_unavailable_store_yields_zeroed() {
        let store = unavailable_store();
        let clock = FixedClock(noon());
        let memory = AggregateStore::new(&store, &clock);

        memory.ingest(&LogEntry::new("calm", noon()));
        assert_eq!(memory.get(), Aggregate::zeroed(TODAY));
    }
}
