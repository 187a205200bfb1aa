//! Next-intervention suggestion
//!
//! [`compute_suggestion`] is a pure decision cascade over the most recent
//! [`SUGGESTION_WINDOW`] log entries. The first matching rule wins:
//!
//! 1. snoozed → nothing
//! 2. empty log → start with Calm
//! 3. a locked `clarify` action from the last 6 hours → do that move
//! 4. stop-urge still present within 2 hours → Calm, then Stop Urge again
//! 5. two or more calm-bucket entries today → move forward
//! 6. nothing today → pick a direction
//! 7. newest entry `direction` → build a plan; `move_forward` → lock the next action
//! 8. otherwise → find your next step
//!
//! Suggestions are recomputed on every call and never cached.

use crate::memory::bucket_for;
use crate::types::{kinds, LogEntry, OUTCOME_STILL_PRESENT};
use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;

/// Number of newest entries the cascade looks at.
pub const SUGGESTION_WINDOW: usize = 80;

/// How long a locked clarify action stays actionable.
pub const CLARIFY_WINDOW_MINUTES: i64 = 360;

/// How far back stop-urge outcomes count toward a loop.
pub const STOP_URGE_WINDOW_MINUTES: i64 = 120;

/// Screens a suggestion can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Home,
    Calm,
    StopUrge,
    MoveForward,
    TodayPlan,
    Reflect,
    Emergency,
    Clarify,
    Direction,
}

impl Route {
    /// URL fragment the routing layer navigates to.
    pub fn as_fragment(&self) -> &'static str {
        match self {
            Route::Home => "#/",
            Route::Calm => "#/calm",
            Route::StopUrge => "#/stop-urge",
            Route::MoveForward => "#/move-forward",
            Route::TodayPlan => "#/today-plan",
            Route::Reflect => "#/reflect",
            Route::Emergency => "#/emergency",
            Route::Clarify => "#/clarify",
            Route::Direction => "#/direction",
        }
    }

    /// Destination for a move recorded on a clarify entry. Unknown moves go
    /// home.
    pub fn for_move(name: &str) -> Route {
        match name.trim() {
            kinds::CALM => Route::Calm,
            kinds::STOP_URGE => Route::StopUrge,
            kinds::MOVE_FORWARD => Route::MoveForward,
            kinds::TODAY_PLAN => Route::TodayPlan,
            kinds::REFLECT => Route::Reflect,
            kinds::EMERGENCY => Route::Emergency,
            _ => Route::Home,
        }
    }
}

/// Which cascade rule produced a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionRule {
    ColdStart,
    LockedMove,
    BreakLoop,
    CalmToAction,
    PickDirection,
    BuildPlan,
    LockNextAction,
    NextStep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub label: String,
    pub route: Route,
}

impl Action {
    fn new(label: &str, route: Route) -> Self {
        Self {
            label: label.to_string(),
            route,
        }
    }
}

/// One recommended next step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub rule: SuggestionRule,
    pub badge: String,
    pub title: String,
    pub body: String,
    pub primary: Action,
    pub secondary: Action,
}

impl Suggestion {
    fn new(
        rule: SuggestionRule,
        badge: &str,
        title: &str,
        body: impl Into<String>,
        primary: Action,
        secondary: Action,
    ) -> Self {
        Self {
            rule,
            badge: badge.to_string(),
            title: title.to_string(),
            body: body.into(),
            primary,
            secondary,
        }
    }
}

/// Run the cascade. `entries` is newest-first, as the event log returns it;
/// only the first [`SUGGESTION_WINDOW`] are considered.
pub fn compute_suggestion(
    now: DateTime<Local>,
    snooze_until: Option<DateTime<Utc>>,
    entries: &[LogEntry],
) -> Option<Suggestion> {
    if let Some(until) = snooze_until {
        if now.with_timezone(&Utc) < until {
            return None;
        }
    }

    let recent = &entries[..entries.len().min(SUGGESTION_WINDOW)];

    let Some(newest) = recent.first() else {
        return Some(start_with_calm());
    };

    if let Some(suggestion) = locked_move(now, recent) {
        return Some(suggestion);
    }

    if stop_urge_looping(now, recent) {
        return Some(break_the_loop());
    }

    let today: Vec<&LogEntry> = recent.iter().filter(|e| e.is_on_day_of(now)).collect();

    // Any kind in the calm tool bucket counts, e.g. `calm_timer_done`.
    let calm_today = today
        .iter()
        .filter(|e| bucket_for(&e.kind) == kinds::CALM)
        .count();
    if calm_today >= 2 {
        return Some(calm_to_action());
    }

    if today.is_empty() {
        return Some(pick_direction());
    }

    Some(match newest.kind.as_str() {
        kinds::DIRECTION => build_plan(),
        kinds::MOVE_FORWARD => lock_next_action(),
        _ => next_step(),
    })
}

fn within(entry: &LogEntry, now: DateTime<Local>, minutes: i64) -> bool {
    entry
        .timestamp()
        .map(|ts| ts >= now - Duration::minutes(minutes))
        .unwrap_or(false)
}

fn locked_move(now: DateTime<Local>, recent: &[LogEntry]) -> Option<Suggestion> {
    let clarify = recent
        .iter()
        .find(|e| e.kind == kinds::CLARIFY && e.text("statement").is_some())?;
    if !within(clarify, now, CLARIFY_WINDOW_MINUTES) {
        return None;
    }

    let statement = clarify.text("statement")?;
    let route = clarify
        .text("move")
        .map(Route::for_move)
        .unwrap_or(Route::Home);

    Some(Suggestion::new(
        SuggestionRule::LockedMove,
        "Locked in",
        "Do the move you locked",
        statement,
        Action::new("Do it now", route),
        Action::new("Re-lock it", Route::Clarify),
    ))
}

fn stop_urge_looping(now: DateTime<Local>, recent: &[LogEntry]) -> bool {
    let stops: Vec<&LogEntry> = recent
        .iter()
        .filter(|e| e.kind == kinds::STOP_URGE && within(e, now, STOP_URGE_WINDOW_MINUTES))
        .collect();

    let still_present = |e: &LogEntry| e.text("outcome") == Some(OUTCOME_STILL_PRESENT);

    match stops.first() {
        None => false,
        Some(&newest) => {
            still_present(newest) || stops.iter().filter(|&&e| still_present(e)).count() >= 2
        }
    }
}

fn start_with_calm() -> Suggestion {
    Suggestion::new(
        SuggestionRule::ColdStart,
        "Start here",
        "Start with Calm",
        "Two quiet minutes first. Everything else can wait.",
        Action::new("Start Calm", Route::Calm),
        Action::new("Pick a direction", Route::Direction),
    )
}

fn break_the_loop() -> Suggestion {
    Suggestion::new(
        SuggestionRule::BreakLoop,
        "Loop",
        "Calm first, then try again",
        "The urge is still here. Bring your body down, then run Stop Urge once more.",
        Action::new("Start Calm", Route::Calm),
        Action::new("Retry Stop Urge", Route::StopUrge),
    )
}

fn calm_to_action() -> Suggestion {
    Suggestion::new(
        SuggestionRule::CalmToAction,
        "Next level",
        "You've calmed twice. Time to move.",
        "Your system has settled. One small physical action will hold it there.",
        Action::new("Move forward", Route::MoveForward),
        Action::new("One more Calm", Route::Calm),
    )
}

fn pick_direction() -> Suggestion {
    Suggestion::new(
        SuggestionRule::PickDirection,
        "New day",
        "Pick today's direction",
        "One word for today is enough to steer by.",
        Action::new("Pick a direction", Route::Direction),
        Action::new("Start with Calm", Route::Calm),
    )
}

fn build_plan() -> Suggestion {
    Suggestion::new(
        SuggestionRule::BuildPlan,
        "Keep going",
        "Turn your direction into a plan",
        "You picked a direction. Give it three small steps.",
        Action::new("Build the plan", Route::TodayPlan),
        Action::new("Move forward", Route::MoveForward),
    )
}

fn lock_next_action() -> Suggestion {
    Suggestion::new(
        SuggestionRule::LockNextAction,
        "Keep going",
        "Lock your next action",
        "You moved. Name the very next thing so it is waiting for you.",
        Action::new("Lock it in", Route::Clarify),
        Action::new("Plan today", Route::TodayPlan),
    )
}

fn next_step() -> Suggestion {
    Suggestion::new(
        SuggestionRule::NextStep,
        "Next step",
        "Find your next step",
        "Pick the smallest thing that moves today forward.",
        Action::new("Move forward", Route::MoveForward),
        Action::new("Start Calm", Route::Calm),
    )
}
