//! haven - command-line front end for the haven state substrate
//!
//! Stands in for the screen layer: records interactions, shows history and
//! rollups, prints the current suggestion, and drives intents, credits and
//! snooze.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/haven/haven.db (~/.local/share/haven/haven.db)
//! - Logs: $XDG_STATE_HOME/haven/haven.log (~/.local/state/haven/haven.log)
//! - Config: $XDG_CONFIG_HOME/haven/config.toml (~/.config/haven/config.toml)

use anyhow::{bail, Context, Result};
use chrono::{Duration, Local};
use clap::{Parser, Subcommand};
use haven_core::types::parse_when;
use haven_core::{Config, Haven, LogEntry, Suggestion};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "haven")]
#[command(about = "Record interventions and get the next suggested step")]
#[command(version)]
struct Args {
    /// Database path (overrides config and XDG default)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record an interaction (appends to the log and updates rollups)
    Record {
        /// Interaction kind, e.g. calm, stop_urge, clarify
        kind: String,

        /// Extra field as key=value (repeatable); JSON values are parsed
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// Timestamp to record instead of now (ISO-8601)
        #[arg(long)]
        when: Option<String>,
    },

    /// Show recorded interactions, newest first
    Log {
        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Inspect or manage the usage rollups
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Print the current suggestion
    Suggest {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage the "stabilized today" credit
    Credit {
        #[command(subcommand)]
        action: CreditAction,
    },

    /// Report whether today counts as stabilized
    Stabilized,

    /// Suppress suggestions for a while
    Snooze {
        /// Minutes to snooze (defaults to config)
        #[arg(short, long)]
        minutes: Option<u32>,

        /// Remove any active snooze
        #[arg(long, conflicts_with = "minutes")]
        clear: bool,
    },

    /// Pass context to the next screen
    Intent {
        #[command(subcommand)]
        action: IntentAction,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Full rollup structure as JSON
    Show,
    /// Display-safe summary
    Snapshot,
    /// Zero every counter
    Reset,
    /// Recompute counters from the log
    Rebuild,
    /// Pattern note for a reflect combination
    Note {
        #[arg(long = "loop")]
        loop_id: Option<String>,
        #[arg(long)]
        lens: Option<String>,
        #[arg(long)]
        ask: Option<String>,
    },
}

#[derive(Subcommand)]
enum CreditAction {
    Status,
    Grant,
    Clear,
}

#[derive(Subcommand)]
enum IntentAction {
    /// Replace the pending intent
    Set {
        intent: String,
        /// JSON payload
        #[arg(long, default_value = "{}")]
        payload: String,
    },
    /// Consume the pending intent
    Take,
    /// Show the pending intent without consuming it
    Peek,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard = haven_core::logging::init(&config.logging, args.verbose)
        .context("failed to initialize logging")?;

    let db_path = args.db.clone().unwrap_or_else(|| config.database_path());
    tracing::info!(path = %db_path.display(), "Opening store");
    let haven = Haven::open(&db_path).context("failed to open database")?;

    match args.command {
        Command::Record { kind, fields, when } => cmd_record(&haven, kind, &fields, when),
        Command::Log { limit, json } => cmd_log(&haven, limit, json),
        Command::Memory { action } => cmd_memory(&haven, action),
        Command::Suggest { json } => cmd_suggest(&haven, json),
        Command::Credit { action } => cmd_credit(&haven, action),
        Command::Stabilized => {
            println!(
                "{}",
                if haven.is_stabilized_today() {
                    "stabilized today"
                } else {
                    "not yet stabilized today"
                }
            );
            Ok(())
        }
        Command::Snooze { minutes, clear } => {
            cmd_snooze(&haven, minutes, clear, config.suggestions.snooze_minutes)
        }
        Command::Intent { action } => cmd_intent(&haven, action),
    }
}

fn cmd_record(haven: &Haven, kind: String, fields: &[String], when: Option<String>) -> Result<()> {
    let mut entry = match when {
        Some(when) => {
            if parse_when(&when).is_none() {
                bail!("invalid --when timestamp: {}", when);
            }
            LogEntry::with_when(kind, when)
        }
        None => LogEntry::new(kind, Local::now()),
    };

    for field in fields {
        let (key, value) = parse_field(field)?;
        entry = entry.field(key, value);
    }

    let kind = entry.kind.clone();
    if haven.record(entry) {
        println!("recorded {}", kind);
        Ok(())
    } else {
        bail!("entry rejected: blank kind, or the store refused the write")
    }
}

/// Split `key=value`; the value is JSON when it parses as JSON, else a string.
fn parse_field(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("field must look like key=value: {}", raw);
    };
    let key = key.trim();
    if key.is_empty() || key == "kind" || key == "when" {
        bail!("invalid field name: {:?}", key);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn cmd_log(haven: &Haven, limit: Option<usize>, json: bool) -> Result<()> {
    let entries = haven.event_log().read(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries recorded.");
        return Ok(());
    }

    for entry in &entries {
        let extras = entry
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, format_value(v)))
            .collect::<Vec<_>>()
            .join(" ");
        if extras.is_empty() {
            println!("{}  {}", entry.when, entry.kind);
        } else {
            println!("{}  {}  {}", entry.when, entry.kind, extras);
        }
    }
    Ok(())
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cmd_memory(haven: &Haven, action: MemoryAction) -> Result<()> {
    let memory = haven.memory();
    match action {
        MemoryAction::Show => {
            println!("{}", serde_json::to_string_pretty(&memory.get())?);
        }
        MemoryAction::Snapshot => {
            let snapshot = memory.snapshot();
            println!("since:      {}", snapshot.created_day);
            println!("updated:    {}", snapshot.updated_day);
            println!("days used:  {}", snapshot.days_used_count);
            println!("tools:");
            for (bucket, count) in &snapshot.tools {
                println!("  {:<12} {}", bucket, count);
            }
            println!("totals:");
            for (kind, count) in &snapshot.totals {
                println!("  {:<24} {}", kind, count);
            }
        }
        MemoryAction::Reset => {
            memory.reset();
            println!("memory reset");
        }
        MemoryAction::Rebuild => {
            let entries = haven.event_log().read(None);
            let aggregate = memory.rebuild_from(&entries);
            let total: u64 = aggregate.totals.values().sum();
            println!("rebuilt from {} entries ({} counted)", entries.len(), total);
        }
        MemoryAction::Note { loop_id, lens, ask } => {
            let note = memory.pattern_note(loop_id.as_deref(), lens.as_deref(), ask.as_deref());
            if note.is_empty() {
                println!("(no pattern yet)");
            } else {
                println!("{}", note);
            }
        }
    }
    Ok(())
}

fn cmd_suggest(haven: &Haven, json: bool) -> Result<()> {
    let suggestion = haven.suggestion();

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestion)?);
        return Ok(());
    }

    match suggestion {
        Some(s) => print_suggestion(&s),
        None => println!("Suggestions are snoozed."),
    }
    Ok(())
}

fn print_suggestion(s: &Suggestion) {
    println!("[{}] {}", s.badge, s.title);
    println!("{}", s.body);
    println!("  > {} ({})", s.primary.label, s.primary.route.as_fragment());
    println!("  > {} ({})", s.secondary.label, s.secondary.route.as_fragment());
}

fn cmd_credit(haven: &Haven, action: CreditAction) -> Result<()> {
    let credits = haven.credits();
    match action {
        CreditAction::Status => {
            let status = if credits.has_stabilize_credit_today() {
                "granted"
            } else {
                "none"
            };
            println!("credit: {}", status);
        }
        CreditAction::Grant => {
            credits.grant_stabilize_credit_today();
            println!("credit: granted");
        }
        CreditAction::Clear => {
            credits.clear_stabilize_credit();
            println!("credit: none");
        }
    }
    Ok(())
}

fn cmd_snooze(haven: &Haven, minutes: Option<u32>, clear: bool, default_minutes: u32) -> Result<()> {
    let credits = haven.credits();
    if clear {
        credits.clear_snooze();
        println!("snooze cleared");
        return Ok(());
    }

    let minutes = minutes.unwrap_or(default_minutes);
    if minutes == 0 {
        bail!("--minutes must be at least 1");
    }
    let until = credits.snooze_for(Duration::minutes(i64::from(minutes)));
    println!(
        "snoozed until {}",
        until.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

fn cmd_intent(haven: &Haven, action: IntentAction) -> Result<()> {
    let intents = haven.intents();
    match action {
        IntentAction::Set { intent, payload } => {
            if intent.trim().is_empty() {
                bail!("intent must not be blank");
            }
            let payload: Value =
                serde_json::from_str(&payload).context("payload must be valid JSON")?;
            intents.set_next_intent(&intent, payload);
            println!("intent set: {}", intent.trim());
        }
        IntentAction::Take => print_envelope(intents.consume_next_intent())?,
        IntentAction::Peek => print_envelope(intents.peek_next_intent())?,
    }
    Ok(())
}

fn print_envelope(envelope: Option<haven_core::IntentEnvelope>) -> Result<()> {
    match envelope {
        Some(envelope) => println!("{}", serde_json::to_string(&envelope)?),
        None => println!("(no pending intent)"),
    }
    Ok(())
}
