//! Tracing setup for haven
//!
//! The binary writes to a daily-rotated file under `$XDG_STATE_HOME/haven/`.
//! With `verbose` the same events are mirrored to stderr. Call sites log
//! kinds, keys and counts; text a user typed never reaches a log line.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const FILE_PREFIX: &str = "haven.log";

/// Keeps the non-blocking file writer alive; flushes on drop.
pub struct LoggingGuard {
    _file: WorkerGuard,
}

/// Filter directives for `level`: haven's own crates at `level`, everything
/// else at `warn`.
pub fn directives(level: &str) -> String {
    let level = level.trim();
    format!("warn,haven={level},haven_core={level}")
}

/// `RUST_LOG` when set, else [`directives`] for the configured level.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(directives(&config.level))
        .map_err(|e| Error::Config(format!("invalid logging.level {:?}: {}", config.level, e)))
}

/// Install the global subscriber.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(FILE_PREFIX)
        .max_log_files(config.max_files.max(1))
        .build(&log_dir)
        .map_err(|e| Error::Config(format!("failed to create log appender: {}", e)))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(build_filter(config)?)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {}", e)))?;

    tracing::debug!(dir = %log_dir.display(), verbose, "logging ready");
    Ok(LoggingGuard { _file: guard })
}

/// Test subscriber on the libtest writer. Safe to call from every test.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
