//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/haven/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/haven/` (~/.config/haven/)
//! - Data: `$XDG_DATA_HOME/haven/` (~/.local/share/haven/)
//! - State/Logs: `$XDG_STATE_HOME/haven/` (~/.local/state/haven/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Storage location overrides
    #[serde(default)]
    pub storage: StorageConfig,

    /// Suggestion behaviour
    #[serde(default)]
    pub suggestions: SuggestionsConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Storage configuration
#[derive(Debug, Deserialize, Default)]
pub struct StorageConfig {
    /// Override for the SQLite database file
    pub database_path: Option<PathBuf>,
}

/// Suggestion configuration
#[derive(Debug, Deserialize)]
pub struct SuggestionsConfig {
    /// Default snooze length when none is given
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            snooze_minutes: default_snooze_minutes(),
        }
    }
}

fn default_snooze_minutes() -> u32 {
    60
}

impl SuggestionsConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.snooze_minutes == 0 || self.snooze_minutes > 24 * 60 {
            return Err(Error::Config(
                "suggestions.snooze_minutes must be between 1 and 1440".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.suggestions.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/haven/config.toml` (~/.config/haven/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("haven").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/haven/` (~/.local/share/haven/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("haven")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/haven/` (~/.local/state/haven/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("haven")
    }

    /// Returns the default database file path
    ///
    /// `$XDG_DATA_HOME/haven/haven.db` (~/.local/share/haven/haven.db)
    pub fn default_database_path() -> PathBuf {
        Self::data_dir().join("haven.db")
    }

    /// Database path honouring `[storage] database_path`.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(Self::default_database_path)
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// For CLI binaries that want stable path behavior before invoking
    /// other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
