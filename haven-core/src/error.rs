//! Error types for haven-core
//!
//! Most of the public surface never returns these: the [`PersistentStore`]
//! boundary turns storage failures into "absent" values. They surface from
//! store backends, configuration loading and logging setup.
//!
//! [`PersistentStore`]: crate::store::PersistentStore

use thiserror::Error;

/// Main error type for the haven-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend refused the operation
    #[error("storage unavailable: {0}")]
    Storage(String),
}

/// Result type alias for haven-core
pub type Result<T> = std::result::Result<T, Error>;
