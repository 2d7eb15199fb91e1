//! Storage error types for fixgen-storage.
//!
//! [`StorageError`] covers the failure modes of the store: SQLite and
//! migration failures, schema level mismatches, and malformed
//! registrations or results.

use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An underlying SQLite call failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem access next to the database failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The database file is already at a later schema level than requested.
    #[error("database is at schema level {found}, newer than requested level {requested}")]
    SchemaTooNew { found: u32, requested: u32 },

    /// The requested schema level is not defined.
    #[error("schema level {requested} is not defined (latest is {latest})")]
    UnsupportedLevel { requested: u32, latest: u32 },

    /// A parameter name was registered twice on one measurement.
    #[error("parameter '{0}' is already registered")]
    DuplicateParameter(String),

    /// A result or setpoint referenced a parameter that was never registered.
    #[error("parameter '{0}' is not registered")]
    UnknownParameter(String),

    /// Numeric results in one `add_result` call disagree on length.
    #[error("result for '{parameter}' has {actual} value(s), expected {expected}")]
    ResultLengthMismatch {
        parameter: String,
        expected: usize,
        actual: usize,
    },

    /// An experiment with the given ID was not found.
    #[error("experiment not found: {0}")]
    ExperimentNotFound(i64),
}
