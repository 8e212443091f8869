//! Error types for SQLite migration runs.
//!
//! Provides a unified error type covering database access, script loading,
//! batch splitting and execution failures.

use thiserror::Error;

/// Errors that can occur while applying migrations.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Configuration or script discovery failure.
    #[error("loader error: {0}")]
    LoaderError(#[from] sqlbatch_db::LoaderError),

    /// A script could not be split into batches.
    #[error("migration {version}: {source}")]
    BatchError {
        version: i64,
        #[source]
        source: sqlbatch_core::BatchError,
    },

    /// A batch was rejected by the database.
    #[error("migration {version}, batch {batch}: {message}")]
    ExecutionError {
        version: i64,
        /// 1-based index of the failing batch within the script.
        batch: usize,
        message: String,
    },

    /// Table prefix contains invalid characters.
    #[error("invalid prefix '{0}': must contain only alphanumeric characters and underscores")]
    InvalidPrefix(String),

    /// A requested target version is not among the loaded migrations.
    #[error("unknown migration version: {0}")]
    UnknownVersion(i64),
}

/// Convenience alias for results with [`RunnerError`].
pub type Result<T> = std::result::Result<T, RunnerError>;
