//! Error types for batch splitting.
//!
//! Only one failure is structural: input ending inside a block comment.
//! The remaining variants cover construction mistakes and I/O failures of
//! stream-backed line sources.

use thiserror::Error;

/// Errors that can occur while splitting a script into batches.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Input ended while a `/* ... */` comment was still open.
    ///
    /// `line` is the 1-based line on which the unterminated comment began.
    #[error("unterminated block comment starting on line {line}")]
    UnterminatedComment { line: usize },

    /// The underlying line source failed (read error or invalid UTF-8).
    #[error("failed to read script: {0}")]
    Source(#[from] std::io::Error),

    /// Separator keyword is empty or contains whitespace.
    #[error("invalid batch separator '{0}': must be a non-empty word without whitespace")]
    InvalidSeparator(String),

    /// The terminator re-inserted between retained lines is empty.
    #[error("line terminator cannot be empty")]
    InvalidTerminator,
}

/// Convenience alias for results with [`BatchError`].
pub type Result<T> = std::result::Result<T, BatchError>;
