//! Error types for configuration and migration loading.
//!
//! Provides a unified error type covering I/O, YAML parsing, configuration
//! validation and the version-ordering failures of the migration loader.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading configuration or migrations.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Configuration is structurally valid YAML but unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The scripts directory holds no migration scripts at all.
    #[error("no migrations found in {}", .0.display())]
    NoMigrationsFound(PathBuf),

    /// Scripts exist but none survived namespace and tag filtering.
    #[error("no migrations match the configured namespace and tags")]
    MissingMigrations,

    /// Two scripts declare the same version number.
    #[error("duplicate migration version {version}: {} and {}", .first.display(), .second.display())]
    DuplicateVersion {
        version: i64,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Convenience alias for results with [`LoaderError`].
pub type Result<T> = std::result::Result<T, LoaderError>;
