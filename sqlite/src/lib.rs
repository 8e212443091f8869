//! SQLite migration runner for batch-split SQL scripts.
//!
//! Scripts are discovered by [`sqlbatch_db::MigrationLoader`], split into
//! batches by [`sqlbatch_core::BatchParser`] and executed against a
//! [`rusqlite::Connection`]. Applied versions are recorded in a prefixed
//! `version_info` table.
//!
//! # Architecture
//!
//! - **`schema`**: version table SQL with customizable table prefixes
//! - **`runner`**: apply (`up`, `up_to`) and inspect (`status`) migrations
//!
//! # Quick start
//!
//! ```no_run
//! use rusqlite::Connection;
//! use sqlbatch_db::RunnerConfig;
//! use sqlbatch_sqlite::{MigrationRunner, MigrationState};
//!
//! let config = RunnerConfig::load("sqlbatch.yml").unwrap();
//! let mut runner = MigrationRunner::new(Connection::open("app.db").unwrap(), config).unwrap();
//!
//! runner.up().unwrap();
//! for status in runner.status().unwrap() {
//!     if status.state == MigrationState::Modified {
//!         println!("{} changed after it was applied", status.version);
//!     }
//! }
//! ```

mod error;
mod runner;
mod schema;

pub use error::{Result, RunnerError};
pub use runner::{ApplyReport, MigrationRunner, MigrationState, MigrationStatus};
pub use schema::generate_version_table_sql;
