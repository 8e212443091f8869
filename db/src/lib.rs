//! Configuration and script migration discovery for sqlbatch.
//!
//! This crate sits between the batch splitter and a database runner: it
//! loads the YAML [`RunnerConfig`] and finds the SQL migration scripts a run
//! should apply, ordered by version.
//!
//! # Quick start
//!
//! ```no_run
//! use sqlbatch_db::{MigrationLoader, RunnerConfig};
//!
//! let config = RunnerConfig::load("sqlbatch.yml").unwrap();
//! let parser = config.splitter.parser().unwrap();
//!
//! let loader = MigrationLoader::new(&config.scripts_dir, config.filter.clone());
//! for migration in loader.load().unwrap().values() {
//!     let script = migration.read().unwrap();
//!     let events = parser.split_str(&script, config.splitter.options()).unwrap();
//!     println!("{} -> {} events", migration.path.display(), events.len());
//! }
//! ```

mod config;
mod error;
mod loader;

pub use config::{FilterConfig, RunnerConfig, SplitterConfig};
pub use error::{LoaderError, Result};
pub use loader::{MigrationLoader, ScriptMigration};
