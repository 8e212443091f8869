//! Runner configuration for script migrations.
//!
//! Defines the YAML-serializable configuration that controls where scripts
//! are found, how they are split into batches, which of them are selected,
//! and where applied versions are recorded.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! scripts_dir: migrations
//! table_prefix: sqlbatch_
//! splitter:
//!   separator: GO
//!   terminator: "\n"
//!   strip_comments: false
//! filter:
//!   namespace: billing
//!   nested: true
//!   tags:
//!     - production
//! ```
//!
//! Every field is optional; missing fields take the values shown above
//! (with no namespace and no tags).

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqlbatch_core::{BatchParser, DEFAULT_SEPARATOR, SplitOptions};

use crate::error::{LoaderError, Result};

/// How scripts are split into batches.
///
/// # Examples
///
/// ```
/// # use sqlbatch_db::SplitterConfig;
/// let splitter = SplitterConfig::default();
/// assert_eq!(splitter.separator, "GO");
/// assert_eq!(splitter.terminator, "\n");
/// assert!(!splitter.strip_comments);
/// assert!(splitter.parser().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Batch-separator keyword, matched case-insensitively on its own line.
    pub separator: String,
    /// Line break re-inserted between retained lines.
    pub terminator: String,
    /// Remove comments from batches before execution.
    pub strip_comments: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            terminator: "\n".to_string(),
            strip_comments: false,
        }
    }
}

impl SplitterConfig {
    /// Builds the batch parser described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::InvalidConfig`] if the separator or terminator
    /// is rejected by the parser.
    pub fn parser(&self) -> Result<BatchParser> {
        BatchParser::new(self.terminator.as_str())
            .and_then(|parser| parser.with_separator(&self.separator))
            .map_err(|e| LoaderError::InvalidConfig(e.to_string()))
    }

    /// Per-run split options.
    pub fn options(&self) -> SplitOptions {
        SplitOptions {
            strip_comments: self.strip_comments,
        }
    }
}

/// Which scripts are selected for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Directory, relative to the scripts root and `/`-separated, whose
    /// scripts are selected. `None` selects every namespace.
    pub namespace: Option<String>,
    /// Also select scripts in directories below `namespace`.
    pub nested: bool,
    /// Tags a tagged script must carry (all of them) to be selected.
    /// Untagged scripts are always selected.
    pub tags: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            nested: true,
            tags: Vec::new(),
        }
    }
}

/// Top-level runner configuration.
///
/// Loaded from a YAML file (typically `sqlbatch.yml` next to the scripts).
/// A relative `scripts_dir` is resolved against the directory of the file it
/// was loaded from.
///
/// # Examples
///
/// ```no_run
/// use sqlbatch_db::RunnerConfig;
///
/// let config = RunnerConfig::load("sqlbatch.yml").unwrap();
/// println!("scripts in {}", config.scripts_dir.display());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Root directory searched recursively for migration scripts.
    pub scripts_dir: PathBuf,
    /// Prefix of the version-tracking table.
    pub table_prefix: String,
    /// Batch splitting settings.
    pub splitter: SplitterConfig,
    /// Script selection settings.
    pub filter: FilterConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            scripts_dir: PathBuf::from("migrations"),
            table_prefix: "sqlbatch_".to_string(),
            splitter: SplitterConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Loads and validates configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](LoaderError::IoError) if the file cannot be read,
    /// [`YamlError`](LoaderError::YamlError) if parsing fails, or
    /// [`InvalidConfig`](LoaderError::InvalidConfig) if validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut config: RunnerConfig = serde_yaml::from_reader(reader)?;
        if config.scripts_dir.is_relative()
            && let Some(parent) = path.parent()
        {
            config.scripts_dir = parent.join(&config.scripts_dir);
        }
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](LoaderError::IoError) if the file cannot be
    /// written, or [`YamlError`](LoaderError::YamlError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks that the splitter settings produce a usable parser and that the
    /// table prefix is a plain identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](LoaderError::InvalidConfig) describing the
    /// first problem found.
    pub fn validate(&self) -> Result<()> {
        self.splitter.parser()?;
        if self.table_prefix.is_empty()
            || !self
                .table_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(LoaderError::InvalidConfig(format!(
                "table prefix '{}' must contain only alphanumeric characters and underscores",
                self.table_prefix
            )));
        }
        Ok(())
    }
}
