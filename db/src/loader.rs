//! Script migration discovery with namespace and tag filtering.
//!
//! A migration is a file named `<version>_<description>.sql` anywhere under
//! the scripts root. Its namespace is the directory it lives in, relative to
//! the root and `/`-separated (`""` for the root itself). Tags are declared
//! in leading comment lines:
//!
//! ```sql
//! -- tags: production, eu
//! create table invoices (id int)
//! GO
//! ```
//!
//! [`MigrationLoader::load`] returns the selected scripts ordered by
//! version and rejects duplicate versions.
//!
//! # Example
//!
//! ```no_run
//! use sqlbatch_db::{FilterConfig, MigrationLoader};
//!
//! let loader = MigrationLoader::new("migrations/", FilterConfig::default());
//! for (version, migration) in loader.load().unwrap() {
//!     println!("{version}: {}", migration.description);
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::FilterConfig;
use crate::error::{LoaderError, Result};

static SCRIPT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)_(.+)\.sql$").expect("static regex must compile"));

static TAGS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^--\s*tags\s*:(.*)$").expect("static regex must compile"));

/// One migration script found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptMigration {
    /// Version parsed from the file name prefix.
    pub version: i64,
    /// File name between the version and the extension, underscores turned
    /// into spaces.
    pub description: String,
    /// Full path of the script.
    pub path: PathBuf,
    /// Directory relative to the scripts root, `/`-separated.
    pub namespace: String,
    /// Tags from leading `-- tags:` lines.
    pub tags: Vec<String>,
}

impl ScriptMigration {
    /// Reads the script contents.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::IoError`] if the file cannot be read.
    pub fn read(&self) -> Result<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }

    /// SHA-256 of the script bytes, lowercase hex.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::IoError`] if the file cannot be read.
    pub fn checksum(&self) -> Result<String> {
        let bytes = std::fs::read(&self.path)?;
        Ok(sha256_hex(&bytes))
    }

    /// Reads the script once, returning its contents and the checksum of
    /// exactly those bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::IoError`] if the file cannot be read or is not
    /// valid UTF-8.
    pub fn read_with_checksum(&self) -> Result<(String, String)> {
        let bytes = std::fs::read(&self.path)?;
        let checksum = sha256_hex(&bytes);
        let contents = String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok((contents, checksum))
    }

    /// Returns `true` if the script carries every tag in `required`.
    /// Untagged scripts match any request.
    pub fn matches_tags(&self, required: &[String]) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        required
            .iter()
            .all(|tag| self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
    }

    /// Returns `true` if the script lives in `namespace`, or below it when
    /// `nested` is set.
    pub fn in_namespace(&self, namespace: &str, nested: bool) -> bool {
        let namespace = namespace.trim_matches('/');
        if self.namespace == namespace {
            return true;
        }
        if !nested {
            return false;
        }
        namespace.is_empty()
            || self
                .namespace
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Finds, filters and orders migration scripts under one root directory.
#[derive(Debug, Clone)]
pub struct MigrationLoader {
    root: PathBuf,
    filter: FilterConfig,
}

impl MigrationLoader {
    /// Creates a loader for `root` with the given selection settings.
    pub fn new(root: impl Into<PathBuf>, filter: FilterConfig) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }

    /// The scripts root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Discovers every script under the root without filtering, in directory
    /// walk order.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::IoError`] if a directory or script cannot be
    /// read.
    pub fn discover(&self) -> Result<Vec<ScriptMigration>> {
        let mut found = Vec::new();
        self.walk(&self.root, &mut found)?;
        Ok(found)
    }

    /// Loads the selected migrations keyed and ordered by version.
    ///
    /// # Errors
    ///
    /// - [`LoaderError::NoMigrationsFound`] if the root holds no scripts.
    /// - [`LoaderError::DuplicateVersion`] if two selected scripts share a
    ///   version.
    /// - [`LoaderError::MissingMigrations`] if filtering selected nothing.
    pub fn load(&self) -> Result<BTreeMap<i64, ScriptMigration>> {
        let scripts = self.discover()?;
        if scripts.is_empty() {
            return Err(LoaderError::NoMigrationsFound(self.root.clone()));
        }

        let mut migrations: BTreeMap<i64, ScriptMigration> = BTreeMap::new();
        for script in scripts {
            if !self.selects(&script) {
                debug!(path = %script.path.display(), "migration filtered out");
                continue;
            }
            if let Some(existing) = migrations.get(&script.version) {
                return Err(LoaderError::DuplicateVersion {
                    version: script.version,
                    first: existing.path.clone(),
                    second: script.path,
                });
            }
            migrations.insert(script.version, script);
        }

        if migrations.is_empty() {
            return Err(LoaderError::MissingMigrations);
        }
        Ok(migrations)
    }

    fn selects(&self, script: &ScriptMigration) -> bool {
        let in_namespace = match &self.filter.namespace {
            Some(ns) => script.in_namespace(ns, self.filter.nested),
            None => true,
        };
        in_namespace && script.matches_tags(&self.filter.tags)
    }

    fn walk(&self, dir: &Path, found: &mut Vec<ScriptMigration>) -> Result<()> {
        let mut entries = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.walk(&path, found)?;
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("sql") {
                continue;
            }
            match self.parse_script(&path)? {
                Some(script) => found.push(script),
                None => warn!(
                    path = %path.display(),
                    "skipping script without a <version>_<description>.sql name"
                ),
            }
        }
        Ok(())
    }

    fn parse_script(&self, path: &Path) -> Result<Option<ScriptMigration>> {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        let Some(caps) = SCRIPT_NAME.captures(file_name) else {
            return Ok(None);
        };
        let Ok(version) = caps[1].parse::<i64>() else {
            return Ok(None);
        };

        let namespace = path
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.root).ok())
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default();

        let contents = std::fs::read_to_string(path)?;

        Ok(Some(ScriptMigration {
            version,
            description: caps[2].replace('_', " "),
            path: path.to_path_buf(),
            namespace,
            tags: parse_tags(&contents),
        }))
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Collects tags from `-- tags:` lines in the script's leading comment
/// block. Scanning stops at the first line that is neither blank nor a
/// `--` comment.
fn parse_tags(contents: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !line.starts_with("--") {
            break;
        }
        if let Some(caps) = TAGS_LINE.captures(line) {
            tags.extend(
                caps[1]
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from),
            );
        }
    }
    tags
}
