//! Applies migration scripts to a SQLite database.
//!
//! Each script is split into batches with the configured [`BatchParser`] and
//! the batches are executed in order. A batch followed by a `GO n` directive
//! runs `n` times. Applied versions are recorded in the
//! `{prefix}version_info` table together with the script checksum, so
//! [`status`](MigrationRunner::status) can detect edited scripts.
//!
//! # Example
//!
//! ```no_run
//! use rusqlite::Connection;
//! use sqlbatch_db::RunnerConfig;
//! use sqlbatch_sqlite::MigrationRunner;
//!
//! let config = RunnerConfig::load("sqlbatch.yml").unwrap();
//! let conn = Connection::open("app.db").unwrap();
//! let mut runner = MigrationRunner::new(conn, config).unwrap();
//!
//! let report = runner.up().unwrap();
//! println!("applied {:?} ({} batches)", report.applied, report.batches_executed);
//! ```

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::{Connection, params};
use serde::Serialize;
use sqlbatch_core::{BatchEvent, BatchParser};
use sqlbatch_db::{LoaderError, MigrationLoader, RunnerConfig, ScriptMigration};
use tracing::{debug, info, warn};

use crate::error::{Result, RunnerError};
use crate::schema::{generate_version_table_sql, validate_prefix, version_table};

/// Runs the migrations described by a [`RunnerConfig`] against one
/// connection.
///
/// Every migration is applied in its own transaction together with its
/// version row: a failing batch rolls back the whole script and leaves
/// earlier migrations applied.
pub struct MigrationRunner {
    conn: Connection,
    config: RunnerConfig,
    parser: BatchParser,
}

impl MigrationRunner {
    /// Creates a runner and ensures the version table exists.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::InvalidPrefix`] if the table prefix is invalid,
    /// [`RunnerError::LoaderError`] if the splitter settings are unusable,
    /// or [`RunnerError::DatabaseError`] if the table cannot be created.
    pub fn new(conn: Connection, config: RunnerConfig) -> Result<Self> {
        validate_prefix(&config.table_prefix)?;
        let parser = config.splitter.parser()?;
        conn.execute_batch(&generate_version_table_sql(&config.table_prefix)?)?;
        Ok(Self {
            conn,
            config,
            parser,
        })
    }

    /// Applies every pending migration in version order.
    pub fn up(&mut self) -> Result<ApplyReport> {
        let migrations = self.loader().load()?;
        self.apply(migrations.values())
    }

    /// Applies pending migrations up to and including `target`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::UnknownVersion`] if no loaded script has
    /// version `target`.
    pub fn up_to(&mut self, target: i64) -> Result<ApplyReport> {
        let migrations = self.loader().load()?;
        if !migrations.contains_key(&target) {
            return Err(RunnerError::UnknownVersion(target));
        }
        self.apply(migrations.range(..=target).map(|(_, m)| m))
    }

    /// Reports the state of every loaded or recorded migration, ordered by
    /// version.
    ///
    /// A scripts directory with nothing selected is not an error here: all
    /// recorded versions are then reported as [`MigrationState::Orphaned`].
    pub fn status(&self) -> Result<Vec<MigrationStatus>> {
        let migrations = match self.loader().load() {
            Ok(migrations) => migrations,
            Err(LoaderError::NoMigrationsFound(_) | LoaderError::MissingMigrations) => {
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        let mut applied = self.applied()?;

        let mut statuses = Vec::with_capacity(migrations.len() + applied.len());
        for (version, migration) in &migrations {
            let (state, applied_on) = match applied.remove(version) {
                None => (MigrationState::Pending, None),
                Some(row) if row.checksum == migration.checksum()? => {
                    (MigrationState::Applied, Some(row.applied_on))
                }
                Some(row) => (MigrationState::Modified, Some(row.applied_on)),
            };
            statuses.push(MigrationStatus {
                version: *version,
                description: migration.description.clone(),
                state,
                applied_on,
            });
        }
        for (version, row) in applied {
            statuses.push(MigrationStatus {
                version,
                description: row.description,
                state: MigrationState::Orphaned,
                applied_on: Some(row.applied_on),
            });
        }

        statuses.sort_by_key(|s| s.version);
        Ok(statuses)
    }

    /// Highest recorded version, or `None` on a fresh database.
    pub fn current_version(&self) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT MAX(version) FROM {}",
            version_table(&self.config.table_prefix)
        );
        let version: Option<i64> = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(version)
    }

    /// The configuration this runner was built from.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the runner and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn loader(&self) -> MigrationLoader {
        MigrationLoader::new(&self.config.scripts_dir, self.config.filter.clone())
    }

    fn apply<'m>(
        &mut self,
        migrations: impl IntoIterator<Item = &'m ScriptMigration>,
    ) -> Result<ApplyReport> {
        let applied = self.applied()?;
        let mut report = ApplyReport::default();

        for migration in migrations {
            if let Some(row) = applied.get(&migration.version) {
                if row.checksum != migration.checksum()? {
                    warn!(
                        version = migration.version,
                        path = %migration.path.display(),
                        "applied migration was modified on disk"
                    );
                }
                continue;
            }
            report.batches_executed += self.apply_one(migration)?;
            report.applied.push(migration.version);
        }

        Ok(report)
    }

    fn apply_one(&mut self, migration: &ScriptMigration) -> Result<usize> {
        let (script, checksum) = migration.read_with_checksum()?;
        let events = self
            .parser
            .split_str(&script, self.config.splitter.options())
            .map_err(|source| RunnerError::BatchError {
                version: migration.version,
                source,
            })?;

        info!(
            version = migration.version,
            description = %migration.description,
            "applying migration"
        );

        let insert = format!(
            "INSERT INTO {} (version, description, checksum, applied_on) VALUES (?1, ?2, ?3, ?4)",
            version_table(&self.config.table_prefix)
        );
        let tx = self.conn.transaction()?;
        let executed = execute_events(&tx, migration.version, events)?;
        tx.execute(
            &insert,
            params![
                migration.version,
                migration.description,
                checksum,
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;
        Ok(executed)
    }

    fn applied(&self) -> Result<BTreeMap<i64, AppliedRow>> {
        let sql = format!(
            "SELECT version, description, checksum, applied_on FROM {}",
            version_table(&self.config.table_prefix)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(AppliedRow {
                version: row.get(0)?,
                description: row.get(1)?,
                checksum: row.get(2)?,
                applied_on: row.get(3)?,
            })
        })?;

        let mut applied = BTreeMap::new();
        for row in rows {
            let row = row?;
            applied.insert(row.version, row);
        }
        Ok(applied)
    }
}

/// Executes split events, repeating each batch as its directive requests.
/// Returns the number of batch executions sent to SQLite.
fn execute_events(conn: &Connection, version: i64, events: Vec<BatchEvent>) -> Result<usize> {
    let mut executed = 0;
    let mut index = 0;
    let mut pending: Option<String> = None;

    for event in events {
        match event {
            BatchEvent::Batch(sql) => {
                if let Some(previous) = pending.replace(sql) {
                    executed += run_batch(conn, version, index, &previous, 1)?;
                }
                index += 1;
            }
            BatchEvent::Directive(directive) => {
                if let Some(sql) = pending.take() {
                    executed += run_batch(conn, version, index, &sql, directive.repeat_count())?;
                }
            }
        }
    }
    if let Some(sql) = pending {
        executed += run_batch(conn, version, index, &sql, 1)?;
    }

    Ok(executed)
}

fn run_batch(
    conn: &Connection,
    version: i64,
    batch: usize,
    sql: &str,
    times: u32,
) -> Result<usize> {
    if sql.trim().is_empty() {
        return Ok(0);
    }
    for _ in 0..times {
        conn.execute_batch(sql)
            .map_err(|e| RunnerError::ExecutionError {
                version,
                batch,
                message: e.to_string(),
            })?;
    }
    debug!(version, batch, times, "executed batch");
    Ok(times as usize)
}

struct AppliedRow {
    version: i64,
    description: String,
    checksum: String,
    applied_on: String,
}

/// Outcome of [`MigrationRunner::up`] and [`MigrationRunner::up_to`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Versions applied by this run, in order.
    pub applied: Vec<i64>,
    /// Batch executions, counting each repetition.
    pub batches_executed: usize,
}

/// Where a migration stands relative to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    /// Recorded, and the script is unchanged.
    Applied,
    /// Present on disk but not recorded.
    Pending,
    /// Recorded with a checksum that no longer matches the script.
    Modified,
    /// Recorded, but no selected script has this version.
    Orphaned,
}

/// One row of [`MigrationRunner::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub version: i64,
    pub description: String,
    pub state: MigrationState,
    /// RFC 3339 timestamp of when the version was recorded.
    pub applied_on: Option<String>,
}
