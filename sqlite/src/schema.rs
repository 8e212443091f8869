//! SQL for the version-tracking table.
//!
//! Applied migrations are recorded in `{prefix}version_info`, one row per
//! version. The prefix lets several independent script sets share a
//! database (e.g. `app_`, `audit_`).

use crate::error::{Result, RunnerError};

/// Validates that a table prefix contains only alphanumeric characters and underscores.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(RunnerError::InvalidPrefix(prefix.to_string()));
    }
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RunnerError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// Name of the version table for `prefix`.
pub(crate) fn version_table(prefix: &str) -> String {
    format!("{prefix}version_info")
}

/// Generates the `CREATE TABLE` statement for the version table.
///
/// Uses `IF NOT EXISTS`, so running it against an initialized database is a
/// no-op.
///
/// # Errors
///
/// Returns [`RunnerError::InvalidPrefix`] if the prefix is empty or contains
/// characters other than ASCII alphanumerics and underscores.
pub fn generate_version_table_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;
    let table = version_table(prefix);

    Ok(format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    version INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    checksum TEXT NOT NULL,
    applied_on TEXT NOT NULL
);
"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_prefix() {
        assert!(validate_prefix("sqlbatch_").is_ok());
        assert!(validate_prefix("App2").is_ok());
        assert!(validate_prefix("_").is_ok());
    }

    #[test]
    fn test_invalid_prefix() {
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("my-prefix").is_err());
        assert!(validate_prefix("x; DROP TABLE y; --").is_err());
        assert!(validate_prefix("ünicode_").is_err());
    }

    #[test]
    fn test_version_table_sql_uses_prefix() {
        let sql = generate_version_table_sql("app_").unwrap();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS app_version_info"));
        assert!(sql.contains("version INTEGER PRIMARY KEY"));
    }

    #[test]
    fn test_generate_rejects_invalid_prefix() {
        assert!(matches!(
            generate_version_table_sql("bad prefix"),
            Err(RunnerError::InvalidPrefix(_))
        ));
        assert!(generate_version_table_sql("").is_err());
    }

    #[test]
    fn test_version_table_sql_executes_twice() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let sql = generate_version_table_sql("t_").unwrap();
        conn.execute_batch(&sql).unwrap();
        conn.execute_batch(&sql).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='t_version_info'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
