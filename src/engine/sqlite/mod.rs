//! `SQLite` Database Engine Implementation
//!
//! This module implements the `DatabaseEngine` trait for `SQLite` databases.
//!
//! # Features
//! - File-based connections (`/path/to/db.sqlite`)
//! - In-memory connections (`:memory:`)
//! - Multi-statement scripts, one result set per row-returning statement
//!
//! # Implementation Notes
//! - Uses `rusqlite` (synchronous driver, no async needed)
//! - Statements are prepared one at a time from the script with `Batch`
//! - The database file must already exist; checks never create one

use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection, OpenFlags, Row};
use std::time::Instant;

use crate::cursor::{BufferedCursor, ResultSet, SqlValue};
use crate::engine::{ConnectionConfig, ConnectionInfo, DatabaseEngine, DatabaseType, ScriptOutput};
use crate::error::{CheckError, Result};

/// `SQLite` database engine implementation
pub struct SqliteEngine;

impl DatabaseEngine for SqliteEngine {
    async fn validate_connection(config: &ConnectionConfig) -> Result<ConnectionInfo> {
        let path = database_path(config)?;
        let conn = open_connection(path)?;

        let version: String = conn
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .map_err(|e| CheckError::connection_failed(format!("Failed to query SQLite version: {e}")))?;

        let db_name = config
            .file
            .as_ref()
            .and_then(|f| f.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or(path)
            .to_string();

        Ok(ConnectionInfo {
            database_version: version.clone(),
            server_info: format!("SQLite {version}"),
            connected_database: db_name,
            user: "N/A".to_string(), // SQLite has no user concept
        })
    }

    async fn execute_script(config: &ConnectionConfig, script: &str) -> Result<ScriptOutput> {
        let path = database_path(config)?;
        let conn = open_connection(path)?;

        let start = Instant::now();
        let sets = run_script(&conn, script)?;
        let execution_time = start.elapsed();

        tracing::debug!(result_sets = sets.len(), elapsed_ms = execution_time.as_millis(), "sqlite script finished");

        Ok(ScriptOutput { cursor: BufferedCursor::new(sets), execution_time })
    }
}

/// Extract and validate the database path from the config
fn database_path(config: &ConnectionConfig) -> Result<&str> {
    if config.engine != DatabaseType::SQLite {
        return Err(CheckError::invalid_input(format!("Expected SQLite engine, got {}", config.engine)));
    }

    let file_path = config
        .file
        .as_ref()
        .ok_or_else(|| CheckError::invalid_input("SQLite requires 'file' parameter"))?;

    file_path
        .to_str()
        .ok_or_else(|| CheckError::invalid_input("SQLite file path contains invalid UTF-8 characters"))
}

/// Open an existing `SQLite` database for reading and writing
fn open_connection(path: &str) -> Result<Connection> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
        .map_err(|e| CheckError::connection_failed(format!("Failed to open SQLite database: {e}")))
}

/// Run every statement of `script`, collecting the result sets of those that return columns
fn run_script(conn: &Connection, script: &str) -> Result<Vec<ResultSet>> {
    let mut batch = Batch::new(conn, script);
    let mut sets = Vec::new();

    while let Some(mut stmt) = batch.next().map_err(|e| CheckError::query_failed(e.to_string()))? {
        let columns: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();

        if columns.is_empty() {
            stmt.execute([]).map_err(|e| CheckError::query_failed(e.to_string()))?;
            continue;
        }

        let mut set = ResultSet::new(columns);
        let mut rows = stmt.query([]).map_err(|e| CheckError::query_failed(e.to_string()))?;
        while let Some(row) = rows.next().map_err(|e| CheckError::query_failed(format!("Failed to fetch row: {e}")))? {
            set.push_row(read_row(row, set.columns.len())?);
        }
        sets.push(set);
    }

    Ok(sets)
}

fn read_row(row: &Row, width: usize) -> Result<Vec<SqlValue>> {
    (0..width)
        .map(|idx| {
            row.get_ref(idx)
                .map(sqlite_value)
                .map_err(|e| CheckError::query_failed(format!("Failed to read column {idx}: {e}")))
        })
        .collect()
}

/// Convert a `SQLite` value reference into an owned value
fn sqlite_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => SqlValue::Text(text.to_string()),
            Err(_) => SqlValue::Blob(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::ResultSetCursor;
    use tempfile::TempDir;

    fn create_db(sql: &str) -> (TempDir, ConnectionConfig) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("check.db");
        let conn = Connection::open(&path).expect("Failed to create temp database");
        conn.execute_batch(sql).expect("Failed to seed database");
        (dir, ConnectionConfig::sqlite(path))
    }

    #[tokio::test]
    async fn test_validate_connection() {
        let (_dir, config) = create_db("CREATE TABLE t (id INTEGER)");
        let info = SqliteEngine::validate_connection(&config).await.unwrap();
        assert!(info.database_version.starts_with("3."));
        assert!(info.server_info.contains("SQLite"));
        assert_eq!(info.connected_database, "check.db");
        assert_eq!(info.user, "N/A");
    }

    #[tokio::test]
    async fn test_validate_connection_missing_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConnectionConfig::sqlite(dir.path().join("absent.db"));

        let err = SqliteEngine::validate_connection(&config).await.unwrap_err();
        assert!(matches!(err, CheckError::ConnectionFailed(_)));
        assert!(!dir.path().join("absent.db").exists());
    }

    #[tokio::test]
    async fn test_validate_connection_wrong_engine() {
        let mut config = ConnectionConfig::sqlite(":memory:".into());
        config.engine = DatabaseType::Postgres;

        let err = SqliteEngine::validate_connection(&config).await.unwrap_err();
        assert!(err.message().contains("Expected SQLite engine"));
    }

    #[tokio::test]
    async fn test_validate_connection_missing_file_parameter() {
        let config = ConnectionConfig::new(DatabaseType::SQLite);
        let err = SqliteEngine::validate_connection(&config).await.unwrap_err();
        assert!(err.message().contains("SQLite requires 'file' parameter"));
    }

    #[tokio::test]
    async fn test_execute_script_multiple_result_sets() {
        let (_dir, config) = create_db(
            "CREATE TABLE conns (id INTEGER);
             INSERT INTO conns VALUES (1), (2), (3);",
        );

        let script = "SELECT 'OK' AS ServiceStatus;
                      SELECT 'conn_count' AS Metric, COUNT(*) AS Value FROM conns;
                      SELECT 0 AS ExitCode;";
        let output = SqliteEngine::execute_script(&config, script).await.unwrap();
        let mut cursor = output.cursor;

        assert_eq!(cursor.result_set_count(), 3);
        assert_eq!(cursor.columns(), ["ServiceStatus".to_string()]);
        assert!(cursor.next_row());
        assert_eq!(cursor.scan_row().unwrap(), [SqlValue::Text("OK".into())]);

        assert!(cursor.next_result_set());
        assert_eq!(cursor.columns(), ["Metric".to_string(), "Value".to_string()]);
        assert!(cursor.next_row());
        assert_eq!(cursor.scan_row().unwrap(), [SqlValue::Text("conn_count".into()), SqlValue::Integer(3)]);

        assert!(cursor.next_result_set());
        assert_eq!(cursor.columns(), ["ExitCode".to_string()]);
    }

    #[tokio::test]
    async fn test_statements_without_columns_produce_no_result_set() {
        let (_dir, config) = create_db("CREATE TABLE t (v TEXT)");

        let script = "CREATE TEMP TABLE scratch (v TEXT);
                      INSERT INTO scratch VALUES ('a');
                      SELECT v AS ServiceStatus FROM scratch;";
        let output = SqliteEngine::execute_script(&config, script).await.unwrap();
        assert_eq!(output.cursor.result_set_count(), 1);
        assert_eq!(output.cursor.row_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_result_set_keeps_columns() {
        let (_dir, config) = create_db("CREATE TABLE t (v TEXT)");

        let output = SqliteEngine::execute_script(&config, "SELECT v AS Metric, v AS Value FROM t").await.unwrap();
        assert_eq!(output.cursor.result_set_count(), 1);
        assert_eq!(output.cursor.columns().len(), 2);
        assert_eq!(output.cursor.row_count(), 0);
    }

    #[tokio::test]
    async fn test_value_types() {
        let (_dir, config) = create_db("CREATE TABLE t (v TEXT)");

        let output = SqliteEngine::execute_script(&config, "SELECT 42, 1.5, 'txt', x'00ff', NULL").await.unwrap();
        let mut cursor = output.cursor;
        assert!(cursor.next_row());
        assert_eq!(
            cursor.scan_row().unwrap(),
            [
                SqlValue::Integer(42),
                SqlValue::Real(1.5),
                SqlValue::Text("txt".into()),
                SqlValue::Blob(vec![0x00, 0xff]),
                SqlValue::Null,
            ]
        );
    }

    #[tokio::test]
    async fn test_syntax_error_is_query_failure() {
        let (_dir, config) = create_db("CREATE TABLE t (v TEXT)");

        let err = SqliteEngine::execute_script(&config, "SELEC 1").await.unwrap_err();
        assert!(matches!(err, CheckError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn test_error_in_later_statement_fails_whole_script() {
        let (_dir, config) = create_db("CREATE TABLE t (v TEXT)");

        let err = SqliteEngine::execute_script(&config, "SELECT 'OK' AS ServiceStatus; SELECT * FROM missing;")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::QueryFailed(_)));
    }
}
