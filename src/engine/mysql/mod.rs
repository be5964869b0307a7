//! MySQL Database Engine Implementation
//!
//! This module implements the `DatabaseEngine` trait for MySQL databases (including MariaDB).
//!
//! # Implementation Notes
//! - Uses `mysql_async` (async driver, requires tokio runtime)
//! - Scripts run through the text protocol with multi-statement support;
//!   every result set that carries columns becomes one `ResultSet`
//! - Date and time values are rendered as ISO 8601 text
//! - Unsigned integers beyond `i64` are kept as text

use mysql_async::{prelude::*, Conn, OptsBuilder, Row, Value};
use std::time::Instant;

use crate::cursor::{BufferedCursor, ResultSet, SqlValue};
use crate::engine::{ConnectionConfig, ConnectionInfo, DatabaseEngine, DatabaseType, ScriptOutput};
use crate::error::{CheckError, Result};

/// MySQL database engine implementation
pub struct MySqlEngine;

impl DatabaseEngine for MySqlEngine {
    async fn validate_connection(config: &ConnectionConfig) -> Result<ConnectionInfo> {
        let opts = build_mysql_opts(config)?;

        let mut conn = Conn::new(opts)
            .await
            .map_err(|e| CheckError::connection_failed(format!("Failed to connect to MySQL: {e}")))?;

        let row: Option<(String, Option<String>, String)> = conn
            .query_first("SELECT VERSION(), DATABASE(), CURRENT_USER()")
            .await
            .map_err(|e| CheckError::connection_failed(format!("Failed to query MySQL server info: {e}")))?;

        let (version_string, database, user) =
            row.ok_or_else(|| CheckError::connection_failed("No server info returned"))?;

        let (database_version, server_info) = parse_mysql_version(&version_string);

        conn.disconnect()
            .await
            .map_err(|e| CheckError::connection_failed(format!("Failed to disconnect: {e}")))?;

        Ok(ConnectionInfo {
            database_version,
            server_info,
            connected_database: database.unwrap_or_default(),
            user,
        })
    }

    async fn execute_script(config: &ConnectionConfig, script: &str) -> Result<ScriptOutput> {
        let opts = build_mysql_opts(config)?;

        let mut conn = Conn::new(opts)
            .await
            .map_err(|e| CheckError::connection_failed(format!("Failed to connect to MySQL: {e}")))?;

        let start = Instant::now();
        let sets = run_script(&mut conn, script).await?;
        let execution_time = start.elapsed();

        conn.disconnect()
            .await
            .map_err(|e| CheckError::engine_error("mysql", format!("Failed to disconnect: {e}")))?;

        tracing::debug!(result_sets = sets.len(), elapsed_ms = execution_time.as_millis(), "mysql script finished");

        Ok(ScriptOutput { cursor: BufferedCursor::new(sets), execution_time })
    }
}

/// Build MySQL connection options from ConnectionConfig
fn build_mysql_opts(config: &ConnectionConfig) -> Result<OptsBuilder> {
    if config.engine != DatabaseType::MySQL {
        return Err(CheckError::invalid_input(format!("Expected MySQL engine, got {}", config.engine)));
    }

    let host = config
        .host
        .as_ref()
        .ok_or_else(|| CheckError::invalid_input("MySQL requires 'host' parameter"))?;

    let port = config
        .port
        .ok_or_else(|| CheckError::invalid_input("MySQL requires 'port' parameter"))?;

    let user = config
        .user
        .as_ref()
        .ok_or_else(|| CheckError::invalid_input("MySQL requires 'user' parameter"))?;

    let opts = OptsBuilder::default()
        .ip_or_hostname(host)
        .tcp_port(port)
        .user(Some(user))
        .pass(config.password.as_ref())
        .db_name(config.database.as_ref());

    Ok(opts)
}

/// Parse MySQL version string to detect MySQL vs MariaDB
fn parse_mysql_version(version_string: &str) -> (String, String) {
    // "8.0.35" or "10.11.2-MariaDB"
    if version_string.to_uppercase().contains("MARIADB") {
        let version = version_string.split('-').next().unwrap_or("unknown").to_string();
        (version.clone(), format!("MariaDB {version}"))
    } else {
        let version = version_string.split_whitespace().next().unwrap_or(version_string).to_string();
        (version.clone(), format!("MySQL {version}"))
    }
}

/// Run the script and collect every result set that has columns
async fn run_script(conn: &mut Conn, script: &str) -> Result<Vec<ResultSet>> {
    let mut result = conn.query_iter(script).await.map_err(|e| CheckError::query_failed(e.to_string()))?;
    let mut sets = Vec::new();

    while !result.is_empty() {
        let columns: Vec<String> = result
            .columns()
            .map(|cols| cols.iter().map(|c| c.name_str().to_string()).collect())
            .unwrap_or_default();

        let rows: Vec<Row> = result.collect().await.map_err(|e| CheckError::query_failed(e.to_string()))?;

        if columns.is_empty() {
            continue;
        }

        let mut set = ResultSet::new(columns);
        for row in &rows {
            set.push_row(row_values(row)?);
        }
        sets.push(set);
    }

    Ok(sets)
}

fn row_values(row: &Row) -> Result<Vec<SqlValue>> {
    (0..row.len()).map(|idx| mysql_value(row, idx)).collect()
}

/// Convert MySQL value to an owned value
fn mysql_value(row: &Row, idx: usize) -> Result<SqlValue> {
    let value = row
        .as_ref(idx)
        .ok_or_else(|| CheckError::query_failed(format!("Failed to get value at index {idx}")))?;

    Ok(match value {
        Value::NULL => SqlValue::Null,
        Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => SqlValue::Text(text.to_string()),
            Err(_) => SqlValue::Blob(bytes.clone()),
        },
        Value::Int(i) => SqlValue::Integer(*i),
        Value::UInt(u) => i64::try_from(*u).map_or_else(|_| SqlValue::Text(u.to_string()), SqlValue::Integer),
        Value::Float(f) => SqlValue::Real(f64::from(*f)),
        Value::Double(d) => SqlValue::Real(*d),
        Value::Date(year, month, day, hour, minute, second, micro) => SqlValue::Text(format!(
            "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{micro:06}"
        )),
        Value::Time(is_negative, days, hours, minutes, seconds, micros) => {
            let sign = if *is_negative { "-" } else { "" };
            let total_hours = days * 24 + u32::from(*hours);
            SqlValue::Text(format!("{sign}{total_hours}:{minutes:02}:{seconds:02}.{micros:06}"))
        }
    })
}
