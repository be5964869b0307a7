//! `PostgreSQL` Database Engine Implementation
//!
//! This module implements the `DatabaseEngine` trait for `PostgreSQL` databases.
//!
//! # Implementation Notes
//! - Uses `tokio-postgres` (async driver, requires tokio runtime)
//! - Scripts run through the simple-query protocol, which accepts several
//!   statements separated by semicolons
//! - A row description starts a new result set, so empty result sets keep
//!   their column names
//! - All values arrive as text or NULL

use std::time::Instant;
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage};

use crate::cursor::{BufferedCursor, ResultSet, SqlValue};
use crate::engine::{ConnectionConfig, ConnectionInfo, DatabaseEngine, DatabaseType, ScriptOutput};
use crate::error::{CheckError, Result};

/// `PostgreSQL` database engine implementation
pub struct PostgresEngine;

impl DatabaseEngine for PostgresEngine {
    async fn validate_connection(config: &ConnectionConfig) -> Result<ConnectionInfo> {
        let client = connect(config).await?;

        let row = client
            .query_one("SELECT version(), current_database(), current_user::text", &[])
            .await
            .map_err(|e| CheckError::connection_failed(format!("Failed to query PostgreSQL server info: {e}")))?;

        let server_info: String = row.get(0);
        let connected_database: String = row.get(1);
        let user: String = row.get(2);

        // "PostgreSQL 15.3 on x86_64..." -> "15.3"
        let database_version = server_info.split_whitespace().nth(1).unwrap_or("unknown").to_string();

        Ok(ConnectionInfo { database_version, server_info, connected_database, user })
    }

    async fn execute_script(config: &ConnectionConfig, script: &str) -> Result<ScriptOutput> {
        let client = connect(config).await?;

        let start = Instant::now();
        let messages = client.simple_query(script).await.map_err(|e| CheckError::query_failed(e.to_string()))?;
        let execution_time = start.elapsed();

        let sets = collect_result_sets(messages);
        tracing::debug!(result_sets = sets.len(), elapsed_ms = execution_time.as_millis(), "postgres script finished");

        Ok(ScriptOutput { cursor: BufferedCursor::new(sets), execution_time })
    }
}

/// Connect and spawn the connection driver task
async fn connect(config: &ConnectionConfig) -> Result<Client> {
    let pg_config = build_pg_config(config)?;

    let (client, connection) = pg_config
        .connect(NoTls)
        .await
        .map_err(|e| CheckError::connection_failed(format!("Failed to connect to PostgreSQL: {e}")))?;

    // Connection errors surface through the client; they are not logged to avoid leaking credentials
    tokio::spawn(async move {
        let _ = connection.await;
    });

    Ok(client)
}

/// Build `PostgreSQL` connection config from `ConnectionConfig`
fn build_pg_config(config: &ConnectionConfig) -> Result<Config> {
    if config.engine != DatabaseType::Postgres {
        return Err(CheckError::invalid_input(format!("Expected PostgreSQL engine, got {}", config.engine)));
    }

    let host = config
        .host
        .as_ref()
        .ok_or_else(|| CheckError::invalid_input("PostgreSQL requires 'host' parameter"))?;

    let port = config
        .port
        .ok_or_else(|| CheckError::invalid_input("PostgreSQL requires 'port' parameter"))?;

    let user = config
        .user
        .as_ref()
        .ok_or_else(|| CheckError::invalid_input("PostgreSQL requires 'user' parameter"))?;

    let database = config
        .database
        .as_ref()
        .ok_or_else(|| CheckError::invalid_input("PostgreSQL requires 'database' parameter"))?;

    let mut pg_config = Config::new();
    pg_config.host(host).port(port).user(user).dbname(database).application_name("dbcheck");

    if let Some(password) = &config.password {
        pg_config.password(password);
    }

    Ok(pg_config)
}

/// Group simple-query messages into result sets
fn collect_result_sets(messages: Vec<SimpleQueryMessage>) -> Vec<ResultSet> {
    let mut sets = Vec::new();
    let mut current: Option<ResultSet> = None;

    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                sets.extend(current.take());
                current = Some(ResultSet::new(columns.iter().map(|c| c.name().to_string()).collect()));
            }
            SimpleQueryMessage::Row(row) => {
                let set = current.get_or_insert_with(|| {
                    ResultSet::new(row.columns().iter().map(|c| c.name().to_string()).collect())
                });
                let values = (0..row.len())
                    .map(|idx| row.get(idx).map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string())))
                    .collect();
                set.push_row(values);
            }
            SimpleQueryMessage::CommandComplete(_) => {
                sets.extend(current.take());
            }
            _ => {}
        }
    }

    sets.extend(current);
    sets
}
