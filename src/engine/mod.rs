//! Database Engine Traits and Core Types
//!
//! This module defines the execution side of a check: connecting to a
//! database and running a script that may return several result sets.
//! Each engine (`PostgreSQL`, `MySQL`, `SQLite`) implements the `DatabaseEngine` trait.
//!
//! # Stateless Design
//! All trait methods are stateless and take `&ConnectionConfig` as input.
//! Connections are opened, used, and closed within each method call, so every
//! exit path releases them.
//!
//! # Buffering
//! `execute_script` fetches every result set before returning. The interpreter
//! then walks the buffered sets through the `ResultSetCursor` trait.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cursor::BufferedCursor;
use crate::error::{CheckError, Result};

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

/// Host used when a server engine is configured without one
pub const DEFAULT_HOST: &str = "localhost";

/// Supported database engine types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL` database
    Postgres,
    /// `MySQL` database (includes `MariaDB`)
    MySQL,
    /// `SQLite` database
    SQLite,
}

impl DatabaseType {
    /// Get the engine name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySQL => "mysql",
            Self::SQLite => "sqlite",
        }
    }

    /// Well-known port for server engines
    #[must_use]
    pub const fn default_port(&self) -> Option<u16> {
        match self {
            Self::Postgres => Some(5432),
            Self::MySQL => Some(3306),
            Self::SQLite => None,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DatabaseType {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySQL),
            "sqlite" | "sqlite3" => Ok(Self::SQLite),
            other => Err(CheckError::invalid_input(format!(
                "Invalid engine '{other}'. Must be postgres, mysql, or sqlite"
            ))),
        }
    }
}

/// Connection configuration for database engines
///
/// Fields are engine-specific (e.g., `file` only applies to `SQLite`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database engine type
    pub engine: DatabaseType,

    /// Hostname (for postgres/mysql)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Port number (for postgres/mysql)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Username (for postgres/mysql)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Password (for postgres/mysql); `None` relies on passwordless server auth
    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Database name (for postgres/mysql)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Database file path (for sqlite)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl ConnectionConfig {
    /// Create an empty config for `engine`; fields are filled in by the caller
    #[must_use]
    pub const fn new(engine: DatabaseType) -> Self {
        Self { engine, host: None, port: None, user: None, password: None, database: None, file: None }
    }

    /// Create a new `PostgreSQL` connection config
    #[must_use]
    pub fn postgres(host: String, port: u16, user: String, password: Option<String>, database: String) -> Self {
        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password,
            database: Some(database),
            ..Self::new(DatabaseType::Postgres)
        }
    }

    /// Create a new `MySQL` connection config
    #[must_use]
    pub fn mysql(host: String, port: u16, user: String, password: Option<String>, database: String) -> Self {
        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password,
            database: Some(database),
            ..Self::new(DatabaseType::MySQL)
        }
    }

    /// Create a new `SQLite` connection config
    #[must_use]
    pub fn sqlite(file: PathBuf) -> Self {
        Self { file: Some(file), ..Self::new(DatabaseType::SQLite) }
    }

    /// Fill in the default host and port for server engines
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        if self.engine != DatabaseType::SQLite {
            if self.host.is_none() {
                self.host = Some(DEFAULT_HOST.to_string());
            }
            if self.port.is_none() {
                self.port = self.engine.default_port();
            }
        }
        self
    }

    /// Human-readable target without credentials, safe for logs
    #[must_use]
    pub fn display_target(&self) -> String {
        match self.engine {
            DatabaseType::SQLite => format!(
                "sqlite:{}",
                self.file.as_ref().map_or_else(|| "<none>".to_string(), |f| f.display().to_string())
            ),
            DatabaseType::Postgres | DatabaseType::MySQL => format!(
                "{}://{}@{}:{}/{}",
                self.engine,
                self.user.as_deref().unwrap_or("<none>"),
                self.host.as_deref().unwrap_or("<none>"),
                self.port.map_or_else(|| "<none>".to_string(), |p| p.to_string()),
                self.database.as_deref().unwrap_or("<none>"),
            ),
        }
    }
}

/// Connection information returned after a successful ping
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Database server version string
    pub database_version: String,

    /// Server information (implementation-specific)
    pub server_info: String,

    /// Name of the connected database
    pub connected_database: String,

    /// Connected user name
    pub user: String,
}

/// Everything a script execution produced
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    /// Result sets in the order the database returned them
    pub cursor: BufferedCursor,

    /// Wall-clock time spent executing the script and fetching its rows
    pub execution_time: Duration,
}

/// Database engine trait
///
/// All database engines implement this trait.
/// Each method is stateless and takes a connection config as input.
pub trait DatabaseEngine {
    /// Open a connection, query basic server information, and close it
    ///
    /// Used as the connectivity check before the script is loaded.
    fn validate_connection(
        config: &ConnectionConfig,
    ) -> impl std::future::Future<Output = Result<ConnectionInfo>> + Send;

    /// Execute a (possibly multi-statement) script and buffer every result set
    ///
    /// Statements that return no columns are executed but contribute no
    /// result set.
    fn execute_script(
        config: &ConnectionConfig,
        script: &str,
    ) -> impl std::future::Future<Output = Result<ScriptOutput>> + Send;
}

/// Validate a connection with the engine named in `config`
pub async fn validate_connection(config: &ConnectionConfig) -> Result<ConnectionInfo> {
    match config.engine {
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => sqlite::SqliteEngine::validate_connection(config).await,
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => postgres::PostgresEngine::validate_connection(config).await,
        #[cfg(feature = "mysql")]
        DatabaseType::MySQL => mysql::MySqlEngine::validate_connection(config).await,
        #[allow(unreachable_patterns)]
        other => Err(engine_not_enabled(other)),
    }
}

/// Execute a script with the engine named in `config`
pub async fn execute_script(config: &ConnectionConfig, script: &str) -> Result<ScriptOutput> {
    match config.engine {
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => sqlite::SqliteEngine::execute_script(config, script).await,
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => postgres::PostgresEngine::execute_script(config, script).await,
        #[cfg(feature = "mysql")]
        DatabaseType::MySQL => mysql::MySqlEngine::execute_script(config, script).await,
        #[allow(unreachable_patterns)]
        other => Err(engine_not_enabled(other)),
    }
}

#[allow(dead_code)]
fn engine_not_enabled(engine: DatabaseType) -> CheckError {
    CheckError::invalid_input(format!("{engine} engine not enabled. Build with --features {engine}"))
}
