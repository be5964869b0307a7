//! Configuration Management
//!
//! This module resolves which database a check runs against.
//!
//! # Configuration Locations
//! - Local: `.dbcheck/connections.json` (relative to the working directory)
//! - Global: `~/.config/dbcheck/connections.json` (per-user)
//!
//! # Resolution Precedence
//! 1. Explicit connection parameters from the command line (highest priority)
//! 2. Named connection (`--connection`), or the registry's default connection
//! 3. Built-in defaults (host `localhost`, the engine's well-known port)
//!
//! Local entries replace global entries with the same name, and a local
//! `default` pointer replaces the global one.
//!
//! # File Format
//! ```json
//! {
//!   "connections": {
//!     "primary": { "engine": "postgres", "host": "db1", "user": "nagios",
//!                  "database": "app", "password_env": "DB1_PASSWORD" }
//!   },
//!   "default": "primary"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::{ConnectionConfig, DatabaseType};
use crate::error::{CheckError, Result};

/// Directory name used for both local and global configuration
pub const CONFIG_DIR_NAME: &str = "dbcheck";

/// File name of a connection registry
pub const CONFIG_FILE_NAME: &str = "connections.json";

/// Named connections and an optional default pointer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionRegistry {
    #[serde(default)]
    pub connections: HashMap<String, StoredConnection>,

    /// Name of the default connection (must exist in connections map)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Stored connection configuration
///
/// Similar to `ConnectionConfig` but supports an environment variable
/// reference for the password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConnection {
    #[serde(flatten)]
    pub config: ConnectionConfig,

    /// Environment variable holding the password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl StoredConnection {
    /// Resolve environment variables and return a `ConnectionConfig`
    pub fn resolve(&self) -> Result<ConnectionConfig> {
        let mut config = self.config.clone();

        if let Some(env_var) = &self.password_env {
            let password = std::env::var(env_var).map_err(|_| {
                CheckError::config_error(format!("Environment variable {env_var} not found for password"))
            })?;
            config.password = Some(password);
        }

        Ok(config)
    }
}

/// Get path to local config file (`.dbcheck/connections.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()
        .map_err(|e| CheckError::config_error(format!("Could not determine current directory: {e}")))?;

    Ok(current_dir.join(format!(".{CONFIG_DIR_NAME}")).join(CONFIG_FILE_NAME))
}

/// Get path to global config file (`~/.config/dbcheck/connections.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir =
        dirs::config_dir().ok_or_else(|| CheckError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load a connection registry; a missing file is an empty registry
pub fn load_registry(path: &Path) -> Result<ConnectionRegistry> {
    if !path.exists() {
        return Ok(ConnectionRegistry::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| CheckError::config_error(format!("Could not read config file {}: {e}", path.display())))?;

    serde_json::from_str(&contents)
        .map_err(|e| CheckError::config_error(format!("Invalid config file format in {}: {e}", path.display())))
}

/// Save a connection registry, creating the parent directory if needed
pub fn save_registry(path: &Path, registry: &ConnectionRegistry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CheckError::config_error(format!("Could not create config directory: {e}")))?;
    }

    let contents = serde_json::to_string_pretty(registry)
        .map_err(|e| CheckError::config_error(format!("Could not serialize config: {e}")))?;

    fs::write(path, contents).map_err(|e| CheckError::config_error(format!("Could not write config file: {e}")))
}

/// Merge a local registry over a global one
#[must_use]
pub fn merge_registries(global: ConnectionRegistry, local: ConnectionRegistry) -> ConnectionRegistry {
    let mut merged = global;
    merged.connections.extend(local.connections);
    if local.default.is_some() {
        merged.default = local.default;
    }
    merged
}

/// Load the local and global registries and merge them
pub fn load_with_precedence() -> Result<ConnectionRegistry> {
    let global = load_registry(&global_config_path()?)?;
    let local = load_registry(&local_config_path()?)?;
    Ok(merge_registries(global, local))
}

impl ConnectionRegistry {
    /// Look up a connection by name, or the default connection when `name` is `None`
    pub fn resolve(&self, name: Option<&str>) -> Result<ConnectionConfig> {
        let conn_name = match name {
            Some(n) => n,
            None => self.default.as_deref().ok_or_else(|| {
                CheckError::config_error(format!(
                    "No default connection set. Available connections: {:?}",
                    self.connection_names()
                ))
            })?,
        };

        let stored = self.connections.get(conn_name).ok_or_else(|| {
            CheckError::config_error(format!(
                "Connection '{conn_name}' not found. Available connections: {:?}",
                self.connection_names()
            ))
        })?;

        stored.resolve()
    }

    /// Connection names in sorted order
    #[must_use]
    pub fn connection_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.connections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Connection parameters given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub engine: Option<DatabaseType>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub file: Option<PathBuf>,
}

impl ConnectionOverrides {
    /// Apply every explicitly given parameter on top of `config`
    #[must_use]
    pub fn apply(&self, mut config: ConnectionConfig) -> ConnectionConfig {
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if let Some(host) = &self.host {
            config.host = Some(host.clone());
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(user) = &self.user {
            config.user = Some(user.clone());
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(database) = &self.database {
            config.database = Some(database.clone());
        }
        if let Some(file) = &self.file {
            config.file = Some(file.clone());
        }
        config
    }
}

/// Resolve the connection for a check against an already loaded registry
///
/// Three scenarios:
/// 1. Named connection: the stored connection, with explicit parameters on top
/// 2. Explicit engine: built from the explicit parameters only
/// 3. Neither: the registry's default connection, with explicit parameters on top
pub fn resolve_from_registry(
    registry: &ConnectionRegistry,
    name: Option<&str>,
    overrides: &ConnectionOverrides,
) -> Result<ConnectionConfig> {
    let base = match (name, overrides.engine) {
        (Some(name), _) => registry.resolve(Some(name))?,
        (None, Some(engine)) => ConnectionConfig::new(engine),
        (None, None) => registry.resolve(None).map_err(|e| {
            CheckError::invalid_input(format!(
                "No connection or engine specified, and no default connection could be used ({e}). \
                 Pass --engine or --connection."
            ))
        })?,
    };

    Ok(overrides.apply(base).with_defaults())
}

/// Resolve the connection for a check using the on-disk registries
pub fn resolve_connection(name: Option<&str>, overrides: &ConnectionOverrides) -> Result<ConnectionConfig> {
    // Fully explicit connections never touch the config files
    if name.is_none() && overrides.engine.is_some() {
        return resolve_from_registry(&ConnectionRegistry::default(), None, overrides);
    }

    let registry = load_with_precedence()?;
    resolve_from_registry(&registry, name, overrides)
}
