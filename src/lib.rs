//! dbcheck - Database Health Check Plugin
//!
//! dbcheck runs a user-supplied SQL script against a database and turns the
//! result sets it returns into a monitoring-plugin report: one line of status
//! text with performance data, plus a process exit code.
//!
//! # Result-Set Protocol
//! Each result set is classified by the name of its first column:
//! - `ServiceStatus`: every row is a line of status text
//! - `Metric`: `(name, value)` rows become performance data
//! - `ExitCode`: integer rows set the exit code (last one wins)
//!
//! Any other first column ends interpretation.
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`report`] - Report, severity and output line rendering
//! - [`template`] - `$(name:default)` placeholder resolution
//! - [`cursor`] - Result-set cursor abstraction and value scanning
//! - [`interpreter`] - Result-set classification
//! - [`engine`] - Database engine trait and implementations
//! - [`config`] - Connection registry and resolution
//! - [`check`] - End-to-end check orchestration
//! - [`logging`] - Stderr logging setup

pub mod check;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod interpreter;
pub mod logging;
pub mod report;
pub mod template;

pub use check::{run_check, CheckRequest};
pub use config::{resolve_connection, ConnectionOverrides, ConnectionRegistry, StoredConnection};
pub use cursor::{BufferedCursor, ResultSet, ResultSetCursor, SqlValue};
pub use engine::{ConnectionConfig, ConnectionInfo, DatabaseEngine, DatabaseType, ScriptOutput};
pub use error::{CheckError, Result};
pub use interpreter::{interpret, Channel};
pub use report::{build_timing_report, Metric, Report, Severity};
pub use template::{resolve, resolve_with_arguments, Override, Placeholder};
