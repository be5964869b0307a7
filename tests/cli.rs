//! Command-Line Contract Tests
//!
//! Runs the `dbcheck` binary the way a monitoring scheduler does and checks
//! the plugin contract:
//! - the plugin output, or a one-line diagnostic, on stdout
//! - the exit code carries the severity
//! - every failure exits UNKNOWN (3)

#![cfg(feature = "sqlite")]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use dbcheck::config::{save_registry, ConnectionRegistry, StoredConnection};
use dbcheck::ConnectionConfig;

// ============================================================================
// Test Helpers
// ============================================================================

const CHECK_SCRIPT: &str = "SELECT 'Queue depth is ' || COUNT(*) AS ServiceStatus FROM jobs;
SELECT 'queue_depth' AS Metric, COUNT(*) AS Value FROM jobs;
SELECT CASE WHEN COUNT(*) >= $(critical:10) THEN 2 WHEN COUNT(*) >= $(warning:2) THEN 1 ELSE 0 END AS ExitCode FROM jobs;
";

fn workspace() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("queue.db");
    let conn = rusqlite::Connection::open(&db).unwrap();
    conn.execute_batch(
        "CREATE TABLE jobs (id INTEGER PRIMARY KEY, name TEXT);
         INSERT INTO jobs (name) VALUES ('a'), ('b'), ('c');",
    )
    .unwrap();
    fs::write(dir.path().join("test.sql"), CHECK_SCRIPT).unwrap();
    (dir, db)
}

fn dbcheck(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dbcheck"))
        .args(args)
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env_remove("RUST_LOG")
        .env_remove("DBCHECK_PASSWORD")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_warning_check() {
    let (dir, db) = workspace();
    let output = dbcheck(dir.path(), &["--engine", "sqlite", "-f", db.to_str().unwrap()]);

    assert_eq!(stdout(&output), "Queue depth is 3\n|queue_depth=3;\n");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_overrides_from_args() {
    let (dir, db) = workspace();
    let output = dbcheck(
        dir.path(),
        &["--engine", "sqlite", "-f", db.to_str().unwrap(), "-a", "warning:5,critical:3"],
    );

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_timing_mode() {
    let (dir, db) = workspace();
    let output = dbcheck(dir.path(), &["--engine", "sqlite", "-f", db.to_str().unwrap(), "-t"]);

    let line = stdout(&output);
    assert!(line.starts_with("Response Time: "));
    assert!(line.contains("|instance_latency_ms="));
    assert_eq!(line.lines().count(), 1);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_malformed_args_exit_unknown() {
    let (dir, db) = workspace();
    let output = dbcheck(dir.path(), &["--engine", "sqlite", "-f", db.to_str().unwrap(), "-a", "warning=5"]);

    assert!(stdout(&output).starts_with("Error parsing arguments"));
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_missing_script_exits_unknown() {
    let (dir, db) = workspace();
    let output = dbcheck(dir.path(), &["--engine", "sqlite", "-f", db.to_str().unwrap(), "-s", "nope.sql"]);

    assert!(stdout(&output).starts_with("Cannot open script file:"));
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_missing_exit_code_channel_unless_allowed() {
    let (dir, db) = workspace();
    fs::write(dir.path().join("partial.sql"), "SELECT 'ok' AS ServiceStatus; SELECT 'n' AS Metric, 1 AS Value;")
        .unwrap();
    let base = ["--engine", "sqlite", "-f", db.to_str().unwrap(), "-s", "partial.sql"];

    let output = dbcheck(dir.path(), &base);
    assert_eq!(stdout(&output), "No exit code found.\n");
    assert_eq!(output.status.code(), Some(3));

    let mut allowed = base.to_vec();
    allowed.push("--allow-missing-channels");
    let output = dbcheck(dir.path(), &allowed);
    assert_eq!(stdout(&output), "ok\n|n=1;\n");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_unknown_flag_exits_unknown() {
    let (dir, _db) = workspace();
    let output = dbcheck(dir.path(), &["--no-such-flag"]);

    assert_eq!(stdout(&output).lines().count(), 1);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_no_connection_exits_unknown() {
    let (dir, _db) = workspace();
    let output = dbcheck(dir.path(), &[]);

    assert_eq!(stdout(&output).lines().count(), 1);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_named_connection_from_local_registry() {
    let (dir, db) = workspace();
    let mut registry = ConnectionRegistry::default();
    registry
        .connections
        .insert("queue".to_string(), StoredConnection { config: ConnectionConfig::sqlite(db), password_env: None });
    registry.default = Some("queue".to_string());
    save_registry(&dir.path().join(".dbcheck").join("connections.json"), &registry).unwrap();

    let named = dbcheck(dir.path(), &["-c", "queue"]);
    assert_eq!(stdout(&named), "Queue depth is 3\n|queue_depth=3;\n");
    assert_eq!(named.status.code(), Some(1));

    let default = dbcheck(dir.path(), &[]);
    assert_eq!(stdout(&default), stdout(&named));
}
