//! Check Orchestration
//!
//! Runs one check from start to finish:
//! 1. Ping the database (connectivity errors win over everything else)
//! 2. Load the script template and resolve its placeholders
//! 3. Execute the script
//! 4. Interpret the result sets, or build a timing report in timing mode
//! 5. Require the metric and exit-code channels unless told otherwise
//!
//! Any error aborts the run; no partial report is produced.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::{self, ConnectionConfig};
use crate::error::{CheckError, Result};
use crate::interpreter::interpret;
use crate::report::{build_timing_report, Report};
use crate::template;

/// Everything needed to run a check
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub connection: ConnectionConfig,

    /// Path of the script template
    pub script_path: PathBuf,

    /// Raw comma-separated `key:value` override list
    pub arguments: String,

    /// Report only the execution latency
    pub timing: bool,

    /// Fail when the script produced no metric or no exit-code result set
    pub require_channels: bool,
}

/// Run a check and return its report
pub async fn run_check(request: &CheckRequest) -> Result<Report> {
    let info = engine::validate_connection(&request.connection).await?;
    debug!(
        target = %request.connection.display_target(),
        server = %info.server_info,
        database = %info.connected_database,
        "connected"
    );

    let template = load_script(&request.script_path)?;
    let script = template::resolve_with_arguments(&template, &request.arguments)?;

    let output = engine::execute_script(&request.connection, &script).await?;
    debug!(
        result_sets = output.cursor.result_set_count(),
        rows = output.cursor.row_count(),
        elapsed_ms = output.execution_time.as_millis(),
        "script executed"
    );

    if request.timing {
        return Ok(build_timing_report(output.execution_time));
    }

    let mut cursor = output.cursor;
    let report = interpret(&mut cursor)?;

    if request.require_channels {
        require_channels(&report)?;
    }

    Ok(report)
}

/// Read the script template from disk
pub fn load_script(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| CheckError::script_read(format!("{}: {e}", path.display())))
}

/// Fail when the metric or exit-code channel never appeared
///
/// A channel that appeared without rows is accepted.
pub fn require_channels(report: &Report) -> Result<()> {
    if !report.channels.metric {
        return Err(CheckError::missing_channel("No performance data found."));
    }
    if !report.channels.exit_code {
        return Err(CheckError::missing_channel("No exit code found."));
    }
    Ok(())
}
