//! Result Set Interpretation
//!
//! Folds the result sets of a script into a [`Report`]. Each result set is
//! classified by the case-insensitive name of its first column:
//!
//! | First column    | Channel  | Row shape                    |
//! |-----------------|----------|------------------------------|
//! | `ServiceStatus` | status   | one text value               |
//! | `Metric`        | metric   | exactly two columns          |
//! | `ExitCode`      | exit     | one integer value            |
//! | anything else   | unknown  | interpretation stops         |
//!
//! Channels may arrive in any order, repeat, or be left out.
//!
//! # Failure Handling
//! - A status row that cannot be scanned aborts the run.
//! - A metric result set without exactly two columns aborts the run.
//! - A metric row with a NULL name or value is skipped.
//! - An exit-code row that cannot be scanned is logged and skipped.
//!
//! The asymmetry between the status and exit-code branches is deliberate and
//! kept for compatibility with existing check scripts.

use tracing::{debug, warn};

use crate::cursor::{expect_arity, ResultSetCursor};
use crate::error::{CheckError, Result};
use crate::report::{Metric, Report, Severity};

/// Semantic channel of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Status,
    Metric,
    ExitCode,
    Unknown,
}

impl Channel {
    /// Classify a result set by the name of its first column
    #[must_use]
    pub fn classify(column: &str) -> Self {
        match column.to_lowercase().as_str() {
            "servicestatus" => Self::Status,
            "metric" => Self::Metric,
            "exitcode" => Self::ExitCode,
            _ => Self::Unknown,
        }
    }
}

/// Drain `cursor` into a report
///
/// Stops at the first result set without columns, at the first result set of
/// an unknown channel (leaving it unread), or when the result sets run out.
pub fn interpret<C>(cursor: &mut C) -> Result<Report>
where
    C: ResultSetCursor + ?Sized,
{
    let mut report = Report::new();

    loop {
        let column = match cursor.columns().first() {
            Some(column) => column.clone(),
            None => break,
        };

        match Channel::classify(&column) {
            Channel::Status => read_status(cursor, &mut report)?,
            Channel::Metric => read_metrics(cursor, &mut report)?,
            Channel::ExitCode => read_exit_codes(cursor, &mut report),
            Channel::Unknown => {
                debug!(column = %column, "unrecognized result set, stopping");
                break;
            }
        }

        if !cursor.next_result_set() {
            break;
        }
    }

    debug!(
        status_bytes = report.status_text.len(),
        metrics = report.metrics.len(),
        exit_code = report.exit_code.code(),
        "interpreted script output"
    );

    Ok(report)
}

fn read_status<C>(cursor: &mut C, report: &mut Report) -> Result<()>
where
    C: ResultSetCursor + ?Sized,
{
    report.channels.status = true;

    while cursor.next_row() {
        let values = cursor.scan_row().map_err(|e| CheckError::result_read(e.to_string()))?;
        expect_arity(values, 1).map_err(|e| CheckError::result_read(e.to_string()))?;
        let line = values[0].to_text().map_err(|e| CheckError::result_read(e.to_string()))?;

        report.status_text.push_str(&line);
        report.status_text.push('\n');
    }

    Ok(())
}

fn read_metrics<C>(cursor: &mut C, report: &mut Report) -> Result<()>
where
    C: ResultSetCursor + ?Sized,
{
    let column_count = cursor.columns().len();
    if column_count != 2 {
        return Err(CheckError::schema(format!(
            "metric result set must have exactly 2 columns (name, value), found {column_count}"
        )));
    }

    report.channels.metric = true;

    while cursor.next_row() {
        let values = cursor.scan_row().map_err(|e| CheckError::result_read(e.to_string()))?;
        expect_arity(values, 2).map_err(|e| CheckError::result_read(e.to_string()))?;

        let name = values[0].to_nullable_text().map_err(|e| CheckError::result_read(e.to_string()))?;
        let value = values[1].to_nullable_text().map_err(|e| CheckError::result_read(e.to_string()))?;

        match (name, value) {
            (Some(name), Some(value)) => report.metrics.push(Metric::new(name, value)),
            (name, _) => warn!(metric = ?name, "skipping metric row with NULL name or value"),
        }
    }

    Ok(())
}

fn read_exit_codes<C>(cursor: &mut C, report: &mut Report)
where
    C: ResultSetCursor + ?Sized,
{
    report.channels.exit_code = true;

    while cursor.next_row() {
        let code = cursor.scan_row().and_then(|values| {
            expect_arity(values, 1)?;
            values[0].to_integer()
        });

        match code {
            Ok(code) => report.exit_code = Severity::from_code(code),
            Err(e) => warn!(error = %e, "ignoring unreadable exit code row"),
        }
    }
}
