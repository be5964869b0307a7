//! Plugin Report Types
//!
//! This module defines the value a check run produces and how it is rendered
//! for the monitoring scheduler.
//!
//! # Output Contract
//! - One line on stdout: `<status text>[|<name>=<value>;<name>=<value>;...]`
//! - Process exit status: the numeric severity (0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN)
//!
//! UNKNOWN doubles as "the script never reported a severity" and "the check
//! failed"; the scheduler cannot tell the two apart.

use std::fmt;
use std::time::Duration;

/// Status text used when no `ServiceStatus` rows were produced
pub const MISSING_STATUS_MESSAGE: &str =
    "No ServiceStatus column found. The script must return a result set whose first column is named ServiceStatus.";

/// Metric name used by timing mode
pub const LATENCY_METRIC: &str = "instance_latency_ms";

/// Plugin severity, communicated through the process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    Ok,
    Warning,
    Critical,
    #[default]
    Unknown,
    /// A value outside 0..=3 read from the database, passed through unchanged
    Other(i32),
}

impl Severity {
    /// Map a raw exit code to a severity
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::Warning,
            2 => Self::Critical,
            3 => Self::Unknown,
            other => Self::Other(other),
        }
    }

    /// Numeric exit status for the scheduler
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
            Self::Other(code) => *code,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Warning => write!(f, "WARNING"),
            Self::Critical => write!(f, "CRITICAL"),
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Other(code) => write!(f, "EXIT({code})"),
        }
    }
}

/// One performance data pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub name: String,
    pub value: String,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Which result channels a script actually produced
///
/// A channel that appeared with zero rows still counts as seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Channels {
    pub status: bool,
    pub metric: bool,
    pub exit_code: bool,
}

/// Accumulated output of a check run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Report {
    /// Status rows, each followed by a newline, in arrival order
    pub status_text: String,

    /// Performance data in insertion order; duplicate names are kept
    pub metrics: Vec<Metric>,

    /// Last severity observed, UNKNOWN if none was reported
    pub exit_code: Severity,

    pub channels: Channels,
}

impl Report {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status text, or the fixed fallback message when no status rows arrived
    #[must_use]
    pub fn status_or_fallback(&self) -> &str {
        if self.status_text.is_empty() {
            MISSING_STATUS_MESSAGE
        } else {
            &self.status_text
        }
    }

    /// Render the single plugin output line
    #[must_use]
    pub fn render_line(&self) -> String {
        let mut line = self.status_or_fallback().to_string();

        if !self.metrics.is_empty() {
            line.push('|');
            for metric in &self.metrics {
                line.push_str(&metric.name);
                line.push('=');
                line.push_str(&metric.value);
                line.push(';');
            }
        }

        line
    }
}

/// Build the synthetic report for timing-only mode
///
/// Result set content is ignored; the check is OK and carries only the latency.
#[must_use]
pub fn build_timing_report(duration: Duration) -> Report {
    let millis = duration.as_millis();

    Report {
        status_text: format!("Response Time: {millis}ms"),
        metrics: vec![Metric::new(LATENCY_METRIC, millis.to_string())],
        exit_code: Severity::Ok,
        channels: Channels::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_codes() {
        assert_eq!(Severity::Ok.code(), 0);
        assert_eq!(Severity::Warning.code(), 1);
        assert_eq!(Severity::Critical.code(), 2);
        assert_eq!(Severity::Unknown.code(), 3);
        assert_eq!(Severity::from_code(2), Severity::Critical);
    }

    #[test]
    fn test_severity_passes_through_unknown_values() {
        let severity = Severity::from_code(42);
        assert_eq!(severity, Severity::Other(42));
        assert_eq!(severity.code(), 42);
        assert_eq!(Severity::from_code(-1).code(), -1);
    }

    #[test]
    fn test_default_report_is_unknown() {
        let report = Report::new();
        assert_eq!(report.exit_code, Severity::Unknown);
        assert!(report.status_text.is_empty());
        assert!(report.metrics.is_empty());
    }

    #[test]
    fn test_render_line_with_metrics() {
        let report = Report {
            status_text: "OK\n".to_string(),
            metrics: vec![Metric::new("conn_count", "42"), Metric::new("locks", "3")],
            exit_code: Severity::Ok,
            channels: Channels::default(),
        };
        assert_eq!(report.render_line(), "OK\n|conn_count=42;locks=3;");
    }

    #[test]
    fn test_render_line_without_metrics_has_no_separator() {
        let report = Report { status_text: "all good\n".to_string(), ..Report::default() };
        assert_eq!(report.render_line(), "all good\n");
    }

    #[test]
    fn test_render_line_uses_fallback_when_status_empty() {
        let report = Report { metrics: vec![Metric::new("a", "1")], ..Report::default() };
        let line = report.render_line();
        assert!(line.starts_with(MISSING_STATUS_MESSAGE));
        assert!(line.contains("ServiceStatus"));
        assert!(line.ends_with("|a=1;"));
    }

    #[test]
    fn test_timing_report() {
        let report = build_timing_report(Duration::from_millis(37));
        assert_eq!(report.exit_code, Severity::Ok);
        assert_eq!(report.metrics, vec![Metric::new("instance_latency_ms", "37")]);
        assert_eq!(report.render_line(), "Response Time: 37ms|instance_latency_ms=37;");
    }
}
