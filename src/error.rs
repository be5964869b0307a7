//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout dbcheck.
//! Every error is fatal for a check run: it is reported as a single diagnostic
//! line and the process exits with the UNKNOWN severity.
//!
//! # Error Categories
//! - `ConnectionFailed`: Database connection or ping errors
//! - `ScriptRead`: The script file could not be read
//! - `ArgumentFormat`: Malformed `key:value` override tokens
//! - `QueryFailed`: Script execution errors
//! - `ResultRead`: A status row could not be scanned
//! - `Schema`: A metric result set does not have exactly two columns
//! - `MissingChannel`: The script produced no metric or no exit-code result set
//! - `InvalidInput`: Missing or inconsistent connection parameters
//! - `Engine`: Engine-specific database errors
//! - `Config`: Connection registry errors

use thiserror::Error;

use crate::report::Severity;

/// Main error type for dbcheck operations
#[derive(Error, Debug)]
pub enum CheckError {
    /// Database connection failed
    #[error("Cannot connect: {0}")]
    ConnectionFailed(String),

    /// Script file could not be opened or read
    #[error("Cannot open script file: {0}")]
    ScriptRead(String),

    /// Override argument list is malformed
    #[error("Error parsing arguments: {0}")]
    ArgumentFormat(String),

    /// Script execution failed
    #[error("Failed to execute script: {0}")]
    QueryFailed(String),

    /// A status row could not be read
    #[error("Failed to parse results: {0}")]
    ResultRead(String),

    /// Performance data result set has the wrong shape
    #[error("Failed to gather performance data: {0}")]
    Schema(String),

    /// An expected result channel never appeared
    #[error("{0}")]
    MissingChannel(String),

    /// Invalid input or missing required parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Engine-specific database error
    #[error("Engine error ({engine}): {detail}")]
    Engine { engine: String, detail: String },

    /// Configuration error (file not found, invalid JSON, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CheckError {
    /// Convert error to a stable error code string
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::ScriptRead(_) => "SCRIPT_READ",
            Self::ArgumentFormat(_) => "ARGUMENT_FORMAT",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::ResultRead(_) => "RESULT_READ",
            Self::Schema(_) => "SCHEMA",
            Self::MissingChannel(_) => "MISSING_CHANNEL",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Engine { .. } => "ENGINE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Severity reported to the scheduler when this error aborts a check
    ///
    /// Every failure is UNKNOWN: an unclear health state must never read as OK.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        Severity::Unknown
    }

    /// Single-line diagnostic suitable for the plugin output
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string().replace('\n', " ")
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    pub fn script_read(message: impl Into<String>) -> Self {
        Self::ScriptRead(message.into())
    }

    pub fn argument_format(message: impl Into<String>) -> Self {
        Self::ArgumentFormat(message.into())
    }

    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    pub fn result_read(message: impl Into<String>) -> Self {
        Self::ResultRead(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn missing_channel(message: impl Into<String>) -> Self {
        Self::MissingChannel(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn engine_error(engine: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Engine { engine: engine.into(), detail: detail.into() }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type alias for dbcheck operations
pub type Result<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CheckError::connection_failed("x").error_code(), "CONNECTION_FAILED");
        assert_eq!(CheckError::script_read("x").error_code(), "SCRIPT_READ");
        assert_eq!(CheckError::argument_format("x").error_code(), "ARGUMENT_FORMAT");
        assert_eq!(CheckError::query_failed("x").error_code(), "QUERY_FAILED");
        assert_eq!(CheckError::result_read("x").error_code(), "RESULT_READ");
        assert_eq!(CheckError::schema("x").error_code(), "SCHEMA");
        assert_eq!(CheckError::missing_channel("x").error_code(), "MISSING_CHANNEL");
        assert_eq!(CheckError::invalid_input("x").error_code(), "INVALID_INPUT");
        assert_eq!(CheckError::engine_error("mysql", "x").error_code(), "ENGINE_ERROR");
        assert_eq!(CheckError::config_error("x").error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_every_error_is_unknown() {
        let errors = [
            CheckError::connection_failed("x"),
            CheckError::script_read("x"),
            CheckError::argument_format("x"),
            CheckError::query_failed("x"),
            CheckError::result_read("x"),
            CheckError::schema("x"),
            CheckError::missing_channel("x"),
        ];
        for err in errors {
            assert_eq!(err.severity(), Severity::Unknown);
        }
    }

    #[test]
    fn test_error_messages() {
        let err = CheckError::connection_failed("connection refused");
        assert_eq!(err.message(), "Cannot connect: connection refused");

        let err = CheckError::engine_error("postgres", "timeout");
        assert!(err.message().contains("postgres"));
        assert!(err.message().contains("timeout"));
    }

    #[test]
    fn test_message_is_single_line() {
        let err = CheckError::query_failed("near \"SELEC\":\nsyntax error");
        assert!(!err.message().contains('\n'));
    }
}
