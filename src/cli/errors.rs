//! CLI-specific error types
//!
//! All CLI errors are fatal: the message is printed and the process exits
//! non-zero.

use std::fmt;
use std::io;

use crate::file_cache::CacheError;
use crate::http_server::ConfigError;
use crate::observability::ObservabilityError;
use crate::planner::PlannerError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file or environment error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Server or storage failed to start
    BootFailed,
    /// One-shot request answered with an error status
    QueryFailed,
    /// Endpoint or body rejected by the planner
    InvalidRequest,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "GHG_CLI_CONFIG_ERROR",
            Self::IoError => "GHG_CLI_IO_ERROR",
            Self::BootFailed => "GHG_CLI_BOOT_FAILED",
            Self::QueryFailed => "GHG_CLI_QUERY_FAILED",
            Self::InvalidRequest => "GHG_CLI_INVALID_REQUEST",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Boot failed
    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, msg)
    }

    /// Request answered with a failure status
    pub fn query_failed(status: u16) -> Self {
        Self::new(CliErrorCode::QueryFailed, format!("request failed with status {}", status))
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<ObservabilityError> for CliError {
    fn from(e: ObservabilityError) -> Self {
        Self::boot_failed(e.to_string())
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        Self::boot_failed(e.to_string())
    }
}

impl From<PlannerError> for CliError {
    fn from(e: PlannerError) -> Self {
        Self::new(CliErrorCode::InvalidRequest, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
