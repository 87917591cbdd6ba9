//! Report error types
//!
//! Error codes:
//! - GHG_NOT_FOUND (REJECT)
//! - GHG_INVALID_DOCUMENT (FAIL)
//! - planner, executor and cache codes pass through

use thiserror::Error;

use crate::executor::ExecutorError;
use crate::file_cache::CacheError;
use crate::planner::PlannerError;

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Failures while producing a report
#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Requested entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// A stored document could not be parsed
    #[error("Invalid document {name}: {reason}")]
    InvalidDocument { name: String, reason: String },
}

impl ReportError {
    /// Returns the error code
    pub fn code(&self) -> &'static str {
        match self {
            ReportError::Planner(e) => e.code(),
            ReportError::Executor(e) => e.code(),
            ReportError::Cache(_) => "GHG_STORAGE",
            ReportError::NotFound(_) => "GHG_NOT_FOUND",
            ReportError::InvalidDocument { .. } => "GHG_INVALID_DOCUMENT",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ReportError::Planner(e) => e.status_code(),
            ReportError::Executor(e) => e.status_code(),
            ReportError::Cache(e) => e.status_code(),
            ReportError::NotFound(_) => 404,
            ReportError::InvalidDocument { .. } => 502,
        }
    }
}
