//! Planner error types
//!
//! Error codes:
//! - GHG_BAD_REQUEST (REJECT)
//! - GHG_INVALID_FILTER_COMBINATION (REJECT)
//! - GHG_UNKNOWN_ENDPOINT (REJECT)

use thiserror::Error;

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Request validation and query construction failures.
///
/// Messages are safe to return to clients.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlannerError {
    /// Malformed or out-of-range request parameter
    #[error("{0}")]
    BadRequest(String),

    /// Filters that cannot coexist in one rollup
    #[error("{0}")]
    InvalidFilterCombination(String),

    /// Endpoint name not known to the builder
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),
}

impl PlannerError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        PlannerError::BadRequest(reason.into())
    }

    /// Returns the error code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerError::BadRequest(_) => "GHG_BAD_REQUEST",
            PlannerError::InvalidFilterCombination(_) => "GHG_INVALID_FILTER_COMBINATION",
            PlannerError::UnknownEndpoint(_) => "GHG_UNKNOWN_ENDPOINT",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        400
    }
}
