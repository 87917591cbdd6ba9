//! Executor error types
//!
//! Error codes:
//! - GHG_STORAGE (table could not be materialised)
//! - GHG_TABLE_READ (local file not decodable)
//! - GHG_UNKNOWN_COLUMN (descriptor references a missing column)
//! - GHG_EXECUTION_FAILED

use thiserror::Error;

use crate::file_cache::CacheError;
use crate::planner::TableName;

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Query execution errors
#[derive(Debug, Clone, Error)]
pub enum ExecutorError {
    /// Fetching a table into the cache failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Local Parquet file could not be decoded
    #[error("Failed to read table {table}: {reason}")]
    TableRead { table: String, reason: String },

    /// Column missing from the table or select list
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Any other execution failure
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl ExecutorError {
    pub(crate) fn table_read(table: TableName, reason: impl ToString) -> Self {
        ExecutorError::TableRead {
            table: table.as_str().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::Cache(_) => "GHG_STORAGE",
            ExecutorError::TableRead { .. } => "GHG_TABLE_READ",
            ExecutorError::UnknownColumn(_) => "GHG_UNKNOWN_COLUMN",
            ExecutorError::ExecutionFailed(_) => "GHG_EXECUTION_FAILED",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ExecutorError::Cache(e) => e.status_code(),
            // A table that cannot be decoded is a bad object in storage
            ExecutorError::TableRead { .. } => 502,
            ExecutorError::UnknownColumn(_) => 500,
            ExecutorError::ExecutionFailed(_) => 500,
        }
    }
}
