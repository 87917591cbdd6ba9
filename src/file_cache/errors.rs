//! # File Cache Errors

use thiserror::Error;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// File cache errors
///
/// Messages may carry object keys and local paths; they are meant for logs.
/// The HTTP layer replaces them with generic advisories.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Remote object missing or unreadable
    #[error("Storage unavailable for {object}: {reason}")]
    StorageUnavailable { object: String, reason: String },

    /// Scratch area cannot hold the object
    #[error("Local disk exhausted while caching {object} ({needed} bytes needed)")]
    LocalDiskExhausted { object: String, needed: u64 },

    /// Table or file name outside the allowed alphabet
    #[error("Invalid object name: {0}")]
    InvalidName(String),

    /// Storage backend could not be configured
    #[error("Invalid storage configuration: {0}")]
    Configuration(String),

    /// Local I/O failure other than a full disk
    #[error("I/O error: {0}")]
    Io(String),
}

impl CacheError {
    pub(crate) fn unavailable(object: impl Into<String>, reason: impl ToString) -> Self {
        CacheError::StorageUnavailable {
            object: object.into(),
            reason: reason.to_string(),
        }
    }

    /// Classify a local write failure
    pub(crate) fn from_write(object: &str, needed: u64, err: std::io::Error) -> Self {
        const ENOSPC: i32 = 28;
        if err.raw_os_error() == Some(ENOSPC) || err.kind() == std::io::ErrorKind::StorageFull {
            CacheError::LocalDiskExhausted {
                object: object.to_string(),
                needed,
            }
        } else {
            CacheError::Io(err.to_string())
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            CacheError::StorageUnavailable { .. } => 502,
            CacheError::LocalDiskExhausted { .. } => 500,
            CacheError::InvalidName(_) => 400,
            CacheError::Configuration(_) => 500,
            CacheError::Io(_) => 500,
        }
    }
}
