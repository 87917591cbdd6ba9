//! # API Errors
//!
//! Every failure leaves the service as the standard envelope with a `null`
//! result. Validation messages are returned as-is; storage and internal
//! failures are logged in full and answered with a generic advisory.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::executor::ExecutorError;
use crate::file_cache::CacheError;
use crate::planner::PlannerError;
use crate::shaper::{Envelope, ReportError};

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// API errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Malformed or out-of-range input
    #[error("{0}")]
    BadRequest(String),

    /// Filters that cannot share one rollup
    #[error("{0}")]
    InvalidFilterCombination(String),

    /// No handler for method and path
    #[error("Route not found: {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// Requested entity does not exist
    #[error("{0}")]
    NotFound(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Remote object missing or unreadable
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Storage not configured for this operation
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Scratch area full
    #[error("Local disk exhausted: {0}")]
    LocalDiskExhausted(String),

    /// Wall-clock ceiling reached
    #[error("Request exceeded {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidFilterCombination(_) => StatusCode::BAD_REQUEST,
            ApiError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::StorageUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::LocalDiskExhausted(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "GHG_BAD_REQUEST",
            ApiError::InvalidFilterCombination(_) => "GHG_INVALID_FILTER_COMBINATION",
            ApiError::RouteNotFound { .. } => "GHG_ROUTE_NOT_FOUND",
            ApiError::NotFound(_) => "GHG_NOT_FOUND",
            ApiError::StorageUnavailable(_) => "GHG_STORAGE_UNAVAILABLE",
            ApiError::ServiceUnavailable(_) => "GHG_SERVICE_UNAVAILABLE",
            ApiError::LocalDiskExhausted(_) => "GHG_LOCAL_DISK_EXHAUSTED",
            ApiError::Timeout(_) => "GHG_TIMEOUT",
            ApiError::Internal(_) => "GHG_INTERNAL",
        }
    }

    /// Message safe to send to clients
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(_)
            | ApiError::InvalidFilterCombination(_)
            | ApiError::RouteNotFound { .. }
            | ApiError::NotFound(_) => self.to_string(),
            ApiError::StorageUnavailable(_) => {
                "Data storage is temporarily unavailable".to_string()
            }
            ApiError::ServiceUnavailable(_) => "Service is temporarily unavailable".to_string(),
            ApiError::LocalDiskExhausted(_) => {
                "Insufficient local capacity to complete the request".to_string()
            }
            ApiError::Timeout(_) => "Request timed out; retry later".to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<PlannerError> for ApiError {
    fn from(err: PlannerError) -> Self {
        match err {
            PlannerError::InvalidFilterCombination(msg) => ApiError::InvalidFilterCombination(msg),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::StorageUnavailable { .. } => ApiError::StorageUnavailable(err.to_string()),
            CacheError::LocalDiskExhausted { .. } => ApiError::LocalDiskExhausted(err.to_string()),
            CacheError::InvalidName(name) => {
                ApiError::BadRequest(format!("Invalid filename: {}", name))
            }
            CacheError::Configuration(_) => ApiError::ServiceUnavailable(err.to_string()),
            CacheError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ExecutorError> for ApiError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Cache(cache) => cache.into(),
            ExecutorError::TableRead { .. } => ApiError::StorageUnavailable(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Planner(e) => e.into(),
            ReportError::Executor(e) => e.into(),
            ReportError::Cache(e) => e.into(),
            ReportError::NotFound(msg) => ApiError::NotFound(msg),
            ReportError::InvalidDocument { .. } => ApiError::StorageUnavailable(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), status = status.as_u16(), error = %self);
        } else {
            tracing::debug!(code = self.code(), status = status.as_u16(), error = %self);
        }
        let body = Json(Envelope::failure(vec![self.public_message()]));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::RouteNotFound {
                method: "GET".into(),
                path: "/nope".into()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Timeout(Duration::from_secs(30)).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::LocalDiskExhausted("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_detail_not_public() {
        let err: ApiError = CacheError::StorageUnavailable {
            object: "epa_ghg_tables_parquet/ghg.RLPS_GHG_EMITTER_SECTOR.parquet".into(),
            reason: "NoSuchKey".into(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!err.public_message().contains("parquet"));
        assert!(err.to_string().contains("parquet"));
    }

    #[test]
    fn test_filter_combination_propagation() {
        let planner = PlannerError::InvalidFilterCombination("nope".into());
        let err: ApiError = ReportError::from(planner).into();
        assert!(matches!(err, ApiError::InvalidFilterCombination(_)));
        assert_eq!(err.public_message(), "nope");
    }
}
