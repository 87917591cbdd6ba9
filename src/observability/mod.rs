//! Observability subsystem
//!
//! Structured logging through `tracing`. Lifecycle events keep the
//! `NAME_BEGIN` / `NAME_COMPLETE` / `NAME_FAILED` convention so a single
//! request can be followed through table fetches and query execution.
//!
//! # Usage
//!
//! ```ignore
//! use ghg_api::observability::{init_logging, LogFormat, ObservationScope};
//!
//! init_logging(LogFormat::Json, "info")?;
//!
//! let scope = ObservationScope::with_fields("QUERY", &[("query", "map_markers")]);
//! // ... do work ...
//! scope.complete_with_fields(&[("rows", "42")]);
//! ```

mod scope;

pub use scope::{ObservationScope, Timer};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line (default, for log shipping)
    #[default]
    Json,
    /// Human readable, for local development
    Pretty,
}

/// Observability setup failure
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Invalid log filter '{0}': {1}")]
    InvalidFilter(String, String),

    #[error("Log subscriber already installed")]
    AlreadyInstalled,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter` when set. Logs go to
/// stderr so stdout stays free for command output.
pub fn init_logging(format: LogFormat, default_filter: &str) -> Result<(), ObservabilityError> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(env) if !env.trim().is_empty() => EnvFilter::try_new(&env)
            .map_err(|e| ObservabilityError::InvalidFilter(env.clone(), e.to_string()))?,
        _ => EnvFilter::try_new(default_filter).map_err(|e| {
            ObservabilityError::InvalidFilter(default_filter.to_string(), e.to_string())
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match format {
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    result.map_err(|_| ObservabilityError::AlreadyInstalled)
}
