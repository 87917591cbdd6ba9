//! Service Configuration
//!
//! Host, port and CORS settings plus everything a request needs: storage
//! backend, key layout, scratch directory, request and export limits.
//!
//! Values come from an optional JSON file and are then overridden by the
//! environment:
//!
//! | Variable | Effect |
//! |---|---|
//! | `S3_BUCKET` | S3 backend with this bucket |
//! | `S3_PREFIX` | Parquet key prefix |
//! | `S3_REGION` | S3 region |
//! | `GHG_STORAGE_ROOT` | local directory backend (wins over `S3_BUCKET`) |
//! | `GHG_SCRATCH_DIR` | scratch directory for cached files |
//! | `PORT` | listen port |

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::file_cache::{BackendConfig, ObjectLayout};
use crate::observability::LogFormat;
use crate::planner::RequestLimits;
use crate::shaper::ExportLimits;

/// Configuration rejected at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        reason: reason.into(),
    }
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub storage: BackendConfig,

    #[serde(default)]
    pub layout: ObjectLayout,

    /// Where cached tables are materialised
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Upper bound on cached bytes per context
    #[serde(default)]
    pub scratch_limit_bytes: Option<u64>,

    #[serde(default)]
    pub requests: RequestLimits,

    #[serde(default)]
    pub export: ExportLimits,

    /// Wall-clock ceiling per request (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("ghg-api")
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_filter() -> String {
    "info,tower_http=info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            storage: BackendConfig::default(),
            layout: ObjectLayout::default(),
            scratch_dir: default_scratch_dir(),
            scratch_limit_bytes: None,
            requests: RequestLimits::default(),
            export: ExportLimits::default(),
            request_timeout_secs: default_request_timeout_secs(),
            log_format: LogFormat::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl ServiceConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`; blank values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let region = get("S3_REGION");
        if let Some(bucket) = get("S3_BUCKET") {
            let (current_region, endpoint) = match &self.storage {
                BackendConfig::S3 { region, endpoint, .. } => (region.clone(), endpoint.clone()),
                _ => ("us-east-1".to_string(), None),
            };
            self.storage = BackendConfig::S3 {
                bucket,
                region: current_region,
                endpoint,
            };
        }
        if let (Some(new_region), BackendConfig::S3 { region, .. }) = (region, &mut self.storage) {
            *region = new_region;
        }
        if let Some(prefix) = get("S3_PREFIX") {
            self.layout.parquet_prefix = prefix;
        }
        if let Some(root) = get("GHG_STORAGE_ROOT") {
            self.storage = BackendConfig::Local { root: root.into() };
        }
        if let Some(dir) = get("GHG_SCRATCH_DIR") {
            self.scratch_dir = dir.into();
        }
        if let Some(port) = get("PORT") {
            self.port = port
                .parse()
                .map_err(|_| invalid("PORT", format!("'{}' is not a port", port)))?;
        }
        Ok(())
    }

    /// Reject limits that would make every request fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        let requests = &self.requests;
        if requests.max_page_size == 0 {
            return Err(invalid("requests.max_page_size", "must be > 0"));
        }
        if requests.default_page_size == 0 || requests.default_page_size > requests.max_page_size {
            return Err(invalid(
                "requests.default_page_size",
                format!("must be between 1 and {}", requests.max_page_size),
            ));
        }
        if self.export.all_years_row_cap == 0 {
            return Err(invalid("export.all_years_row_cap", "must be > 0"));
        }
        let export = &self.export;
        if export.estimated_row_bytes == 0
            || export.response_ceiling_bytes < export.estimated_row_bytes
        {
            return Err(invalid(
                "export.estimated_row_bytes",
                "must be > 0 and no larger than the response ceiling",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be > 0"));
        }
        if let Some(0) = self.scratch_limit_bytes {
            return Err(invalid("scratch_limit_bytes", "must be > 0 when set"));
        }
        if let BackendConfig::S3 { bucket, .. } = &self.storage {
            if bucket.trim().is_empty() {
                return Err(invalid("storage.bucket", "must not be empty"));
            }
        }
        Ok(())
    }
}
