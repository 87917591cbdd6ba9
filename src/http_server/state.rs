//! Shared handler state
//!
//! Only immutable configuration and the storage handle are shared. Each
//! request builds its own file cache and query context from them.

use std::future::Future;

use super::config::ServiceConfig;
use super::errors::{ApiError, ApiResult};
use crate::executor::QueryContext;
use crate::file_cache::{CacheResult, DataFileCatalog, FileCache, StorageBackend};
use crate::planner::{ReportBody, ReportRequest};
use crate::shaper::Reports;

/// State shared across handlers
pub struct AppState {
    config: ServiceConfig,
    backend: StorageBackend,
}

impl AppState {
    pub fn new(config: ServiceConfig, backend: StorageBackend) -> Self {
        Self { config, backend }
    }

    /// Connect the storage backend named by the config
    pub fn from_config(config: ServiceConfig) -> CacheResult<Self> {
        let backend = StorageBackend::from_config(&config.storage)?;
        Ok(Self::new(config, backend))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// A fresh cache for one execution context
    pub fn file_cache(&self) -> FileCache {
        let cache = FileCache::new(
            &self.backend,
            self.config.layout.clone(),
            &self.config.scratch_dir,
        );
        match self.config.scratch_limit_bytes {
            Some(limit) => cache.with_scratch_limit(limit),
            None => cache,
        }
    }

    /// A fresh report producer with its own execution context
    pub fn reports(&self) -> Reports {
        Reports::new(QueryContext::new(self.file_cache()), self.config.export)
    }

    pub fn catalog(&self) -> DataFileCatalog {
        DataFileCatalog::new(&self.backend, self.config.layout.clone())
    }

    /// Apply defaults and validate a report body
    pub fn request(&self, body: &ReportBody) -> ApiResult<ReportRequest> {
        Ok(body.validate(&self.config.requests)?)
    }

    /// Run `work` under the request's wall-clock ceiling
    pub async fn run<T, E, F>(&self, work: F) -> ApiResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ApiError>,
    {
        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, work).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(ApiError::Timeout(timeout)),
        }
    }
}
