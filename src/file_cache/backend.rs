//! # Storage Backends
//!
//! The remote side of the cache. Production reads from S3; local
//! development reads a directory laid out like the bucket; tests use an
//! in-memory store.

use std::path::PathBuf;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};

use super::errors::{CacheError, CacheResult};

/// Which object store to read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// S3 bucket; credentials come from the environment / instance role
    S3 {
        bucket: String,
        #[serde(default = "default_region")]
        region: String,
        /// Custom endpoint for S3-compatible stores
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// Directory mirroring the bucket layout
    Local { root: PathBuf },
    /// Empty in-memory store
    Memory,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::S3 {
            bucket: "epa-backups-eia".to_string(),
            region: default_region(),
            endpoint: None,
        }
    }
}

/// Key layout inside the bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLayout {
    /// Prefix of the Parquet tables (`{prefix}/ghg.{TABLE}.parquet`)
    #[serde(default = "default_parquet_prefix")]
    pub parquet_prefix: String,

    /// Prefix of the geo JSON documents
    #[serde(default = "default_geo_prefix")]
    pub geo_prefix: String,

    /// Prefix of the downloadable CSV source tables
    #[serde(default = "default_csv_prefix")]
    pub csv_prefix: String,
}

fn default_parquet_prefix() -> String {
    "epa_ghg_tables_parquet".to_string()
}

fn default_geo_prefix() -> String {
    "epa_ghg_geo".to_string()
}

fn default_csv_prefix() -> String {
    "epa_ghg_tables_csvs".to_string()
}

impl Default for ObjectLayout {
    fn default() -> Self {
        Self {
            parquet_prefix: default_parquet_prefix(),
            geo_prefix: default_geo_prefix(),
            csv_prefix: default_csv_prefix(),
        }
    }
}

impl ObjectLayout {
    /// Remote key of a Parquet table
    pub fn table_key(&self, table: &str) -> ObjectPath {
        join_key(&self.parquet_prefix, &format!("ghg.{}.parquet", table))
    }

    /// Remote key of a geo document
    pub fn geo_key(&self, file: &str) -> ObjectPath {
        join_key(&self.geo_prefix, file)
    }

    /// Remote key of a CSV source file
    pub fn csv_key(&self, file: &str) -> ObjectPath {
        join_key(&self.csv_prefix, file)
    }

    /// Prefix under which CSV source files are listed
    pub fn csv_prefix_path(&self) -> ObjectPath {
        ObjectPath::from(self.csv_prefix.trim_matches('/'))
    }
}

fn join_key(prefix: &str, name: &str) -> ObjectPath {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        ObjectPath::from(name)
    } else {
        ObjectPath::from(format!("{}/{}", prefix, name))
    }
}

/// A configured object store, plus a URL signer when the store supports one
#[derive(Debug, Clone)]
pub struct StorageBackend {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
}

impl StorageBackend {
    /// Build the backend described by `config`
    pub fn from_config(config: &BackendConfig) -> CacheResult<Self> {
        match config {
            BackendConfig::S3 {
                bucket,
                region,
                endpoint,
            } => {
                let mut builder = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .with_region(region);
                if let Some(endpoint) = endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                let s3 = Arc::new(
                    builder
                        .build()
                        .map_err(|e| CacheError::Configuration(e.to_string()))?,
                );
                let signer: Arc<dyn Signer> = s3.clone();
                Ok(Self {
                    store: s3,
                    signer: Some(signer),
                })
            }
            BackendConfig::Local { root } => {
                let local = LocalFileSystem::new_with_prefix(root)
                    .map_err(|e| CacheError::Configuration(e.to_string()))?;
                Ok(Self::from_store(Arc::new(local)))
            }
            BackendConfig::Memory => Ok(Self::from_store(Arc::new(InMemory::new()))),
        }
    }

    /// Wrap an existing store (no URL signing)
    pub fn from_store(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            signer: None,
        }
    }

    /// The object store
    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }

    /// The URL signer, if the store supports presigned URLs
    pub fn signer(&self) -> Option<Arc<dyn Signer>> {
        self.signer.clone()
    }
}
