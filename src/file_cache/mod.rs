//! # File Cache
//!
//! Materialises remote Parquet tables (and geo documents) into a local
//! scratch directory. A [`FileCache`] belongs to one execution context:
//! the first request for a name fetches it, later requests within the same
//! context reuse the local copy. Nothing is shared between contexts except
//! files that happen to be on disk already, which are adopted as-is.

pub mod backend;
pub mod cache;
pub mod catalog;
pub mod errors;

pub use backend::{BackendConfig, ObjectLayout, StorageBackend};
pub use cache::{CachedTable, FileCache, ObjectKind};
pub use catalog::{DataFile, DataFileCatalog, SignedDownload};
pub use errors::{CacheError, CacheResult};
