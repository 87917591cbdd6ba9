//! # Per-context file cache
//!
//! `ensure_local(table)` returns the local copy of a table, fetching it on
//! first use. Concurrent callers asking for the same name share one fetch;
//! distinct names fetch in parallel.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use regex::Regex;
use tokio::sync::OnceCell;

use super::backend::{ObjectLayout, StorageBackend};
use super::errors::{CacheError, CacheResult};
use crate::observability::ObservationScope;

/// Kind of object held in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Parquet table, addressed by table name
    Table,
    /// Geo JSON document, addressed by file name
    Geo,
}

/// Handle to a materialised object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTable {
    /// Logical name (table name or geo file name)
    pub name: String,
    /// Local file path
    pub path: PathBuf,
    /// When this context obtained the file
    pub fetched_at: DateTime<Utc>,
    /// Size on disk
    pub size_bytes: u64,
    /// True when the file was already on disk from an earlier context
    pub reused: bool,
}

type Slot = Arc<OnceCell<CachedTable>>;

/// Cache of remote objects for one execution context
pub struct FileCache {
    store: Arc<dyn ObjectStore>,
    layout: ObjectLayout,
    scratch_dir: PathBuf,
    scratch_limit_bytes: Option<u64>,
    used_bytes: AtomicU64,
    slots: Mutex<HashMap<(ObjectKind, String), Slot>>,
}

impl FileCache {
    /// Create an empty cache writing into `scratch_dir`
    pub fn new(
        backend: &StorageBackend,
        layout: ObjectLayout,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store: backend.store(),
            layout,
            scratch_dir: scratch_dir.into(),
            scratch_limit_bytes: None,
            used_bytes: AtomicU64::new(0),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Cap the bytes this context may place in the scratch area
    pub fn with_scratch_limit(mut self, limit_bytes: u64) -> Self {
        self.scratch_limit_bytes = Some(limit_bytes);
        self
    }

    /// Scratch directory used by this cache
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Local path of a table, fetching it on first use
    pub async fn ensure_local(&self, table: &str) -> CacheResult<CachedTable> {
        self.ensure(ObjectKind::Table, table).await
    }

    /// Local path of a geo document, fetching it on first use
    pub async fn ensure_geo(&self, file: &str) -> CacheResult<CachedTable> {
        self.ensure(ObjectKind::Geo, file).await
    }

    /// Materialise several tables concurrently.
    ///
    /// Returns handles in the order of `tables`; fails with the first error.
    pub async fn ensure_all(&self, tables: &[&str]) -> CacheResult<Vec<CachedTable>> {
        try_join_all(tables.iter().map(|t| self.ensure_local(t))).await
    }

    /// Handles materialised so far, sorted by name
    pub fn cached(&self) -> Vec<CachedTable> {
        let slots = self.lock_slots();
        let mut handles: Vec<CachedTable> =
            slots.values().filter_map(|s| s.get().cloned()).collect();
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        handles
    }

    /// Bytes placed in (or adopted from) the scratch area by this context
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes.load(Ordering::SeqCst)
    }

    async fn ensure(&self, kind: ObjectKind, name: &str) -> CacheResult<CachedTable> {
        validate_name(kind, name)?;

        let slot = {
            let mut slots = self.lock_slots();
            Arc::clone(slots.entry((kind, name.to_string())).or_default())
        };

        slot.get_or_try_init(|| self.materialise(kind, name))
            .await
            .cloned()
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<(ObjectKind, String), Slot>> {
        // A panic while holding the lock leaves the map itself consistent
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn materialise(&self, kind: ObjectKind, name: &str) -> CacheResult<CachedTable> {
        let (key, local_name) = match kind {
            ObjectKind::Table => (self.layout.table_key(name), format!("ghg.{}.parquet", name)),
            ObjectKind::Geo => (self.layout.geo_key(name), format!("geo.{}", name)),
        };
        let local_path = self.scratch_dir.join(&local_name);

        if let Ok(meta) = tokio::fs::metadata(&local_path).await {
            if meta.is_file() {
                self.reserve(&local_name, meta.len())?;
                tracing::debug!(event = "CACHE_REUSE", object = %local_name);
                return Ok(CachedTable {
                    name: name.to_string(),
                    path: local_path,
                    fetched_at: Utc::now(),
                    size_bytes: meta.len(),
                    reused: true,
                });
            }
        }

        let scope = ObservationScope::with_fields("CACHE_FETCH", &[("object", key.as_ref())]);
        match self.fetch(&key, &local_name, &local_path).await {
            Ok(size_bytes) => {
                scope.complete_with_fields(&[("bytes", &size_bytes.to_string())]);
                Ok(CachedTable {
                    name: name.to_string(),
                    path: local_path,
                    fetched_at: Utc::now(),
                    size_bytes,
                    reused: false,
                })
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch(
        &self,
        key: &ObjectPath,
        local_name: &str,
        local_path: &Path,
    ) -> CacheResult<u64> {
        let result = self
            .store
            .get(key)
            .await
            .map_err(|e| CacheError::unavailable(key.as_ref(), e))?;

        let size = result.meta.size as u64;
        self.reserve(local_name, size)?;

        let bytes = match result.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.release(size);
                return Err(CacheError::unavailable(key.as_ref(), e));
            }
        };

        let scratch_dir = self.scratch_dir.clone();
        let target = local_path.to_path_buf();
        let object = local_name.to_string();
        let written = tokio::task::spawn_blocking(move || {
            write_atomically(&scratch_dir, &target, &bytes, &object)
        })
        .await
        .map_err(|e| CacheError::Io(e.to_string()))?;

        if let Err(e) = written {
            self.release(size);
            return Err(e);
        }
        Ok(size)
    }

    /// Account for `size` bytes against the scratch limit
    fn reserve(&self, object: &str, size: u64) -> CacheResult<()> {
        let total = self.used_bytes.fetch_add(size, Ordering::SeqCst) + size;
        if let Some(limit) = self.scratch_limit_bytes {
            if total > limit {
                self.release(size);
                return Err(CacheError::LocalDiskExhausted {
                    object: object.to_string(),
                    needed: size,
                });
            }
        }
        Ok(())
    }

    fn release(&self, size: u64) {
        self.used_bytes.fetch_sub(size, Ordering::SeqCst);
    }
}

/// Write through a temp file in the same directory, then rename into place,
/// so no reader ever observes a partially written file.
fn write_atomically(
    scratch_dir: &Path,
    target: &Path,
    data: &[u8],
    object: &str,
) -> CacheResult<()> {
    let needed = data.len() as u64;
    std::fs::create_dir_all(scratch_dir).map_err(|e| CacheError::from_write(object, needed, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(scratch_dir)
        .map_err(|e| CacheError::from_write(object, needed, e))?;
    tmp.write_all(data)
        .and_then(|_| tmp.flush())
        .map_err(|e| CacheError::from_write(object, needed, e))?;
    tmp.persist(target)
        .map_err(|e| CacheError::from_write(object, needed, e.error))?;
    Ok(())
}

fn validate_name(kind: ObjectKind, name: &str) -> CacheResult<()> {
    static TABLE: OnceLock<Option<Regex>> = OnceLock::new();
    static GEO: OnceLock<Option<Regex>> = OnceLock::new();

    let pattern = match kind {
        ObjectKind::Table => TABLE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{1,128}$").ok()),
        ObjectKind::Geo => GEO.get_or_init(|| Regex::new(r"^[A-Za-z0-9_\-]{1,128}\.json$").ok()),
    };

    if pattern.as_ref().is_some_and(|p| p.is_match(name)) {
        Ok(())
    } else {
        Err(CacheError::InvalidName(name.to_string()))
    }
}
