//! # Downloadable source files
//!
//! Lists the CSV source tables published next to the Parquet copies and
//! hands out presigned download URLs for them.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::http::Method;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use object_store::signer::Signer;
use object_store::ObjectStore;
use regex::Regex;
use serde::Serialize;

use super::backend::{ObjectLayout, StorageBackend};
use super::errors::{CacheError, CacheResult};

/// Presigned URL lifetime
pub const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(3600);

/// A CSV file available for download
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFile {
    pub filename: String,
    pub size: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
}

/// A presigned download link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignedDownload {
    pub url: String,
    pub filename: String,
}

/// Catalog of CSV source files
pub struct DataFileCatalog {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    layout: ObjectLayout,
}

impl DataFileCatalog {
    pub fn new(backend: &StorageBackend, layout: ObjectLayout) -> Self {
        Self {
            store: backend.store(),
            signer: backend.signer(),
            layout,
        }
    }

    /// All `.csv` objects under the CSV prefix, sorted by file name
    pub async fn list(&self) -> CacheResult<Vec<DataFile>> {
        let prefix = self.layout.csv_prefix_path();
        let metas: Vec<_> = self
            .store
            .list(Some(&prefix))
            .try_collect()
            .await
            .map_err(|e| CacheError::unavailable(prefix.as_ref(), e))?;

        let mut files: Vec<DataFile> = metas
            .into_iter()
            .filter_map(|meta| {
                let filename = meta.location.filename()?.to_string();
                if !filename.ends_with(".csv") {
                    return None;
                }
                let size_bytes = meta.size as u64;
                Some(DataFile {
                    filename,
                    size: human_size(size_bytes),
                    size_bytes,
                    last_modified: meta.last_modified,
                })
            })
            .collect();

        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    /// Presigned URL for one CSV file.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub async fn sign(&self, filename: &str) -> CacheResult<Option<SignedDownload>> {
        if !is_valid_csv_name(filename) {
            return Err(CacheError::InvalidName(filename.to_string()));
        }

        let key = self.layout.csv_key(filename);
        match self.store.head(&key).await {
            Ok(_) => {}
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(CacheError::unavailable(key.as_ref(), e)),
        }

        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| CacheError::unavailable(key.as_ref(), "backend cannot presign URLs"))?;
        let url = signer
            .signed_url(Method::GET, &key, DOWNLOAD_URL_TTL)
            .await
            .map_err(|e| CacheError::unavailable(key.as_ref(), e))?;

        Ok(Some(SignedDownload {
            url: url.to_string(),
            filename: filename.to_string(),
        }))
    }
}

/// File names must be plain `.csv` names: no separators, no traversal
pub fn is_valid_csv_name(filename: &str) -> bool {
    static CSV_NAME: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = CSV_NAME.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]{1,200}\.csv$").ok());
    pattern.as_ref().is_some_and(|p| p.is_match(filename)) && !filename.contains("..")
}

/// Human readable size: `512 B`, `1.5 KB`, `12.3 MB`
fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use object_store::memory::InMemory;
    use object_store::path::Path as ObjectPath;
    use object_store::PutPayload;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_csv_name_validation() {
        assert!(is_valid_csv_name("ghg.PUB_DIM_SECTOR.csv"));
        assert!(!is_valid_csv_name("../secret.csv"));
        assert!(!is_valid_csv_name("dir/file.csv"));
        assert!(!is_valid_csv_name("file.parquet"));
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let store = InMemory::new();
        for key in [
            "epa_ghg_tables_csvs/ghg.B.csv",
            "epa_ghg_tables_csvs/ghg.A.csv",
            "epa_ghg_tables_csvs/readme.txt",
            "elsewhere/ghg.C.csv",
        ] {
            store
                .put(&ObjectPath::from(key), PutPayload::from(Bytes::from_static(b"x,y\n")))
                .await
                .unwrap();
        }
        let backend = StorageBackend::from_store(Arc::new(store));
        let catalog = DataFileCatalog::new(&backend, ObjectLayout::default());

        let files = catalog.list().await.unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["ghg.A.csv", "ghg.B.csv"]);
        assert_eq!(files[0].size_bytes, 4);
    }

    #[tokio::test]
    async fn test_sign_missing_file() {
        let backend = StorageBackend::from_store(Arc::new(InMemory::new()));
        let catalog = DataFileCatalog::new(&backend, ObjectLayout::default());
        assert_eq!(catalog.sign("ghg.NOPE.csv").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_without_signer_is_unavailable() {
        let store = InMemory::new();
        store
            .put(
                &ObjectPath::from("epa_ghg_tables_csvs/ghg.A.csv"),
                PutPayload::from(Bytes::from_static(b"a")),
            )
            .await
            .unwrap();
        let backend = StorageBackend::from_store(Arc::new(store));
        let catalog = DataFileCatalog::new(&backend, ObjectLayout::default());

        let result = catalog.sign("ghg.A.csv").await;
        assert!(matches!(result, Err(CacheError::StorageUnavailable { .. })));
    }
}
