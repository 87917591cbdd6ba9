//! Execution context
//!
//! One context per request. It owns the request's file cache and a memo of
//! decoded tables so the queries of one request decode each table once.
//! Nothing is shared between contexts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::try_join_all;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::errors::{ExecutorError, ExecutorResult};
use super::executor::QueryExecutor;
use super::result::RowSet;
use super::table::Table;
use crate::file_cache::FileCache;
use crate::observability::ObservationScope;
use crate::planner::{render_sql, QueryDescriptor, TableName};

type TableSlot = Arc<OnceCell<Arc<Table>>>;

/// Per-request execution state
pub struct QueryContext {
    id: Uuid,
    cache: FileCache,
    tables: Mutex<HashMap<TableName, TableSlot>>,
}

impl QueryContext {
    pub fn new(cache: FileCache) -> Self {
        Self {
            id: Uuid::new_v4(),
            cache,
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Identifier used to correlate this context's log events
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    /// Decoded table, if a query of this context has read it
    pub fn decoded(&self, name: TableName) -> Option<Arc<Table>> {
        self.lock_tables().get(&name).and_then(|slot| slot.get().cloned())
    }

    /// Execute one descriptor.
    ///
    /// Waits until every table it reads is materialised locally; distinct
    /// tables are fetched and decoded concurrently. Decoding and evaluation
    /// run on the blocking pool.
    pub async fn execute(&self, query: &QueryDescriptor) -> ExecutorResult<RowSet> {
        let context = self.id.to_string();
        let scope = ObservationScope::with_fields(
            "QUERY_EXECUTE",
            &[("context", &context), ("query", &query.label)],
        );
        tracing::debug!(query = %query.label, sql = %render_sql(query));

        match self.run(query).await {
            Ok(rows) => {
                scope.complete_with_fields(&[
                    ("rows", &rows.len().to_string()),
                    ("scanned", &rows.scanned_count.to_string()),
                ]);
                Ok(rows)
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    /// Number of rows `query` yields before LIMIT/OFFSET
    pub async fn count(&self, query: &QueryDescriptor) -> ExecutorResult<u64> {
        self.execute(&query.count()).await?.count_value()
    }

    async fn run(&self, query: &QueryDescriptor) -> ExecutorResult<RowSet> {
        let tables = query.tables();
        let names: Vec<&str> = tables.iter().map(|t| t.as_str()).collect();
        let handles = self.cache.ensure_all(&names).await?;

        let loaded: HashMap<TableName, Arc<Table>> = try_join_all(
            tables
                .into_iter()
                .zip(handles)
                .map(|(name, handle)| self.load(name, handle.path)),
        )
        .await?
        .into_iter()
        .collect();

        let query = query.clone();
        tokio::task::spawn_blocking(move || QueryExecutor::new(&loaded).execute(&query))
            .await
            .map_err(|e| ExecutorError::ExecutionFailed(e.to_string()))?
    }

    /// Decode `name` once per context; concurrent callers share one decode
    async fn load(
        &self,
        name: TableName,
        path: PathBuf,
    ) -> ExecutorResult<(TableName, Arc<Table>)> {
        let slot = {
            let mut tables = self.lock_tables();
            Arc::clone(tables.entry(name).or_default())
        };

        let table = slot
            .get_or_try_init(|| async move {
                let table = tokio::task::spawn_blocking(move || Table::read_parquet(name, &path))
                    .await
                    .map_err(|e| ExecutorError::ExecutionFailed(e.to_string()))??;
                tracing::debug!(event = "TABLE_DECODED", table = %name, rows = table.len());
                Ok::<_, ExecutorError>(Arc::new(table))
            })
            .await?;
        Ok((name, Arc::clone(table)))
    }

    fn lock_tables(&self) -> MutexGuard<'_, HashMap<TableName, TableSlot>> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
