//! Query execution
//!
//! An in-process engine over the Parquet tables of the dataset. Each request
//! runs in its own `QueryContext`, which materialises tables through the file
//! cache and decodes each one at most once.
//!
//! # Invariants
//!
//! - Deterministic: same descriptor and data, same rows in the same order
//! - SQL null semantics: null never matches a predicate; `sum` of nothing is null
//! - A query starts only once every table it reads is local

mod context;
mod errors;
mod executor;
mod filters;
mod result;
mod sorter;
mod table;

pub use context::QueryContext;
pub use errors::{ExecutorError, ExecutorResult};
pub use executor::{JoinedRow, QueryExecutor, Sources};
pub use filters::{BoundPredicate, PredicateFilter};
pub use result::{RowSet, RowView};
pub use sorter::ResultSorter;
pub use table::Table;
