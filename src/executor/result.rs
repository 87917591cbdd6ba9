//! Result types for query execution

use super::errors::{ExecutorError, ExecutorResult};
use crate::planner::Scalar;

static NULL: Scalar = Scalar::Null;

/// Rows produced by one query, in result order
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
    /// Base-table rows read before filtering
    pub scanned_count: usize,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Self {
        Self {
            columns,
            rows,
            scanned_count: 0,
        }
    }

    /// Creates an empty result
    pub fn empty(columns: Vec<String>) -> Self {
        Self::new(columns, Vec::new())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |values| RowView {
            columns: &self.columns,
            values,
        })
    }

    pub fn first(&self) -> Option<RowView<'_>> {
        self.iter().next()
    }

    pub fn into_rows(self) -> Vec<Vec<Scalar>> {
        self.rows
    }

    /// The value of a count query
    pub fn count_value(&self) -> ExecutorResult<u64> {
        self.first()
            .and_then(|row| row.i64("count"))
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| {
                ExecutorError::ExecutionFailed("count query returned no count".to_string())
            })
    }
}

/// One row, addressed by output column name
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    columns: &'a [String],
    values: &'a [Scalar],
}

impl<'a> RowView<'a> {
    /// Value of a column; null when the column is absent
    pub fn get(&self, name: &str) -> &'a Scalar {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
            .unwrap_or(&NULL)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).as_text()
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).as_f64()
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).as_i64()
    }

    pub fn values(&self) -> &'a [Scalar] {
        self.values
    }
}
