//! Result sorting for query execution
//!
//! Multi-key, stable and deterministic. Nulls sort last in both directions.

use std::cmp::Ordering;

use crate::planner::{Scalar, SortDirection, SortSpec};

use super::errors::{ExecutorError, ExecutorResult};

/// Sorts output rows
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts rows according to the sort keys, in key order
    pub fn sort(
        rows: &mut [Vec<Scalar>],
        columns: &[String],
        keys: &[SortSpec],
    ) -> ExecutorResult<()> {
        let bound: Vec<(usize, SortDirection)> = keys
            .iter()
            .map(|k| {
                columns
                    .iter()
                    .position(|c| *c == k.field)
                    .map(|i| (i, k.direction))
                    .ok_or_else(|| ExecutorError::UnknownColumn(k.field.clone()))
            })
            .collect::<ExecutorResult<_>>()?;

        rows.sort_by(|a, b| {
            for (index, direction) in &bound {
                let ordering = Self::compare_values(&a[*index], &b[*index], *direction);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        Ok(())
    }

    /// Compares two values for sorting.
    ///
    /// Ordering rules:
    /// - null after every value, whatever the direction
    /// - numbers numerically, otherwise text
    fn compare_values(a: &Scalar, b: &Scalar, direction: SortDirection) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ordering = a.compare(b).unwrap_or(Ordering::Equal);
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["id".into(), "total".into()]
    }

    fn row(id: &str, total: Scalar) -> Vec<Scalar> {
        vec![Scalar::str(id), total]
    }

    fn ids(rows: &[Vec<Scalar>]) -> Vec<String> {
        rows.iter().map(|r| r[0].to_string()).collect()
    }

    #[test]
    fn test_sort_descending_nulls_last() {
        let mut rows = vec![
            row("a", Scalar::Null),
            row("b", Scalar::Float(10.0)),
            row("c", Scalar::Float(30.0)),
        ];
        ResultSorter::sort(&mut rows, &columns(), &[SortSpec::desc("total")]).unwrap();
        assert_eq!(ids(&rows), vec!["c", "b", "a"]);

        ResultSorter::sort(&mut rows, &columns(), &[SortSpec::asc("total")]).unwrap();
        assert_eq!(ids(&rows), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_tie_break_on_second_key() {
        let mut rows = vec![
            row("z", Scalar::Float(5.0)),
            row("m", Scalar::Float(5.0)),
            row("a", Scalar::Float(1.0)),
        ];
        let keys = [SortSpec::desc("total"), SortSpec::asc("id")];
        ResultSorter::sort(&mut rows, &columns(), &keys).unwrap();
        assert_eq!(ids(&rows), vec!["m", "z", "a"]);
    }

    #[test]
    fn test_numeric_text_sorts_numerically() {
        let mut rows = vec![
            row("10", Scalar::Null),
            row("9", Scalar::Null),
            row("100", Scalar::Null),
        ];
        ResultSorter::sort(&mut rows, &columns(), &[SortSpec::asc("id")]).unwrap();
        assert_eq!(ids(&rows), vec!["9", "10", "100"]);
    }

    #[test]
    fn test_sort_stable() {
        let mut rows = vec![row("b", Scalar::Int(1)), row("a", Scalar::Int(1))];
        ResultSorter::sort(&mut rows, &columns(), &[SortSpec::asc("total")]).unwrap();
        assert_eq!(ids(&rows), vec!["b", "a"]);
    }

    #[test]
    fn test_unknown_sort_column() {
        let mut rows = vec![row("a", Scalar::Int(1))];
        assert!(ResultSorter::sort(&mut rows, &columns(), &[SortSpec::asc("nope")]).is_err());
    }
}
