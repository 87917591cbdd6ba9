//! Predicate filtering for query execution
//!
//! Predicates are bound to (source, column) positions once per query, then
//! evaluated against joined rows. All predicates combine with AND; a null
//! value never matches.

use crate::planner::{FilterOp, Predicate};

use super::errors::ExecutorResult;
use super::executor::{JoinedRow, Sources};

/// A predicate with its column resolved
#[derive(Debug, Clone)]
pub struct BoundPredicate<'q> {
    pub source: usize,
    pub column: usize,
    pub op: &'q FilterOp,
}

/// Evaluates bound predicates against joined rows
pub struct PredicateFilter;

impl PredicateFilter {
    /// Resolve predicates against the sources
    pub fn bind<'q>(
        sources: &Sources<'_>,
        predicates: &'q [Predicate],
    ) -> ExecutorResult<Vec<BoundPredicate<'q>>> {
        predicates
            .iter()
            .map(|p| {
                let (source, column) = sources.resolve(&p.column)?;
                Ok(BoundPredicate {
                    source,
                    column,
                    op: &p.op,
                })
            })
            .collect()
    }

    /// Checks if a row matches all predicates
    pub fn matches(
        sources: &Sources<'_>,
        row: &JoinedRow,
        predicates: &[BoundPredicate<'_>],
    ) -> bool {
        predicates
            .iter()
            .all(|p| p.op.matches(sources.value(row, p.source, p.column)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::table::Table;
    use crate::planner::{col, Scalar, TableName};

    fn facilities() -> Table {
        Table::from_rows(
            TableName::Facilities,
            &["facility_id", "state", "latitude"],
            vec![
                vec![Scalar::str("1"), Scalar::str("TX"), Scalar::str("30.1")],
                vec![Scalar::str("2"), Scalar::str("OK"), Scalar::str("")],
                vec![Scalar::str("3"), Scalar::Null, Scalar::Float(35.0)],
            ],
        )
    }

    fn matching(predicates: Vec<Predicate>) -> Vec<usize> {
        let table = facilities();
        let sources = Sources::single("f", &table);
        let bound = PredicateFilter::bind(&sources, &predicates).unwrap();
        (0..table.len())
            .filter(|r| PredicateFilter::matches(&sources, &vec![Some(*r)], &bound))
            .collect()
    }

    #[test]
    fn test_equality_match() {
        assert_eq!(matching(vec![Predicate::eq(col("f", "state"), "TX")]), vec![0]);
        assert_eq!(matching(vec![Predicate::eq(col("f", "facility_id"), 2i64)]), vec![1]);
    }

    #[test]
    fn test_null_value_no_match() {
        assert_eq!(matching(vec![Predicate::ne(col("f", "state"), "TX")]), vec![1]);
    }

    #[test]
    fn test_not_empty() {
        assert_eq!(matching(vec![Predicate::not_empty(col("f", "latitude"))]), vec![0, 2]);
    }

    #[test]
    fn test_multiple_predicates_and() {
        let preds = vec![
            Predicate::not_empty(col("f", "latitude")),
            Predicate::gte(col("f", "facility_id"), 2i64),
        ];
        assert_eq!(matching(preds), vec![2]);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let table = facilities();
        let sources = Sources::single("f", &table);
        let preds = vec![Predicate::eq(col("f", "county"), "Harris")];
        assert!(PredicateFilter::bind(&sources, &preds).is_err());
    }
}
