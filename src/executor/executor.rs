//! Query executor
//!
//! Executes descriptors against decoded tables, producing deterministic
//! results.
//!
//! Execution flow (strict order):
//! 1. Scan the base table, applying predicates that only touch it
//! 2. Hash-join each joined table in declaration order
//! 3. Apply the remaining WHERE predicates
//! 4. Group and aggregate, or project
//! 5. Apply HAVING, then DISTINCT
//! 6. Count mode stops here and returns the row count
//! 7. Sort (stable, nulls last), then OFFSET and LIMIT

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::planner::{
    Aggregate, ColumnRef, JoinKind, Join, OutputMode, Predicate, QueryDescriptor, Scalar,
    SelectExpr, TableName,
};

use super::errors::{ExecutorError, ExecutorResult};
use super::filters::PredicateFilter;
use super::result::RowSet;
use super::sorter::ResultSorter;
use super::table::Table;

static NULL: Scalar = Scalar::Null;

/// A joined row: one optional row index per source, in source order
pub type JoinedRow = Vec<Option<usize>>;

/// The aliased tables of one query
pub struct Sources<'t> {
    entries: Vec<(&'t str, &'t Table)>,
}

impl<'t> Sources<'t> {
    pub fn single(alias: &'t str, table: &'t Table) -> Self {
        Self {
            entries: vec![(alias, table)],
        }
    }

    fn push(&mut self, alias: &'t str, table: &'t Table) -> ExecutorResult<()> {
        if self.entries.iter().any(|(a, _)| *a == alias) {
            return Err(ExecutorError::ExecutionFailed(format!(
                "duplicate table alias '{}'",
                alias
            )));
        }
        self.entries.push((alias, table));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn table(&self, source: usize) -> &'t Table {
        self.entries[source].1
    }

    /// (source index, column index) of a column reference
    pub fn resolve(&self, column: &ColumnRef) -> ExecutorResult<(usize, usize)> {
        let source = self
            .entries
            .iter()
            .position(|(alias, _)| *alias == column.alias)
            .ok_or_else(|| ExecutorError::UnknownColumn(column.to_string()))?;
        let index = self
            .table(source)
            .column_index(&column.column)
            .ok_or_else(|| ExecutorError::UnknownColumn(column.to_string()))?;
        Ok((source, index))
    }

    /// Value at a resolved position; null for an unmatched outer-join side
    pub fn value(&self, row: &JoinedRow, source: usize, column: usize) -> &'t Scalar {
        match row.get(source).copied().flatten() {
            Some(r) => &self.table(source).rows[r][column],
            None => &NULL,
        }
    }
}

/// A select item with its column resolved
#[derive(Debug, Clone, Copy)]
enum BoundExpr {
    Column(usize, usize),
    Sum(usize, usize),
    Count,
    CountDistinct(usize, usize),
    Max(usize, usize),
}

/// Running aggregate state for one group
#[derive(Debug, Clone)]
enum Accumulator {
    Sum(Option<f64>),
    Count(u64),
    CountDistinct(HashSet<String>),
    Max(Option<Scalar>),
    /// Plain column: value from the first row of the group
    First,
}

impl Accumulator {
    fn for_expr(expr: &BoundExpr) -> Self {
        match expr {
            BoundExpr::Column(..) => Accumulator::First,
            BoundExpr::Sum(..) => Accumulator::Sum(None),
            BoundExpr::Count => Accumulator::Count(0),
            BoundExpr::CountDistinct(..) => Accumulator::CountDistinct(HashSet::new()),
            BoundExpr::Max(..) => Accumulator::Max(None),
        }
    }

    fn update(&mut self, value: &Scalar) {
        match self {
            Accumulator::Sum(total) => {
                if let Some(v) = value.as_f64() {
                    *total = Some(total.unwrap_or(0.0) + v);
                }
            }
            Accumulator::Count(n) => *n += 1,
            Accumulator::CountDistinct(seen) => {
                if let Some(key) = value.key() {
                    seen.insert(key);
                }
            }
            Accumulator::Max(current) => {
                let replace = !value.is_null()
                    && current
                        .as_ref()
                        .map_or(true, |c| value.compare(c) == Some(Ordering::Greater));
                if replace {
                    *current = Some(value.clone());
                }
            }
            Accumulator::First => {}
        }
    }

    fn finish(self) -> Option<Scalar> {
        match self {
            Accumulator::Sum(total) => Some(total.map_or(Scalar::Null, Scalar::Float)),
            Accumulator::Count(n) => Some(Scalar::Int(n as i64)),
            Accumulator::CountDistinct(seen) => Some(Scalar::Int(seen.len() as i64)),
            Accumulator::Max(current) => Some(current.unwrap_or(Scalar::Null)),
            Accumulator::First => None,
        }
    }
}

struct Group {
    first: Option<JoinedRow>,
    accumulators: Vec<Accumulator>,
}

/// Executes descriptors against a set of decoded tables
pub struct QueryExecutor<'a> {
    tables: &'a HashMap<TableName, Arc<Table>>,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(tables: &'a HashMap<TableName, Arc<Table>>) -> Self {
        Self { tables }
    }

    /// Executes a descriptor.
    ///
    /// This method is deterministic: same descriptor + same data = same rows.
    pub fn execute(&self, query: &QueryDescriptor) -> ExecutorResult<RowSet> {
        if query.select.is_empty() {
            return Err(ExecutorError::ExecutionFailed(format!(
                "query '{}' selects nothing",
                query.label
            )));
        }
        let sources = self.sources(query)?;
        let width = sources.len();

        // Step 1: scan base table with pushed-down predicates
        let (pushed, remaining): (Vec<Predicate>, Vec<Predicate>) = query
            .predicates
            .iter()
            .cloned()
            .partition(|p| p.column.alias == query.from.alias);
        let pushed = PredicateFilter::bind(&sources, &pushed)?;
        let base = sources.table(0);
        let mut rows: Vec<JoinedRow> = (0..base.len())
            .map(|r| {
                let mut row = vec![None; width];
                row[0] = Some(r);
                row
            })
            .filter(|row| PredicateFilter::matches(&sources, row, &pushed))
            .collect();

        // Step 2: joins
        for (i, join) in query.joins.iter().enumerate() {
            rows = Self::hash_join(&sources, i + 1, join, rows)?;
        }

        // Step 3: remaining predicates
        let remaining = PredicateFilter::bind(&sources, &remaining)?;
        rows.retain(|row| PredicateFilter::matches(&sources, row, &remaining));

        // Step 4: group or project
        let exprs = Self::bind_select(&sources, query)?;
        let columns: Vec<String> = query.select.iter().map(|s| s.alias.clone()).collect();
        let mut output = if query.is_aggregate() {
            Self::aggregate(&sources, query, &exprs, &rows)?
        } else {
            rows.iter()
                .map(|row| {
                    exprs
                        .iter()
                        .map(|e| match e {
                            BoundExpr::Column(s, c) => sources.value(row, *s, *c).clone(),
                            _ => Scalar::Null,
                        })
                        .collect()
                })
                .collect()
        };

        // Step 5: HAVING, DISTINCT
        for having in &query.having {
            let index = columns
                .iter()
                .position(|c| *c == having.column)
                .ok_or_else(|| ExecutorError::UnknownColumn(having.column.clone()))?;
            output.retain(|row: &Vec<Scalar>| having.op.matches(&row[index]));
        }
        if query.distinct {
            let mut seen = HashSet::new();
            output.retain(|row| seen.insert(row.iter().map(Scalar::key).collect::<Vec<_>>()));
        }

        // Step 6: count mode
        if query.output == OutputMode::Count {
            let count = vec![vec![Scalar::Int(output.len() as i64)]];
            let mut result = RowSet::new(vec!["count".to_string()], count);
            result.scanned_count = base.len();
            return Ok(result);
        }

        // Step 7: order, offset, limit
        ResultSorter::sort(&mut output, &columns, &query.order_by)?;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let mut output: Vec<Vec<Scalar>> = output.into_iter().skip(offset).collect();
        if let Some(limit) = query.limit {
            output.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        let mut result = RowSet::new(columns, output);
        result.scanned_count = base.len();
        Ok(result)
    }

    fn sources<'q>(&'q self, query: &'q QueryDescriptor) -> ExecutorResult<Sources<'q>> {
        let mut sources = Sources {
            entries: Vec::with_capacity(query.joins.len() + 1),
        };
        sources.push(&query.from.alias, self.table(query.from.table)?)?;
        for join in &query.joins {
            sources.push(&join.table.alias, self.table(join.table.table)?)?;
        }
        Ok(sources)
    }

    fn table(&self, name: TableName) -> ExecutorResult<&'a Table> {
        self.tables
            .get(&name)
            .map(|t| t.as_ref())
            .ok_or_else(|| ExecutorError::ExecutionFailed(format!("table {} not loaded", name)))
    }

    /// Join source `index` onto the rows built so far
    fn hash_join(
        sources: &Sources<'_>,
        index: usize,
        join: &Join,
        rows: Vec<JoinedRow>,
    ) -> ExecutorResult<Vec<JoinedRow>> {
        let right = sources.table(index);

        let mut left_keys = Vec::with_capacity(join.on.len());
        let mut right_keys = Vec::with_capacity(join.on.len());
        for (l, r) in &join.on {
            let (ls, lc) = sources.resolve(l)?;
            let (rs, rc) = sources.resolve(r)?;
            if rs == index && ls < index {
                left_keys.push((ls, lc));
                right_keys.push(rc);
            } else if ls == index && rs < index {
                left_keys.push((rs, rc));
                right_keys.push(lc);
            } else {
                return Err(ExecutorError::ExecutionFailed(format!(
                    "join condition {} = {} does not link '{}' to an earlier table",
                    l, r, join.table.alias
                )));
            }
        }

        let filters = PredicateFilter::bind(sources, &join.filters)?;
        if let Some(p) = filters.iter().find(|p| p.source != index) {
            return Err(ExecutorError::ExecutionFailed(format!(
                "join filter on source {} must reference '{}'",
                p.source, join.table.alias
            )));
        }

        // Build side: null keys never match
        let mut lookup: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        for (r, values) in right.rows.iter().enumerate() {
            if !filters.iter().all(|p| p.op.matches(&values[p.column])) {
                continue;
            }
            let key: Option<Vec<String>> = right_keys.iter().map(|c| values[*c].key()).collect();
            if let Some(key) = key {
                lookup.entry(key).or_default().push(r);
            }
        }

        // Probe side, preserving left row order
        let mut joined = Vec::with_capacity(rows.len());
        for row in rows {
            let key: Option<Vec<String>> = left_keys
                .iter()
                .map(|(s, c)| sources.value(&row, *s, *c).key())
                .collect();
            match key.and_then(|k| lookup.get(&k)) {
                Some(matches) => {
                    for m in matches {
                        let mut combined = row.clone();
                        combined[index] = Some(*m);
                        joined.push(combined);
                    }
                }
                None if join.kind == JoinKind::Left => joined.push(row),
                None => {}
            }
        }
        Ok(joined)
    }

    fn bind_select(
        sources: &Sources<'_>,
        query: &QueryDescriptor,
    ) -> ExecutorResult<Vec<BoundExpr>> {
        query
            .select
            .iter()
            .map(|item| {
                Ok(match &item.expr {
                    SelectExpr::Column(c) => {
                        let (s, i) = sources.resolve(c)?;
                        BoundExpr::Column(s, i)
                    }
                    SelectExpr::Aggregate(Aggregate::Sum(c)) => {
                        let (s, i) = sources.resolve(c)?;
                        BoundExpr::Sum(s, i)
                    }
                    SelectExpr::Aggregate(Aggregate::Count) => BoundExpr::Count,
                    SelectExpr::Aggregate(Aggregate::CountDistinct(c)) => {
                        let (s, i) = sources.resolve(c)?;
                        BoundExpr::CountDistinct(s, i)
                    }
                    SelectExpr::Aggregate(Aggregate::Max(c)) => {
                        let (s, i) = sources.resolve(c)?;
                        BoundExpr::Max(s, i)
                    }
                })
            })
            .collect()
    }

    /// Group rows in first-seen order and evaluate the select list per group
    fn aggregate(
        sources: &Sources<'_>,
        query: &QueryDescriptor,
        exprs: &[BoundExpr],
        rows: &[JoinedRow],
    ) -> ExecutorResult<Vec<Vec<Scalar>>> {
        let keys = query
            .group_by
            .iter()
            .map(|c| sources.resolve(c))
            .collect::<ExecutorResult<Vec<_>>>()?;

        let mut groups: Vec<Group> = Vec::new();
        let mut index: HashMap<Vec<Option<String>>, usize> = HashMap::new();
        for row in rows {
            let key: Vec<Option<String>> =
                keys.iter().map(|(s, c)| sources.value(row, *s, *c).key()).collect();
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(Group {
                    first: Some(row.clone()),
                    accumulators: exprs.iter().map(Accumulator::for_expr).collect(),
                });
                groups.len() - 1
            });
            for (acc, expr) in groups[slot].accumulators.iter_mut().zip(exprs) {
                let value = match expr {
                    BoundExpr::Column(..) | BoundExpr::Count => &NULL,
                    BoundExpr::Sum(s, c)
                    | BoundExpr::CountDistinct(s, c)
                    | BoundExpr::Max(s, c) => sources.value(row, *s, *c),
                };
                acc.update(value);
            }
        }

        // Aggregates without GROUP BY yield one row even over no input
        if groups.is_empty() && keys.is_empty() {
            groups.push(Group {
                first: None,
                accumulators: exprs.iter().map(Accumulator::for_expr).collect(),
            });
        }

        Ok(groups
            .into_iter()
            .map(|group| {
                let first = group.first;
                group
                    .accumulators
                    .into_iter()
                    .zip(exprs)
                    .map(|(acc, expr)| match acc.finish() {
                        Some(value) => value,
                        None => match (expr, &first) {
                            (BoundExpr::Column(s, c), Some(row)) => {
                                sources.value(row, *s, *c).clone()
                            }
                            _ => Scalar::Null,
                        },
                    })
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{col, FilterOp, Join, SortSpec, TableRef};

    fn s(v: &str) -> Scalar {
        Scalar::str(v)
    }

    fn tables() -> HashMap<TableName, Arc<Table>> {
        let facilities = Table::from_rows(
            TableName::Facilities,
            &["facility_id", "year", "state", "facility_name"],
            vec![
                vec![s("1"), s("2022"), s("TX"), s("Alpha")],
                vec![s("2"), s("2022"), s("OK"), s("Bravo")],
                vec![s("3"), s("2022"), s("TX"), s("Charlie")],
                vec![s("1"), s("2021"), s("TX"), s("Alpha")],
            ],
        );
        let e = |id: &str, year: &str, sector: &str, code: &str, gas: &str, tons: f64| {
            vec![s(id), s(year), s(sector), s(code), s(gas), Scalar::Float(tons)]
        };
        let emissions = Table::from_rows(
            TableName::EmitterSector,
            &["facility_id", "year", "sector_name", "level2_code", "gas_name", "co2e_emission"],
            vec![
                e("1", "2022", "Power Plants", "PP1", "Carbon Dioxide", 100.0),
                e("1", "2022", "Power Plants", "PP1", "Methane", 50.0),
                e("1", "2022", "Power Plants", "PP1", "Biogenic CO2", 999.0),
                e("2", "2022", "Waste", "ZZZ", "Methane", 80.0),
                e("1", "2021", "Power Plants", "PP1", "Carbon Dioxide", 90.0),
            ],
        );
        let sectors = Table::from_rows(
            TableName::DimSector,
            &["sector_id", "sector_code", "sector_name", "sector_level"],
            vec![
                vec![s("1"), s("Power Plants"), s("Power Plants"), s("1")],
                vec![s("11"), s("PP1"), s("Electricity Generation"), s("2")],
            ],
        );
        let mut map = HashMap::new();
        map.insert(TableName::Facilities, Arc::new(facilities));
        map.insert(TableName::EmitterSector, Arc::new(emissions));
        map.insert(TableName::DimSector, Arc::new(sectors));
        map
    }

    fn run(query: &QueryDescriptor) -> RowSet {
        let tables = tables();
        QueryExecutor::new(&tables).execute(query).unwrap()
    }

    fn facility_totals() -> QueryDescriptor {
        QueryDescriptor::new("totals", TableName::Facilities, "f")
            .join(
                Join::new(JoinKind::Left, TableRef::new(TableName::EmitterSector, "e"))
                    .on(col("f", "facility_id"), col("e", "facility_id"))
                    .on(col("f", "year"), col("e", "year"))
                    .filter(Predicate::ne(col("e", "gas_name"), "Biogenic CO2")),
            )
            .filter(Predicate::eq(col("f", "year"), 2022i64))
            .group_by(col("f", "facility_id"))
            .column(col("f", "facility_id"), "facility_id")
            .aggregate(Aggregate::Sum(col("e", "co2e_emission")), "total")
            .order_by(SortSpec::desc("total"))
            .order_by(SortSpec::asc("facility_id"))
    }

    #[test]
    fn test_left_join_keeps_unmatched_with_null_total() {
        let rows = run(&facility_totals());
        let ids: Vec<i64> = rows.iter().map(|r| r.i64("facility_id").unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(rows.first().unwrap().f64("total"), Some(150.0));
        assert!(rows.iter().last().unwrap().get("total").is_null());
    }

    #[test]
    fn test_count_matches_rows_and_ignores_limit() {
        let query = facility_totals().with_limit(2).with_offset(1);
        let page = run(&query);
        assert_eq!(page.len(), 2);
        assert_eq!(run(&query.count()).count_value().unwrap(), 3);
    }

    #[test]
    fn test_inner_join_drops_unresolved_codes() {
        let query = QueryDescriptor::new("l2", TableName::EmitterSector, "e")
            .join(
                Join::new(JoinKind::Inner, TableRef::new(TableName::DimSector, "d"))
                    .on(col("e", "level2_code"), col("d", "sector_code"))
                    .filter(Predicate::eq(col("d", "sector_level"), 2i64)),
            )
            .filter(Predicate::ne(col("e", "gas_name"), "Biogenic CO2"))
            .group_by(col("d", "sector_code"))
            .column(col("d", "sector_code"), "category")
            .aggregate(Aggregate::Sum(col("e", "co2e_emission")), "total");
        let rows = run(&query);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().unwrap().text("category").as_deref(), Some("PP1"));
        assert_eq!(rows.first().unwrap().f64("total"), Some(240.0));
    }

    #[test]
    fn test_having_and_count_distinct() {
        let query = QueryDescriptor::new("sectors", TableName::EmitterSector, "e")
            .filter(Predicate::eq(col("e", "year"), 2022i64))
            .group_by(col("e", "sector_name"))
            .column(col("e", "sector_name"), "name")
            .aggregate(Aggregate::CountDistinct(col("e", "facility_id")), "facilities")
            .aggregate(Aggregate::Count, "rows")
            .having("rows", FilterOp::Gt(Scalar::Int(1)));
        let rows = run(&query);
        assert_eq!(rows.len(), 1);
        let row = rows.first().unwrap();
        assert_eq!(row.text("name").as_deref(), Some("Power Plants"));
        assert_eq!(row.i64("facilities"), Some(1));
        assert_eq!(row.i64("rows"), Some(3));
    }

    #[test]
    fn test_aggregate_without_group_over_no_rows() {
        let query = QueryDescriptor::new("none", TableName::EmitterSector, "e")
            .filter(Predicate::eq(col("e", "year"), 1999i64))
            .aggregate(Aggregate::Sum(col("e", "co2e_emission")), "total")
            .aggregate(Aggregate::Count, "n");
        let rows = run(&query);
        assert_eq!(rows.len(), 1);
        assert!(rows.first().unwrap().get("total").is_null());
        assert_eq!(rows.first().unwrap().i64("n"), Some(0));
    }

    #[test]
    fn test_distinct_projection() {
        let query = QueryDescriptor::new("states", TableName::Facilities, "f")
            .column(col("f", "state"), "state")
            .distinct()
            .order_by(SortSpec::asc("state"));
        let rows = run(&query);
        let states: Vec<String> = rows.iter().map(|r| r.text("state").unwrap()).collect();
        assert_eq!(states, vec!["OK", "TX"]);
    }

    #[test]
    fn test_max_picks_latest_year() {
        let query = QueryDescriptor::new("latest", TableName::Facilities, "f")
            .filter(Predicate::eq(col("f", "facility_id"), "1"))
            .aggregate(Aggregate::Max(col("f", "year")), "year");
        assert_eq!(run(&query).first().unwrap().i64("year"), Some(2022));
    }

    #[test]
    fn test_unknown_column_is_error() {
        let tables = tables();
        let query =
            QueryDescriptor::new("bad", TableName::Facilities, "f").column(col("f", "nope"), "x");
        assert!(matches!(
            QueryExecutor::new(&tables).execute(&query),
            Err(ExecutorError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_missing_table_is_error() {
        let tables = HashMap::new();
        let query = QueryDescriptor::new("q", TableName::Facilities, "f")
            .column(col("f", "state"), "state");
        assert!(QueryExecutor::new(&tables).execute(&query).is_err());
    }
}
