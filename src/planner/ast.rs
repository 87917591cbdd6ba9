//! Typed query descriptors
//!
//! A descriptor names its tables, joins, predicates, grouping, ordering and
//! bounds. It is executed by the in-process engine and rendered as SQL text
//! only for explain output. Literal values never pass through a query string.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// Tables of the published dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableName {
    /// One row per facility per reporting year
    Facilities,
    /// Emission fact rows
    EmitterSector,
    /// Sector hierarchy
    DimSector,
}

impl TableName {
    /// Physical table name in the bucket
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Facilities => "RLPS_GHG_EMITTER_FACILITIES",
            TableName::EmitterSector => "RLPS_GHG_EMITTER_SECTOR",
            TableName::DimSector => "PUB_DIM_SECTOR",
        }
    }

    pub fn all() -> [TableName; 3] {
        [TableName::Facilities, TableName::EmitterSector, TableName::DimSector]
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scalar cell value
///
/// Columns may be stored as text or numbers. Comparisons are numeric when
/// both sides parse as numbers and textual otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    pub fn str(value: impl Into<String>) -> Self {
        Scalar::Str(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric view of the value, parsing text when needed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Null | Scalar::Bool(_) => None,
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
                }
            }
        }
    }

    /// Integer view of the value; fractional numbers are rejected
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            other => other
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64),
        }
    }

    /// Text view of the value; `None` for null
    pub fn as_text(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Int(i) => Some(i.to_string()),
            Scalar::Float(f) => Some(format_float(*f)),
            Scalar::Str(s) => Some(s.clone()),
        }
    }

    /// Normalised key used for joins, grouping and DISTINCT.
    ///
    /// `1001`, `1001.0` and `"1001"` share a key; null has none.
    pub fn key(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(b) => Some(format!("b:{}", b)),
            _ => match self.as_f64() {
                Some(f) => Some(format!("n:{}", format_float(f))),
                None => self.as_text().map(|s| format!("s:{}", s)),
            },
        }
    }

    /// SQL-style comparison: `None` when either side is null
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => Some(self.as_text()?.cmp(&other.as_text()?)),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "NULL"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value as i64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

/// A source table with its alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub table: TableName,
    pub alias: String,
}

impl TableRef {
    pub fn new(table: TableName, alias: impl Into<String>) -> Self {
        Self {
            table,
            alias: alias.into(),
        }
    }
}

/// `alias.column`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.column)
    }
}

/// Shorthand for `ColumnRef::new`
pub fn col(alias: &str, column: &str) -> ColumnRef {
    ColumnRef::new(alias, column)
}

/// Filter operation types
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// field = value
    Eq(Scalar),
    /// field != value
    Ne(Scalar),
    /// field IN (values)
    In(Vec<Scalar>),
    /// field IS NOT NULL AND field != ''
    NotEmpty,
    /// field > value
    Gt(Scalar),
    /// field >= value
    Gte(Scalar),
    /// field <= value
    Lte(Scalar),
}

impl FilterOp {
    /// Returns the operation name for explain output
    pub fn op_name(&self) -> &'static str {
        match self {
            FilterOp::Eq(_) => "eq",
            FilterOp::Ne(_) => "ne",
            FilterOp::In(_) => "in",
            FilterOp::NotEmpty => "not_empty",
            FilterOp::Gt(_) => "gt",
            FilterOp::Gte(_) => "gte",
            FilterOp::Lte(_) => "lte",
        }
    }

    /// Evaluate against a value. Null never matches.
    pub fn matches(&self, value: &Scalar) -> bool {
        if value.is_null() {
            return false;
        }
        match self {
            FilterOp::Eq(expected) => value.compare(expected) == Some(Ordering::Equal),
            FilterOp::Ne(expected) => matches!(
                value.compare(expected),
                Some(Ordering::Less) | Some(Ordering::Greater)
            ),
            FilterOp::In(options) => options
                .iter()
                .any(|o| value.compare(o) == Some(Ordering::Equal)),
            FilterOp::NotEmpty => value.as_text().map_or(false, |s| !s.trim().is_empty()),
            FilterOp::Gt(bound) => value.compare(bound) == Some(Ordering::Greater),
            FilterOp::Gte(bound) => matches!(
                value.compare(bound),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            ),
            FilterOp::Lte(bound) => matches!(
                value.compare(bound),
                Some(Ordering::Less) | Some(Ordering::Equal)
            ),
        }
    }
}

/// A single predicate (column + operation)
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: ColumnRef,
    pub op: FilterOp,
}

impl Predicate {
    pub fn eq(column: ColumnRef, value: impl Into<Scalar>) -> Self {
        Self {
            column,
            op: FilterOp::Eq(value.into()),
        }
    }

    pub fn ne(column: ColumnRef, value: impl Into<Scalar>) -> Self {
        Self {
            column,
            op: FilterOp::Ne(value.into()),
        }
    }

    pub fn is_in(column: ColumnRef, values: Vec<Scalar>) -> Self {
        Self {
            column,
            op: FilterOp::In(values),
        }
    }

    pub fn not_empty(column: ColumnRef) -> Self {
        Self {
            column,
            op: FilterOp::NotEmpty,
        }
    }

    pub fn gte(column: ColumnRef, value: impl Into<Scalar>) -> Self {
        Self {
            column,
            op: FilterOp::Gte(value.into()),
        }
    }

    pub fn lte(column: ColumnRef, value: impl Into<Scalar>) -> Self {
        Self {
            column,
            op: FilterOp::Lte(value.into()),
        }
    }
}

/// Join kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// An equi-join with optional ON-clause filters on the joined table
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    /// (left column, right column) pairs; the right side belongs to `table`
    pub on: Vec<(ColumnRef, ColumnRef)>,
    /// Filters applied to the joined table before matching
    pub filters: Vec<Predicate>,
}

impl Join {
    pub fn new(kind: JoinKind, table: TableRef) -> Self {
        Self {
            kind,
            table,
            on: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn on(mut self, left: ColumnRef, right: ColumnRef) -> Self {
        self.on.push((left, right));
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn filters(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.filters.extend(predicates);
        self
    }
}

/// Aggregate functions
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    /// Sum of numeric values; null when the group has none
    Sum(ColumnRef),
    /// Number of rows in the group
    Count,
    /// Number of distinct non-null values
    CountDistinct(ColumnRef),
    /// Largest non-null value
    Max(ColumnRef),
}

/// Select list expression
#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    Column(ColumnRef),
    Aggregate(Aggregate),
}

/// An output column
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: SelectExpr,
    pub alias: String,
}

/// Filter on an output column, applied after grouping
#[derive(Debug, Clone, PartialEq)]
pub struct Having {
    pub column: String,
    pub op: FilterOp,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort key over an output column. Nulls sort last in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// What the engine returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// The selected rows
    Rows,
    /// A single `count` column holding the number of rows before limit/offset
    Count,
}

/// A complete typed query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    /// Short name used in logs and explain output
    pub label: String,
    pub from: TableRef,
    pub joins: Vec<Join>,
    /// WHERE predicates (AND)
    pub predicates: Vec<Predicate>,
    pub group_by: Vec<ColumnRef>,
    pub select: Vec<SelectItem>,
    pub having: Vec<Having>,
    pub order_by: Vec<SortSpec>,
    pub limit: Option<u64>,
    pub offset: u64,
    pub distinct: bool,
    pub output: OutputMode,
}

impl QueryDescriptor {
    /// Creates a new descriptor reading `table` as `alias`
    pub fn new(label: impl Into<String>, table: TableName, alias: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            from: TableRef::new(table, alias),
            joins: Vec::new(),
            predicates: Vec::new(),
            group_by: Vec::new(),
            select: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: 0,
            distinct: false,
            output: OutputMode::Rows,
        }
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn filters(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn group_by(mut self, column: ColumnRef) -> Self {
        self.group_by.push(column);
        self
    }

    /// Select a plain column
    pub fn column(mut self, column: ColumnRef, alias: impl Into<String>) -> Self {
        self.select.push(SelectItem {
            expr: SelectExpr::Column(column),
            alias: alias.into(),
        });
        self
    }

    /// Select an aggregate
    pub fn aggregate(mut self, aggregate: Aggregate, alias: impl Into<String>) -> Self {
        self.select.push(SelectItem {
            expr: SelectExpr::Aggregate(aggregate),
            alias: alias.into(),
        });
        self
    }

    pub fn having(mut self, column: impl Into<String>, op: FilterOp) -> Self {
        self.having.push(Having {
            column: column.into(),
            op,
        });
        self
    }

    pub fn order_by(mut self, sort: SortSpec) -> Self {
        self.order_by.push(sort);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// True when any select item aggregates
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty()
            || self
                .select
                .iter()
                .any(|s| matches!(s.expr, SelectExpr::Aggregate(_)))
    }

    /// The count-of-rows query over the same sources, joins and predicates.
    ///
    /// Ordering and bounds are dropped; grouping, HAVING and DISTINCT are kept
    /// so the count matches the number of rows the paged query can return.
    pub fn count(&self) -> QueryDescriptor {
        let mut counted = self.clone();
        counted.label = format!("{}_count", self.label);
        counted.order_by.clear();
        counted.limit = None;
        counted.offset = 0;
        counted.output = OutputMode::Count;
        counted
    }

    /// Tables read by this descriptor, without duplicates, in first-use order
    pub fn tables(&self) -> Vec<TableName> {
        let mut tables = vec![self.from.table];
        for join in &self.joins {
            if !tables.contains(&join.table.table) {
                tables.push(join.table.table);
            }
        }
        tables
    }

    /// Output column names in select order
    pub fn output_columns(&self) -> Vec<&str> {
        self.select.iter().map(|s| s.alias.as_str()).collect()
    }
}
