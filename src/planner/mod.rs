//! Query planning
//!
//! Validates report requests and turns them into typed query descriptors.
//!
//! # Design Principles
//!
//! - Omitted filters are wildcards: no predicate is emitted
//! - Literals travel as typed values, never spliced into query text
//! - Count queries derive from the same descriptor as the rows they count
//! - Deterministic: same request, same descriptors

mod ast;
mod builder;
mod errors;
mod explain;
mod request;

pub use ast::{
    col, Aggregate, ColumnRef, FilterOp, Having, Join, JoinKind, OutputMode, Predicate,
    QueryDescriptor, Scalar, SelectExpr, SelectItem, SortDirection, SortSpec, TableName, TableRef,
};
pub use builder::{EndpointKind, ExportMode, QueryBuilder, SectorLevel, TrendSector, BIOGENIC_CO2};
pub use errors::{PlannerError, PlannerResult};
pub use explain::{render_sql, ExplainPlan};
pub use request::{normalize_state, Lenient, Page, ReportBody, ReportRequest, RequestLimits};
