//! Explain output
//!
//! Renders descriptors as SQL text for logs and the `explain` command. The
//! text is never executed. Identifiers outside `[a-z_][a-z0-9_]*` are double
//! quoted and string literals are single quoted with embedded quotes doubled.

use std::fmt;

use super::ast::{
    Aggregate, FilterOp, Join, JoinKind, OutputMode, Predicate, QueryDescriptor, Scalar, SelectExpr,
};

/// Explain plan output
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainPlan {
    pub label: String,
    pub tables: Vec<String>,
    pub sql: String,
}

impl ExplainPlan {
    pub fn from_descriptor(query: &QueryDescriptor) -> Self {
        Self {
            label: query.label.clone(),
            tables: query.tables().iter().map(|t| t.as_str().to_string()).collect(),
            sql: render_sql(query),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN {} ===", self.label)?;
        writeln!(f, "Tables: {}", self.tables.join(", "))?;
        writeln!(f, "{}", self.sql)
    }
}

/// Render a descriptor as a single SQL statement
pub fn render_sql(query: &QueryDescriptor) -> String {
    let mut sql = String::new();

    let select_list = if query.select.is_empty() {
        "*".to_string()
    } else {
        query
            .select
            .iter()
            .map(|item| format!("{} AS {}", render_expr(&item.expr), ident(&item.alias)))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let distinct = if query.distinct { "DISTINCT " } else { "" };

    sql.push_str(&format!(
        "SELECT {}{} FROM {} AS {}",
        distinct,
        select_list,
        ident(query.from.table.as_str()),
        ident(&query.from.alias)
    ));

    for join in &query.joins {
        sql.push(' ');
        sql.push_str(&render_join(join));
    }

    if !query.predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&render_predicates(&query.predicates));
    }

    if !query.group_by.is_empty() {
        let keys: Vec<String> = query
            .group_by
            .iter()
            .map(|c| format!("{}.{}", ident(&c.alias), ident(&c.column)))
            .collect();
        sql.push_str(&format!(" GROUP BY {}", keys.join(", ")));
    }

    if !query.having.is_empty() {
        let clauses: Vec<String> = query
            .having
            .iter()
            .map(|h| render_condition(&ident(&h.column), &h.op))
            .collect();
        sql.push_str(&format!(" HAVING {}", clauses.join(" AND ")));
    }

    if !query.order_by.is_empty() {
        let keys: Vec<String> = query
            .order_by
            .iter()
            .map(|s| {
                format!("{} {} NULLS LAST", ident(&s.field), s.direction.as_str().to_uppercase())
            })
            .collect();
        sql.push_str(&format!(" ORDER BY {}", keys.join(", ")));
    }

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    if query.offset > 0 {
        sql.push_str(&format!(" OFFSET {}", query.offset));
    }

    match query.output {
        OutputMode::Rows => sql,
        OutputMode::Count => format!("SELECT COUNT(*) AS \"count\" FROM ({}) AS counted", sql),
    }
}

fn render_join(join: &Join) -> String {
    let kind = match join.kind {
        JoinKind::Inner => "INNER JOIN",
        JoinKind::Left => "LEFT JOIN",
    };
    let mut conditions: Vec<String> = join
        .on
        .iter()
        .map(|(l, r)| {
            format!(
                "{}.{} = {}.{}",
                ident(&l.alias),
                ident(&l.column),
                ident(&r.alias),
                ident(&r.column)
            )
        })
        .collect();
    conditions.extend(join.filters.iter().map(render_predicate));
    if conditions.is_empty() {
        conditions.push("TRUE".to_string());
    }
    format!(
        "{} {} AS {} ON {}",
        kind,
        ident(join.table.table.as_str()),
        ident(&join.table.alias),
        conditions.join(" AND ")
    )
}

fn render_expr(expr: &SelectExpr) -> String {
    match expr {
        SelectExpr::Column(c) => format!("{}.{}", ident(&c.alias), ident(&c.column)),
        SelectExpr::Aggregate(agg) => match agg {
            Aggregate::Sum(c) => {
                format!("SUM(CAST({}.{} AS DOUBLE))", ident(&c.alias), ident(&c.column))
            }
            Aggregate::Count => "COUNT(*)".to_string(),
            Aggregate::CountDistinct(c) => {
                format!("COUNT(DISTINCT {}.{})", ident(&c.alias), ident(&c.column))
            }
            Aggregate::Max(c) => format!("MAX({}.{})", ident(&c.alias), ident(&c.column)),
        },
    }
}

fn render_predicates(predicates: &[Predicate]) -> String {
    predicates
        .iter()
        .map(render_predicate)
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn render_predicate(predicate: &Predicate) -> String {
    let column = format!("{}.{}", ident(&predicate.column.alias), ident(&predicate.column.column));
    render_condition(&column, &predicate.op)
}

fn render_condition(column: &str, op: &FilterOp) -> String {
    match op {
        FilterOp::Eq(v) => format!("{} = {}", column, literal(v)),
        FilterOp::Ne(v) => format!("{} != {}", column, literal(v)),
        FilterOp::In(values) => {
            let list: Vec<String> = values.iter().map(literal).collect();
            format!("{} IN ({})", column, list.join(", "))
        }
        FilterOp::NotEmpty => format!("({} IS NOT NULL AND {} != '')", column, column),
        FilterOp::Gt(v) => format!("{} > {}", column, literal(v)),
        FilterOp::Gte(v) => format!("{} >= {}", column, literal(v)),
        FilterOp::Lte(v) => format!("{} <= {}", column, literal(v)),
    }
}

/// Quote an identifier unless it is a plain lower-case name
pub fn ident(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Render a literal. Text is always quoted, even when it looks numeric.
pub fn literal(value: &Scalar) -> String {
    match value {
        Scalar::Null => "NULL".to_string(),
        Scalar::Bool(b) => b.to_string().to_uppercase(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) if f.is_finite() => f.to_string(),
        Scalar::Float(_) => "NULL".to_string(),
        Scalar::Str(s) => format!("'{}'", s.replace('\'', "''")),
    }
}
