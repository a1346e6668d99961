//! # List Filters
//!
//! Narrow filter support for repository `list_with` queries: equal, in,
//! like, less-than, greater-than. Filters render to parameterized SQL via
//! `sqlx::QueryBuilder`; values are always bound, never interpolated.

use sqlx::{QueryBuilder, Sqlite};

/// A bindable filter value.
#[derive(Debug, Clone)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Real(f64),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Real(value)
    }
}

/// Supported filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    In,
    Like,
    LessThan,
    GreaterThan,
}

/// A single column filter.
///
/// Columns are `'static` names supplied by repository code, not user input.
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: &'static str,
    pub op: FilterOp,
    pub values: Vec<FilterValue>,
}

impl Filter {
    pub fn equal(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Self {
            column,
            op: FilterOp::Equal,
            values: vec![value.into()],
        }
    }

    pub fn is_in(column: &'static str, values: Vec<FilterValue>) -> Self {
        Self {
            column,
            op: FilterOp::In,
            values,
        }
    }

    pub fn like(column: &'static str, pattern: impl Into<String>) -> Self {
        Self {
            column,
            op: FilterOp::Like,
            values: vec![FilterValue::Text(pattern.into())],
        }
    }

    pub fn less_than(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Self {
            column,
            op: FilterOp::LessThan,
            values: vec![value.into()],
        }
    }

    pub fn greater_than(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Self {
            column,
            op: FilterOp::GreaterThan,
            values: vec![value.into()],
        }
    }
}

/// Options for `list_with` repository queries.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub filters: Vec<Filter>,
    pub order_by: Option<&'static str>,
    pub limit: Option<i64>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order_by: &'static str) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &FilterValue) {
    match value {
        FilterValue::Text(v) => builder.push_bind(v.clone()),
        FilterValue::Int(v) => builder.push_bind(*v),
        FilterValue::Real(v) => builder.push_bind(*v),
    };
}

/// Append `WHERE`/`ORDER BY`/`LIMIT` clauses to a base query.
pub fn apply_options(builder: &mut QueryBuilder<'_, Sqlite>, opts: &ListOptions) {
    for (idx, filter) in opts.filters.iter().enumerate() {
        builder.push(if idx == 0 { " WHERE " } else { " AND " });
        builder.push(filter.column);

        match filter.op {
            FilterOp::Equal => {
                builder.push(" = ");
                push_value(builder, &filter.values[0]);
            }
            FilterOp::Like => {
                builder.push(" LIKE ");
                push_value(builder, &filter.values[0]);
            }
            FilterOp::LessThan => {
                builder.push(" < ");
                push_value(builder, &filter.values[0]);
            }
            FilterOp::GreaterThan => {
                builder.push(" > ");
                push_value(builder, &filter.values[0]);
            }
            FilterOp::In => {
                builder.push(" IN (");
                let mut separated = builder.separated(", ");
                for value in &filter.values {
                    match value {
                        FilterValue::Text(v) => separated.push_bind(v.clone()),
                        FilterValue::Int(v) => separated.push_bind(*v),
                        FilterValue::Real(v) => separated.push_bind(*v),
                    };
                }
                builder.push(")");
            }
        }
    }

    if let Some(order_by) = opts.order_by {
        builder.push(" ORDER BY ");
        builder.push(order_by);
    }

    if let Some(limit) = opts.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
}
