//! Compiled query nodes
//!
//! The tagged union produced by the filter translator: term/exists/range
//! leaves and and/or/not combinators. Combinators are associative but never
//! flattened; the compiled tree mirrors the predicate's shape. `to_dsl`
//! renders the engine wire form used in outgoing request bodies.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::expr::Value;

/// Ordered comparison operator of a range leaf
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeOp {
    /// Wire key inside a `range` clause
    pub fn key(self) -> &'static str {
        match self {
            RangeOp::Gt => "gt",
            RangeOp::Gte => "gte",
            RangeOp::Lt => "lt",
            RangeOp::Lte => "lte",
        }
    }

    /// Operator with its operand order swapped (`>` becomes `<`, and so on)
    pub fn mirrored(self) -> Self {
        match self {
            RangeOp::Gt => RangeOp::Lt,
            RangeOp::Gte => RangeOp::Lte,
            RangeOp::Lt => RangeOp::Gt,
            RangeOp::Lte => RangeOp::Gte,
        }
    }
}

/// A compiled query: a leaf primitive or a boolean composition
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    /// Exact match on a field (or its `.keyword` sibling)
    Term { field: String, value: Value },
    /// Negated existence check; compiled from `== null` comparisons
    NotExists { field: String },
    NumericRange {
        field: String,
        op: RangeOp,
        bound: f64,
    },
    DateRange {
        field: String,
        op: RangeOp,
        bound: DateTime<Utc>,
    },
    And(Box<Query>, Box<Query>),
    Or(Box<Query>, Box<Query>),
    Not(Box<Query>),
    /// Free-text query over full-text-tagged fields; built by the
    /// repository layer, never by the filter translator
    QueryString { query: String, fields: Vec<String> },
}

impl Query {
    /// Create a term leaf
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a negated existence leaf
    pub fn not_exists(field: impl Into<String>) -> Self {
        Query::NotExists {
            field: field.into(),
        }
    }

    pub fn and(self, other: Query) -> Self {
        Query::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Query) -> Self {
        Query::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Query::Not(Box::new(self))
    }

    /// AND together the present parts, or `None` when all are absent
    pub fn and_all(parts: Vec<Option<Query>>) -> Option<Query> {
        parts
            .into_iter()
            .flatten()
            .reduce(|acc, next| acc.and(next))
    }

    /// Render into the engine's wire form
    pub fn to_dsl(&self) -> serde_json::Value {
        match self {
            Query::Term { field, value } => json!({
                "term": { field.clone(): { "value": value.to_json() } }
            }),
            Query::NotExists { field } => json!({
                "bool": { "must_not": [ { "exists": { "field": field } } ] }
            }),
            Query::NumericRange { field, op, bound } => json!({
                "range": { field.clone(): { op.key(): bound } }
            }),
            Query::DateRange { field, op, bound } => json!({
                "range": { field.clone(): {
                    op.key(): bound.to_rfc3339_opts(SecondsFormat::Millis, true)
                } }
            }),
            Query::And(left, right) => json!({
                "bool": { "must": [ left.to_dsl(), right.to_dsl() ] }
            }),
            Query::Or(left, right) => json!({
                "bool": { "should": [ left.to_dsl(), right.to_dsl() ], "minimum_should_match": 1 }
            }),
            Query::Not(inner) => json!({
                "bool": { "must_not": [ inner.to_dsl() ] }
            }),
            Query::QueryString { query, fields } => json!({
                "query_string": {
                    "query": query,
                    "fields": fields,
                    "default_operator": "and"
                }
            }),
        }
    }
}

/// Sort direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortOrder {
    pub fn key(self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// A single-field sort specification
///
/// At most one sort field is active per query; the direction is set by the
/// repository after translation.
#[derive(Clone, Debug, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub order: Option<SortOrder>,
}

impl SortSpec {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: None,
        }
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Render into the engine's wire form for the `sort` request section
    pub fn to_dsl(&self) -> serde_json::Value {
        let order = self.order.unwrap_or(SortOrder::Ascending);
        json!({ self.field.clone(): { "order": order.key() } })
    }
}
