//! Predicate compilation into the search engine's query DSL
//!
//! Pipeline: partial evaluation folds closed sub-trees to constants, the
//! guardian validates the remaining shape, and the filter translator
//! recursively lowers it into term/range/exists leaves and boolean
//! combinators. Compilation is deterministic and idempotent; it never
//! touches the network.

mod any;
mod equality;
mod range;
mod related;

pub mod aggregation;
pub mod dsl;
pub mod field;
pub mod filter;
pub mod sort;

pub use aggregation::DedupAggregation;
pub use dsl::{Query, RangeOp, SortOrder, SortSpec};
pub use field::ResolvedField;

use crate::error::Result;
use crate::expr::{eval, Expr};
use crate::schema::DocumentSchema;

/// Compile a predicate into a query tree
///
/// Accepts either a lambda (`x => body`) or a bare predicate body.
pub fn compile(predicate: &Expr, schema: &DocumentSchema) -> Result<Query> {
    let evaluated = eval::evaluate(predicate)?;
    let body = match &evaluated {
        Expr::Lambda { body, .. } => body.as_ref(),
        other => other,
    };
    filter::translate(body, schema)
}
