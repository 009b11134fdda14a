//! Sort translation
//!
//! An ordering selector is a bare member chain, optionally behind one
//! conversion wrapper. At most one direction may be requested per query.

use crate::error::{KrillError, Result};
use crate::expr::{strip_convert, Expr};
use crate::query::dsl::{SortOrder, SortSpec};
use crate::query::field;
use crate::schema::DocumentSchema;

/// Translate an ordering selector into a direction-less sort spec
pub fn translate(selector: &Expr, schema: &DocumentSchema) -> Result<SortSpec> {
    let selector = strip_convert(selector);
    match selector {
        Expr::Member { .. } => {
            let resolved = field::resolve(selector, schema, false)?;
            Ok(SortSpec::new(resolved.name))
        }
        other => Err(KrillError::UnsupportedNode {
            kind: other.kind(),
            expression: other.to_string(),
        }),
    }
}

/// Combine the two direction arguments into at most one sort spec
pub fn sort_for(
    order_by: Option<&Expr>,
    order_by_desc: Option<&Expr>,
    schema: &DocumentSchema,
) -> Result<Option<SortSpec>> {
    match (order_by, order_by_desc) {
        (Some(_), Some(_)) => Err(KrillError::ConflictingSort),
        (Some(selector), None) => Ok(Some(
            translate(selector, schema)?.with_order(SortOrder::Ascending),
        )),
        (None, Some(selector)) => Ok(Some(
            translate(selector, schema)?.with_order(SortOrder::Descending),
        )),
        (None, None) => Ok(None),
    }
}
