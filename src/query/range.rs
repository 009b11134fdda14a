//! Range leaf translation
//!
//! Compiles ordered comparisons into range leaves. When the constant sits
//! on the left the operator is mirrored, so the emitted leaf always reads
//! `field OP bound`. Date constants produce date ranges; everything else
//! must coerce to a numeric bound.

use chrono::{DateTime, Duration, Utc};

use crate::error::{KrillError, Result};
use crate::expr::{strip_convert, BinaryOp, Expr, Value};
use crate::query::dsl::{Query, RangeOp};
use crate::query::field;
use crate::schema::DocumentSchema;

/// Translate an ordered comparison into a range leaf
pub fn translate(op: BinaryOp, left: &Expr, right: &Expr, schema: &DocumentSchema) -> Result<Query> {
    let op = range_op(op);
    let left = strip_convert(left);
    let right = strip_convert(right);
    let (member, constant, op) = match (left, right) {
        (member @ Expr::Member { .. }, Expr::Constant(value)) => (member, value, op),
        // Constant on the left: 5 < x.Age reads as x.Age > 5.
        (Expr::Constant(value), member @ Expr::Member { .. }) => (member, value, op.mirrored()),
        _ => {
            return Err(KrillError::UnsupportedOperands {
                left: left.to_string(),
                right: right.to_string(),
            })
        }
    };
    let path = field::resolve_path(member, schema)?;
    bound(path, op, constant)
}

fn range_op(op: BinaryOp) -> RangeOp {
    match op {
        BinaryOp::Gt => RangeOp::Gt,
        BinaryOp::Ge => RangeOp::Gte,
        BinaryOp::Lt => RangeOp::Lt,
        BinaryOp::Le => RangeOp::Lte,
        other => unreachable!("non-ordered operator {other} routed to range translation"),
    }
}

fn bound(field: String, op: RangeOp, constant: &Value) -> Result<Query> {
    match constant {
        Value::Date(date) => Ok(Query::DateRange {
            field,
            op,
            bound: nudge(*date),
        }),
        other => match other.as_f64() {
            Some(bound) => Ok(Query::NumericRange { field, op, bound }),
            None => Err(KrillError::InvalidRangeBound(other.to_string())),
        },
    }
}

/// An uninitialized date bound sits at the minimum representable instant,
/// which the engine's date parser refuses; move it forward one minute.
fn nudge(date: DateTime<Utc>) -> DateTime<Utc> {
    let floor = DateTime::<Utc>::MIN_UTC + Duration::minutes(1);
    if date < floor {
        floor
    } else {
        date
    }
}
