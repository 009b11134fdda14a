//! Equality leaf translation
//!
//! Compiles `member == constant` (either operand order) into a term leaf,
//! or a negated existence check when the constant is null. Case-insensitive
//! comparisons arrive as a `to_lower` call wrapping the member; the call is
//! stripped and the keyword heuristic switches accordingly.

use crate::error::{KrillError, Result};
use crate::expr::{strip_convert, Expr, Method, Value};
use crate::query::dsl::Query;
use crate::query::field;
use crate::schema::DocumentSchema;

/// Translate an equality between two operands into a query leaf
pub fn translate(left: &Expr, right: &Expr, schema: &DocumentSchema) -> Result<Query> {
    let (member, constant, to_lower) = split(left, right)?;
    if constant.is_null() {
        // Null comparisons test for field absence on the bare path.
        return Ok(Query::not_exists(field::resolve_path(member, schema)?));
    }
    let resolved = field::resolve(member, schema, to_lower)?;
    Ok(Query::term(resolved.name, constant.clone()))
}

/// Orient the operands into (member side, constant side, to_lower flag)
pub(crate) fn split<'e>(left: &'e Expr, right: &'e Expr) -> Result<(&'e Expr, &'e Value, bool)> {
    let left = strip_convert(left);
    let right = strip_convert(right);
    match (member_side(left), right) {
        (Some((member, to_lower)), Expr::Constant(value)) => return Ok((member, value, to_lower)),
        _ => {}
    }
    match (left, member_side(right)) {
        (Expr::Constant(value), Some((member, to_lower))) => return Ok((member, value, to_lower)),
        _ => {}
    }
    Err(KrillError::UnsupportedOperands {
        left: left.to_string(),
        right: right.to_string(),
    })
}

/// A member chain, optionally wrapped in a case-normalizing call
pub(crate) fn member_side(expr: &Expr) -> Option<(&Expr, bool)> {
    match expr {
        Expr::Member { .. } => Some((expr, false)),
        Expr::Call {
            method: Method::ToLower,
            target: Some(target),
            args,
        } if args.is_empty() => match strip_convert(target) {
            member @ Expr::Member { .. } => Some((member, true)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    fn schema() -> DocumentSchema {
        DocumentSchema::builder()
            .field("name", FieldKind::Str)
            .field("email", FieldKind::Str)
            .field("age", FieldKind::Int)
            .field("owner", FieldKind::Str)
            .build()
    }

    #[test]
    fn test_member_eq_constant() {
        let member = Expr::parameter("x").member("Name");
        let constant = Expr::constant("Bob");
        let query = translate(&member, &constant, &schema()).unwrap();
        assert_eq!(query, Query::term("name.keyword", "Bob"));
    }

    #[test]
    fn test_constant_on_left() {
        let member = Expr::parameter("x").member("Name");
        let constant = Expr::constant("Bob");
        let query = translate(&constant, &member, &schema()).unwrap();
        assert_eq!(query, Query::term("name.keyword", "Bob"));
    }

    #[test]
    fn test_null_becomes_not_exists() {
        let member = Expr::parameter("x").member("Owner");
        let query = translate(&member, &Expr::null(), &schema()).unwrap();
        assert_eq!(query, Query::not_exists("owner"));
    }

    #[test]
    fn test_to_lower_drops_keyword_and_keeps_value() {
        // the constant passes through untouched; case folding is the
        // caller's responsibility when building the predicate
        let member = Expr::parameter("x").member("Name").to_lower();
        let constant = Expr::constant("bob");
        let query = translate(&member, &constant, &schema()).unwrap();
        assert_eq!(query, Query::term("name", "bob"));
    }

    #[test]
    fn test_to_lower_email_keeps_keyword() {
        let member = Expr::parameter("x").member("Email").to_lower();
        let constant = Expr::constant("Bob@Example.com");
        let query = translate(&member, &constant, &schema()).unwrap();
        assert_eq!(query, Query::term("email.keyword", "Bob@Example.com"));
    }

    #[test]
    fn test_two_constants_rejected() {
        let err = translate(&Expr::constant(1), &Expr::constant(2), &schema()).unwrap_err();
        assert!(matches!(err, KrillError::UnsupportedOperands { .. }));
    }

    #[test]
    fn test_converted_member_accepted() {
        let member = Expr::parameter("x").member("Age").convert();
        let query = translate(&member, &Expr::constant(7), &schema()).unwrap();
        assert_eq!(query, Query::term("age", 7));
    }
}
