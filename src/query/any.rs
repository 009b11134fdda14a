//! Nested-collection `any` translation
//!
//! Compiles `collection.any(p => …)` into term leaves over the flattened
//! nested path, and the parameterless `collection.any()` into an existence
//! check on the collection field itself.

use crate::error::{KrillError, Result};
use crate::expr::{strip_convert, BinaryOp, Expr, Method, Value};
use crate::query::dsl::Query;
use crate::query::field;
use crate::schema::DocumentSchema;

/// Translate an `any` call over a nested collection
pub fn translate(
    collection: &Expr,
    body: Option<&Expr>,
    schema: &DocumentSchema,
) -> Result<Query> {
    let Some(body) = body else {
        // Parameterless form tests for collection absence.
        let resolved = field::resolve_any(collection, None, schema)?;
        return Ok(Query::not_exists(resolved.name));
    };
    match body {
        Expr::Binary {
            op: BinaryOp::Eq,
            left,
            right,
        } => inner_equality(collection, left, right, schema),
        Expr::Call {
            method: Method::Contains,
            target: Some(target),
            args,
        } if args.len() == 1 => inner_contains(collection, target, &args[0], schema),
        other => Err(KrillError::UnsupportedNode {
            kind: other.kind(),
            expression: other.to_string(),
        }),
    }
}

/// `p.Member == constant` inside the lambda
fn inner_equality(
    collection: &Expr,
    left: &Expr,
    right: &Expr,
    schema: &DocumentSchema,
) -> Result<Query> {
    let (member, constant) = orient(left, right)?;
    match constant {
        Value::Null => {
            let resolved = field::resolve_any(collection, member, schema)?;
            Ok(Query::not_exists(resolved.name))
        }
        Value::List(items) => {
            let resolved = field::resolve_any(collection, member, schema)?;
            terms_of(resolved.name, items, left, right)
        }
        other => {
            let resolved = field::resolve_any(collection, member, schema)?;
            Ok(Query::term(resolved.name, other.clone()))
        }
    }
}

/// `literal_list.contains(p.Member)` inside the lambda
fn inner_contains(
    collection: &Expr,
    target: &Expr,
    arg: &Expr,
    schema: &DocumentSchema,
) -> Result<Query> {
    let (member, constant) = orient(target, arg)?;
    match constant {
        Value::List(items) => {
            let resolved = field::resolve_any(collection, member, schema)?;
            terms_of(resolved.name, items, target, arg)
        }
        other => Err(KrillError::UnsupportedOperands {
            left: target.to_string(),
            right: other.to_string(),
        }),
    }
}

/// Split an operand pair into the element-member side and the constant side
///
/// A bare element parameter (collection of primitives) is legal and yields
/// no inner member.
fn orient<'e>(left: &'e Expr, right: &'e Expr) -> Result<(Option<&'e Expr>, &'e Value)> {
    let left = strip_convert(left);
    let right = strip_convert(right);
    match (left, right) {
        (member @ Expr::Member { .. }, Expr::Constant(value)) => Ok((Some(member), value)),
        (Expr::Constant(value), member @ Expr::Member { .. }) => Ok((Some(member), value)),
        (Expr::Parameter(_), Expr::Constant(value)) => Ok((None, value)),
        (Expr::Constant(value), Expr::Parameter(_)) => Ok((None, value)),
        _ => Err(KrillError::UnsupportedOperands {
            left: left.to_string(),
            right: right.to_string(),
        }),
    }
}

/// OR together one term per distinct element, preserving first-seen order
fn terms_of(name: String, items: &[Value], left: &Expr, right: &Expr) -> Result<Query> {
    let mut seen: Vec<&Value> = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen.into_iter()
        .map(|item| Query::term(name.clone(), item.clone()))
        .reduce(Query::or)
        .ok_or_else(|| KrillError::UnsupportedOperands {
            left: left.to_string(),
            right: right.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::schema::FieldKind;

    fn schema() -> DocumentSchema {
        DocumentSchema::builder()
            .field("tags", FieldKind::StrList)
            .field("phones", FieldKind::Collection)
            .field("phones.number", FieldKind::Str)
            .field("phones.extension", FieldKind::Int)
            .build()
    }

    fn phones() -> Expr {
        Expr::parameter("x").member("Phones")
    }

    #[test]
    fn test_inner_equality_term() {
        let body = Expr::parameter("p")
            .member("Number")
            .eq(Expr::constant("555"));
        let query = translate(&phones(), Some(&body), &schema()).unwrap();
        assert_eq!(query, Query::term("phones.number.keyword", "555"));
    }

    #[test]
    fn test_inner_equality_null() {
        let body = Expr::parameter("p").member("Number").eq(Expr::null());
        let query = translate(&phones(), Some(&body), &schema()).unwrap();
        assert_eq!(query, Query::not_exists("phones.number.keyword"));
    }

    #[test]
    fn test_inner_list_becomes_or_of_terms() {
        let body = Expr::parameter("p")
            .member("Number")
            .eq(Expr::constant(vec!["555", "777"]));
        let query = translate(&phones(), Some(&body), &schema()).unwrap();
        assert_eq!(
            query,
            Query::term("phones.number.keyword", "555")
                .or(Query::term("phones.number.keyword", "777"))
        );
    }

    #[test]
    fn test_inner_contains() {
        let body = Expr::constant(vec!["555", "777"])
            .contains(Expr::parameter("p").member("Number"));
        let query = translate(&phones(), Some(&body), &schema()).unwrap();
        assert_eq!(
            query,
            Query::term("phones.number.keyword", "555")
                .or(Query::term("phones.number.keyword", "777"))
        );
    }

    #[test]
    fn test_primitive_element_parameter() {
        // x.Tags.any(t => t == "red")
        let body = Expr::parameter("t").eq(Expr::constant("red"));
        let tags = Expr::parameter("x").member("Tags");
        let query = translate(&tags, Some(&body), &schema()).unwrap();
        assert_eq!(query, Query::term("tags.keyword", "red"));
    }

    #[test]
    fn test_parameterless_any_is_not_exists() {
        let query = translate(&phones(), None, &schema()).unwrap();
        assert_eq!(query, Query::not_exists("phones"));
    }

    #[test]
    fn test_empty_list_rejected() {
        let body = Expr::parameter("p")
            .member("Number")
            .eq(Expr::Constant(Value::List(Vec::new())));
        assert!(translate(&phones(), Some(&body), &schema()).is_err());
    }

    #[test]
    fn test_unsupported_body_rejected() {
        let body = Expr::parameter("p")
            .member("Extension")
            .gt(Expr::constant(100));
        let err = translate(&phones(), Some(&body), &schema()).unwrap_err();
        assert!(matches!(err, KrillError::UnsupportedNode { .. }));
    }
}
