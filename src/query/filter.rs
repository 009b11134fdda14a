//! Filter translation
//!
//! The dispatch layer of the compiler: validates the predicate body against
//! the guardian allow-list, then recursively descends it, routing each node
//! to the matching leaf translator. Translation is a pure function of the
//! body and the schema; identical inputs always compile to identical trees.

use crate::error::{KrillError, Result};
use crate::expr::{guardian, strip_convert, BinaryOp, Expr, Method, UnaryOp, Value};
use crate::query::dsl::Query;
use crate::query::{any, equality, field, range, related};
use crate::schema::{DocumentSchema, FieldKind};

/// Translate a predicate body into a compiled query tree
pub fn translate(body: &Expr, schema: &DocumentSchema) -> Result<Query> {
    guardian::ensure_supported(body)?;
    translate_node(body, schema)
}

fn translate_node(expr: &Expr, schema: &DocumentSchema) -> Result<Query> {
    match expr {
        Expr::Binary { op, left, right } => match op {
            BinaryOp::And => Ok(translate_node(left, schema)?.and(translate_node(right, schema)?)),
            BinaryOp::Or => Ok(translate_node(left, schema)?.or(translate_node(right, schema)?)),
            BinaryOp::Eq => translate_equal(left, right, schema),
            BinaryOp::Ne => Ok(translate_equal(left, right, schema)?.not()),
            BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le => {
                range::translate(*op, left, right, schema)
            }
        },
        Expr::Unary { op, operand } => match op {
            UnaryOp::Not => Ok(translate_node(operand, schema)?.not()),
            UnaryOp::Convert => translate_node(operand, schema),
        },
        // A bare boolean member in predicate position is implicit `== true`.
        Expr::Member { .. } => {
            let resolved = field::resolve(expr, schema, false)?;
            Ok(Query::term(resolved.name, true))
        }
        Expr::Call {
            method,
            target,
            args,
        } => translate_call(expr, method, target.as_deref(), args, schema),
        other => Err(KrillError::UnsupportedNode {
            kind: other.kind(),
            expression: other.to_string(),
        }),
    }
}

/// Equality dispatch: related-document identity when the member's declared
/// kind says so, plain equality otherwise
fn translate_equal(left: &Expr, right: &Expr, schema: &DocumentSchema) -> Result<Query> {
    let (member, constant, to_lower) = equality::split(left, right)?;
    if !to_lower && is_related(member, schema) {
        return related::translate(member, constant, schema);
    }
    equality::translate(left, right, schema)
}

fn is_related(member: &Expr, schema: &DocumentSchema) -> bool {
    field::resolve_path(member, schema)
        .ok()
        .and_then(|path| schema.field(&path))
        .map(|meta| meta.kind == FieldKind::Related)
        .unwrap_or(false)
}

fn translate_call(
    expr: &Expr,
    method: &Method,
    target: Option<&Expr>,
    args: &[Expr],
    schema: &DocumentSchema,
) -> Result<Query> {
    match (method, target, args) {
        (Method::Equals, Some(target), [arg]) => translate_equal(target, arg, schema),
        (Method::Equals, None, [left, right]) => translate_equal(left, right, schema),
        (Method::Contains, Some(target), [arg]) => translate_contains(target, arg, schema),
        (Method::Any, Some(target), args) => {
            let collection = strip_convert(target);
            match args {
                [] => any::translate(collection, None, schema),
                [Expr::Lambda { body, .. }] => any::translate(collection, Some(body), schema),
                _ => Err(KrillError::UnsupportedMethod {
                    method: method.name().to_string(),
                    expression: expr.to_string(),
                }),
            }
        }
        (Method::Named(name), _, _) => Err(KrillError::UnsupportedMethod {
            method: name.clone(),
            expression: expr.to_string(),
        }),
        _ => Err(KrillError::UnsupportedMethod {
            method: method.name().to_string(),
            expression: expr.to_string(),
        }),
    }
}

/// Both `contains` conventions: a literal list probed with a member, and a
/// member collection probed with a constant
fn translate_contains(target: &Expr, arg: &Expr, schema: &DocumentSchema) -> Result<Query> {
    let target = strip_convert(target);
    let arg = strip_convert(arg);
    if let (Expr::Constant(Value::List(items)), Some((member, to_lower))) =
        (target, equality::member_side(arg))
    {
        let resolved = field::resolve(member, schema, to_lower)?;
        return or_of_terms(resolved.name, items, target, arg);
    }
    match (target, arg) {
        (member @ Expr::Member { .. }, Expr::Constant(value)) => {
            if value.is_null() {
                return Ok(Query::not_exists(field::resolve_path(member, schema)?));
            }
            if matches!(value, Value::Related(_)) || is_related(member, schema) {
                return related::translate(member, value, schema);
            }
            let resolved = field::resolve(member, schema, false)?;
            Ok(Query::term(resolved.name, value.clone()))
        }
        _ => Err(KrillError::UnsupportedOperands {
            left: target.to_string(),
            right: arg.to_string(),
        }),
    }
}

/// One term per distinct element in first-seen order, OR-folded; an empty
/// list has no satisfiable translation
fn or_of_terms(name: String, items: &[Value], target: &Expr, arg: &Expr) -> Result<Query> {
    let mut distinct: Vec<&Value> = Vec::new();
    for item in items {
        if !distinct.contains(&item) {
            distinct.push(item);
        }
    }
    distinct
        .into_iter()
        .map(|item| Query::term(name.clone(), item.clone()))
        .reduce(Query::or)
        .ok_or_else(|| KrillError::UnsupportedOperands {
            left: target.to_string(),
            right: arg.to_string(),
        })
}
