//! Guardian front-end for predicate trees
//!
//! A hard allow-list over the closed node-kind set: only {constant, member
//! access, unary not, unary convert, binary and/or/equality/comparison,
//! supported method calls} pass. Everything else fails fast with an error
//! naming the node kind and its textual form. The exhaustive `match` means
//! a future `Expr` variant is a compile error here until it is explicitly
//! admitted.

use crate::error::{KrillError, Result};
use crate::expr::{Expr, Method, UnaryOp};

/// Verify that a predicate body stays inside the supported subset
pub fn ensure_supported(expr: &Expr) -> Result<()> {
    walk(expr, false)
}

fn walk(expr: &Expr, in_lambda: bool) -> Result<()> {
    match expr {
        Expr::Constant(_) => Ok(()),
        Expr::Member { .. } => walk_member_chain(expr),
        Expr::Unary { op, operand } => match op {
            UnaryOp::Not | UnaryOp::Convert => walk(operand, in_lambda),
        },
        Expr::Binary { left, right, .. } => {
            walk(left, in_lambda)?;
            walk(right, in_lambda)
        }
        Expr::Call {
            method,
            target,
            args,
        } => walk_call(expr, method, target.as_deref(), args, in_lambda),
        // The predicate language is first-order: a bare parameter or a
        // lambda outside an `any` argument position is never admitted.
        Expr::Parameter(_) => Err(unsupported(expr)),
        Expr::Lambda { .. } => Err(nested_lambda(expr)),
        Expr::Index { .. } | Expr::Construct { .. } | Expr::Conditional { .. } => {
            Err(unsupported(expr))
        }
    }
}

fn walk_call(
    expr: &Expr,
    method: &Method,
    target: Option<&Expr>,
    args: &[Expr],
    in_lambda: bool,
) -> Result<()> {
    match method {
        Method::Any => {
            if let Some(target) = target {
                walk_member_chain(target)?;
            }
            match args {
                [] => Ok(()),
                // The one place a lambda is admitted, and only one level
                // deep; its body is walked with the flag raised.
                [lambda @ Expr::Lambda { body, .. }] => {
                    if in_lambda {
                        Err(nested_lambda(lambda))
                    } else {
                        walk(body, true)
                    }
                }
                [other] => walk(other, in_lambda),
                _ => Err(unsupported(expr)),
            }
        }
        Method::Equals | Method::Contains | Method::ToLower | Method::Named(_) => {
            if let Some(target) = target {
                walk_operand(target, in_lambda)?;
            }
            for arg in args {
                walk_operand(arg, in_lambda)?;
            }
            Ok(())
        }
    }
}

/// Operand position: member chains and constants are fine, nested calls
/// (like `to_lower`) recurse, lambdas and the rest are rejected.
fn walk_operand(expr: &Expr, in_lambda: bool) -> Result<()> {
    match expr {
        Expr::Member { .. } => walk_member_chain(expr),
        Expr::Constant(_) => Ok(()),
        Expr::Unary {
            op: UnaryOp::Convert,
            operand,
        } => walk_operand(operand, in_lambda),
        Expr::Call { .. } | Expr::Binary { .. } | Expr::Unary { .. } => walk(expr, in_lambda),
        _ => Err(unsupported(expr)),
    }
}

/// A member chain must bottom out at a lambda parameter, possibly through
/// conversion wrappers.
fn walk_member_chain(expr: &Expr) -> Result<()> {
    match expr {
        Expr::Parameter(_) => Ok(()),
        Expr::Member { base, .. } => walk_member_chain(base),
        Expr::Unary {
            op: UnaryOp::Convert,
            operand,
        } => walk_member_chain(operand),
        _ => Err(unsupported(expr)),
    }
}

fn unsupported(expr: &Expr) -> KrillError {
    KrillError::UnsupportedNode {
        kind: expr.kind(),
        expression: expr.to_string(),
    }
}

fn nested_lambda(expr: &Expr) -> KrillError {
    KrillError::UnsupportedNode {
        kind: "Lambda",
        expression: format!("nested lambda is not supported, expression is {expr}"),
    }
}
