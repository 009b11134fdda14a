//! Partial evaluation of predicate trees
//!
//! Two passes over the immutable tree: a branch selector decides which
//! sub-trees are closed (constant-foldable), then a substitution pass
//! replaces each topmost closed sub-tree with a constant carrying its
//! interpreted value. A sub-tree of an already-substituted node is never
//! evaluated again.

use crate::error::{KrillError, Result};
use crate::expr::{BinaryOp, Expr, Method, UnaryOp, Value};

/// Rewrite the tree, folding closed sub-trees into constants
///
/// A closed sub-expression that fails to evaluate (type mismatch, bad
/// operand) propagates as a compiler error: a caller-supplied closed
/// expression that cannot be interpreted is a caller bug.
pub fn evaluate(expr: &Expr) -> Result<Expr> {
    if matches!(expr, Expr::Constant(_)) {
        return Ok(expr.clone());
    }
    if is_closed(expr) {
        return Ok(Expr::Constant(eval_const(expr)?));
    }
    rebuild(expr)
}

/// Branch selector: whether the entire sub-tree is evaluable
///
/// Lambda parameters are unresolved references, and calls into the
/// collection combinator vocabulary (`any`, `contains`) are part of the
/// query language itself; neither is ever evaluable.
fn is_closed(expr: &Expr) -> bool {
    match expr {
        Expr::Constant(_) => true,
        Expr::Parameter(_) | Expr::Lambda { .. } => false,
        Expr::Member { base, .. } => is_closed(base),
        Expr::Unary { operand, .. } => is_closed(operand),
        Expr::Binary { left, right, .. } => is_closed(left) && is_closed(right),
        Expr::Call {
            method,
            target,
            args,
        } => {
            !matches!(method, Method::Any | Method::Contains)
                && target.as_deref().map_or(true, is_closed)
                && args.iter().all(is_closed)
        }
        Expr::Index { base, index } => is_closed(base) && is_closed(index),
        Expr::Construct { parts } => parts.iter().all(is_closed),
        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => is_closed(condition) && is_closed(then_branch) && is_closed(else_branch),
    }
}

fn rebuild(expr: &Expr) -> Result<Expr> {
    let result = match expr {
        Expr::Constant(_) | Expr::Parameter(_) => expr.clone(),
        Expr::Member { base, name } => Expr::Member {
            base: Box::new(evaluate(base)?),
            name: name.clone(),
        },
        Expr::Unary { op, operand } => Expr::Unary {
            op: *op,
            operand: Box::new(evaluate(operand)?),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: Box::new(evaluate(left)?),
            right: Box::new(evaluate(right)?),
        },
        Expr::Call {
            method,
            target,
            args,
        } => Expr::Call {
            method: method.clone(),
            target: match target {
                Some(t) => Some(Box::new(evaluate(t)?)),
                None => None,
            },
            args: args.iter().map(evaluate).collect::<Result<Vec<_>>>()?,
        },
        Expr::Lambda { param, body } => Expr::Lambda {
            param: param.clone(),
            body: Box::new(evaluate(body)?),
        },
        Expr::Index { base, index } => Expr::Index {
            base: Box::new(evaluate(base)?),
            index: Box::new(evaluate(index)?),
        },
        Expr::Construct { parts } => Expr::Construct {
            parts: parts.iter().map(evaluate).collect::<Result<Vec<_>>>()?,
        },
        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => Expr::Conditional {
            condition: Box::new(evaluate(condition)?),
            then_branch: Box::new(evaluate(then_branch)?),
            else_branch: Box::new(evaluate(else_branch)?),
        },
    };
    Ok(result)
}

/// Interpret a closed sub-expression with no external inputs
fn eval_const(expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Constant(value) => Ok(value.clone()),
        Expr::Unary { op, operand } => match op {
            UnaryOp::Convert => eval_const(operand),
            UnaryOp::Not => match eval_const(operand)? {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(evaluation_error(expr, &format!("cannot negate {other}"))),
            },
        },
        Expr::Binary { op, left, right } => {
            let left = eval_const(left)?;
            let right = eval_const(right)?;
            eval_binary(*op, &left, &right).ok_or_else(|| {
                evaluation_error(expr, &format!("cannot apply {op} to {left} and {right}"))
            })
        }
        Expr::Member { base, name } => {
            let base = eval_const(base)?;
            match (&base, name.to_ascii_lowercase().as_str()) {
                (Value::Related(r), "documenttype") => Ok(Value::Str(r.document_type.clone())),
                (Value::Related(r), "id") => Ok(Value::Str(r.id.clone())),
                _ => Err(evaluation_error(
                    expr,
                    &format!("cannot read member '{name}' of {base}"),
                )),
            }
        }
        Expr::Call {
            method,
            target,
            args,
        } => match (method, target, args.as_slice()) {
            (Method::ToLower, Some(target), []) => match eval_const(target)? {
                Value::Str(s) => Ok(Value::Str(s.to_lowercase())),
                other => Err(evaluation_error(
                    expr,
                    &format!("to_lower on non-string {other}"),
                )),
            },
            (Method::Equals, Some(target), [arg]) => {
                Ok(Value::Bool(eval_const(target)? == eval_const(arg)?))
            }
            (Method::Equals, None, [left, right]) => {
                Ok(Value::Bool(eval_const(left)? == eval_const(right)?))
            }
            _ => Err(evaluation_error(
                expr,
                &format!("cannot evaluate method '{}'", method.name()),
            )),
        },
        _ => Err(evaluation_error(
            expr,
            &format!("cannot evaluate {} node", expr.kind()),
        )),
    }
}

fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    let result = match op {
        BinaryOp::And => match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(*a && *b),
            _ => return None,
        },
        BinaryOp::Or => match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(*a || *b),
            _ => return None,
        },
        BinaryOp::Eq => Value::Bool(left == right),
        BinaryOp::Ne => Value::Bool(left != right),
        BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le => {
            let ordering = left.partial_cmp(right)?;
            Value::Bool(match op {
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::Ge => ordering.is_ge(),
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                _ => unreachable!(),
            })
        }
    };
    Some(result)
}

fn evaluation_error(expr: &Expr, reason: &str) -> KrillError {
    KrillError::Evaluation(format!("{reason} (expression is {expr})"))
}
