//! Predicate expression trees
//!
//! The caller-supplied boolean AST over a document type, and the compiler's
//! sole input. Trees are immutable: the compiler only reads them and
//! substitutes closed sub-trees with constants during partial evaluation.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::RelatedDocument;

pub mod eval;
pub mod guardian;

/// A constant value carried by the expression tree and by term leaves
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(DateTime<Utc>),
    List(Vec<Value>),
    Related(RelatedDocument),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric coercion used for range bounds
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Ordering between comparable values; `None` for mixed kinds
    pub fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Render into the engine's wire form
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::from(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Str(s) => serde_json::Value::from(s.clone()),
            Value::Date(d) => {
                serde_json::Value::from(d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Related(r) => serde_json::json!({
                "documentType": r.document_type,
                "id": r.id,
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Date(d) => write!(f, "{}", d.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Related(r) => write!(f, "related({}, {})", r.document_type, r.id),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl From<RelatedDocument> for Value {
    fn from(v: RelatedDocument) -> Self {
        Value::Related(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

/// Unary operators admitted by the predicate language
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    /// Numeric/reference widening; stripped before translation
    Convert,
}

/// Binary operators admitted by the predicate language
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
        };
        write!(f, "{symbol}")
    }
}

/// Methods callable inside a predicate
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Method {
    Equals,
    Contains,
    Any,
    ToLower,
    /// Anything else; always rejected by the filter translator
    Named(String),
}

impl Method {
    pub fn name(&self) -> &str {
        match self {
            Method::Equals => "equals",
            Method::Contains => "contains",
            Method::Any => "any",
            Method::ToLower => "to_lower",
            Method::Named(name) => name,
        }
    }
}

/// A node of the predicate expression tree
///
/// Only a subset of these shapes is admitted by the guardian front-end;
/// the disallowed variants exist so the allow-list has a closed set to
/// reject with a descriptive error.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Constant(Value),
    /// The predicate's lambda parameter
    Parameter(String),
    Member {
        base: Box<Expr>,
        name: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        method: Method,
        target: Option<Box<Expr>>,
        args: Vec<Expr>,
    },
    Lambda {
        param: String,
        body: Box<Expr>,
    },
    /// Indexer access; never admitted
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// Object or array construction; never admitted
    Construct {
        parts: Vec<Expr>,
    },
    /// Ternary conditional; never admitted
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
}

impl Expr {
    /// Node-kind tag used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Constant(_) => "Constant",
            Expr::Parameter(_) => "Parameter",
            Expr::Member { .. } => "Member",
            Expr::Unary { .. } => "Unary",
            Expr::Binary { .. } => "Binary",
            Expr::Call { .. } => "Call",
            Expr::Lambda { .. } => "Lambda",
            Expr::Index { .. } => "Index",
            Expr::Construct { .. } => "Construct",
            Expr::Conditional { .. } => "Conditional",
        }
    }

    /// Create a lambda parameter reference
    pub fn parameter(name: impl Into<String>) -> Self {
        Expr::Parameter(name.into())
    }

    /// Create a constant
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    /// Create a null constant
    pub fn null() -> Self {
        Expr::Constant(Value::Null)
    }

    /// Create a lambda
    pub fn lambda(param: impl Into<String>, body: Expr) -> Self {
        Expr::Lambda {
            param: param.into(),
            body: Box::new(body),
        }
    }

    /// Access a member of this expression
    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member {
            base: Box::new(self),
            name: name.into(),
        }
    }

    fn binary(self, op: BinaryOp, other: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn eq(self, other: Expr) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    pub fn ne(self, other: Expr) -> Self {
        self.binary(BinaryOp::Ne, other)
    }

    pub fn gt(self, other: Expr) -> Self {
        self.binary(BinaryOp::Gt, other)
    }

    pub fn ge(self, other: Expr) -> Self {
        self.binary(BinaryOp::Ge, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        self.binary(BinaryOp::Lt, other)
    }

    pub fn le(self, other: Expr) -> Self {
        self.binary(BinaryOp::Le, other)
    }

    pub fn and(self, other: Expr) -> Self {
        self.binary(BinaryOp::And, other)
    }

    pub fn or(self, other: Expr) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    pub fn not(self) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    /// Wrap in a numeric/reference conversion
    pub fn convert(self) -> Self {
        Expr::Unary {
            op: UnaryOp::Convert,
            operand: Box::new(self),
        }
    }

    /// Case-normalizing call used for case-insensitive equality
    pub fn to_lower(self) -> Self {
        Expr::Call {
            method: Method::ToLower,
            target: Some(Box::new(self)),
            args: Vec::new(),
        }
    }

    /// Instance-convention `equals` call
    pub fn equals(self, arg: Expr) -> Self {
        Expr::Call {
            method: Method::Equals,
            target: Some(Box::new(self)),
            args: vec![arg],
        }
    }

    /// Static-convention `equals` call with two arguments
    pub fn equals_static(left: Expr, right: Expr) -> Self {
        Expr::Call {
            method: Method::Equals,
            target: None,
            args: vec![left, right],
        }
    }

    /// `contains` call; `self` is the source collection (literal or member)
    pub fn contains(self, arg: Expr) -> Self {
        Expr::Call {
            method: Method::Contains,
            target: Some(Box::new(self)),
            args: vec![arg],
        }
    }

    /// `any` call with an inner predicate over the collection element
    pub fn any(self, param: impl Into<String>, body: Expr) -> Self {
        Expr::Call {
            method: Method::Any,
            target: Some(Box::new(self)),
            args: vec![Expr::lambda(param, body)],
        }
    }

    /// Parameterless `any` call ("the collection has elements" shape)
    pub fn any_exists(self) -> Self {
        Expr::Call {
            method: Method::Any,
            target: Some(Box::new(self)),
            args: Vec::new(),
        }
    }

    /// A call to an arbitrary, unsupported method; used in tests and by
    /// front-ends that lower foreign call syntax verbatim
    pub fn call_named(self, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            method: Method::Named(name.into()),
            target: Some(Box::new(self)),
            args,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(v) => write!(f, "{v}"),
            Expr::Parameter(name) => write!(f, "{name}"),
            Expr::Member { base, name } => write!(f, "{base}.{name}"),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "!({operand})"),
                UnaryOp::Convert => write!(f, "convert({operand})"),
            },
            Expr::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::Call {
                method,
                target,
                args,
            } => {
                if let Some(target) = target {
                    write!(f, "{target}.{}(", method.name())?;
                } else {
                    write!(f, "{}(", method.name())?;
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::Lambda { param, body } => write!(f, "{param} => {body}"),
            Expr::Index { base, index } => write!(f, "{base}[{index}]"),
            Expr::Construct { parts } => {
                write!(f, "new {{")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{part}")?;
                }
                write!(f, "}}")
            }
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "({condition} ? {then_branch} : {else_branch})"),
        }
    }
}

/// Strip a single conversion wrapper, if present
pub(crate) fn strip_convert(expr: &Expr) -> &Expr {
    match expr {
        Expr::Unary {
            op: UnaryOp::Convert,
            operand,
        } => operand,
        _ => expr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_shapes() {
        let predicate = Expr::parameter("x")
            .member("Name")
            .eq(Expr::constant("Bob"))
            .and(Expr::parameter("x").member("Age").gt(Expr::constant(21)));
        assert!(matches!(
            predicate,
            Expr::Binary {
                op: BinaryOp::And,
                ..
            }
        ));
    }

    #[test]
    fn test_display() {
        let predicate = Expr::parameter("x")
            .member("Name")
            .eq(Expr::constant("Bob"));
        assert_eq!(predicate.to_string(), "(x.Name == \"Bob\")");

        let any = Expr::parameter("x").member("Phones").any(
            "p",
            Expr::parameter("p")
                .member("Number")
                .eq(Expr::constant("555")),
        );
        assert_eq!(any.to_string(), "x.Phones.any(p => (p.Number == \"555\"))");
    }

    #[test]
    fn test_value_partial_cmp() {
        use std::cmp::Ordering;
        assert_eq!(
            Value::Int(1).partial_cmp(&Value::Float(2.0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Str("b".into()).partial_cmp(&Value::Str("a".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Int(1).partial_cmp(&Value::Str("a".into())), None);
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(Value::from(42).to_json(), serde_json::json!(42));
        assert_eq!(Value::Null.to_json(), serde_json::Value::Null);
        let list = Value::from(vec!["a", "b"]);
        assert_eq!(list.to_json(), serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_strip_convert() {
        let member = Expr::parameter("x").member("Age");
        let converted = member.clone().convert();
        assert_eq!(strip_convert(&converted), &member);
        assert_eq!(strip_convert(&member), &member);
    }
}
