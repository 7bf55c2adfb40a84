//! Predicate expression AST.
//!
//! An [`Expr`] is the body of a `record -> bool` function: [`Expr::Param`] stands
//! for the record, [`Expr::Member`] reads one of its fields, and everything else
//! is either a literal, a captured variable or an operation over those.
//! Expressions are usually built through [`FieldRef`](crate::schema::FieldRef)
//! and the combinators on [`Expr`].

use std::fmt;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::schema::{IntoOperand, IntoValue};

/// Reads the current value of a captured variable.
pub type CaptureFn = Arc<dyn Fn() -> Value + Send + Sync>;

#[derive(Clone)]
pub enum Expr {
    /// The record parameter.
    Param,
    /// Member read; a record field when `target` is [`Expr::Param`].
    Member { target: Box<Expr>, member: String },
    Constant(Value),
    /// Variable captured from the caller's scope, read when the expression is translated.
    Captured { name: String, read: CaptureFn },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Method call when `target` is set, free function call otherwise.
    Call {
        target: Option<Box<Expr>>,
        method: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Field read on the record parameter: `x.<name>`.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Expr {
        Expr::member(Expr::Param, name)
    }

    #[must_use]
    pub fn member(target: Expr, member: impl Into<String>) -> Expr {
        Expr::Member {
            target: Box::new(target),
            member: member.into(),
        }
    }

    #[must_use]
    pub fn value<V: IntoValue>(value: V) -> Expr {
        Expr::Constant(value.into_value())
    }

    /// Capture a variable by closure.
    ///
    /// The closure runs during translation, so the predicate sees the value the
    /// variable holds at that moment rather than when the expression was built.
    ///
    /// # Example
    ///
    /// ```rust
    /// use repokit_expr::ast::Expr;
    ///
    /// let company = String::from("ACME");
    /// let rhs = Expr::captured("company", move || company.clone());
    /// assert_eq!(rhs.to_string(), "company");
    /// ```
    #[must_use]
    pub fn captured<V, F>(name: impl Into<String>, read: F) -> Expr
    where
        V: IntoValue,
        F: Fn() -> V + Send + Sync + 'static,
    {
        Expr::Captured {
            name: name.into(),
            read: Arc::new(move || read().into_value()),
        }
    }

    #[must_use]
    pub fn binary(op: BinaryOp, left: impl IntoOperand, right: impl IntoOperand) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left.into_operand()),
            right: Box::new(right.into_operand()),
        }
    }

    #[must_use]
    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Method call on `target`: `target.method(args..)`.
    #[must_use]
    pub fn method(target: Expr, method: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Call {
            target: Some(Box::new(target)),
            method: method.into(),
            args,
        }
    }

    /// Free function call: `function(args..)`.
    #[must_use]
    pub fn function(function: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Call {
            target: None,
            method: function.into(),
            args,
        }
    }

    /// Combine two expressions with AND: `self && other`
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let filter = customer::company().eq("ACME").and(customer::email().contains("@acme"));
    /// ```
    #[must_use]
    pub fn and(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::AndAlso, self, other)
    }

    /// Combine two expressions with OR: `self || other`
    #[must_use]
    pub fn or(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::OrElse, self, other)
    }

    /// Negate an expression: `!self`
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Expr {
        !self
    }

    /// Direct children, left to right.
    #[must_use]
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Param | Expr::Constant(_) | Expr::Captured { .. } => Vec::new(),
            Expr::Member { target, .. } => vec![target.as_ref()],
            Expr::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::Unary { operand, .. } => vec![operand.as_ref()],
            Expr::Call { target, args, .. } => target
                .as_deref()
                .into_iter()
                .chain(args.iter())
                .collect(),
        }
    }

    /// Number of nodes on the longest root-to-leaf path.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1usize)];
        while let Some((expr, level)) = pending.pop() {
            deepest = deepest.max(level);
            pending.extend(expr.children().into_iter().map(|child| (child, level + 1)));
        }
        deepest
    }

    /// Whether this node is a field read on the record parameter.
    #[must_use]
    pub fn is_record_field(&self) -> bool {
        matches!(self, Expr::Member { target, .. } if matches!(**target, Expr::Param))
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Self::Output {
        Expr::unary(UnaryOp::Not, self)
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Param => f.write_str("Param"),
            Expr::Member { target, member } => f
                .debug_struct("Member")
                .field("target", target)
                .field("member", member)
                .finish(),
            Expr::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Expr::Captured { name, .. } => f
                .debug_struct("Captured")
                .field("name", name)
                .finish_non_exhaustive(),
            Expr::Binary { op, left, right } => f
                .debug_struct("Binary")
                .field("op", op)
                .field("left", left)
                .field("right", right)
                .finish(),
            Expr::Unary { op, operand } => f
                .debug_struct("Unary")
                .field("op", op)
                .field("operand", operand)
                .finish(),
            Expr::Call {
                target,
                method,
                args,
            } => f
                .debug_struct("Call")
                .field("target", target)
                .field("method", method)
                .field("args", args)
                .finish(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Param => f.write_str("x"),
            Expr::Member { target, member } => write!(f, "{target}.{member}"),
            Expr::Constant(value) => write!(f, "{value}"),
            Expr::Captured { name, .. } => f.write_str(name),
            Expr::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::Unary { op, operand } => write!(f, "{op}{operand}"),
            Expr::Call {
                target,
                method,
                args,
            } => {
                if let Some(target) = target {
                    write!(f, "{target}.")?;
                }
                write!(f, "{method}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    AndAlso,
    OrElse,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        };
        f.write_str(symbol)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => f.write_str("!"),
            UnaryOp::Negate => f.write_str("-"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(BigDecimal),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// Short name of the value's type, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Uuid(_) => "uuid",
            Value::DateTime(_) => "datetime",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::String(_) => "string",
            Value::List(_) => "list",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}
