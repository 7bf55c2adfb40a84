//! Partial evaluation: folds every record-independent subexpression into a
//! constant before translation.
//!
//! Runs in two passes. Nomination walks bottom-up and marks a node foldable
//! when it is not the record parameter and all of its children are foldable.
//! Substitution walks top-down and replaces each maximal foldable subtree with
//! `Constant(evaluate(subtree))`, so captured variables are read exactly once
//! per translation.

use std::cmp::Ordering;
use std::fmt;

use bigdecimal::{BigDecimal, FromPrimitive, Zero};
use tracing::trace;

use crate::ast::{BinaryOp, Expr, UnaryOp, Value};
use crate::errors::EvalError;

struct Nomination {
    foldable: bool,
    children: Vec<Nomination>,
}

fn nominate(expr: &Expr) -> Nomination {
    let children: Vec<Nomination> = expr.children().into_iter().map(nominate).collect();
    let foldable = !matches!(expr, Expr::Param) && children.iter().all(|c| c.foldable);
    Nomination { foldable, children }
}

/// Replace every record-independent subtree of `expr` with its value.
///
/// # Errors
///
/// Returns the first [`EvalError`] raised while evaluating a foldable subtree.
pub fn partial_eval(expr: &Expr) -> Result<Expr, EvalError> {
    let nomination = nominate(expr);
    substitute(expr, &nomination)
}

fn substitute(expr: &Expr, nomination: &Nomination) -> Result<Expr, EvalError> {
    if nomination.foldable {
        if let Expr::Constant(_) = expr {
            return Ok(expr.clone());
        }
        let value = evaluate(expr)?;
        trace!(expr = %expr, value = %value, "folded subexpression");
        return Ok(Expr::Constant(value));
    }

    let nested = &nomination.children;
    let rebuilt = match expr {
        Expr::Param | Expr::Constant(_) | Expr::Captured { .. } => expr.clone(),
        Expr::Member { target, member } => Expr::Member {
            target: Box::new(substitute(target, &nested[0])?),
            member: member.clone(),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: Box::new(substitute(left, &nested[0])?),
            right: Box::new(substitute(right, &nested[1])?),
        },
        Expr::Unary { op, operand } => Expr::Unary {
            op: *op,
            operand: Box::new(substitute(operand, &nested[0])?),
        },
        Expr::Call {
            target,
            method,
            args,
        } => {
            let offset = usize::from(target.is_some());
            let target = match target {
                Some(target) => Some(Box::new(substitute(target, &nested[0])?)),
                None => None,
            };
            let args = args
                .iter()
                .zip(&nested[offset..])
                .map(|(arg, n)| substitute(arg, n))
                .collect::<Result<Vec<_>, _>>()?;
            Expr::Call {
                target,
                method: method.clone(),
                args,
            }
        }
    };
    Ok(rebuilt)
}

/// Evaluate a record-independent expression.
///
/// # Errors
///
/// Returns [`EvalError::Unbound`] when the expression reads the record
/// parameter, and the matching [`EvalError`] for unsupported operations.
pub fn evaluate(expr: &Expr) -> Result<Value, EvalError> {
    match expr {
        Expr::Param => Err(EvalError::Unbound),
        Expr::Constant(value) => Ok(value.clone()),
        Expr::Captured { read, .. } => Ok(read()),
        Expr::Member { member, .. } => Err(EvalError::MemberOnValue(member.clone())),
        Expr::Unary { op, operand } => eval_unary(*op, evaluate(operand)?),
        Expr::Binary { op, left, right } => eval_binary(*op, left, right),
        Expr::Call {
            target,
            method,
            args,
        } => {
            let target = target.as_deref().map(evaluate).transpose()?;
            let args = args.iter().map(evaluate).collect::<Result<Vec<_>, _>>()?;
            match target {
                Some(target) => call_method(method, target, &args),
                None => call_function(method, &args),
            }
        }
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
        (op, other) => Err(EvalError::UnaryMismatch {
            op: op.to_string(),
            operand: other.type_name(),
        }),
    }
}

fn eval_binary(op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value, EvalError> {
    let lhs = evaluate(left)?;

    // `&&` and `||` short-circuit.
    if op.is_logical() {
        let Value::Bool(l) = lhs else {
            return Err(mismatch(op, &lhs, &Value::Null));
        };
        if (op == BinaryOp::AndAlso && !l) || (op == BinaryOp::OrElse && l) {
            return Ok(Value::Bool(l));
        }
        return match evaluate(right)? {
            Value::Bool(r) => Ok(Value::Bool(r)),
            other => Err(mismatch(op, &lhs, &other)),
        };
    }

    let rhs = evaluate(right)?;
    match op {
        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le => {
            let ordering = compare(&lhs, &rhs).ok_or_else(|| mismatch(op, &lhs, &rhs))?;
            let result = match op {
                BinaryOp::Gt => ordering == Ordering::Greater,
                BinaryOp::Ge => ordering != Ordering::Less,
                BinaryOp::Lt => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", text(&lhs), text(&rhs))))
            }
            _ => Err(mismatch(op, &lhs, &rhs)),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let (Value::Number(a), Value::Number(b)) = (&lhs, &rhs) else {
                return Err(mismatch(op, &lhs, &rhs));
            };
            match op {
                BinaryOp::Sub => Ok(Value::Number(a - b)),
                BinaryOp::Mul => Ok(Value::Number(a * b)),
                _ if b.is_zero() => Err(EvalError::DivisionByZero),
                _ => Ok(Value::Number(a / b)),
            }
        }
        BinaryOp::AndAlso | BinaryOp::OrElse => Err(mismatch(op, &lhs, &rhs)),
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn mismatch(op: impl fmt::Display, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: op.to_string(),
        left: lhs.type_name(),
        right: rhs.type_name(),
    }
}

/// Plain text of a value for concatenation; strings are not quoted.
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Lowercase with underscores removed, so `starts_with`, `StartsWith` and
/// `startswith` name the same method.
pub(crate) fn normalize_method(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn expect_args(method: &str, args: &[Value], expected: usize) -> Result<(), EvalError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::Arity {
            method: method.to_owned(),
            expected,
            got: args.len(),
        })
    }
}

fn call_method(method: &str, target: Value, args: &[Value]) -> Result<Value, EvalError> {
    let name = normalize_method(method);

    if name == "equals" {
        expect_args(method, args, 1)?;
        return Ok(Value::Bool(args.first() == Some(&target)));
    }

    let Value::String(s) = target else {
        return Err(EvalError::UnknownMethod(format!(
            "{}.{method}",
            target.type_name()
        )));
    };

    match name.as_str() {
        "toupper" => {
            expect_args(method, args, 0)?;
            Ok(Value::String(s.to_uppercase()))
        }
        "tolower" => {
            expect_args(method, args, 0)?;
            Ok(Value::String(s.to_lowercase()))
        }
        "trim" => {
            expect_args(method, args, 0)?;
            Ok(Value::String(s.trim().to_owned()))
        }
        "len" | "length" => {
            expect_args(method, args, 0)?;
            let len = BigDecimal::from_usize(s.chars().count()).unwrap_or_default();
            Ok(Value::Number(len))
        }
        "startswith" | "endswith" | "contains" => {
            expect_args(method, args, 1)?;
            let Some(Value::String(pattern)) = args.first() else {
                let got = args.first().map_or("null", Value::type_name);
                return Err(EvalError::TypeMismatch {
                    op: method.to_owned(),
                    left: "string",
                    right: got,
                });
            };
            let result = match name.as_str() {
                "startswith" => s.starts_with(pattern.as_str()),
                "endswith" => s.ends_with(pattern.as_str()),
                _ => s.contains(pattern.as_str()),
            };
            Ok(Value::Bool(result))
        }
        _ => Err(EvalError::UnknownMethod(format!("string.{method}"))),
    }
}

fn call_function(function: &str, args: &[Value]) -> Result<Value, EvalError> {
    match normalize_method(function).as_str() {
        "abs" => {
            expect_args(function, args, 1)?;
            match args.first() {
                Some(Value::Number(n)) => Ok(Value::Number(n.abs())),
                Some(other) => Err(EvalError::UnaryMismatch {
                    op: function.to_owned(),
                    operand: other.type_name(),
                }),
                None => Err(EvalError::UnknownMethod(function.to_owned())),
            }
        }
        name @ ("min" | "max") => {
            expect_args(function, args, 2)?;
            let [a, b] = args else {
                return Err(EvalError::UnknownMethod(function.to_owned()));
            };
            let ordering = compare(a, b).ok_or_else(|| mismatch(function, a, b))?;
            let pick_first = if name == "min" {
                ordering != Ordering::Greater
            } else {
                ordering != Ordering::Less
            };
            Ok(if pick_first { a.clone() } else { b.clone() })
        }
        "concat" => Ok(Value::String(args.iter().map(text).collect())),
        _ => Err(EvalError::UnknownMethod(function.to_owned())),
    }
}
