use thiserror::Error;

use crate::ast::Expr;

/// Failure while folding a record-independent subexpression into a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Operator {op} is not defined for {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },

    #[error("Operator {op} is not defined for {operand}")]
    UnaryMismatch { op: String, operand: &'static str },

    #[error("Wrong number of arguments for {method}: expected {expected}, got {got}")]
    Arity {
        method: String,
        expected: usize,
        got: usize,
    },

    #[error("Cannot read member '{0}' of a value")]
    MemberOnValue(String),

    #[error("Expression depends on the record parameter")]
    Unbound,
}

#[derive(Debug, Error, Clone)]
pub enum TranslateError {
    /// A construct outside the supported subset; carries the offending node.
    #[error("Unsupported expression `{node}`: {reason}")]
    Unsupported { node: Box<Expr>, reason: String },

    /// The expression nests deeper than `ExprConfig::max_depth`.
    #[error("Expression nests {depth} levels, the configured limit is {limit}")]
    TooDeep { depth: usize, limit: usize },

    #[error(transparent)]
    Evaluation(#[from] EvalError),
}

impl TranslateError {
    pub(crate) fn unsupported(node: &Expr, reason: impl Into<String>) -> Self {
        TranslateError::Unsupported {
            node: Box::new(node.clone()),
            reason: reason.into(),
        }
    }

    /// The offending node, when the error is `Unsupported`.
    #[must_use]
    pub fn node(&self) -> Option<&Expr> {
        match self {
            TranslateError::Unsupported { node, .. } => Some(node),
            TranslateError::TooDeep { .. } | TranslateError::Evaluation(_) => None,
        }
    }
}

pub type TranslateResult<T> = Result<T, TranslateError>;
