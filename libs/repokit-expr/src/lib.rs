#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Typed predicate expressions over records and their translation into
//! filter trees that query executors render into `WHERE` clauses.

pub mod ast;
pub mod config;
pub mod errors;
pub mod eval;
pub mod predicate;
pub mod schema;
pub mod translate;

pub use ast::{BinaryOp, Expr, UnaryOp, Value};
pub use config::{ExprConfig, Grouping};
pub use errors::{EvalError, TranslateError, TranslateResult};
pub use predicate::{FieldPredicate, GroupOperator, Operator, Predicate, PredicateGroup};
pub use schema::{FieldKind, FieldRef, IntoOperand, IntoValue, Record, RecordField};
pub use translate::{ExprTranslator, to_predicate};
