use repokit_expr::{FieldKind, Operator, TranslateError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error("Field '{0}' has no mapped column")]
    UnmappedField(&'static str),

    #[error("Type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: &'static str,
        expected: FieldKind,
        got: &'static str,
    },

    #[error("Operator {op} cannot compare field '{field}' with {got}")]
    InvalidOperand {
        field: &'static str,
        op: Operator,
        got: &'static str,
    },

    #[error("Expected at most one row, found several")]
    NotUnique,

    #[error("Operation needs a single-column primary key, entity has {0} columns")]
    CompositeKey(usize),

    #[error("Invalid configuration: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

pub type RepoResult<T> = Result<T, RepoError>;
