#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `SeaORM` storage for records filtered by predicate expressions.
//!
//! A [`Repository`] translates an [`repokit_expr::Expr`] into a predicate tree,
//! renders that tree as a `SeaORM` [`sea_orm::Condition`] and runs the query
//! on a caller-supplied connection.

pub mod condition;
pub mod config;
pub mod entity;
pub mod error;
pub mod repository;

pub use condition::predicate_to_condition;
pub use config::RepoConfig;
pub use entity::{ColumnOf, ModelOf, PrimaryKeyOf, PrimaryKeyValueOf, RecordEntity};
pub use error::{RepoError, RepoResult};
pub use repository::Repository;
