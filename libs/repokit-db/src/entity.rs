//! Binding between a record's field registry and a `SeaORM` entity.

use repokit_expr::{Record, RecordField};
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, EntityTrait, IdenStatic, Iterable};

/// A record stored in a `SeaORM` entity.
///
/// Fields map to columns by name, ignoring ASCII case. Override
/// [`RecordEntity::column`] when logical names and column names differ.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Record)]
/// #[sea_orm(table_name = "customers")]
/// pub struct Model {
///     #[sea_orm(primary_key, auto_increment = false)]
///     pub id: Uuid,
///     pub company: String,
/// }
///
/// impl RecordEntity for Model {
///     type Entity = Entity;
///     type ActiveModel = ActiveModel;
/// }
/// ```
pub trait RecordEntity: Record {
    type Entity: EntityTrait;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send;

    fn column(field: Self::Field) -> Option<<Self::Entity as EntityTrait>::Column> {
        <Self::Entity as EntityTrait>::Column::iter()
            .find(|column| column.as_str().eq_ignore_ascii_case(field.name()))
    }
}

pub type ModelOf<R> = <<R as RecordEntity>::Entity as EntityTrait>::Model;
pub type ColumnOf<R> = <<R as RecordEntity>::Entity as EntityTrait>::Column;
pub type PrimaryKeyOf<R> = <<R as RecordEntity>::Entity as EntityTrait>::PrimaryKey;
pub type PrimaryKeyValueOf<R> = <PrimaryKeyOf<R> as sea_orm::PrimaryKeyTrait>::ValueType;
