//! Generic CRUD repository filtering through translated predicate expressions.

use repokit_expr::{Expr, ExprConfig, ExprTranslator};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, Iterable, PaginatorTrait, PrimaryKeyToColumn, PrimaryKeyTrait,
    QueryFilter, QuerySelect,
};
use tracing::debug;

use crate::condition::predicate_to_condition;
use crate::config::RepoConfig;
use crate::entity::{ColumnOf, ModelOf, PrimaryKeyOf, PrimaryKeyValueOf, RecordEntity};
use crate::error::{RepoError, RepoResult};

/// CRUD operations over the entity bound to `R`.
///
/// The connection is supplied by the caller; the repository holds no other
/// state than the translator configuration.
pub struct Repository<R: RecordEntity> {
    db: DatabaseConnection,
    translator: ExprTranslator<R>,
}

impl<R> Repository<R>
where
    R: RecordEntity,
    ModelOf<R>: IntoActiveModel<R::ActiveModel> + Sync,
{
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_config(db, ExprConfig::default())
    }

    #[must_use]
    pub fn with_config(db: DatabaseConnection, config: ExprConfig) -> Self {
        Self {
            db,
            translator: ExprTranslator::with_config(config),
        }
    }

    /// Connect using `config` and build a repository over the new connection.
    ///
    /// # Errors
    /// Returns [`RepoError::Db`] when the connection fails.
    pub async fn connect(config: &RepoConfig) -> RepoResult<Self> {
        let db = config.connect().await?;
        Ok(Self::with_config(db, config.expr.clone()))
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Translate an optional filter; no filter matches every row.
    fn condition(&self, filter: Option<&Expr>) -> RepoResult<Condition> {
        match filter {
            Some(expr) => {
                let predicate = self.translator.translate(expr)?;
                predicate_to_condition::<R>(&predicate)
            }
            None => Ok(Condition::all()),
        }
    }

    /// All rows matching `filter`, or every row when `filter` is `None`.
    ///
    /// # Errors
    /// Returns [`RepoError`] when the filter cannot be translated or the query fails.
    pub async fn all(&self, filter: Option<&Expr>) -> RepoResult<Vec<ModelOf<R>>> {
        let cond = self.condition(filter)?;
        let rows = R::Entity::find().filter(cond).all(&self.db).await?;
        debug!(operation = "all", rows = rows.len(), "repository query");
        Ok(rows)
    }

    /// Number of rows matching `filter`.
    ///
    /// # Errors
    /// Returns [`RepoError`] when the filter cannot be translated or the query fails.
    pub async fn count(&self, filter: Option<&Expr>) -> RepoResult<u64> {
        let cond = self.condition(filter)?;
        let rows = R::Entity::find().filter(cond).count(&self.db).await?;
        debug!(operation = "count", rows, "repository query");
        Ok(rows)
    }

    /// Whether any row matches `filter`.
    ///
    /// # Errors
    /// Returns [`RepoError`] when the filter cannot be translated or the query fails.
    pub async fn any(&self, filter: Option<&Expr>) -> RepoResult<bool> {
        Ok(self.count(filter).await? > 0)
    }

    /// The single row matching `filter`.
    ///
    /// # Errors
    /// Returns [`RepoError::NotUnique`] when several rows match, and
    /// [`RepoError`] when the filter cannot be translated or the query fails.
    pub async fn one(&self, filter: &Expr) -> RepoResult<Option<ModelOf<R>>> {
        let cond = self.condition(Some(filter))?;
        let mut rows = R::Entity::find()
            .filter(cond)
            .limit(2)
            .all(&self.db)
            .await?;
        debug!(operation = "one", rows = rows.len(), "repository query");
        if rows.len() > 1 {
            return Err(RepoError::NotUnique);
        }
        Ok(rows.pop())
    }

    /// Row with the given primary key.
    ///
    /// # Errors
    /// Returns [`RepoError::Db`] when the query fails.
    pub async fn find_by_id(
        &self,
        id: impl Into<PrimaryKeyValueOf<R>>,
    ) -> RepoResult<Option<ModelOf<R>>> {
        Ok(R::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Delete the row with the given primary key; `true` when a row was deleted.
    ///
    /// # Errors
    /// Returns [`RepoError::Db`] when the statement fails.
    pub async fn remove(&self, id: impl Into<PrimaryKeyValueOf<R>>) -> RepoResult<bool> {
        let res = R::Entity::delete_by_id(id).exec(&self.db).await?;
        debug!(operation = "remove", rows = res.rows_affected, "repository delete");
        Ok(res.rows_affected > 0)
    }

    /// Delete the row stored for `model`; `true` when a row was deleted.
    ///
    /// # Errors
    /// Returns [`RepoError::Db`] when the statement fails.
    pub async fn remove_model(&self, model: ModelOf<R>) -> RepoResult<bool> {
        let active: R::ActiveModel = model.into_active_model();
        let res = active.delete(&self.db).await?;
        debug!(operation = "remove_model", rows = res.rows_affected, "repository delete");
        Ok(res.rows_affected > 0)
    }

    /// Delete every row whose primary key is in `ids`; returns the number of
    /// deleted rows. An empty `ids` deletes nothing.
    ///
    /// # Errors
    /// Returns [`RepoError::CompositeKey`] for entities with a multi-column
    /// primary key, and [`RepoError::Db`] when the statement fails.
    pub async fn remove_by_ids<I, V>(&self, ids: I) -> RepoResult<u64>
    where
        I: IntoIterator<Item = V>,
        V: Into<sea_orm::Value>,
    {
        let mut keys = PrimaryKeyOf::<R>::iter();
        let (Some(key), None) = (keys.next(), keys.next()) else {
            return Err(RepoError::CompositeKey(PrimaryKeyOf::<R>::iter().count()));
        };

        let values: Vec<sea_orm::Value> = ids.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Ok(0);
        }

        let res = R::Entity::delete_many()
            .filter(key.into_column().is_in(values))
            .exec(&self.db)
            .await?;
        debug!(operation = "remove_by_ids", rows = res.rows_affected, "repository delete");
        Ok(res.rows_affected)
    }

    /// Delete every row; returns the number of deleted rows.
    ///
    /// # Errors
    /// Returns [`RepoError::Db`] when the statement fails.
    pub async fn remove_all(&self) -> RepoResult<u64> {
        let res = R::Entity::delete_many().exec(&self.db).await?;
        debug!(operation = "remove_all", rows = res.rows_affected, "repository delete");
        Ok(res.rows_affected)
    }

    /// Store `model` and return the stored row.
    ///
    /// A model whose generated key is still unset (zero) is inserted and
    /// receives its key from the database. Otherwise the row with the model's
    /// key is updated, or the model is inserted when no such row exists.
    ///
    /// # Errors
    /// Returns [`RepoError::Db`] when the statement fails.
    pub async fn save(&self, model: ModelOf<R>) -> RepoResult<ModelOf<R>> {
        let mut active: R::ActiveModel = model.into_active_model().reset_all();

        if let Some(key) = unset_generated_key::<R>(&active) {
            active.not_set(key);
            let stored = active.insert(&self.db).await?;
            debug!(operation = "save", action = "insert", "repository save");
            return Ok(stored);
        }

        match active.clone().update(&self.db).await {
            Ok(stored) => {
                debug!(operation = "save", action = "update", "repository save");
                Ok(stored)
            }
            Err(DbErr::RecordNotUpdated) => {
                let stored = active.insert(&self.db).await?;
                debug!(operation = "save", action = "insert", "repository save");
                Ok(stored)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Save each model in order.
    ///
    /// # Errors
    /// Stops at and returns the first failing save.
    pub async fn save_all(
        &self,
        models: impl IntoIterator<Item = ModelOf<R>>,
    ) -> RepoResult<Vec<ModelOf<R>>> {
        let mut stored = Vec::new();
        for model in models {
            stored.push(self.save(model).await?);
        }
        Ok(stored)
    }
}

/// Key column of an auto-increment entity whose key is null or zero.
fn unset_generated_key<R: RecordEntity>(active: &R::ActiveModel) -> Option<ColumnOf<R>> {
    if !PrimaryKeyOf::<R>::auto_increment() {
        return None;
    }
    let mut keys = PrimaryKeyOf::<R>::iter();
    let (Some(key), None) = (keys.next(), keys.next()) else {
        return None;
    };
    let column = key.into_column();
    match active.get(column) {
        ActiveValue::Set(value) | ActiveValue::Unchanged(value) => {
            is_default_key(&value).then_some(column)
        }
        ActiveValue::NotSet => Some(column),
    }
}

fn is_default_key(value: &sea_orm::Value) -> bool {
    matches!(
        value,
        sea_orm::Value::TinyInt(None | Some(0))
            | sea_orm::Value::SmallInt(None | Some(0))
            | sea_orm::Value::Int(None | Some(0))
            | sea_orm::Value::BigInt(None | Some(0))
            | sea_orm::Value::TinyUnsigned(None | Some(0))
            | sea_orm::Value::SmallUnsigned(None | Some(0))
            | sea_orm::Value::Unsigned(None | Some(0))
            | sea_orm::Value::BigUnsigned(None | Some(0))
    )
}

impl<R: RecordEntity> std::fmt::Debug for Repository<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}
