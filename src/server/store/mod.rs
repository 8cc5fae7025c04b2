//! Document store backed by SQLite.
//!
//! Documents are stored as BSON blobs in the `document` table, one row per
//! document, keyed by collection and the canonical form of their `_id`. The
//! engine evaluates MongoDB-style filters, updates, projections, sorts and
//! aggregation pipelines in Rust on top of plain SeaORM queries. Per-collection
//! counters live in the `ids` table.

pub mod aggregate;
pub mod collection;
pub mod cursor;
pub mod filter;
pub mod projection;
pub mod sort;
pub mod update;
pub mod value;

#[cfg(test)]
mod test;

pub use collection::{
    Collection, FindSpec, InsertManyResult, InsertOneResult, UpdateResult,
};
pub use cursor::Cursor;

use entity::counter;
use sea_orm::{
    sea_query::{Expr, ExprTrait, OnConflict},
    ActiveValue, DatabaseConnection, EntityTrait,
};

use crate::server::error::store::StoreError;

/// Handle to the document store. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct DocumentStore {
    db: DatabaseConnection,
}

impl DocumentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(self.db.clone(), name.to_string())
    }

    /// Atomically increments the counter `name` and returns the new value.
    ///
    /// A missing counter starts at 1. The read-modify-write is a single
    /// `INSERT .. ON CONFLICT DO UPDATE .. RETURNING` statement, so concurrent
    /// callers always receive distinct values.
    pub async fn increment_counter(&self, name: &str) -> Result<i64, StoreError> {
        let row = counter::ActiveModel {
            name: ActiveValue::Set(name.to_string()),
            id: ActiveValue::Set(1),
        };
        let counter = counter::Entity::insert(row)
            .on_conflict(
                OnConflict::column(counter::Column::Name)
                    .value(counter::Column::Id, Expr::col(counter::Column::Id).add(1))
                    .to_owned(),
            )
            .exec_with_returning(&self.db)
            .await?;
        Ok(counter.id)
    }

    /// Sets the counter `name` to `id`, creating it if needed, and returns `id`.
    pub async fn set_counter(&self, name: &str, id: i64) -> Result<i64, StoreError> {
        let row = counter::ActiveModel {
            name: ActiveValue::Set(name.to_string()),
            id: ActiveValue::Set(id),
        };
        let counter = counter::Entity::insert(row)
            .on_conflict(
                OnConflict::column(counter::Column::Name)
                    .update_column(counter::Column::Id)
                    .to_owned(),
            )
            .exec_with_returning(&self.db)
            .await?;
        Ok(counter.id)
    }
}
