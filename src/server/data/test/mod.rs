use bson::{doc, oid::ObjectId, Bson, Document};
use test_utils::builder::TestBuilder;

use crate::server::{
    data::model_base::{
        Entity, EntityConfig, FieldKind, FindOptions, FindResult, ModelBase, UpdateOptions,
        CREATE_TIME_FIELD, DELETED_FIELD, UPDATE_TIME_FIELD,
    },
    error::store::StoreError,
    store::DocumentStore,
};

mod model_base;
mod task;

/// Builds a store over a fresh in-memory database with the document tables.
async fn store() -> DocumentStore {
    let test = TestBuilder::new()
        .with_document_tables()
        .build()
        .await
        .unwrap();
    DocumentStore::new(test.db.unwrap())
}
