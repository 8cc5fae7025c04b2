use bson::{doc, oid::ObjectId, Bson, Document};
use test_utils::builder::TestBuilder;

use crate::server::{
    error::store::StoreError,
    store::{Collection, DocumentStore, FindSpec},
};


/// Builds a store over a fresh in-memory database with the document tables.
async fn store() -> DocumentStore {
    let test = TestBuilder::new()
        .with_document_tables()
        .build()
        .await
        .unwrap();
    DocumentStore::new(test.db.unwrap())
}

/// Seeds `tasks` with three documents with integer ids 1..=3.
async fn seeded() -> Result<Collection, StoreError> {
    let tasks = store().await.collection("tasks");
    tasks
        .insert_many(
            vec![
                doc! { "_id": 1, "name": "write", "done": false, "points": 3, "tags": ["a"] },
                doc! { "_id": 2, "name": "review", "done": true, "points": 5, "tags": ["a", "b"] },
                doc! { "_id": 3, "name": "ship", "done": false, "points": 1 },
            ],
            true,
        )
        .await?;
    Ok(tasks)
}

fn ids(docs: &[Document]) -> Vec<Bson> {
    docs.iter()
        .map(|d| d.get("_id").cloned().unwrap_or(Bson::Null))
        .collect()
}
