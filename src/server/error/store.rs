use bson::Bson;
use thiserror::Error;

/// Failure of a document store primitive.
///
/// Every variant surfaces to the caller unchanged; the access layer logs it
/// with operation context before propagating.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying SQLite/SeaORM failure (connectivity, constraint, SQL).
    #[error(transparent)]
    DbErr(#[from] sea_orm::DbErr),

    /// A document could not be encoded to BSON bytes.
    #[error("Failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    /// A stored row holds bytes that are not a valid BSON document.
    #[error("Failed to decode stored document: {0}")]
    Decode(#[from] bson::de::Error),

    /// A document with the same `_id` already exists in the collection.
    #[error("E11000 duplicate key error collection: {collection} dup key: {{ _id: {id} }}")]
    DuplicateKey {
        /// Collection the insert targeted
        collection: String,
        /// Offending identifier, as extended JSON
        id: String,
    },

    /// The value cannot serve as a document identifier.
    #[error("Invalid _id: {0}")]
    InvalidId(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Malformed update document, or an update that cannot be applied to the
    /// matched document (e.g. `$inc` on text, changing `_id`).
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Invalid projection: {0}")]
    InvalidProjection(String),

    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    /// Malformed aggregation stage or expression, or an expression that failed
    /// while evaluating against a document.
    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// One or more documents of an `insert_many` failed.
    ///
    /// Documents inserted before (ordered) or around (unordered) the failures
    /// stay persisted.
    #[error(
        "Bulk write error: {} inserted, {} failed ({})",
        .inserted_ids.len(),
        .failures.len(),
        .failures.first().map(|f| f.message.as_str()).unwrap_or_default()
    )]
    BulkWrite {
        inserted_ids: Vec<Bson>,
        failures: Vec<BulkWriteFailure>,
    },
}

/// A single failed document inside a bulk insert.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkWriteFailure {
    /// Position of the document in the submitted batch
    pub index: usize,
    pub message: String,
}
