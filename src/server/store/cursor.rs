//! Lazy query cursors.

use bson::Document;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::collections::VecDeque;

use entity::document;

use crate::server::{
    error::store::StoreError,
    store::{filter::Filter, projection::Projection},
};

/// Rows fetched per round trip when the caller does not choose a batch size.
pub const DEFAULT_BATCH_SIZE: u64 = 101;

/// Iterator over query results.
///
/// An unsorted query scans the collection in insertion order, pulling
/// `batch_size` rows at a time and only when the buffered results run out.
/// Sorted queries and aggregations are materialized up front and then served
/// from memory.
pub struct Cursor {
    scan: Option<Scan>,
    buffer: VecDeque<Document>,
}

pub(crate) struct Scan {
    pub db: DatabaseConnection,
    pub collection: String,
    pub doc_key: Option<String>,
    pub filter: Filter,
    pub projection: Option<Projection>,
    pub skip: u64,
    pub limit: Option<u64>,
    pub batch_size: u64,
    pub after_seq: i64,
}

impl Cursor {
    pub(crate) fn scan(scan: Scan) -> Self {
        Self {
            scan: Some(scan),
            buffer: VecDeque::new(),
        }
    }

    /// Cursor over documents that are already in memory.
    pub fn from_documents(docs: Vec<Document>) -> Self {
        Self {
            scan: None,
            buffer: docs.into(),
        }
    }

    /// Returns the next document, fetching another batch when needed.
    pub async fn try_next(&mut self) -> Result<Option<Document>, StoreError> {
        loop {
            if let Some(doc) = self.buffer.pop_front() {
                return Ok(Some(doc));
            }
            let Some(scan) = self.scan.as_mut() else {
                return Ok(None);
            };
            let exhausted = scan.fetch(&mut self.buffer).await?;
            if exhausted {
                self.scan = None;
            }
        }
    }

    /// Drains the cursor into a vector.
    pub async fn collect(mut self) -> Result<Vec<Document>, StoreError> {
        let mut docs = Vec::new();
        while let Some(doc) = self.try_next().await? {
            docs.push(doc);
        }
        Ok(docs)
    }
}

impl Scan {
    /// Fills `out` from the next batch of rows. Returns `true` once the scan
    /// has nothing left to produce.
    async fn fetch(&mut self, out: &mut VecDeque<Document>) -> Result<bool, StoreError> {
        if self.limit == Some(0) {
            return Ok(true);
        }

        let rows = read_batch(
            &self.db,
            &self.collection,
            self.doc_key.as_deref(),
            self.after_seq,
            self.batch_size,
        )
        .await?;
        let exhausted = (rows.len() as u64) < self.batch_size;

        for row in rows {
            self.after_seq = row.seq;
            let doc = Document::from_reader(row.body.as_slice())?;
            if !self.filter.matches(&doc) {
                continue;
            }
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }
            if let Some(limit) = self.limit.as_mut() {
                if *limit == 0 {
                    return Ok(true);
                }
                *limit -= 1;
            }
            out.push_back(match &self.projection {
                Some(projection) => projection.apply(doc),
                None => doc,
            });
        }

        Ok(exhausted || self.limit == Some(0))
    }
}

/// Reads the next `batch_size` rows of a collection after row `after_seq`,
/// in insertion order, optionally narrowed to one `_id` key.
pub(crate) async fn read_batch<C: ConnectionTrait>(
    conn: &C,
    collection: &str,
    doc_key: Option<&str>,
    after_seq: i64,
    batch_size: u64,
) -> Result<Vec<document::Model>, StoreError> {
    let mut query = document::Entity::find()
        .filter(document::Column::Collection.eq(collection))
        .filter(document::Column::Seq.gt(after_seq));
    if let Some(key) = doc_key {
        query = query.filter(document::Column::DocKey.eq(key));
    }
    Ok(query
        .order_by_asc(document::Column::Seq)
        .limit(batch_size)
        .all(conn)
        .await?)
}
