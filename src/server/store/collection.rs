use bson::{oid::ObjectId, Bson, Document};
use sea_orm::{
    sea_query::Expr, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, SqlErr, TransactionTrait,
};
use std::collections::HashSet;

use entity::document;

use crate::server::{
    error::store::{BulkWriteFailure, StoreError},
    store::{
        aggregate::Pipeline,
        cursor::{read_batch, Cursor, Scan, DEFAULT_BATCH_SIZE},
        filter::Filter,
        projection::Projection,
        sort::SortSpec,
        update::Update,
        value::{canonical_key, id_key, lookup},
    },
};

/// Options of a `find` query.
#[derive(Debug, Clone, Default)]
pub struct FindSpec {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: u64,
    pub limit: Option<u64>,
    pub batch_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneResult {
    pub inserted_id: Bson,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertManyResult {
    pub inserted_ids: Vec<Bson>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<Bson>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// A named set of documents inside the store.
///
/// Every write primitive runs inside its own SQLite transaction, so a failure
/// halfway through a multi-document update leaves the collection untouched.
#[derive(Clone)]
pub struct Collection {
    db: DatabaseConnection,
    name: String,
}

impl Collection {
    pub(crate) fn new(db: DatabaseConnection, name: String) -> Self {
        Self { db, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts one document, generating an `ObjectId` `_id` when it has none.
    ///
    /// # Arguments
    /// - `doc` - Document to store
    ///
    /// # Returns
    /// - `Ok(InsertOneResult)` - The `_id` the document was stored under
    /// - `Err(StoreError::DuplicateKey)` - Another document already uses that `_id`
    /// - `Err(StoreError)` - Invalid `_id`, encoding or database failure
    pub async fn insert_one(&self, doc: Document) -> Result<InsertOneResult, StoreError> {
        let inserted_id = self.insert_row(&self.db, doc).await?;
        Ok(InsertOneResult { inserted_id })
    }

    /// Inserts a batch of documents.
    ///
    /// Ordered inserts stop at the first failure, unordered inserts attempt
    /// every document. Either way the documents that did go in stay stored and
    /// any failure is reported as [`StoreError::BulkWrite`].
    pub async fn insert_many(
        &self,
        docs: Vec<Document>,
        ordered: bool,
    ) -> Result<InsertManyResult, StoreError> {
        let mut inserted_ids = Vec::with_capacity(docs.len());
        let mut failures = Vec::new();

        for (index, doc) in docs.into_iter().enumerate() {
            match self.insert_row(&self.db, doc).await {
                Ok(id) => inserted_ids.push(id),
                Err(err) => {
                    failures.push(BulkWriteFailure {
                        index,
                        message: err.to_string(),
                    });
                    if ordered {
                        break;
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(InsertManyResult { inserted_ids })
        } else {
            Err(StoreError::BulkWrite {
                inserted_ids,
                failures,
            })
        }
    }

    /// Queries the collection.
    ///
    /// The filter, projection and sort are validated before anything is read,
    /// so a malformed query fails even when no document would match.
    pub async fn find(&self, filter: &Document, spec: FindSpec) -> Result<Cursor, StoreError> {
        let filter = Filter::parse(filter)?;
        let projection = spec.projection.as_ref().map(Projection::parse).transpose()?;
        let sort = match &spec.sort {
            Some(sort) => SortSpec::parse(sort)?,
            None => SortSpec::default(),
        };
        let doc_key = filter.id_equality().map(canonical_key);
        let batch_size = spec.batch_size.filter(|n| *n > 0).unwrap_or(DEFAULT_BATCH_SIZE);

        if sort.is_empty() {
            return Ok(Cursor::scan(Scan {
                db: self.db.clone(),
                collection: self.name.clone(),
                doc_key,
                filter,
                projection,
                skip: spec.skip,
                limit: spec.limit,
                batch_size,
                after_seq: 0,
            }));
        }

        // A sort needs the whole match set before the first result.
        let mut docs = self
            .matching(&self.db, &filter, None)
            .await?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect::<Vec<_>>();
        sort.sort(&mut docs);
        let docs = docs
            .into_iter()
            .skip(spec.skip as usize)
            .take(spec.limit.map_or(usize::MAX, |n| n as usize))
            .map(|doc| match &projection {
                Some(projection) => projection.apply(doc),
                None => doc,
            })
            .collect();
        Ok(Cursor::from_documents(docs))
    }

    pub async fn find_one(
        &self,
        filter: &Document,
        sort: Option<Document>,
        projection: Option<Document>,
    ) -> Result<Option<Document>, StoreError> {
        let spec = FindSpec {
            projection,
            sort,
            limit: Some(1),
            batch_size: Some(1),
            ..Default::default()
        };
        self.find(filter, spec).await?.try_next().await
    }

    pub async fn update_one(
        &self,
        filter: &Document,
        update: &Document,
        upsert: bool,
    ) -> Result<UpdateResult, StoreError> {
        self.update(filter, update, upsert, false).await
    }

    pub async fn update_many(
        &self,
        filter: &Document,
        update: &Document,
        upsert: bool,
    ) -> Result<UpdateResult, StoreError> {
        self.update(filter, update, upsert, true).await
    }

    async fn update(
        &self,
        filter: &Document,
        update: &Document,
        upsert: bool,
        multi: bool,
    ) -> Result<UpdateResult, StoreError> {
        let filter = Filter::parse(filter)?;
        let update = Update::parse(update)?;

        let txn = self.db.begin().await?;
        let limit = if multi { None } else { Some(1) };
        let mut result = UpdateResult::default();

        for (seq, mut doc) in self.matching(&txn, &filter, limit).await? {
            result.matched_count += 1;
            if update.apply(&mut doc, false)? {
                result.modified_count += 1;
                document::Entity::update_many()
                    .col_expr(document::Column::Body, Expr::value(encode(&doc)?))
                    .filter(document::Column::Seq.eq(seq))
                    .exec(&txn)
                    .await?;
            }
        }

        if result.matched_count == 0 && upsert {
            let mut doc = filter.equality_seed()?;
            update.apply(&mut doc, true)?;
            result.upserted_id = Some(self.insert_row(&txn, doc).await?);
        }

        txn.commit().await?;
        Ok(result)
    }

    pub async fn delete_one(&self, filter: &Document) -> Result<DeleteResult, StoreError> {
        self.delete(filter, false).await
    }

    pub async fn delete_many(&self, filter: &Document) -> Result<DeleteResult, StoreError> {
        self.delete(filter, true).await
    }

    async fn delete(&self, filter: &Document, multi: bool) -> Result<DeleteResult, StoreError> {
        let filter = Filter::parse(filter)?;
        let txn = self.db.begin().await?;

        let seqs: Vec<i64> = self
            .matching(&txn, &filter, if multi { None } else { Some(1) })
            .await?
            .into_iter()
            .map(|(seq, _)| seq)
            .collect();
        let deleted_count = if seqs.is_empty() {
            0
        } else {
            document::Entity::delete_many()
                .filter(document::Column::Seq.is_in(seqs))
                .exec(&txn)
                .await?
                .rows_affected
        };

        txn.commit().await?;
        Ok(DeleteResult { deleted_count })
    }

    pub async fn count_documents(&self, filter: &Document) -> Result<u64, StoreError> {
        let filter = Filter::parse(filter)?;
        Ok(self.matching(&self.db, &filter, None).await?.len() as u64)
    }

    /// Distinct values of `field` among matching documents, in first-seen
    /// order. Array values contribute their elements.
    pub async fn distinct(&self, field: &str, filter: &Document) -> Result<Vec<Bson>, StoreError> {
        let filter = Filter::parse(filter)?;
        let mut seen = HashSet::new();
        let mut values = Vec::new();

        for (_, doc) in self.matching(&self.db, &filter, None).await? {
            for value in lookup(&doc, field) {
                let items = match value {
                    Bson::Array(items) => items.clone(),
                    other => vec![other.clone()],
                };
                for item in items {
                    if seen.insert(canonical_key(&item)) {
                        values.push(item);
                    }
                }
            }
        }
        Ok(values)
    }

    /// Runs an aggregation pipeline. The result is computed in full and
    /// served from the returned cursor.
    pub async fn aggregate(&self, pipeline: &[Document]) -> Result<Cursor, StoreError> {
        let pipeline = Pipeline::parse(pipeline)?;
        let all = Filter::all();
        let scan_filter = pipeline.leading_match().unwrap_or(&all);

        let docs = self
            .matching(&self.db, scan_filter, None)
            .await?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect();
        Ok(Cursor::from_documents(pipeline.run(docs)?))
    }

    /// Loads matching documents in insertion order, with their row sequence.
    ///
    /// Rows are read in batches and the read stops once `limit` matches are
    /// found.
    async fn matching<C: ConnectionTrait>(
        &self,
        conn: &C,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<(i64, Document)>, StoreError> {
        let doc_key = filter.id_equality().map(canonical_key);
        let mut out = Vec::new();
        let mut after_seq = 0;

        loop {
            let rows = read_batch(
                conn,
                &self.name,
                doc_key.as_deref(),
                after_seq,
                DEFAULT_BATCH_SIZE,
            )
            .await?;
            let exhausted = (rows.len() as u64) < DEFAULT_BATCH_SIZE;

            for row in rows {
                after_seq = row.seq;
                let doc = Document::from_reader(row.body.as_slice())?;
                if filter.matches(&doc) {
                    out.push((row.seq, doc));
                    if limit.is_some_and(|n| out.len() >= n) {
                        return Ok(out);
                    }
                }
            }

            if exhausted {
                return Ok(out);
            }
        }
    }

    async fn insert_row<C: ConnectionTrait>(
        &self,
        conn: &C,
        doc: Document,
    ) -> Result<Bson, StoreError> {
        let doc = match doc.get("_id") {
            Some(_) => doc,
            None => {
                let mut with_id = Document::new();
                with_id.insert("_id", ObjectId::new());
                with_id.extend(doc);
                with_id
            }
        };
        let id = doc.get("_id").cloned().unwrap_or(Bson::Null);

        let row = document::ActiveModel {
            seq: ActiveValue::NotSet,
            collection: ActiveValue::Set(self.name.clone()),
            doc_key: ActiveValue::Set(id_key(&id)?),
            body: ActiveValue::Set(encode(&doc)?),
        };
        document::Entity::insert(row)
            .exec(conn)
            .await
            .map_err(|err| self.map_insert_error(err, &id))?;
        Ok(id)
    }

    fn map_insert_error(&self, err: DbErr, id: &Bson) -> StoreError {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::DuplicateKey {
                collection: self.name.clone(),
                id: id.clone().into_relaxed_extjson().to_string(),
            },
            _ => StoreError::DbErr(err),
        }
    }
}

fn encode(doc: &Document) -> Result<Vec<u8>, StoreError> {
    let mut body = Vec::new();
    doc.to_writer(&mut body)?;
    Ok(body)
}
