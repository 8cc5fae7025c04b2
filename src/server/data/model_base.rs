//! Generic document access shared by every entity.
//!
//! [`ModelBase`] binds the document store to one entity's collection and adds
//! the bookkeeping every entity relies on: `create_time` on insert,
//! `update_time` after a modifying update, soft deletion through the
//! `_deleted` marker, field filtering on insert and a per-collection
//! auto-increment counter. Each operation logs its collection, duration and
//! outcome; failures are logged and then returned unchanged.

use bson::{doc, Bson, DateTime, Document};
use std::{fmt, marker::PhantomData, time::Instant};

use crate::server::{
    error::store::StoreError,
    store::{
        Collection, Cursor, DocumentStore, FindSpec, InsertManyResult, InsertOneResult,
        UpdateResult,
    },
};

/// Marker field of soft-deleted documents.
pub const DELETED_FIELD: &str = "_deleted";
pub const CREATE_TIME_FIELD: &str = "create_time";
pub const UPDATE_TIME_FIELD: &str = "update_time";

/// Value kinds a field may hold to survive [`ModelBase::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int32,
    Int64,
    String,
    Double,
    Array,
    Document,
    Boolean,
    DateTime,
}

impl FieldKind {
    pub const ALL: &'static [FieldKind] = &[
        FieldKind::Int32,
        FieldKind::Int64,
        FieldKind::String,
        FieldKind::Double,
        FieldKind::Array,
        FieldKind::Document,
        FieldKind::Boolean,
        FieldKind::DateTime,
    ];

    /// Kind of a value, `None` for kinds that are never persisted from
    /// caller-supplied fields (null, binary, object id, regex, ...).
    pub fn of(value: &Bson) -> Option<Self> {
        Some(match value {
            Bson::Int32(_) => Self::Int32,
            Bson::Int64(_) => Self::Int64,
            Bson::String(_) => Self::String,
            Bson::Double(_) => Self::Double,
            Bson::Array(_) => Self::Array,
            Bson::Document(_) => Self::Document,
            Bson::Boolean(_) => Self::Boolean,
            Bson::DateTime(_) => Self::DateTime,
            _ => return None,
        })
    }
}

/// Per-entity configuration.
#[derive(Debug, Clone, Copy)]
pub struct EntityConfig {
    /// Entity type name the collection name derives from
    pub type_name: &'static str,
    /// Explicit collection name overriding the derived one
    pub collection: Option<&'static str>,
    /// Value kinds kept by `insert`
    pub allowed_kinds: &'static [FieldKind],
}

impl EntityConfig {
    pub const fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            collection: None,
            allowed_kinds: FieldKind::ALL,
        }
    }

    pub const fn with_collection(mut self, collection: &'static str) -> Self {
        self.collection = Some(collection);
        self
    }

    pub const fn with_allowed_kinds(mut self, allowed_kinds: &'static [FieldKind]) -> Self {
        self.allowed_kinds = allowed_kinds;
        self
    }

    pub fn collection_name(&self) -> String {
        match self.collection {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => derive_collection_name(self.type_name),
        }
    }
}

/// `TaskItem` -> `task_items`: every capital after the first character gets an
/// underscore, everything is lowercased and an `s` is appended.
pub fn derive_collection_name(type_name: &str) -> String {
    let mut name = String::with_capacity(type_name.len() + 4);
    for ch in type_name.chars() {
        if !name.is_empty() && ch.is_ascii_uppercase() {
            name.push('_');
        }
        name.push(ch.to_ascii_lowercase());
    }
    name.push('s');
    name
}

/// An entity stored through [`ModelBase`].
pub trait Entity {
    fn config() -> EntityConfig;
}

/// Options of [`ModelBase::find`]. Non-positive `skip`/`page_size` mean unset.
#[derive(Debug, Clone)]
pub struct FindOptions {
    pub fields: Option<Document>,
    pub skip: i64,
    pub page_size: i64,
    pub sort: Option<Document>,
    pub include_deleted: bool,
    pub return_cursor: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            fields: None,
            skip: -1,
            page_size: -1,
            sort: None,
            include_deleted: false,
            return_cursor: false,
        }
    }
}

/// Result of a query: a lazy cursor or the materialized documents.
pub enum FindResult {
    Cursor(Cursor),
    Documents(Vec<Document>),
}

impl FindResult {
    pub async fn into_documents(self) -> Result<Vec<Document>, StoreError> {
        match self {
            Self::Cursor(cursor) => cursor.collect().await,
            Self::Documents(docs) => Ok(docs),
        }
    }

    pub fn into_cursor(self) -> Cursor {
        match self {
            Self::Cursor(cursor) => cursor,
            Self::Documents(docs) => Cursor::from_documents(docs),
        }
    }
}

/// Options of [`ModelBase::update`]. Non-positive `skip_count`/`page_size`
/// mean unset.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub skip_count: i64,
    pub page_size: i64,
    pub update_time: bool,
    pub single_update: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            skip_count: -1,
            page_size: -1,
            update_time: true,
            single_update: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    /// `_id`s of modified documents; only filled by per-document updates
    pub modified_ids: Vec<Bson>,
}

/// Data access for the entity `E`.
pub struct ModelBase<'a, E: Entity> {
    store: &'a DocumentStore,
    collection: Collection,
    config: EntityConfig,
    _entity: PhantomData<E>,
}

impl<'a, E: Entity> ModelBase<'a, E> {
    pub fn new(store: &'a DocumentStore) -> Self {
        let config = E::config();
        Self {
            store,
            collection: store.collection(&config.collection_name()),
            config,
            _entity: PhantomData,
        }
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    /// Inserts caller-supplied fields as a new document.
    ///
    /// Keys starting with `_` and values of disallowed kinds are dropped, `id`
    /// is stored as `_id`, and `create_time` is set to now.
    ///
    /// # Arguments
    /// - `fields` - Field values of the new document
    ///
    /// # Returns
    /// - `Ok(InsertOneResult)` - `_id` of the stored document
    /// - `Err(StoreError)` - Duplicate `_id` or store failure
    pub async fn insert(&self, fields: Document) -> Result<InsertOneResult, StoreError> {
        let started = Instant::now();
        let doc = self.prepare(fields, DateTime::now());

        let result = self.collection.insert_one(doc).await;
        log_outcome(
            &result,
            format_args!("insert into {} in {:.3} seconds", self.collection_name(), secs(started)),
        );
        result
    }

    /// Inserts a document as given apart from stamping `create_time`.
    pub async fn insert_raw(&self, mut doc: Document) -> Result<InsertOneResult, StoreError> {
        let started = Instant::now();
        doc.insert(CREATE_TIME_FIELD, DateTime::now());

        let result = self.collection.insert_one(doc).await;
        log_outcome(
            &result,
            format_args!("insert into {} in {:.3} seconds", self.collection_name(), secs(started)),
        );
        result
    }

    /// Inserts several documents sharing one `create_time`, filtered like
    /// [`insert`](Self::insert).
    pub async fn insert_many(
        &self,
        items: Vec<Document>,
        ordered: bool,
    ) -> Result<InsertManyResult, StoreError> {
        let started = Instant::now();
        let now = DateTime::now();
        let count = items.len();
        let docs = items.into_iter().map(|fields| self.prepare(fields, now)).collect();

        let result = self.collection.insert_many(docs, ordered).await;
        log_outcome(
            &result,
            format_args!(
                "insert {} docs into {} in {:.3} seconds",
                count,
                self.collection_name(),
                secs(started)
            ),
        );
        result
    }

    fn prepare(&self, fields: Document, now: DateTime) -> Document {
        let mut doc = Document::new();
        doc.insert(CREATE_TIME_FIELD, now);
        for (name, value) in fields {
            if name.starts_with('_') || name == CREATE_TIME_FIELD {
                continue;
            }
            if !FieldKind::of(&value).is_some_and(|kind| self.config.allowed_kinds.contains(&kind)) {
                continue;
            }
            let name = if name == "id" { "_id".to_string() } else { name };
            doc.insert(name, value);
        }
        doc
    }

    /// Queries live documents.
    ///
    /// Unless `include_deleted` is set the filter is narrowed to documents
    /// without a `_deleted` marker. Sort applies before skip and page size.
    /// With `return_cursor` the result is a lazy cursor; the match count used
    /// for the log line is then computed separately and a failure to compute
    /// it is only logged.
    pub async fn find(
        &self,
        mut filter: Document,
        options: FindOptions,
    ) -> Result<FindResult, StoreError> {
        let started = Instant::now();
        if !options.include_deleted {
            filter.insert(DELETED_FIELD, Bson::Null);
        }

        let result = self.run_find(&filter, &options).await;
        let count = result.as_ref().map_or(0, |(_, count)| *count);
        log_outcome(
            &result,
            format_args!(
                "find from {} in {:.3} seconds, count is {}",
                self.collection_name(),
                secs(started),
                count
            ),
        );
        result.map(|(found, _)| found)
    }

    async fn run_find(
        &self,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<(FindResult, u64), StoreError> {
        let spec = FindSpec {
            projection: options.fields.clone().filter(|fields| !fields.is_empty()),
            sort: options.sort.clone().filter(|sort| !sort.is_empty()),
            skip: options.skip.max(0) as u64,
            limit: (options.page_size > 0).then_some(options.page_size as u64),
            batch_size: None,
        };
        let cursor = self.collection.find(filter, spec).await?;

        if options.return_cursor {
            let count = match self.collection.count_documents(filter).await {
                Ok(count) => count,
                Err(err) => {
                    tracing::warn!(
                        "count of {} for cursor failed: {:?}",
                        self.collection_name(),
                        err
                    );
                    0
                }
            };
            return Ok((FindResult::Cursor(cursor), count));
        }

        let docs = cursor.collect().await?;
        let count = docs.len() as u64;
        Ok((FindResult::Documents(docs), count))
    }

    /// First document matching `filter`, soft-deleted ones included.
    pub async fn find_one(
        &self,
        filter: Document,
        sort: Option<Document>,
        fields: Option<Document>,
    ) -> Result<Option<Document>, StoreError> {
        let started = Instant::now();

        let result = self
            .collection
            .find_one(
                &filter,
                sort.filter(|sort| !sort.is_empty()),
                fields.filter(|fields| !fields.is_empty()),
            )
            .await;
        let found = matches!(result, Ok(Some(_)));
        log_outcome(
            &result,
            format_args!(
                "find one from {} in {:.3} seconds ({})",
                self.collection_name(),
                secs(started),
                if found { "found" } else { "not found" }
            ),
        );
        result
    }

    /// Updates matching documents.
    ///
    /// With paging or `single_update`, live matches are visited one at a time
    /// through [`find`](Self::find); each is updated by `_id` and stamped with
    /// `update_time` only when it actually changed. Otherwise one multi-update
    /// runs and, when it modified anything, `update_time` is stamped on the
    /// same filter. That bulk stamp is an approximation: it also reaches
    /// matching documents the update left unchanged, and misses documents the
    /// update moved out of the filter.
    pub async fn update(
        &self,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome, StoreError> {
        let started = Instant::now();

        let result = if options.skip_count > 0 || options.page_size > 0 || options.single_update {
            self.update_each(filter, &update, &options).await
        } else {
            self.update_bulk(&filter, &update, options.update_time).await
        };
        let updated = result.as_ref().map_or(0, |outcome| outcome.modified_count);
        log_outcome(
            &result,
            format_args!(
                "update {} in {:.3} seconds, {} updated",
                self.collection_name(),
                secs(started),
                updated
            ),
        );
        result
    }

    async fn update_each(
        &self,
        filter: Document,
        update: &Document,
        options: &UpdateOptions,
    ) -> Result<UpdateOutcome, StoreError> {
        let find = FindOptions {
            skip: options.skip_count,
            page_size: options.page_size,
            return_cursor: true,
            ..Default::default()
        };
        let mut cursor = self.find(filter, find).await?.into_cursor();
        let mut outcome = UpdateOutcome::default();

        while let Some(item) = cursor.try_next().await? {
            let Some(id) = item.get("_id").cloned() else {
                continue;
            };
            let by_id = doc! { "_id": id.clone() };

            let single = self.collection.update_one(&by_id, update, false).await?;
            outcome.matched_count += single.matched_count;
            outcome.modified_count += single.modified_count;
            if single.modified_count > 0 {
                outcome.modified_ids.push(id);
                if options.update_time {
                    self.collection
                        .update_one(&by_id, &update_time_stamp(), false)
                        .await?;
                }
            }
        }
        Ok(outcome)
    }

    async fn update_bulk(
        &self,
        filter: &Document,
        update: &Document,
        update_time: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self.collection.update_many(filter, update, false).await?;
        if result.modified_count > 0 && update_time {
            self.collection
                .update_many(filter, &update_time_stamp(), false)
                .await?;
        }
        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            modified_ids: Vec::new(),
        })
    }

    /// Updates the first match. `update_time` is stamped, on the same filter,
    /// only when that document actually changed.
    pub async fn update_one(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
        update_time: bool,
    ) -> Result<UpdateResult, StoreError> {
        let started = Instant::now();

        let result = self.run_update_one(&filter, &update, upsert, update_time).await;
        let updated = result.as_ref().map_or(0, |r| r.modified_count);
        log_outcome(
            &result,
            format_args!(
                "update_one {} in {:.3} seconds, {} updated",
                self.collection_name(),
                secs(started),
                updated
            ),
        );
        result
    }

    async fn run_update_one(
        &self,
        filter: &Document,
        update: &Document,
        upsert: bool,
        update_time: bool,
    ) -> Result<UpdateResult, StoreError> {
        let result = self.collection.update_one(filter, update, upsert).await?;
        if result.modified_count > 0 && update_time {
            self.collection
                .update_one(filter, &update_time_stamp(), false)
                .await?;
        }
        Ok(result)
    }

    pub async fn upsert(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, StoreError> {
        self.update_one(filter, update, true, true).await
    }

    /// Deletes matching documents, softly by default.
    ///
    /// A soft delete sets `_deleted: 1`; `real_delete` removes the documents.
    /// `id` in the filter is read as `_id`. Returns how many documents were
    /// newly marked or removed.
    pub async fn delete(
        &self,
        mut filter: Document,
        real_delete: bool,
        multi: bool,
    ) -> Result<u64, StoreError> {
        let started = Instant::now();
        if let Some(id) = filter.remove("id") {
            filter.insert("_id", id);
        }

        let result = match (real_delete, multi) {
            (false, _) => {
                let mark = doc! { "$set": { "_deleted": 1 } };
                let updated = if multi {
                    self.collection.update_many(&filter, &mark, false).await
                } else {
                    self.collection.update_one(&filter, &mark, false).await
                };
                updated.map(|r| r.modified_count)
            }
            (true, true) => self.collection.delete_many(&filter).await.map(|r| r.deleted_count),
            (true, false) => self.collection.delete_one(&filter).await.map(|r| r.deleted_count),
        };
        log_outcome(
            &result,
            format_args!("delete from {} in {:.3} seconds", self.collection_name(), secs(started)),
        );
        result
    }

    /// Number of matching documents. Soft-deleted documents are counted unless
    /// the filter excludes them.
    pub async fn count(&self, filter: Document) -> Result<u64, StoreError> {
        let started = Instant::now();

        let result = self.collection.count_documents(&filter).await;
        log_outcome(
            &result,
            format_args!(
                "count {} in {:.3} seconds, count is {}",
                self.collection_name(),
                secs(started),
                result.as_ref().copied().unwrap_or_default()
            ),
        );
        result
    }

    pub async fn distinct(&self, field: &str, filter: Document) -> Result<Vec<Bson>, StoreError> {
        let started = Instant::now();

        let result = self.collection.distinct(field, &filter).await;
        log_outcome(
            &result,
            format_args!(
                "distinct {} of {} in {:.3} seconds",
                field,
                self.collection_name(),
                secs(started)
            ),
        );
        result
    }

    /// Runs an aggregation pipeline over the collection.
    ///
    /// `allow_disk_use` is accepted for callers that pass it; pipelines always
    /// run in memory.
    pub async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        return_cursor: bool,
        allow_disk_use: bool,
    ) -> Result<FindResult, StoreError> {
        let started = Instant::now();

        let result = match self.collection.aggregate(&pipeline).await {
            Ok(cursor) if return_cursor => Ok(FindResult::Cursor(cursor)),
            Ok(cursor) => cursor.collect().await.map(FindResult::Documents),
            Err(err) => Err(err),
        };
        let count = match &result {
            Ok(FindResult::Documents(docs)) => docs.len(),
            _ => 0,
        };
        log_outcome(
            &result,
            format_args!(
                "aggregate {} in {:.3} seconds, count is {}, allow_disk_use is {}",
                self.collection_name(),
                secs(started),
                count,
                allow_disk_use
            ),
        );
        result
    }

    /// Increments this collection's counter and returns the new value.
    pub async fn get_auto_increasing_id(&self) -> Result<i64, StoreError> {
        self.store.increment_counter(self.collection_name()).await
    }

    pub async fn set_auto_increasing_id(&self, id: i64) -> Result<i64, StoreError> {
        self.store.set_counter(self.collection_name(), id).await
    }
}

fn update_time_stamp() -> Document {
    doc! { "$set": { "update_time": DateTime::now() } }
}

fn secs(started: Instant) -> f64 {
    started.elapsed().as_secs_f64()
}

/// Logs a data operation at debug level, or at error level with the error
/// when it failed.
fn log_outcome<T>(result: &Result<T, StoreError>, message: fmt::Arguments<'_>) {
    match result {
        Ok(_) => tracing::debug!("{}", message),
        Err(err) => tracing::error!("{}, error is {:?}", message, err),
    }
}
