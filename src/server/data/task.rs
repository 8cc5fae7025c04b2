use bson::{doc, Bson, Document};

use crate::server::{
    data::model_base::{FindOptions, ModelBase, UpdateOptions, UpdateOutcome, DELETED_FIELD},
    error::store::StoreError,
    model::task::{Task, TaskFields, NUMBER_FIELD},
    store::{DocumentStore, InsertManyResult, UpdateResult},
};

pub struct TaskRepository<'a> {
    tasks: ModelBase<'a, Task>,
}

impl<'a> TaskRepository<'a> {
    /// Creates a new TaskRepository instance.
    ///
    /// # Arguments
    /// - `store` - Document store handle
    ///
    /// # Returns
    /// - `TaskRepository` - New repository instance
    pub fn new(store: &'a DocumentStore) -> Self {
        Self {
            tasks: ModelBase::new(store),
        }
    }

    /// Creates a task numbered from the `tasks` counter.
    ///
    /// # Arguments
    /// - `fields` - Writable task fields
    ///
    /// # Returns
    /// - `Ok(Bson)` - `_id` of the created task
    /// - `Err(StoreError)` - Counter or insert failure
    pub async fn create(&self, fields: TaskFields) -> Result<Bson, StoreError> {
        let mut doc = fields.into_document();
        doc.insert(NUMBER_FIELD, self.tasks.get_auto_increasing_id().await?);

        let result = self.tasks.insert(doc).await?;

        Ok(result.inserted_id)
    }

    /// Creates several tasks, each numbered from the `tasks` counter.
    ///
    /// With `ordered` the first failing item stops the batch; otherwise every
    /// item is attempted and the failures are reported together.
    pub async fn create_many(
        &self,
        items: Vec<TaskFields>,
        ordered: bool,
    ) -> Result<InsertManyResult, StoreError> {
        let mut docs = Vec::with_capacity(items.len());
        for fields in items {
            let mut doc = fields.into_document();
            doc.insert(NUMBER_FIELD, self.tasks.get_auto_increasing_id().await?);
            docs.push(doc);
        }

        self.tasks.insert_many(docs, ordered).await
    }

    /// Gets a live task by id.
    ///
    /// # Arguments
    /// - `id` - `_id` value or `_id` filter condition
    ///
    /// # Returns
    /// - `Ok(Some(Document))` - The newest live task matching `id`
    /// - `Ok(None)` - No live task matches
    /// - `Err(StoreError)` - Store failure
    pub async fn get_by_id(&self, id: Bson) -> Result<Option<Document>, StoreError> {
        let mut filter = doc! { "_id": id };
        filter.insert(DELETED_FIELD, Bson::Null);

        self.tasks
            .find_one(filter, Some(doc! { "create_time": -1 }), None)
            .await
    }

    /// Gets one page of tasks, newest first, with the total count.
    ///
    /// # Arguments
    /// - `skip` - Number of tasks before the page
    /// - `page_size` - Tasks per page
    /// - `include_deleted` - Whether soft-deleted tasks are listed and counted
    ///
    /// # Returns
    /// - `Ok((Vec<Document>, u64))` - The page and the total across all pages
    /// - `Err(StoreError)` - Store failure
    pub async fn get_paginated(
        &self,
        skip: i64,
        page_size: i64,
        include_deleted: bool,
    ) -> Result<(Vec<Document>, u64), StoreError> {
        let options = FindOptions {
            skip,
            page_size,
            sort: Some(doc! { "create_time": -1, "no": -1 }),
            include_deleted,
            ..Default::default()
        };
        let tasks = self.tasks.find(doc! {}, options).await?.into_documents().await?;

        let total = if include_deleted {
            self.tasks.count(doc! {}).await?
        } else {
            self.count().await?
        };

        Ok((tasks, total))
    }

    /// Sets fields of a live task.
    pub async fn update(&self, id: Bson, fields: TaskFields) -> Result<UpdateResult, StoreError> {
        let mut filter = doc! { "_id": id };
        filter.insert(DELETED_FIELD, Bson::Null);

        self.tasks
            .update_one(filter, doc! { "$set": fields.into_document() }, false, true)
            .await
    }

    /// Sets fields of the task with the given `_id`, creating it when missing.
    pub async fn save(&self, id: Bson, fields: TaskFields) -> Result<UpdateResult, StoreError> {
        self.tasks
            .upsert(doc! { "_id": id }, doc! { "$set": fields.into_document() })
            .await
    }

    /// Marks every open live task as done, one task at a time.
    ///
    /// # Arguments
    /// - `page_size` - Maximum number of tasks completed, non-positive for all
    ///
    /// # Returns
    /// - `Ok(UpdateOutcome)` - Counts and the `_id`s of the completed tasks
    /// - `Err(StoreError)` - Store failure
    pub async fn complete_open(&self, page_size: i64) -> Result<UpdateOutcome, StoreError> {
        let options = UpdateOptions {
            page_size,
            single_update: true,
            ..Default::default()
        };

        self.tasks
            .update(
                doc! { "done": { "$ne": true } },
                doc! { "$set": { "done": true } },
                options,
            )
            .await
    }

    /// Deletes a task, softly unless `real_delete` is set.
    ///
    /// # Returns
    /// - `Ok(u64)` - 1 when a task was marked or removed, 0 otherwise
    /// - `Err(StoreError)` - Store failure
    pub async fn delete(&self, id: Bson, real_delete: bool) -> Result<u64, StoreError> {
        self.tasks.delete(doc! { "id": id }, real_delete, false).await
    }

    /// Number of live tasks.
    pub async fn count(&self) -> Result<u64, StoreError> {
        let mut filter = Document::new();
        filter.insert(DELETED_FIELD, Bson::Null);

        self.tasks.count(filter).await
    }

    /// Distinct names of live tasks.
    pub async fn names(&self) -> Result<Vec<Bson>, StoreError> {
        let mut filter = Document::new();
        filter.insert(DELETED_FIELD, Bson::Null);

        self.tasks.distinct("name", filter).await
    }

    /// Live tasks grouped by `done`, with the count and summed `points` of
    /// each group.
    pub async fn stats(&self) -> Result<Vec<Document>, StoreError> {
        let pipeline = vec![
            doc! { "$match": { "_deleted": null } },
            doc! {
                "$group": {
                    "_id": "$done",
                    "count": { "$sum": 1 },
                    "points": { "$sum": "$points" },
                }
            },
            doc! { "$sort": { "_id": 1 } },
        ];

        self.tasks
            .aggregate(pipeline, false, false)
            .await?
            .into_documents()
            .await
    }
}
