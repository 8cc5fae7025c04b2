use bson::{Bson, Document};

use crate::server::{
    data::{model_base::UpdateOutcome, task::TaskRepository},
    error::AppError,
    model::task::{TaskFields, TaskPage},
    store::{DocumentStore, InsertManyResult, UpdateResult},
};

pub struct TaskService<'a> {
    store: &'a DocumentStore,
}

impl<'a> TaskService<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Creates a task and returns it as stored
    pub async fn create(&self, fields: TaskFields) -> Result<Document, AppError> {
        let repo = TaskRepository::new(self.store);

        let id = repo.create(fields).await?;

        repo.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found after creation".to_string()))
    }

    /// Creates several tasks in one batch
    pub async fn import(
        &self,
        items: Vec<TaskFields>,
        ordered: bool,
    ) -> Result<InsertManyResult, AppError> {
        let repo = TaskRepository::new(self.store);

        Ok(repo.create_many(items, ordered).await?)
    }

    /// Gets a live task by id
    pub async fn get_by_id(&self, id: Bson) -> Result<Option<Document>, AppError> {
        let repo = TaskRepository::new(self.store);

        Ok(repo.get_by_id(id).await?)
    }

    /// Gets one page of tasks with the total count
    pub async fn get_paginated(
        &self,
        page: u64,
        page_size: u64,
        include_deleted: bool,
    ) -> Result<TaskPage, AppError> {
        if page_size == 0 {
            return Err(AppError::BadRequest(
                "page_size must be greater than 0".to_string(),
            ));
        }

        let (skip, limit) = match (
            page.checked_mul(page_size).and_then(|skip| i64::try_from(skip).ok()),
            i64::try_from(page_size).ok(),
        ) {
            (Some(skip), Some(limit)) => (skip, limit),
            _ => return Err(AppError::BadRequest("page out of range".to_string())),
        };

        let repo = TaskRepository::new(self.store);

        let (tasks, total) = repo.get_paginated(skip, limit, include_deleted).await?;

        Ok(TaskPage {
            tasks,
            total,
            page,
            page_size,
        })
    }

    /// Sets fields of a live task
    pub async fn update(&self, id: Bson, fields: TaskFields) -> Result<UpdateResult, AppError> {
        if fields.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }

        let repo = TaskRepository::new(self.store);

        Ok(repo.update(id, fields).await?)
    }

    /// Sets fields of a task, creating it under `id` when missing
    pub async fn save(&self, id: Bson, fields: TaskFields) -> Result<UpdateResult, AppError> {
        if fields.is_empty() {
            return Err(AppError::BadRequest("No fields to save".to_string()));
        }

        let repo = TaskRepository::new(self.store);

        Ok(repo.save(id, fields).await?)
    }

    /// Marks open tasks as done, at most `limit` of them when positive
    pub async fn complete_open(&self, limit: i64) -> Result<UpdateOutcome, AppError> {
        let repo = TaskRepository::new(self.store);

        Ok(repo.complete_open(limit).await?)
    }

    /// Deletes a task, softly unless `real_delete` is set
    pub async fn delete(&self, id: Bson, real_delete: bool) -> Result<u64, AppError> {
        let repo = TaskRepository::new(self.store);

        Ok(repo.delete(id, real_delete).await?)
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        let repo = TaskRepository::new(self.store);

        Ok(repo.count().await?)
    }

    pub async fn names(&self) -> Result<Vec<Bson>, AppError> {
        let repo = TaskRepository::new(self.store);

        Ok(repo.names().await?)
    }

    pub async fn stats(&self) -> Result<Vec<Document>, AppError> {
        let repo = TaskRepository::new(self.store);

        Ok(repo.stats().await?)
    }
}
