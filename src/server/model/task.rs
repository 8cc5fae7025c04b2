//! Task domain models.
//!
//! A task is a schemaless document in the `tasks` collection. Beyond the
//! bookkeeping fields every entity carries, tasks get a sequential `no` from
//! the collection counter when created through the service.

use bson::Document;

use crate::{
    model::task::TaskPageDto,
    server::{
        data::model_base::{Entity, EntityConfig},
        util::convert::document_to_transport,
    },
};

/// Field holding a task's sequential number.
pub const NUMBER_FIELD: &str = "no";

/// The task entity, stored in `tasks`.
pub struct Task;

impl Entity for Task {
    fn config() -> EntityConfig {
        EntityConfig::new("Task")
    }
}

/// One page of live tasks.
#[derive(Debug, Clone)]
pub struct TaskPage {
    pub tasks: Vec<Document>,
    /// Number of tasks across all pages
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl TaskPage {
    /// Converts the page into its transport form.
    pub fn into_dto(self) -> TaskPageDto {
        TaskPageDto {
            items: self
                .tasks
                .iter()
                .map(|doc| serde_json::Value::Object(document_to_transport(doc)))
                .collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Fields of a create or update request.
///
/// Keys starting with `_`, `id` and the bookkeeping fields are not writable
/// through requests and are removed.
#[derive(Debug, Clone, Default)]
pub struct TaskFields(pub Document);

impl TaskFields {
    pub fn writable(fields: Document) -> Self {
        Self(
            fields
                .into_iter()
                .filter(|(name, _)| {
                    !name.starts_with('_')
                        && !matches!(
                            name.as_str(),
                            "id" | NUMBER_FIELD | "create_time" | "update_time"
                        )
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_document(self) -> Document {
        self.0
    }
}
