use super::*;

mod collection_name;
mod counter;
mod delete;
mod find;
mod insert;
mod update;

struct Task;

impl Entity for Task {
    fn config() -> EntityConfig {
        EntityConfig::new("Task")
    }
}

struct TaskItem;

impl Entity for TaskItem {
    fn config() -> EntityConfig {
        EntityConfig::new("TaskItem")
    }
}

/// Entity stored under an explicit collection name.
struct ArchivedTask;

impl Entity for ArchivedTask {
    fn config() -> EntityConfig {
        EntityConfig::new("ArchivedTask").with_collection("archive")
    }
}

/// Entity that only keeps text fields.
struct Label;

impl Entity for Label {
    fn config() -> EntityConfig {
        EntityConfig::new("Label").with_allowed_kinds(&[FieldKind::String])
    }
}

/// Inserts three live tasks `a`, `b`, `c` with integer ids 1..=3.
async fn seed(tasks: &ModelBase<'_, Task>) -> Result<(), StoreError> {
    tasks
        .insert_many(
            vec![
                doc! { "id": 1, "name": "a", "done": false },
                doc! { "id": 2, "name": "b", "done": true },
                doc! { "id": 3, "name": "c", "done": false },
            ],
            true,
        )
        .await?;
    Ok(())
}

fn names(docs: &[Document]) -> Vec<&str> {
    docs.iter()
        .map(|d| d.get_str("name").unwrap_or_default())
        .collect()
}
