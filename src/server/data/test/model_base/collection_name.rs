use super::*;
use crate::server::data::model_base::derive_collection_name;

/// Tests deriving collection names from entity type names.
///
/// Verifies that every capital after the first character is preceded by an
/// underscore, the name is lowercased, and an `s` is appended.
///
/// Expected: `Task` -> `tasks`, `TaskItem` -> `task_items`
#[tokio::test]
async fn derives_snake_case_plural() {
    let store = store().await;

    assert_eq!(ModelBase::<Task>::new(&store).collection_name(), "tasks");
    assert_eq!(ModelBase::<TaskItem>::new(&store).collection_name(), "task_items");
    assert_eq!(derive_collection_name("HTTPLog"), "h_t_t_p_logs");
}

/// Tests an entity declaring its collection explicitly.
///
/// Verifies that the declared name is used instead of the derived one and
/// that documents land in that collection.
///
/// Expected: Ok with the document stored in `archive`
#[tokio::test]
async fn explicit_collection_overrides_derived_name() -> Result<(), StoreError> {
    let store = store().await;
    let archived = ModelBase::<ArchivedTask>::new(&store);

    assert_eq!(archived.collection_name(), "archive");

    archived.insert(doc! { "name": "old" }).await?;
    assert_eq!(store.collection("archive").count_documents(&doc! {}).await?, 1);
    assert_eq!(store.collection("archived_tasks").count_documents(&doc! {}).await?, 0);

    Ok(())
}
