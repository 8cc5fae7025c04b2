use super::*;
use crate::server::util::param::coerce;
use serde_json::json;

/// Tests looking a task up by the textual form of its id.
///
/// Verifies that the identifier condition built from request text matches
/// both generated `ObjectId`s and caller-chosen string ids.
///
/// Expected: Ok(Some) for both tasks
#[tokio::test]
async fn finds_by_textual_id() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);

    let generated = repo.create(fields(doc! { "name": "a" })).await?;
    let hex = generated.as_object_id().unwrap().to_hex();
    ModelBase::<Task>::new(&store)
        .insert(doc! { "id": "custom", "name": "b" })
        .await?;

    let by_hex = repo
        .get_by_id(coerce::identifier(&json!(hex)).unwrap())
        .await?
        .unwrap();
    let by_name = repo
        .get_by_id(coerce::identifier(&json!("custom")).unwrap())
        .await?
        .unwrap();

    assert_eq!(by_hex.get_str("name").unwrap(), "a");
    assert_eq!(by_name.get_str("name").unwrap(), "b");

    Ok(())
}

/// Tests that soft-deleted tasks are not found.
///
/// Expected: Ok(None)
#[tokio::test]
async fn skips_soft_deleted_task() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);

    let id = repo.create(fields(doc! { "name": "a" })).await?;
    repo.delete(id.clone(), false).await?;

    assert!(repo.get_by_id(id).await?.is_none());

    Ok(())
}

/// Tests looking up an id that does not exist.
///
/// Expected: Ok(None)
#[tokio::test]
async fn returns_none_for_unknown_id() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);

    assert!(repo.get_by_id(Bson::ObjectId(ObjectId::new())).await?.is_none());

    Ok(())
}
