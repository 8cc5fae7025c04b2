use super::*;
use crate::server::util::convert::document_to_transport;
use serde_json::Value;

/// Tests creating tasks numbered from the counter.
///
/// Verifies that each created task receives the next `no` and a generated
/// `ObjectId`.
///
/// Expected: Ok with `no` 1 and 2
#[tokio::test]
async fn numbers_tasks_sequentially() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);

    let first = repo.create(fields(doc! { "name": "a" })).await?;
    let second = repo.create(fields(doc! { "name": "b" })).await?;

    let first = repo.get_by_id(first).await?.unwrap();
    let second = repo.get_by_id(second).await?.unwrap();
    assert!(matches!(first.get("_id"), Some(Bson::ObjectId(_))));
    assert_eq!(first.get_i64("no").unwrap(), 1);
    assert_eq!(second.get_i64("no").unwrap(), 2);

    Ok(())
}

/// Tests that request fields cannot overwrite bookkeeping fields.
///
/// Expected: Ok with `no`, `_deleted` and `update_time` under store control
#[tokio::test]
async fn ignores_bookkeeping_fields() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);

    let id = repo
        .create(fields(doc! {
            "name": "a",
            "no": 99,
            "_deleted": 1,
            "update_time": "now",
        }))
        .await?;
    let task = repo.get_by_id(id).await?.unwrap();

    assert_eq!(task.get_i64("no").unwrap(), 1);
    assert!(!task.contains_key("_deleted"));
    assert!(!task.contains_key("update_time"));

    Ok(())
}

/// Tests the transport form of a freshly inserted task.
///
/// Verifies that the identifier becomes a hex string and `create_time` the
/// `YYYY-MM-DD HH:MM:SS` text form.
///
/// Expected: Ok with string `_id` and formatted `create_time`
#[tokio::test]
async fn converts_to_transport_form() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);

    let id = repo.create(fields(doc! { "name": "x" })).await?;
    let task = document_to_transport(&repo.get_by_id(id.clone()).await?.unwrap());

    let oid = id.as_object_id().unwrap();
    assert_eq!(task["_id"], Value::String(oid.to_hex()));
    assert_eq!(task["name"], Value::String("x".to_string()));

    let created = task["create_time"].as_str().unwrap();
    assert!(chrono::NaiveDateTime::parse_from_str(created, "%Y-%m-%d %H:%M:%S").is_ok());

    Ok(())
}

/// Tests creating several tasks at once.
///
/// Expected: Ok with one inserted id per item
#[tokio::test]
async fn creates_many() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);

    let result = repo
        .create_many(vec![fields(doc! { "name": "a" }), fields(doc! { "name": "b" })], true)
        .await?;

    assert_eq!(result.inserted_ids.len(), 2);
    assert_eq!(repo.count().await?, 2);

    Ok(())
}
