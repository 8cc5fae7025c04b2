use super::*;

/// Tests updating fields of a task.
///
/// Verifies that the change is stored and stamped with `update_time`.
///
/// Expected: Ok with matched 1 and modified 1
#[tokio::test]
async fn updates_and_stamps_task() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);
    let id = repo.create(fields(doc! { "name": "a", "done": false })).await?;

    let result = repo.update(id.clone(), fields(doc! { "done": true })).await?;
    let task = repo.get_by_id(id).await?.unwrap();

    assert_eq!((result.matched_count, result.modified_count), (1, 1));
    assert!(task.get_bool("done").unwrap());
    assert!(matches!(task.get(UPDATE_TIME_FIELD), Some(Bson::DateTime(_))));

    Ok(())
}

/// Tests updating a soft-deleted task.
///
/// Expected: Ok with nothing matched
#[tokio::test]
async fn leaves_deleted_task_alone() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);
    let id = repo.create(fields(doc! { "name": "a" })).await?;
    repo.delete(id.clone(), false).await?;

    let result = repo.update(id, fields(doc! { "name": "b" })).await?;

    assert_eq!(result.matched_count, 0);

    Ok(())
}

/// Tests saving a task under a caller-chosen id.
///
/// Verifies that the first save creates the task and the second one updates it.
///
/// Expected: Ok with an upsert followed by a modification
#[tokio::test]
async fn save_creates_then_updates() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);
    let id = Bson::String("weekly".to_string());

    let created = repo.save(id.clone(), fields(doc! { "name": "report" })).await?;
    let updated = repo.save(id.clone(), fields(doc! { "name": "review" })).await?;

    assert_eq!(created.upserted_id, Some(id.clone()));
    assert_eq!(updated.modified_count, 1);
    assert_eq!(repo.get_by_id(id).await?.unwrap().get_str("name").unwrap(), "review");

    Ok(())
}

/// Tests completing open tasks one by one.
///
/// Expected: Ok with the ids of the two open tasks
#[tokio::test]
async fn completes_open_tasks() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);
    let a = repo.create(fields(doc! { "name": "a", "done": false })).await?;
    repo.create(fields(doc! { "name": "b", "done": true })).await?;
    let c = repo.create(fields(doc! { "name": "c" })).await?;

    let outcome = repo.complete_open(-1).await?;

    assert_eq!(outcome.modified_ids, vec![a, c]);
    assert_eq!(repo.complete_open(-1).await?.modified_count, 0);

    Ok(())
}
