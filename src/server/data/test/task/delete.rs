use super::*;

/// Tests soft and real deletion of a task.
///
/// Verifies that a soft-deleted task is hidden but kept, and that a real
/// delete removes it.
///
/// Expected: Ok with the task hidden, then gone
#[tokio::test]
async fn soft_then_real_delete() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);
    let id = repo.create(fields(doc! { "name": "a" })).await?;

    assert_eq!(repo.delete(id.clone(), false).await?, 1);
    assert_eq!(repo.count().await?, 0);
    assert_eq!(repo.get_paginated(0, 10, true).await?.1, 1);

    assert_eq!(repo.delete(id, true).await?, 1);
    assert_eq!(repo.get_paginated(0, 10, true).await?.1, 0);

    Ok(())
}

/// Tests deleting an unknown task.
///
/// Expected: Ok(0)
#[tokio::test]
async fn unknown_task_deletes_nothing() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);

    assert_eq!(repo.delete(Bson::Int32(42), false).await?, 0);
    assert_eq!(repo.delete(Bson::Int32(42), true).await?, 0);

    Ok(())
}
