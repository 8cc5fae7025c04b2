use super::*;

/// Tests grouping live tasks by completion.
///
/// Verifies counts and summed points per group, ignoring deleted tasks.
///
/// Expected: Ok with one group per `done` value
#[tokio::test]
async fn groups_live_tasks_by_done() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);
    repo.create(fields(doc! { "name": "a", "done": false, "points": 3 })).await?;
    repo.create(fields(doc! { "name": "b", "done": true, "points": 5 })).await?;
    repo.create(fields(doc! { "name": "c", "done": false, "points": 2 })).await?;
    let gone = repo.create(fields(doc! { "name": "d", "done": true, "points": 8 })).await?;
    repo.delete(gone, false).await?;

    let stats = repo.stats().await?;

    assert_eq!(
        stats,
        vec![
            doc! { "_id": false, "count": 2, "points": 5 },
            doc! { "_id": true, "count": 1, "points": 5 },
        ]
    );

    Ok(())
}

/// Tests distinct names of live tasks.
///
/// Expected: Ok with each live name once
#[tokio::test]
async fn lists_distinct_names() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);
    for name in ["a", "b", "a"] {
        repo.create(fields(doc! { "name": name })).await?;
    }
    let gone = repo.create(fields(doc! { "name": "c" })).await?;
    repo.delete(gone, false).await?;

    assert_eq!(repo.names().await?, vec![Bson::from("a"), Bson::from("b")]);

    Ok(())
}
