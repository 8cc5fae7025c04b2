use super::*;

/// Tests a soft delete followed by queries.
///
/// Verifies that the deleted document disappears from default queries but is
/// still returned, with `_deleted` set, when deleted documents are included.
///
/// Expected: Ok with the document hidden from live queries only
#[tokio::test]
async fn soft_delete_hides_from_live_queries() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    let deleted = tasks.delete(doc! { "name": "b" }, false, false).await?;
    assert_eq!(deleted, 1);

    let live = tasks
        .find(doc! { "name": "b" }, FindOptions::default())
        .await?
        .into_documents()
        .await?;
    assert!(live.is_empty());

    let all = tasks
        .find(
            doc! { "name": "b" },
            FindOptions {
                include_deleted: true,
                ..Default::default()
            },
        )
        .await?
        .into_documents()
        .await?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].get_i32(DELETED_FIELD).unwrap(), 1);
    assert!(!all[0].contains_key(UPDATE_TIME_FIELD));

    // `count` does not exclude soft-deleted documents by itself
    assert_eq!(tasks.count(doc! {}).await?, 3);

    Ok(())
}

/// Tests soft-deleting every match.
///
/// Verifies that `multi` marks all matches, that `id` is read as `_id`, and
/// that marking an already deleted document counts nothing.
///
/// Expected: Ok with counts of newly marked documents
#[tokio::test]
async fn soft_delete_many_and_id_alias() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    assert_eq!(tasks.delete(doc! { "done": false }, false, true).await?, 2);
    assert_eq!(tasks.delete(doc! { "id": 1 }, false, false).await?, 0);
    assert_eq!(tasks.delete(doc! { "id": 2 }, false, false).await?, 1);

    let live = tasks
        .find(doc! {}, FindOptions::default())
        .await?
        .into_documents()
        .await?;
    assert!(live.is_empty());

    Ok(())
}

/// Tests removing documents with `real_delete`.
///
/// Expected: Ok with the documents physically gone
#[tokio::test]
async fn real_delete_removes_documents() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    assert_eq!(tasks.delete(doc! { "id": 1 }, true, false).await?, 1);
    assert_eq!(tasks.delete(doc! { "done": false }, true, true).await?, 1);

    let remaining = tasks
        .find(
            doc! {},
            FindOptions {
                include_deleted: true,
                ..Default::default()
            },
        )
        .await?
        .into_documents()
        .await?;
    assert_eq!(names(&remaining), ["b"]);

    Ok(())
}
