use super::*;

/// Tests `update_one` with a filter that matches nothing.
///
/// Verifies that zero documents are reported modified and that no document
/// receives an `update_time`.
///
/// Expected: Ok with modified_count 0 and no update_time anywhere
#[tokio::test]
async fn update_one_without_match_does_not_stamp() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    let result = tasks
        .update_one(doc! { "name": "zzz" }, doc! { "$set": { "done": true } }, false, true)
        .await?;

    assert_eq!(result.matched_count, 0);
    assert_eq!(result.modified_count, 0);
    let stamped = tasks.count(doc! { "update_time": { "$exists": true } }).await?;
    assert_eq!(stamped, 0);

    Ok(())
}

/// Tests `update_one` that matches but changes nothing.
///
/// Expected: Ok with matched 1, modified 0 and no update_time
#[tokio::test]
async fn no_op_update_does_not_stamp() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    let result = tasks
        .update_one(doc! { "_id": 2 }, doc! { "$set": { "done": true } }, false, true)
        .await?;
    let stored = tasks.find_one(doc! { "_id": 2 }, None, None).await?.unwrap();

    assert_eq!(result.matched_count, 1);
    assert_eq!(result.modified_count, 0);
    assert!(!stored.contains_key(UPDATE_TIME_FIELD));

    Ok(())
}

/// Tests `update_one` that modifies a document.
///
/// Verifies that `update_time` is stamped on the modified document only, and
/// not at all when stamping is disabled.
///
/// Expected: Ok with update_time on the modified document
#[tokio::test]
async fn update_one_stamps_modified_document() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    tasks
        .update_one(doc! { "_id": 1 }, doc! { "$set": { "done": true } }, false, true)
        .await?;
    tasks
        .update_one(doc! { "_id": 3 }, doc! { "$set": { "done": true } }, false, false)
        .await?;

    let first = tasks.find_one(doc! { "_id": 1 }, None, None).await?.unwrap();
    let third = tasks.find_one(doc! { "_id": 3 }, None, None).await?.unwrap();
    assert!(matches!(first.get(UPDATE_TIME_FIELD), Some(Bson::DateTime(_))));
    assert!(third.get_bool("done").unwrap());
    assert!(!third.contains_key(UPDATE_TIME_FIELD));
    let second = tasks.find_one(doc! { "_id": 2 }, None, None).await?.unwrap();
    assert!(!second.contains_key(UPDATE_TIME_FIELD));

    Ok(())
}

/// Tests `upsert` on a missing document.
///
/// Verifies that the document is created from the filter's equality and the
/// update, and that creation is not stamped as an update.
///
/// Expected: Ok with an upserted id and a created document
#[tokio::test]
async fn upsert_creates_missing_document() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);

    let result = tasks
        .upsert(doc! { "_id": "daily" }, doc! { "$set": { "name": "standup" } })
        .await?;
    let stored = tasks.find_one(doc! { "_id": "daily" }, None, None).await?.unwrap();

    assert_eq!(result.upserted_id, Some(Bson::String("daily".to_string())));
    assert_eq!(result.modified_count, 0);
    assert_eq!(stored.get_str("name").unwrap(), "standup");
    assert!(!stored.contains_key(UPDATE_TIME_FIELD));

    Ok(())
}

/// Tests a bulk `update`.
///
/// Verifies that every match is updated and stamped, and that no ids are
/// collected in bulk mode.
///
/// Expected: Ok with two modified and update_time on both
#[tokio::test]
async fn bulk_update_stamps_matches() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    let outcome = tasks
        .update(
            doc! { "done": false },
            doc! { "$set": { "priority": 1 } },
            UpdateOptions::default(),
        )
        .await?;

    assert_eq!(outcome.matched_count, 2);
    assert_eq!(outcome.modified_count, 2);
    assert!(outcome.modified_ids.is_empty());
    assert_eq!(tasks.count(doc! { "update_time": { "$exists": true } }).await?, 2);

    Ok(())
}

/// Tests a paged `update` visiting documents one at a time.
///
/// Verifies that only unchanged documents are left unstamped, that the ids
/// of modified documents are reported in order, and that soft-deleted
/// documents are skipped.
///
/// Expected: Ok with modified_ids [3] after skipping the first match
#[tokio::test]
async fn paged_update_reports_modified_ids() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;
    tasks
        .insert_many(
            vec![
                doc! { "id": 4, "name": "d", "done": false },
                doc! { "id": 5, "name": "e", "done": false, "level": 2 },
            ],
            true,
        )
        .await?;
    tasks.delete(doc! { "id": 4 }, false, false).await?;

    let outcome = tasks
        .update(
            doc! { "done": false },
            doc! { "$set": { "level": 2 } },
            UpdateOptions {
                skip_count: 1,
                ..Default::default()
            },
        )
        .await?;

    // matches after skipping `a`: `c` (modified) and `e` (already level 2)
    assert_eq!(outcome.matched_count, 2);
    assert_eq!(outcome.modified_count, 1);
    assert_eq!(outcome.modified_ids, vec![Bson::Int32(3)]);

    let e = tasks.find_one(doc! { "_id": 5 }, None, None).await?.unwrap();
    let d = tasks.find_one(doc! { "_id": 4 }, None, None).await?.unwrap();
    assert!(!e.contains_key(UPDATE_TIME_FIELD));
    assert!(!d.contains_key("level"));

    Ok(())
}

/// Tests `single_update` limited by page size.
///
/// Expected: Ok with only the first match modified
#[tokio::test]
async fn single_update_honours_page_size() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    let outcome = tasks
        .update(
            doc! { "done": false },
            doc! { "$set": { "done": true } },
            UpdateOptions {
                page_size: 1,
                single_update: true,
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(outcome.modified_ids, vec![Bson::Int32(1)]);
    assert_eq!(tasks.count(doc! { "done": false }).await?, 1);

    Ok(())
}

/// Tests an update document without operators.
///
/// Expected: Err(StoreError::InvalidUpdate)
#[tokio::test]
async fn rejects_replacement_documents() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    let result = tasks
        .update(doc! {}, doc! { "name": "x" }, UpdateOptions::default())
        .await;

    assert!(matches!(result, Err(StoreError::InvalidUpdate(_))));
    assert_eq!(tasks.count(doc! { "name": "x" }).await?, 0);

    Ok(())
}
