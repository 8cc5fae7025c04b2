use super::*;

/// Tests paging through live documents.
///
/// Verifies that sort applies before skip and page size, and that
/// non-positive skip and page size mean unset.
///
/// Expected: Ok with the requested slice in sort order
#[tokio::test]
async fn sorts_then_skips_then_limits() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    let page = tasks
        .find(
            doc! {},
            FindOptions {
                sort: Some(doc! { "name": -1 }),
                skip: 1,
                page_size: 1,
                ..Default::default()
            },
        )
        .await?
        .into_documents()
        .await?;
    assert_eq!(names(&page), ["b"]);

    let all = tasks
        .find(
            doc! {},
            FindOptions {
                skip: 0,
                page_size: 0,
                ..Default::default()
            },
        )
        .await?
        .into_documents()
        .await?;
    assert_eq!(names(&all), ["a", "b", "c"]);

    Ok(())
}

/// Tests projecting fields of the found documents.
///
/// Expected: Ok with only `_id` and the included field
#[tokio::test]
async fn applies_field_projection() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    let docs = tasks
        .find(
            doc! { "done": false },
            FindOptions {
                fields: Some(doc! { "name": 1 }),
                ..Default::default()
            },
        )
        .await?
        .into_documents()
        .await?;

    assert_eq!(docs, vec![doc! { "_id": 1, "name": "a" }, doc! { "_id": 3, "name": "c" }]);

    Ok(())
}

/// Tests requesting a cursor instead of materialized documents.
///
/// Verifies that the cursor yields the same documents lazily.
///
/// Expected: Ok(FindResult::Cursor) yielding every live match
#[tokio::test]
async fn returns_lazy_cursor() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    let result = tasks
        .find(
            doc! { "done": false },
            FindOptions {
                return_cursor: true,
                ..Default::default()
            },
        )
        .await?;
    let FindResult::Cursor(mut cursor) = result else {
        panic!("expected a cursor");
    };

    let mut seen = Vec::new();
    while let Some(doc) = cursor.try_next().await? {
        seen.push(doc);
    }
    assert_eq!(names(&seen), ["a", "c"]);

    Ok(())
}

/// Tests `find_one` with a sort.
///
/// Expected: Ok with the first document in sort order
#[tokio::test]
async fn find_one_honours_sort() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    let last = tasks
        .find_one(doc! { "done": false }, Some(doc! { "_id": -1 }), None)
        .await?
        .unwrap();
    let missing = tasks.find_one(doc! { "name": "zzz" }, None, None).await?;

    assert_eq!(last.get_str("name").unwrap(), "c");
    assert!(missing.is_none());

    Ok(())
}

/// Tests a malformed filter.
///
/// Verifies that the store error is returned to the caller rather than
/// swallowed, in both result modes.
///
/// Expected: Err(StoreError::InvalidFilter)
#[tokio::test]
async fn propagates_store_errors() {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);

    for return_cursor in [false, true] {
        let result = tasks
            .find(
                doc! { "name": { "$bogus": 1 } },
                FindOptions {
                    return_cursor,
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::InvalidFilter(_))));
    }
}

/// Tests distinct values and aggregation through the access layer.
///
/// Expected: Ok with distinct names and grouped counts
#[tokio::test]
async fn distinct_and_aggregate() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;
    tasks.insert(doc! { "name": "a", "done": true }).await?;

    let distinct = tasks.distinct("name", doc! {}).await?;
    assert_eq!(distinct, vec![Bson::from("a"), Bson::from("b"), Bson::from("c")]);

    let groups = tasks
        .aggregate(
            vec![
                doc! { "$group": { "_id": "$done", "n": { "$sum": 1 } } },
                doc! { "$sort": { "_id": 1 } },
            ],
            false,
            true,
        )
        .await?
        .into_documents()
        .await?;
    assert_eq!(
        groups,
        vec![doc! { "_id": false, "n": 2 }, doc! { "_id": true, "n": 2 }]
    );

    Ok(())
}
