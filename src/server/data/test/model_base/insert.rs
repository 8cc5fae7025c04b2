use super::*;

/// Tests inserting a document and reading it back by id.
///
/// Verifies that `insert` stamps `create_time` and leaves the document live,
/// with no `_deleted` marker and no `update_time`.
///
/// Expected: Ok with create_time set and _deleted absent
#[tokio::test]
async fn stamps_create_time_and_stays_live() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);

    let result = tasks.insert(doc! { "name": "x" }).await?;
    let stored = tasks
        .find_one(doc! { "_id": result.inserted_id.clone() }, None, None)
        .await?
        .unwrap();

    assert!(matches!(result.inserted_id, Bson::ObjectId(_)));
    assert!(matches!(stored.get(CREATE_TIME_FIELD), Some(Bson::DateTime(_))));
    assert!(!stored.contains_key(DELETED_FIELD));
    assert!(!stored.contains_key(UPDATE_TIME_FIELD));
    assert_eq!(stored.get_str("name").unwrap(), "x");

    Ok(())
}

/// Tests the field filter applied by `insert`.
///
/// Verifies that keys starting with `_` are dropped, `id` is stored as `_id`,
/// null values are dropped, and a caller-supplied `create_time` is replaced.
///
/// Expected: Ok with only the allowed fields persisted
#[tokio::test]
async fn filters_fields_before_persisting() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);

    let result = tasks
        .insert(doc! {
            "id": "t-1",
            "_deleted": 1,
            "_secret": "x",
            "note": null,
            "create_time": "yesterday",
            "name": "x",
            "points": 5_000_000_000i64,
            "tags": ["a"],
            "meta": { "k": 1 },
        })
        .await?;
    assert_eq!(result.inserted_id, Bson::String("t-1".to_string()));

    let stored = tasks.find_one(doc! { "_id": "t-1" }, None, None).await?.unwrap();
    let keys: Vec<&str> = stored.keys().map(String::as_str).collect();
    assert_eq!(keys, ["create_time", "_id", "name", "points", "tags", "meta"]);
    assert!(matches!(stored.get(CREATE_TIME_FIELD), Some(Bson::DateTime(_))));

    Ok(())
}

/// Tests an entity restricted to text fields.
///
/// Expected: Ok with non-text fields dropped
#[tokio::test]
async fn drops_disallowed_kinds() -> Result<(), StoreError> {
    let store = store().await;
    let labels = ModelBase::<Label>::new(&store);

    let result = labels
        .insert(doc! { "name": "urgent", "weight": 3, "visible": true })
        .await?;
    let stored = labels
        .find_one(doc! { "_id": result.inserted_id }, None, None)
        .await?
        .unwrap();

    assert_eq!(stored.get_str("name").unwrap(), "urgent");
    assert!(!stored.contains_key("weight"));
    assert!(!stored.contains_key("visible"));

    Ok(())
}

/// Tests `insert_raw` persisting a document as given.
///
/// Verifies that underscore-prefixed fields survive and only `create_time`
/// is stamped.
///
/// Expected: Ok with the document unfiltered
#[tokio::test]
async fn raw_insert_keeps_every_field() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    let id = ObjectId::new();

    tasks
        .insert_raw(doc! { "_id": id, "_source": "import", "note": null })
        .await?;
    let stored = tasks.find_one(doc! { "_id": id }, None, None).await?.unwrap();

    assert_eq!(stored.get_str("_source").unwrap(), "import");
    assert_eq!(stored.get("note"), Some(&Bson::Null));
    assert!(stored.contains_key(CREATE_TIME_FIELD));

    Ok(())
}

/// Tests an unordered `insert_many` with a duplicate id in the middle.
///
/// Verifies that every other item is still inserted and the failure is
/// reported with its index.
///
/// Expected: Err(StoreError::BulkWrite) with two inserted ids
#[tokio::test]
async fn unordered_insert_many_reports_every_failure() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);

    let err = tasks
        .insert_many(
            vec![
                doc! { "id": 1, "name": "a" },
                doc! { "id": 1, "name": "dup" },
                doc! { "id": 2, "name": "b" },
            ],
            false,
        )
        .await
        .unwrap_err();

    let StoreError::BulkWrite {
        inserted_ids,
        failures,
    } = err
    else {
        panic!("expected a bulk write error");
    };
    assert_eq!(inserted_ids.len(), 2);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 1);
    assert_eq!(tasks.count(doc! {}).await?, 2);

    Ok(())
}

/// Tests that `insert_many` stamps one shared `create_time`.
///
/// Expected: Ok with equal create_time on every document
#[tokio::test]
async fn insert_many_shares_create_time() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    seed(&tasks).await?;

    let docs = tasks
        .find(doc! {}, FindOptions::default())
        .await?
        .into_documents()
        .await?;
    let times: Vec<&Bson> = docs.iter().filter_map(|d| d.get(CREATE_TIME_FIELD)).collect();

    assert_eq!(times.len(), 3);
    assert!(times.iter().all(|t| *t == times[0]));

    Ok(())
}
