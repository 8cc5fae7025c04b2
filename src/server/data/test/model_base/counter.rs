use super::*;

/// Tests concurrent auto-increment calls on one collection.
///
/// Verifies that N concurrent callers receive the N consecutive values
/// 1..=N with no duplicates or gaps.
///
/// Expected: Ok with values 1..=20 exactly once each
#[tokio::test]
async fn concurrent_ids_are_distinct_and_sequential() -> Result<(), StoreError> {
    let store = store().await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { ModelBase::<Task>::new(&store).get_auto_increasing_id().await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap()?);
    }
    ids.sort_unstable();

    assert_eq!(ids, (1..=20).collect::<Vec<i64>>());

    Ok(())
}

/// Tests setting a counter and continuing from it.
///
/// Verifies that counters are kept per collection.
///
/// Expected: Ok with the next id following the set value
#[tokio::test]
async fn set_counter_then_continue() -> Result<(), StoreError> {
    let store = store().await;
    let tasks = ModelBase::<Task>::new(&store);
    let items = ModelBase::<TaskItem>::new(&store);

    assert_eq!(tasks.set_auto_increasing_id(100).await?, 100);
    assert_eq!(tasks.get_auto_increasing_id().await?, 101);
    assert_eq!(items.get_auto_increasing_id().await?, 1);

    Ok(())
}
