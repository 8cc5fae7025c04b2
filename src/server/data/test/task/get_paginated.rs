use super::*;

/// Tests paging through tasks newest first.
///
/// Verifies skip-based page boundaries and that the total covers all pages.
///
/// Expected: Ok with pages [e, d], [c, b], [a] and total 5
#[tokio::test]
async fn pages_newest_first() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);
    for name in ["a", "b", "c", "d", "e"] {
        repo.create(fields(doc! { "name": name })).await?;
    }

    let (first, total) = repo.get_paginated(0, 2, false).await?;
    let (second, _) = repo.get_paginated(2, 2, false).await?;
    let (last, _) = repo.get_paginated(4, 2, false).await?;

    let names = |docs: &[Document]| -> Vec<String> {
        docs.iter()
            .map(|d| d.get_str("name").unwrap().to_string())
            .collect()
    };
    assert_eq!(total, 5);
    assert_eq!(names(&first), ["e", "d"]);
    assert_eq!(names(&second), ["c", "b"]);
    assert_eq!(names(&last), ["a"]);

    Ok(())
}

/// Tests listing with and without soft-deleted tasks.
///
/// Expected: Ok with totals 1 and 2
#[tokio::test]
async fn include_deleted_lists_and_counts_deleted() -> Result<(), StoreError> {
    let store = store().await;
    let repo = TaskRepository::new(&store);
    let id = repo.create(fields(doc! { "name": "a" })).await?;
    repo.create(fields(doc! { "name": "b" })).await?;
    repo.delete(id, false).await?;

    let (live, live_total) = repo.get_paginated(0, 10, false).await?;
    let (all, all_total) = repo.get_paginated(0, 10, true).await?;

    assert_eq!((live.len(), live_total), (1, 1));
    assert_eq!((all.len(), all_total), (2, 2));

    Ok(())
}
