use std::sync::Arc;

use super::*;
use crate::test_utils;
use crate::test_utils::group_row;
use crate::test_utils::FakeGroupStore;
use crate::GroupFilter;
use crate::GroupSortField;
use crate::SortOrder;

fn setup() -> (Arc<FakeGroupStore>, GroupCache) {
    test_utils::enable_logger();
    let store = Arc::new(FakeGroupStore::new());
    let cache = GroupCache::new(store.clone());
    (store, cache)
}

fn names(groups: &[Arc<crate::ConfigGroup>]) -> Vec<String> {
    groups.iter().map(|g| g.name.clone()).collect()
}

#[tokio::test]
async fn test_list_groups_sorted_with_revision() {
    let (store, cache) = setup();
    store.upsert(group_row(1, "default", "order", 1));
    store.upsert(group_row(2, "default", "account", 1));
    store.upsert(group_row(3, "other", "order", 1));
    cache.update().await.unwrap();

    let (groups, revision) = cache.list_groups("default");
    assert_eq!(vec!["account", "order"], names(&groups));
    assert!(!revision.is_empty());
    assert_ne!(revision, cache.revision("other"));
    assert_eq!((vec![], String::new()), cache.list_groups("missing"));
    assert_eq!(3, cache.group_count());
}

/// # Case: group metadata changes
///
/// ## Criterias:
/// 1. a modified group changes the namespace revision
/// 2. other namespaces keep theirs
#[tokio::test]
async fn test_revision_follows_modifications() {
    let (store, cache) = setup();
    store.upsert(group_row(1, "default", "order", 1));
    store.upsert(group_row(2, "other", "order", 1));
    cache.update().await.unwrap();
    let default_rev = cache.revision("default");
    let other_rev = cache.revision("other");

    store.upsert(group_row(1, "default", "order", 5));
    cache.update().await.unwrap();
    assert_ne!(default_rev, cache.revision("default"));
    assert_eq!(other_rev, cache.revision("other"));

    // reapplying the same rows changes nothing
    let default_rev = cache.revision("default");
    cache.update().await.unwrap();
    assert_eq!(default_rev, cache.revision("default"));
}

#[tokio::test]
async fn test_rename_and_delete() {
    let (store, cache) = setup();
    store.upsert(group_row(1, "default", "order", 1));
    store.upsert(group_row(2, "default", "user", 1));
    cache.update().await.unwrap();

    store.upsert(group_row(1, "default", "orders", 2));
    let mut removed = group_row(2, "default", "user", 2);
    removed.valid = false;
    store.upsert(removed);
    cache.update().await.unwrap();

    assert_eq!(None, cache.get_group("default", "order"));
    assert_eq!(None, cache.get_group("default", "user"));
    assert_eq!(
        Some(1),
        cache.get_group("default", "orders").map(|g| g.id)
    );
    assert_eq!(Some("orders".to_string()), cache.get_group_by_id(1).map(|g| g.name.clone()));
    assert_eq!(None, cache.get_group_by_id(2));
    assert_eq!(1, cache.group_count());

    let mut removed = group_row(1, "default", "orders", 3);
    removed.valid = false;
    store.upsert(removed);
    cache.update().await.unwrap();
    assert_eq!("", cache.revision("default"));
    assert!(cache.namespace_sizes().is_empty());
}

#[tokio::test]
async fn test_query_groups() {
    let (store, cache) = setup();
    let mut row = group_row(1, "default", "order-svc", 3);
    row.business = "trade".into();
    row.metadata.insert("tier".into(), "core".into());
    store.upsert(row);
    let mut row = group_row(2, "default", "order-api", 1);
    row.business = "trade".into();
    store.upsert(row);
    let mut row = group_row(3, "default", "user-svc", 2);
    row.department = "infra".into();
    store.upsert(row);

    let (total, page) = cache
        .query(&GroupFilter {
            name: "order*".into(),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(2, total);
    assert_eq!(vec!["order-api", "order-svc"], names(&page));

    let (total, page) = cache
        .query(&GroupFilter {
            order_field: GroupSortField::ModifyTime,
            order: SortOrder::Desc,
            limit: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(3, total);
    assert_eq!(vec!["order-svc", "user-svc"], names(&page));

    let (total, page) = cache
        .query(&GroupFilter {
            business: "trade".into(),
            metadata: [("tier".to_string(), "core".to_string())].into_iter().collect(),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(1, total);
    assert_eq!(vec!["order-svc"], names(&page));

    let (total, page) = cache
        .query(&GroupFilter {
            namespace: "default".into(),
            department: "infra".into(),
            offset: 1,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(1, total);
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_clear() {
    let (store, cache) = setup();
    store.upsert(group_row(1, "default", "order", 1));
    cache.update().await.unwrap();

    cache.clear().unwrap();
    assert_eq!(0, cache.group_count());
    assert!(cache.base().is_first_load());

    cache.update().await.unwrap();
    assert_eq!(1, cache.group_count());
    assert_eq!(2, store.fetch_count());
}

/// # Case: readers run while an unchanged group is refreshed repeatedly
///
/// ## Setup:
/// 1. reader threads look the group up by name, by id and by listing
/// 2. the group row is rewritten and refreshed many times
///
/// ## Criterias:
/// 1. no reader ever misses the group
#[tokio::test]
async fn test_readers_never_miss_group_during_refresh() {
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    test_utils::enable_logger();
    let store = Arc::new(FakeGroupStore::new());
    store.upsert(group_row(1, "default", "order", 1));
    let cache = Arc::new(GroupCache::new(store.clone()));
    cache.update().await.unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let misses = Arc::new(AtomicUsize::new(0));
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let cache = cache.clone();
            let stop = stop.clone();
            let misses = misses.clone();
            std::thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    if cache.get_group("default", "order").is_none() {
                        misses.fetch_add(1, Ordering::Relaxed);
                    }
                    if cache.get_group_by_id(1).is_none() {
                        misses.fetch_add(1, Ordering::Relaxed);
                    }
                    if cache.list_groups("default").0.is_empty() {
                        misses.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for modify_time in 2..2_000 {
        store.upsert(group_row(1, "default", "order", modify_time));
        cache.update().await.unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(0, misses.load(Ordering::Relaxed));
    assert_eq!(1, cache.group_count());
}

#[tokio::test]
async fn test_moved_group_leaves_old_namespace() {
    let (store, cache) = setup();
    store.upsert(group_row(1, "default", "order", 1));
    cache.update().await.unwrap();
    let default_rev = cache.revision("default");
    assert!(!default_rev.is_empty());

    store.upsert(group_row(1, "other", "order", 2));
    cache.update().await.unwrap();

    assert_eq!(None, cache.get_group("default", "order"));
    assert_eq!(Some(1), cache.get_group("other", "order").map(|g| g.id));
    assert_eq!("", cache.revision("default"));
    assert_eq!(vec![("other".to_string(), 1)], cache.namespace_sizes());
}
