use std::sync::Arc;

use super::*;
use crate::test_utils::ReleaseRowBuilder;
use crate::GroupKey;
use crate::Release;
use crate::ReleaseKey;

fn release(builder: ReleaseRowBuilder) -> Arc<Release> {
    Arc::new(Release::from_row(builder.build()).0)
}

#[test]
fn test_insert_and_lookup() {
    let index = ReleaseIndex::new();
    assert!(index.is_empty());

    let r1 = release(ReleaseRowBuilder::new(1, "ns", "g1", "a.yaml").name("v1"));
    assert!(index.insert(r1.clone()).is_none());

    assert_eq!(Some(r1.clone()), index.get_by_id(1));
    assert_eq!(Some(r1.clone()), index.get(&ReleaseKey::by_id(1)));
    assert_eq!(
        Some(r1),
        index.get(&ReleaseKey::by_name("ns", "g1", "a.yaml", "v1"))
    );
    assert_eq!(None, index.get(&ReleaseKey::by_name("ns", "g1", "a.yaml", "v2")));
    assert_eq!(None, index.get(&ReleaseKey::by_id(2)));
}

/// # Case: the same id comes back under another name
///
/// ## Criterias:
/// 1. the old logical key no longer resolves
/// 2. only one entry exists for the id
#[test]
fn test_insert_moves_renamed_release() {
    let index = ReleaseIndex::new();
    index.insert(release(ReleaseRowBuilder::new(1, "ns", "g1", "a.yaml").name("v1")));
    let prior = index.insert(release(
        ReleaseRowBuilder::new(1, "ns", "g2", "a.yaml")
            .name("v2")
            .version(2),
    ));

    assert_eq!(Some(1), prior.map(|p| p.version));
    assert_eq!(None, index.get(&ReleaseKey::by_name("ns", "g1", "a.yaml", "v1")));
    assert!(index
        .get(&ReleaseKey::by_name("ns", "g2", "a.yaml", "v2"))
        .is_some());
    assert_eq!(1, index.len());
    assert_eq!(vec![(GroupKey::new("ns", "g2"), 1)], index.group_sizes());
}

#[test]
fn test_remove() {
    let index = ReleaseIndex::new();
    let r1 = release(ReleaseRowBuilder::new(1, "ns", "g1", "a.yaml"));
    let r2 = release(ReleaseRowBuilder::new(2, "ns", "g1", "b.yaml"));
    index.insert(r1.clone());
    index.insert(r2);

    assert_eq!(Some(r1.clone()), index.remove(&r1));
    assert_eq!(None, index.get_by_id(1));
    assert_eq!(1, index.len());
    assert_eq!(None, index.remove(&r1));

    let r2 = index.get_by_id(2).unwrap();
    index.remove(&r2);
    assert!(index.is_empty());
    assert!(index.group_sizes().is_empty());
}

#[test]
fn test_scan_matches_patterns() {
    let index = ReleaseIndex::new();
    index.insert(release(ReleaseRowBuilder::new(1, "ns", "order-svc", "a.yaml")));
    index.insert(release(ReleaseRowBuilder::new(2, "ns", "order-api", "a.yaml")));
    index.insert(release(ReleaseRowBuilder::new(3, "ns", "user-svc", "a.yaml")));
    index.insert(release(ReleaseRowBuilder::new(4, "other", "order-svc", "a.yaml")));

    let mut ids: Vec<u64> = index
        .scan("ns", "order*", |_| true)
        .iter()
        .map(|r| r.id)
        .collect();
    ids.sort();
    assert_eq!(vec![1, 2], ids);

    assert_eq!(4, index.scan("", "*", |_| true).len());
    assert_eq!(1, index.scan("*", "", |r| r.id == 3).len());

    index.clear();
    assert!(index.scan("", "", |_| true).is_empty());
}
