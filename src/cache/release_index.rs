use std::sync::Arc;

use dashmap::DashMap;

use crate::utils::pattern::match_name;
use crate::GroupKey;
use crate::Release;
use crate::ReleaseKey;

type FileReleases = DashMap<(String, String), Arc<Release>>;

/// Every known release, active or not.
///
/// Two views are kept in step: a flat id index for direct lookups and a
/// group-partitioned index keyed by `(file_name, release_name)` for scans.
/// Only the refresh path mutates it, and `BaseCache` serializes refreshes.
#[derive(Debug, Default)]
pub struct ReleaseIndex {
    by_id: DashMap<u64, Arc<Release>>,
    by_group: DashMap<GroupKey, FileReleases>,
}

impl ReleaseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a release. A previous entry for the same id under
    /// another logical key is unlinked first.
    pub fn insert(
        &self,
        release: Arc<Release>,
    ) -> Option<Arc<Release>> {
        let prior = self.by_id.insert(release.id, release.clone());
        if let Some(prior) = &prior {
            if prior.group_key() != release.group_key()
                || prior.file_name != release.file_name
                || prior.name != release.name
            {
                self.unlink(prior);
            }
        }

        self.by_group
            .entry(release.group_key())
            .or_default()
            .insert((release.file_name.clone(), release.name.clone()), release);
        prior
    }

    pub fn remove(
        &self,
        release: &Release,
    ) -> Option<Arc<Release>> {
        let removed = self.by_id.remove(&release.id).map(|(_, r)| r);
        self.unlink(release);
        if let Some(prior) = &removed {
            if prior.group_key() != release.group_key()
                || prior.file_name != release.file_name
                || prior.name != release.name
            {
                self.unlink(prior);
            }
        }
        removed
    }

    fn unlink(
        &self,
        release: &Release,
    ) {
        let group_key = release.group_key();
        let emptied = match self.by_group.get(&group_key) {
            Some(files) => {
                files.remove_if(&(release.file_name.clone(), release.name.clone()), |_, r| {
                    r.id == release.id
                });
                files.is_empty()
            }
            None => false,
        };
        if emptied {
            self.by_group.remove_if(&group_key, |_, files| files.is_empty());
        }
    }

    pub fn get_by_id(
        &self,
        id: u64,
    ) -> Option<Arc<Release>> {
        self.by_id.get(&id).map(|r| r.value().clone())
    }

    /// Looks up by id when set, otherwise by the logical key.
    pub fn get(
        &self,
        key: &ReleaseKey,
    ) -> Option<Arc<Release>> {
        if key.id != 0 {
            return self.get_by_id(key.id);
        }
        let files = self.by_group.get(&GroupKey::new(&key.namespace, &key.group))?;
        let found = files
            .get(&(key.file_name.clone(), key.name.clone()))
            .map(|r| r.value().clone());
        found
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Release count per group partition.
    pub fn group_sizes(&self) -> Vec<(GroupKey, usize)> {
        self.by_group
            .iter()
            .map(|g| (g.key().clone(), g.value().len()))
            .collect()
    }

    /// Collects releases whose group matches the namespace/group patterns and
    /// that satisfy `predicate`.
    pub fn scan<P>(
        &self,
        namespace: &str,
        group: &str,
        predicate: P,
    ) -> Vec<Arc<Release>>
    where
        P: Fn(&Release) -> bool,
    {
        let mut found = Vec::new();
        for partition in self.by_group.iter() {
            let key = partition.key();
            if !match_name(namespace, &key.namespace) || !match_name(group, &key.group) {
                continue;
            }
            for entry in partition.value().iter() {
                if predicate(entry.value()) {
                    found.push(entry.value().clone());
                }
            }
        }
        found
    }

    pub fn clear(&self) {
        self.by_id.clear();
        self.by_group.clear();
    }
}
