//! Mirror of configuration releases.
//!
//! Applies store deltas to the release index and the active slots, keeps one
//! revision per `(namespace, group)` and publishes an event per active slot
//! transition. Revisions are recomputed only for groups touched by the batch.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;
use tracing::trace;

use super::revision::revision_of_versions;
use super::ActiveReleaseTracker;
use super::BaseCache;
use super::EventPublisher;
use super::FetchOutcome;
use super::Refreshable;
use super::ReleaseEvent;
use super::ReleaseEventKind;
use super::ReleaseIndex;
use super::SlotChange;
use crate::constants::RELEASE_CACHE_NAME;
use crate::utils::pattern::match_metadata;
use crate::utils::pattern::match_name;
use crate::utils::pattern::paginate;
use crate::ActiveRelease;
use crate::ActiveReleaseKey;
use crate::ContentStore;
use crate::GroupKey;
use crate::Release;
use crate::ReleaseFilter;
use crate::ReleaseKey;
use crate::ReleaseRow;
use crate::ReleaseSortField;
use crate::ReleaseStore;
use crate::ReleaseType;
use crate::Result;
use crate::SortOrder;

/// Release counts of one group, as sampled for metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReleaseStats {
    pub key: GroupKey,
    pub releases: usize,
    pub active: usize,
}

pub struct ReleaseCache {
    base: BaseCache,
    store: Arc<dyn ReleaseStore>,
    index: ReleaseIndex,
    active: ActiveReleaseTracker,
    revisions: DashMap<GroupKey, String>,
    events: EventPublisher,
}

impl std::fmt::Debug for ReleaseCache {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ReleaseCache")
            .field("base", &self.base)
            .field("releases", &self.index.len())
            .field("active", &self.active)
            .finish()
    }
}

impl ReleaseCache {
    pub fn new(
        store: Arc<dyn ReleaseStore>,
        content: Arc<dyn ContentStore>,
        event_channel_capacity: usize,
    ) -> Self {
        Self {
            base: BaseCache::new(RELEASE_CACHE_NAME),
            store,
            index: ReleaseIndex::new(),
            active: ActiveReleaseTracker::new(content),
            revisions: DashMap::new(),
            events: EventPublisher::new(event_channel_capacity),
        }
    }

    pub fn base(&self) -> &BaseCache {
        &self.base
    }

    pub fn store(&self) -> &Arc<dyn ReleaseStore> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReleaseEvent> {
        self.events.subscribe()
    }

    async fn fetch_and_apply(
        &self,
        first_load: bool,
        since: u64,
    ) -> Result<FetchOutcome> {
        let rows = self.store.fetch_release_deltas(first_load, since).await?;
        if rows.is_empty() {
            return Ok(FetchOutcome::empty());
        }

        let total = rows.len();
        let mut affected = HashSet::new();
        let mut max_modify_time = 0;
        let mut applied = Ok(());
        for row in rows {
            max_modify_time = max_modify_time.max(row.modify_time);
            if let Err(e) = self.apply_row(row, &mut affected) {
                applied = Err(e);
                break;
            }
        }

        // Groups touched before a failure still get consistent revisions
        self.reload_revisions(&affected);
        applied?;

        Ok(FetchOutcome {
            rows: total,
            max_modify_time: Some(max_modify_time),
        })
    }

    fn apply_row(
        &self,
        row: ReleaseRow,
        affected: &mut HashSet<GroupKey>,
    ) -> Result<()> {
        let (release, content) = Release::from_row(row);
        trace!(
            id = release.id,
            slot = %release.active_key(),
            version = release.version,
            active = release.active,
            valid = release.valid,
            "apply release row"
        );
        affected.insert(release.group_key());

        if !release.valid {
            let prior = self.index.get_by_id(release.id);
            self.apply_delete(&release)?;
            if let Some(prior) = prior {
                if prior.active_key() != release.active_key() {
                    affected.insert(prior.group_key());
                    self.vacate(&prior)?;
                }
            }
            return Ok(());
        }
        self.apply_upsert(Arc::new(release), content, affected)
    }

    fn apply_upsert(
        &self,
        release: Arc<Release>,
        content: String,
        affected: &mut HashSet<GroupKey>,
    ) -> Result<()> {
        if let Some(prior) = self.index.get_by_id(release.id) {
            // a type switch moves the release to another slot shape
            if prior.active_key() != release.active_key() {
                affected.insert(prior.group_key());
                self.apply_delete(&prior)?;
            }
        }
        self.index.insert(release.clone());

        if release.active {
            if let SlotChange::Activated(r) = self.active.occupy(&release, content)? {
                self.events.publish(ReleaseEvent::new(ReleaseEventKind::Activated, &r));
            }
            Ok(())
        } else {
            self.vacate(&release)
        }
    }

    fn apply_delete(
        &self,
        release: &Release,
    ) -> Result<()> {
        self.index.remove(release);
        self.vacate(release)
    }

    fn vacate(
        &self,
        release: &Release,
    ) -> Result<()> {
        if let SlotChange::Deactivated(r) = self.active.vacate(release)? {
            self.events
                .publish(ReleaseEvent::new(ReleaseEventKind::Deactivated, &r));
        }
        Ok(())
    }

    fn reload_revisions(
        &self,
        affected: &HashSet<GroupKey>,
    ) {
        for group_key in affected {
            let versions: Vec<u64> = self
                .active
                .group_releases(group_key, Some(ReleaseType::Full))
                .iter()
                .map(|r| r.version)
                .collect();
            if versions.is_empty() {
                self.revisions.remove(group_key);
                self.active.prune(group_key);
            } else {
                let revision = revision_of_versions(versions);
                debug!(group = %group_key, %revision, "group revision reloaded");
                self.revisions.insert(group_key.clone(), revision);
            }
        }
    }

    pub fn get_active_release(
        &self,
        namespace: &str,
        group: &str,
        file_name: &str,
    ) -> Option<ActiveRelease> {
        self.active.load(&ActiveReleaseKey::new(
            namespace,
            group,
            file_name,
            ReleaseType::Full,
        ))
    }

    pub fn get_active_gray_release(
        &self,
        namespace: &str,
        group: &str,
        file_name: &str,
    ) -> Option<ActiveRelease> {
        self.active.load(&ActiveReleaseKey::new(
            namespace,
            group,
            file_name,
            ReleaseType::Gray,
        ))
    }

    /// Full active releases of a group, sorted by file name, with the group
    /// revision. An unknown group yields an empty list and an empty revision.
    pub fn get_group_active_releases(
        &self,
        namespace: &str,
        group: &str,
    ) -> (Vec<Arc<Release>>, String) {
        let group_key = GroupKey::new(namespace, group);
        let releases = self.active.group_releases(&group_key, Some(ReleaseType::Full));
        (releases, self.revision(namespace, group))
    }

    pub fn revision(
        &self,
        namespace: &str,
        group: &str,
    ) -> String {
        self.revisions
            .get(&GroupKey::new(namespace, group))
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn get_release(
        &self,
        key: &ReleaseKey,
    ) -> Option<Arc<Release>> {
        self.index.get(key)
    }

    /// Filtered, sorted and paginated scan over every known release.
    ///
    /// Forces a consistent refresh first so a caller sees its own writes.
    pub async fn query_releases(
        &self,
        filter: &ReleaseFilter,
    ) -> Result<(u32, Vec<Arc<Release>>)> {
        self.update_consistent().await?;

        let mut found = self.index.scan(&filter.namespace, &filter.group, |r| {
            match_name(&filter.file_name, &r.file_name)
                && match_name(&filter.name, &r.name)
                && (filter.include_gray || !r.is_gray())
                && (!filter.only_active || r.active)
                && match_metadata(&filter.metadata, &r.metadata)
        });

        found.sort_by(|a, b| {
            let ord = match filter.order_field {
                ReleaseSortField::Name => a.name.cmp(&b.name),
                ReleaseSortField::ModifyTime => a.modify_time.cmp(&b.modify_time),
                ReleaseSortField::Version => a.version.cmp(&b.version),
            }
            .then(a.id.cmp(&b.id));
            match filter.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = found.len() as u32;
        Ok((total, paginate(&found, filter.offset, filter.limit)))
    }

    pub fn release_count(&self) -> usize {
        self.index.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn group_stats(&self) -> Vec<GroupReleaseStats> {
        let active: std::collections::HashMap<GroupKey, usize> =
            self.active.group_sizes().into_iter().collect();
        self.index
            .group_sizes()
            .into_iter()
            .map(|(key, releases)| GroupReleaseStats {
                active: active.get(&key).copied().unwrap_or(0),
                key,
                releases,
            })
            .collect()
    }
}

#[async_trait]
impl Refreshable for ReleaseCache {
    fn name(&self) -> &'static str {
        self.base.name()
    }

    async fn update(&self) -> Result<bool> {
        self.base
            .update(|first_load, since| self.fetch_and_apply(first_load, since))
            .await
    }

    fn clear(&self) -> Result<()> {
        self.index.clear();
        self.revisions.clear();
        self.base.reset();
        self.active.clear()
    }
}
