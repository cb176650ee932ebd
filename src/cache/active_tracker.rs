//! Active slot bookkeeping.
//!
//! One slot exists per `(namespace, group, file, release type)`. A slot moves
//! `Empty -> Occupied(v) -> Occupied(v') [v' >= v] -> Empty`, driven only by
//! store deltas. Each transition is a single map entry update, so a reader
//! sees either the old or the new occupant, never a cleared gap in the middle
//! of a replacement. Content I/O happens outside the entry: content is put
//! before a slot is taken and deleted after it is cleared.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use tracing::warn;

use crate::constants::CONTENT_READ_ATTEMPTS;
use crate::ActiveRelease;
use crate::ActiveReleaseKey;
use crate::ContentRecord;
use crate::ContentStore;
use crate::GroupKey;
use crate::Release;
use crate::ReleaseType;
use crate::Result;
use crate::SlotKey;
use crate::StorageError;

type GroupSlots = Arc<DashMap<SlotKey, Arc<Release>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotChange {
    /// The release now occupies its slot
    Activated(Arc<Release>),
    /// The release left its slot, which is now empty
    Deactivated(Arc<Release>),
    Unchanged,
}

pub struct ActiveReleaseTracker {
    slots: DashMap<GroupKey, GroupSlots>,
    content: Arc<dyn ContentStore>,
}

impl std::fmt::Debug for ActiveReleaseTracker {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ActiveReleaseTracker")
            .field("groups", &self.slots.len())
            .field("content_len", &self.content.len())
            .finish()
    }
}

impl ActiveReleaseTracker {
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self {
            slots: DashMap::new(),
            content,
        }
    }

    fn group_slots(
        &self,
        group_key: &GroupKey,
    ) -> Option<GroupSlots> {
        self.slots.get(group_key).map(|g| g.value().clone())
    }

    fn group_slots_or_insert(
        &self,
        group_key: GroupKey,
    ) -> GroupSlots {
        if let Some(slots) = self.group_slots(&group_key) {
            return slots;
        }
        self.slots.entry(group_key).or_default().value().clone()
    }

    /// Puts `release` into its slot and persists its content, unless the
    /// current occupant carries a strictly greater version.
    ///
    /// Content is written before the slot is taken, with no map lock held
    /// during the write. Readers keep seeing the previous occupant until the
    /// slot is switched.
    pub fn occupy(
        &self,
        release: &Arc<Release>,
        content: String,
    ) -> Result<SlotChange> {
        let key = release.active_key();
        let slots = self.group_slots_or_insert(key.group_key());

        let current = slots.get(&key.slot()).map(|r| r.value().clone());
        if let Some(current) = current {
            if current.version > release.version {
                debug!(
                    slot = %key,
                    occupant = current.version,
                    incoming = release.version,
                    "stale release ignored"
                );
                return Ok(SlotChange::Unchanged);
            }
            if current.id == release.id
                && current.version == release.version
                && current.content_hash == release.content_hash
            {
                slots.insert(key.slot(), release.clone());
                return Ok(SlotChange::Unchanged);
            }
        }

        self.put_content(&key, release, content)?;

        // Refreshes are serialized, so the occupant can only have moved if a
        // second writer bypassed BaseCache.
        let change = match slots.entry(key.slot()) {
            Entry::Occupied(occupied) if occupied.get().version > release.version => {
                warn!(
                    slot = %key,
                    occupant = occupied.get().version,
                    incoming = release.version,
                    "slot advanced during content write"
                );
                SlotChange::Unchanged
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(release.clone());
                SlotChange::Activated(release.clone())
            }
            Entry::Vacant(vacant) => {
                vacant.insert(release.clone());
                SlotChange::Activated(release.clone())
            }
        };
        Ok(change)
    }

    /// Clears the slot if `release` is its occupant and no newer version
    /// replaced it, then removes the externalized content.
    pub fn vacate(
        &self,
        release: &Release,
    ) -> Result<SlotChange> {
        let key = release.active_key();
        let Some(slots) = self.group_slots(&key.group_key()) else {
            return Ok(SlotChange::Unchanged);
        };

        let removed = match slots.entry(key.slot()) {
            Entry::Occupied(occupied)
                if occupied.get().id == release.id && occupied.get().version <= release.version =>
            {
                Some(occupied.remove_entry().1)
            }
            _ => None,
        };
        let Some(removed) = removed else {
            return Ok(SlotChange::Unchanged);
        };

        self.content
            .delete(&key.owner_key(), key.slot_key())
            .map_err(|e| StorageError::content("delete", &key.owner_key(), key.slot_key(), e))?;
        Ok(SlotChange::Deactivated(removed))
    }

    fn put_content(
        &self,
        key: &ActiveReleaseKey,
        release: &Release,
        content: String,
    ) -> Result<()> {
        let record = ContentRecord {
            release_id: release.id,
            version: release.version,
            content,
        };
        self.content
            .put(&key.owner_key(), key.slot_key(), &record)
            .map_err(|e| StorageError::content("put", &key.owner_key(), key.slot_key(), e).into())
    }

    pub fn get(
        &self,
        key: &ActiveReleaseKey,
    ) -> Option<Arc<Release>> {
        let slots = self.group_slots(&key.group_key())?;
        let found = slots.get(&key.slot()).map(|r| r.value().clone());
        found
    }

    /// Occupant metadata plus its content. A slot replaced between the two
    /// reads is read again, a bounded number of times.
    pub fn load(
        &self,
        key: &ActiveReleaseKey,
    ) -> Option<ActiveRelease> {
        let mut release = self.get(key)?;
        for _ in 0..CONTENT_READ_ATTEMPTS {
            match self.content.get(&key.owner_key(), key.slot_key()) {
                Ok(Some(record)) if record.release_id == release.id => {
                    return Some(ActiveRelease {
                        release,
                        content: Some(record.content),
                    });
                }
                // the slot is being switched to the record's release
                Ok(_) => std::thread::yield_now(),
                Err(e) => {
                    warn!(slot = %key, "content read failed: {}", e);
                    return Some(ActiveRelease {
                        release,
                        content: None,
                    });
                }
            }
            release = self.get(key)?;
        }

        warn!(slot = %key, release_id = release.id, "content diverged from active slot");
        Some(ActiveRelease {
            release,
            content: None,
        })
    }

    /// Occupants of one group, optionally restricted to a release type.
    pub fn group_releases(
        &self,
        group_key: &GroupKey,
        release_type: Option<ReleaseType>,
    ) -> Vec<Arc<Release>> {
        let Some(slots) = self.group_slots(group_key) else {
            return Vec::new();
        };
        let mut releases: Vec<Arc<Release>> = slots
            .iter()
            .filter(|s| release_type.map(|t| s.key().release_type == t).unwrap_or(true))
            .map(|s| s.value().clone())
            .collect();
        releases.sort_by(|a, b| a.file_name.cmp(&b.file_name).then(a.release_type.cmp(&b.release_type)));
        releases
    }

    /// Drops group partitions left without occupants.
    pub fn prune(
        &self,
        group_key: &GroupKey,
    ) {
        self.slots.remove_if(group_key, |_, slots| slots.is_empty());
    }

    pub fn len(&self) -> usize {
        self.slots.iter().map(|g| g.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn group_sizes(&self) -> Vec<(GroupKey, usize)> {
        self.slots
            .iter()
            .map(|g| (g.key().clone(), g.value().len()))
            .collect()
    }

    /// Empties every slot and the content store behind them.
    pub fn clear(&self) -> Result<()> {
        self.slots.clear();
        self.content.clear()?;
        Ok(())
    }
}
