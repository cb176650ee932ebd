use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

/// Two independent active slots exist per file, one per release type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum ReleaseType {
    #[default]
    Full,
    Gray,
}

impl ReleaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Full => "full",
            ReleaseType::Gray => "gray",
        }
    }

    pub fn is_gray(&self) -> bool {
        matches!(self, ReleaseType::Gray)
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a delta batch as reported by the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReleaseRow {
    pub id: u64,
    pub namespace: String,
    pub group: String,
    pub file_name: String,
    pub name: String,
    pub version: u64,
    pub content: String,
    /// Left empty by stores that do not precompute it
    pub content_hash: String,
    pub release_type: ReleaseType,
    pub active: bool,
    pub valid: bool,
    pub modify_time: u64,
    pub metadata: HashMap<String, String>,
}

/// Release metadata as held in memory. Content lives in the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub namespace: String,
    pub group: String,
    pub file_name: String,
    pub name: String,
    pub version: u64,
    pub content_hash: String,
    pub release_type: ReleaseType,
    pub active: bool,
    pub valid: bool,
    pub modify_time: u64,
    pub metadata: HashMap<String, String>,
}

impl Release {
    /// Splits a store row into metadata and the content payload.
    pub fn from_row(row: ReleaseRow) -> (Release, String) {
        let content_hash = if row.content_hash.is_empty() {
            content_digest(&row.content)
        } else {
            row.content_hash
        };
        (
            Release {
                id: row.id,
                namespace: row.namespace,
                group: row.group,
                file_name: row.file_name,
                name: row.name,
                version: row.version,
                content_hash,
                release_type: row.release_type,
                active: row.active,
                valid: row.valid,
                modify_time: row.modify_time,
                metadata: row.metadata,
            },
            row.content,
        )
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.namespace, &self.group)
    }

    pub fn active_key(&self) -> ActiveReleaseKey {
        ActiveReleaseKey {
            namespace: self.namespace.clone(),
            group: self.group.clone(),
            file_name: self.file_name.clone(),
            release_type: self.release_type,
        }
    }

    pub fn is_gray(&self) -> bool {
        self.release_type.is_gray()
    }
}

/// SHA-256 hex digest of a content payload.
pub fn content_digest(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Partition key shared by the release index, active slots and revisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub namespace: String,
    pub group: String,
}

impl GroupKey {
    pub fn new(
        namespace: &str,
        group: &str,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            group: group.to_string(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.group)
    }
}

/// Lookup key for a single release: by id when `id != 0`, otherwise by the
/// logical `(namespace, group, file_name, name)` key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseKey {
    pub id: u64,
    pub namespace: String,
    pub group: String,
    pub file_name: String,
    pub name: String,
}

impl ReleaseKey {
    pub fn by_id(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn by_name(
        namespace: &str,
        group: &str,
        file_name: &str,
        name: &str,
    ) -> Self {
        Self {
            id: 0,
            namespace: namespace.to_string(),
            group: group.to_string(),
            file_name: file_name.to_string(),
            name: name.to_string(),
        }
    }
}

/// Identifies an active slot, independent of its current occupant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActiveReleaseKey {
    pub namespace: String,
    pub group: String,
    pub file_name: String,
    pub release_type: ReleaseType,
}

impl ActiveReleaseKey {
    pub fn new(
        namespace: &str,
        group: &str,
        file_name: &str,
        release_type: ReleaseType,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            group: group.to_string(),
            file_name: file_name.to_string(),
            release_type,
        }
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.namespace, &self.group)
    }

    pub fn slot(&self) -> SlotKey {
        SlotKey {
            file_name: self.file_name.clone(),
            release_type: self.release_type,
        }
    }

    /// Content store owner key: `namespace/group/file_name`
    pub fn owner_key(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.group, self.file_name)
    }

    /// Content store slot key
    pub fn slot_key(&self) -> &'static str {
        self.release_type.as_str()
    }
}

impl fmt::Display for ActiveReleaseKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}#{}", self.owner_key(), self.release_type)
    }
}

/// Slot key inside one group partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub file_name: String,
    pub release_type: ReleaseType,
}

/// Result of an active lookup: metadata plus lazily loaded content.
///
/// `content` is `None` only when the content store no longer agrees with the
/// in-memory slot, e.g. after a failed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRelease {
    pub release: Arc<Release>,
    pub content: Option<String>,
}

/// Externalized content as written to the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub release_id: u64,
    pub version: u64,
    pub content: String,
}
