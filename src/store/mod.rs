//! Backing store boundary.
//!
//! The persistent store (SQL, embedded file, ...) is consumed only through
//! these narrow delta contracts. An empty batch is a valid "no changes"
//! answer and must not be treated as an error.

use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::ConfigGroupRow;
use crate::ReleaseRow;
use crate::Result;

/// Release counts per namespace, then per group.
pub type GroupCounts = HashMap<String, HashMap<String, u64>>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReleaseStore: Send + Sync + 'static {
    /// Returns every release when `full_snapshot` is set, otherwise the rows
    /// modified at or after `since` (milliseconds since epoch).
    async fn fetch_release_deltas(
        &self,
        full_snapshot: bool,
        since: u64,
    ) -> Result<Vec<ReleaseRow>>;

    async fn count_releases_per_group(&self) -> Result<GroupCounts>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait GroupStore: Send + Sync + 'static {
    async fn fetch_group_deltas(
        &self,
        full_snapshot: bool,
        since: u64,
    ) -> Result<Vec<ConfigGroupRow>>;
}
