//! In-process mirrors of the configuration center's persisted state.
//!
//! Each cache is refreshed incrementally from its backing store, by a
//! periodic tick and by read paths that need read-your-writes consistency.

mod active_tracker;
mod base;
mod events;
mod group_cache;
mod release_cache;
mod release_index;
pub mod revision;

#[cfg(test)]
mod group_cache_test;
#[cfg(test)]
mod release_index_test;

use std::sync::Arc;
use std::time::Duration;

pub use active_tracker::*;
use async_trait::async_trait;
pub use base::*;
pub use events::*;
pub use group_cache::*;
pub use release_cache::*;
pub use release_index::*;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::Result;

#[async_trait]
pub trait Refreshable: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Incremental refresh. Returns whether the outcome was shared with a
    /// refresh already in flight.
    async fn update(&self) -> Result<bool>;

    /// Refresh that observes every write made before the call.
    ///
    /// A shared refresh may have started before the caller's writes, so a
    /// second refresh is issued in that case.
    async fn update_consistent(&self) -> Result<()> {
        if self.update().await? {
            self.update().await?;
        }
        Ok(())
    }

    /// Drops all mirrored state; the next refresh loads a full snapshot.
    fn clear(&self) -> Result<()>;
}

/// Periodically refreshes `cache` until `cancel` fires. Errors are logged and
/// retried on the next tick.
pub fn spawn_refresh_task(
    cache: Arc<dyn Refreshable>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(cache = cache.name(), ?period, "refresh task started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(cache = cache.name(), "refresh task stopped");
                    return;
                }
                _ = interval.tick() => {
                    match cache.update().await {
                        Ok(shared) => debug!(cache = cache.name(), shared, "refresh tick"),
                        Err(e) => error!(cache = cache.name(), "refresh tick failed: {}", e),
                    }
                }
            }
        }
    })
}
