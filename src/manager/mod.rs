//! Query façade consumed by protocol adapters and watch delivery.

mod builder;
pub use builder::*;


use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;

use crate::spawn_refresh_task;
use crate::ActiveRelease;
use crate::CacheNodeConfig;
use crate::ConfigGroup;
use crate::ContentStore;
use crate::GroupCache;
use crate::GroupFilter;
use crate::MetricsReporter;
use crate::Refreshable;
use crate::Release;
use crate::ReleaseCache;
use crate::ReleaseEvent;
use crate::ReleaseFilter;
use crate::ReleaseKey;
use crate::Result;

pub struct CacheManager {
    config: CacheNodeConfig,
    releases: Arc<ReleaseCache>,
    groups: Arc<GroupCache>,
    content: Arc<dyn ContentStore>,
    reporter: Option<Arc<MetricsReporter>>,
    cancel: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("releases", &self.releases)
            .field("groups", &self.groups)
            .finish()
    }
}

impl CacheManager {
    /// Loads the first full snapshot of both caches, then starts the refresh
    /// ticks and the metrics reporter.
    pub async fn start(&self) -> Result<()> {
        self.releases.update().await?;
        self.groups.update().await?;

        let period = self.config.cache.refresh_interval();
        let mut handles = self.handles.lock();
        handles.push(spawn_refresh_task(
            self.releases.clone(),
            period,
            self.cancel.child_token(),
        ));
        handles.push(spawn_refresh_task(
            self.groups.clone(),
            period,
            self.cancel.child_token(),
        ));
        if let Some(reporter) = &self.reporter {
            handles.push(
                reporter
                    .clone()
                    .spawn(self.config.monitoring.report_interval(), self.cancel.child_token()),
            );
        }
        info!(tasks = handles.len(), "cache manager started");
        Ok(())
    }

    /// Cancels background tasks, waits for them and flushes content.
    pub async fn stop(&self) -> Result<()> {
        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                error!("background task failed: {}", e);
            }
        }
        self.content.flush()?;
        info!("cache manager stopped");
        Ok(())
    }

    pub fn release_cache(&self) -> &Arc<ReleaseCache> {
        &self.releases
    }

    pub fn group_cache(&self) -> &Arc<GroupCache> {
        &self.groups
    }

    pub fn get_active_release(
        &self,
        namespace: &str,
        group: &str,
        file_name: &str,
    ) -> Option<ActiveRelease> {
        self.releases.get_active_release(namespace, group, file_name)
    }

    pub fn get_active_gray_release(
        &self,
        namespace: &str,
        group: &str,
        file_name: &str,
    ) -> Option<ActiveRelease> {
        self.releases.get_active_gray_release(namespace, group, file_name)
    }

    pub fn get_group_active_releases(
        &self,
        namespace: &str,
        group: &str,
    ) -> (Vec<Arc<Release>>, String) {
        self.releases.get_group_active_releases(namespace, group)
    }

    pub fn get_release(
        &self,
        key: &ReleaseKey,
    ) -> Option<Arc<Release>> {
        self.releases.get_release(key)
    }

    pub async fn query_releases(
        &self,
        filter: &ReleaseFilter,
    ) -> Result<(u32, Vec<Arc<Release>>)> {
        self.releases.query_releases(filter).await
    }

    pub fn list_groups(
        &self,
        namespace: &str,
    ) -> (Vec<Arc<ConfigGroup>>, String) {
        self.groups.list_groups(namespace)
    }

    pub async fn query_groups(
        &self,
        filter: &GroupFilter,
    ) -> Result<(u32, Vec<Arc<ConfigGroup>>)> {
        self.groups.query(filter).await
    }

    /// Active slot transitions, for the watch notifier.
    pub fn subscribe(&self) -> broadcast::Receiver<ReleaseEvent> {
        self.releases.subscribe()
    }
}
