use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mesh_config_cache::CacheManager;
use mesh_config_cache::CacheManagerBuilder;
use mesh_config_cache::CacheNodeConfig;
use mesh_config_cache::ConfigGroupRow;
use mesh_config_cache::GroupCounts;
use mesh_config_cache::GroupStore;
use mesh_config_cache::ReleaseRow;
use mesh_config_cache::ReleaseStore;
use mesh_config_cache::ReleaseType;
use mesh_config_cache::Result;
use parking_lot::Mutex;

pub const REFRESH_INTERVAL_MS: u64 = 20;

pub const WAIT_FOR_TICK: Duration = Duration::from_millis(REFRESH_INTERVAL_MS * 10);

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for integration test.");
}

/// Release and group tables shared by both store traits.
#[derive(Default)]
pub struct MemoryStore {
    releases: Mutex<Vec<ReleaseRow>>,
    groups: Mutex<Vec<ConfigGroupRow>>,
}

impl MemoryStore {
    pub fn publish(
        &self,
        row: ReleaseRow,
    ) {
        let mut rows = self.releases.lock();
        rows.retain(|r| r.id != row.id);
        rows.push(row);
    }

    pub fn put_group(
        &self,
        row: ConfigGroupRow,
    ) {
        let mut rows = self.groups.lock();
        rows.retain(|r| r.id != row.id);
        rows.push(row);
    }
}

#[async_trait]
impl ReleaseStore for MemoryStore {
    async fn fetch_release_deltas(
        &self,
        full_snapshot: bool,
        since: u64,
    ) -> Result<Vec<ReleaseRow>> {
        let mut rows: Vec<ReleaseRow> = self
            .releases
            .lock()
            .iter()
            .filter(|r| full_snapshot || r.modify_time >= since)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.modify_time);
        Ok(rows)
    }

    async fn count_releases_per_group(&self) -> Result<GroupCounts> {
        let mut counts = GroupCounts::new();
        for row in self.releases.lock().iter().filter(|r| r.valid) {
            *counts
                .entry(row.namespace.clone())
                .or_default()
                .entry(row.group.clone())
                .or_default() += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn fetch_group_deltas(
        &self,
        full_snapshot: bool,
        since: u64,
    ) -> Result<Vec<ConfigGroupRow>> {
        Ok(self
            .groups
            .lock()
            .iter()
            .filter(|r| full_snapshot || r.modify_time >= since)
            .cloned()
            .collect())
    }
}

#[allow(clippy::too_many_arguments)]
pub fn release(
    id: u64,
    group: &str,
    file_name: &str,
    version: u64,
    release_type: ReleaseType,
    active: bool,
    modify_time: u64,
) -> ReleaseRow {
    ReleaseRow {
        id,
        namespace: "default".to_string(),
        group: group.to_string(),
        file_name: file_name.to_string(),
        name: format!("{}-v{}", file_name, version),
        version,
        content: format!("{}: v{}", file_name, version),
        release_type,
        active,
        valid: true,
        modify_time,
        ..Default::default()
    }
}

pub fn group(
    id: u64,
    name: &str,
    modify_time: u64,
) -> ConfigGroupRow {
    ConfigGroupRow {
        id,
        namespace: "default".to_string(),
        name: name.to_string(),
        owner: "admin".to_string(),
        metadata: HashMap::new(),
        valid: true,
        modify_time,
        ..Default::default()
    }
}

pub async fn start_manager(
    db_root: &Path,
    store: Arc<MemoryStore>,
) -> CacheManager {
    let mut config = CacheNodeConfig::default();
    config.cache.refresh_interval_ms = REFRESH_INTERVAL_MS;
    config.storage.db_root_dir = db_root.to_path_buf();
    config.monitoring.enabled = false;

    let manager = CacheManagerBuilder::init(config)
        .release_store(store.clone())
        .group_store(store)
        .build()
        .unwrap();
    manager.start().await.unwrap();
    manager
}
