use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::CacheManager;
use crate::init_sled_content_db;
use crate::CacheNodeConfig;
use crate::ContentStore;
use crate::Error;
use crate::GroupCache;
use crate::GroupStore;
use crate::MetricsReporter;
use crate::ReleaseCache;
use crate::ReleaseStore;
use crate::Result;
use crate::SledContentStore;
use crate::StorageError;

/// Builder for a [`CacheManager`]. Both stores are required; the content
/// store defaults to sled under `storage.db_root_dir`.
pub struct CacheManagerBuilder {
    config: CacheNodeConfig,
    release_store: Option<Arc<dyn ReleaseStore>>,
    group_store: Option<Arc<dyn GroupStore>>,
    content_store: Option<Arc<dyn ContentStore>>,
}

impl CacheManagerBuilder {
    /// Starts from configuration loaded from defaults, `CONFIG_PATH` and the
    /// environment, optionally layered with `override_path`.
    pub fn load(override_path: Option<&str>) -> Result<Self> {
        let mut config = CacheNodeConfig::new()?;
        if let Some(p) = override_path {
            info!("with_override_config from: {}", &p);
            config = config.with_override_config(p)?;
        }
        Ok(Self::init(config))
    }

    pub fn init(config: CacheNodeConfig) -> Self {
        Self {
            config,
            release_store: None,
            group_store: None,
            content_store: None,
        }
    }

    pub fn release_store(
        mut self,
        store: Arc<dyn ReleaseStore>,
    ) -> Self {
        self.release_store = Some(store);
        self
    }

    pub fn group_store(
        mut self,
        store: Arc<dyn GroupStore>,
    ) -> Self {
        self.group_store = Some(store);
        self
    }

    /// Replaces the default sled content store
    pub fn content_store(
        mut self,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        self.content_store = Some(store);
        self
    }

    pub fn config(
        mut self,
        config: CacheNodeConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and wires the caches together.
    pub fn build(self) -> Result<CacheManager> {
        let config = self.config.validate()?;
        let release_store = self
            .release_store
            .ok_or_else(|| Error::InvalidConfig("release store is required".into()))?;
        let group_store = self
            .group_store
            .ok_or_else(|| Error::InvalidConfig("group store is required".into()))?;

        let content: Arc<dyn ContentStore> = match self.content_store {
            Some(store) => store,
            None => {
                let db = init_sled_content_db(&config.storage.db_root_dir, &config.storage)
                    .map_err(|e| StorageError::PathError {
                        path: config.storage.db_root_dir.clone(),
                        source: e,
                    })?;
                Arc::new(SledContentStore::new(Arc::new(db), config.storage.reset_on_open)?)
            }
        };

        let releases = Arc::new(ReleaseCache::new(
            release_store,
            content.clone(),
            config.cache.event_channel_capacity,
        ));
        let groups = Arc::new(GroupCache::new(group_store));
        let reporter = config
            .monitoring
            .enabled
            .then(|| Arc::new(MetricsReporter::new(releases.clone(), groups.clone(), &config.monitoring)));

        info!(?config, "cache manager built");
        Ok(CacheManager {
            config,
            releases,
            groups,
            content,
            reporter,
            cancel: CancellationToken::new(),
            handles: Mutex::new(Vec::new()),
        })
    }
}
