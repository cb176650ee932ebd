//! Configuration management for the config cache.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
mod cache;
mod monitoring;
mod storage;
pub use cache::*;
pub use monitoring::*;
pub use storage::*;

use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Environment variable prefix, e.g. `CONFIG_CACHE__CACHE__REFRESH_INTERVAL_MS`
pub const ENV_PREFIX: &str = "CONFIG_CACHE";

/// Main configuration container
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct CacheNodeConfig {
    /// Refresh scheduling and event publication
    #[serde(default)]
    pub cache: CacheConfig,
    /// Local content store
    #[serde(default)]
    pub storage: StorageConfig,
    /// Gauge sampling
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl Debug for CacheNodeConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CacheNodeConfig")
            .field("cache", &self.cache)
            .field("storage", &self.storage.db_root_dir)
            .finish()
    }
}

impl CacheNodeConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Callers must call `validate()` once all overrides are applied.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/cache.toml");
    /// std::env::set_var("CONFIG_CACHE__CACHE__REFRESH_INTERVAL_MS", "500");
    /// let cfg = CacheNodeConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every subsystem and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.cache.validate()?;
        self.storage.validate()?;
        self.monitoring.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
