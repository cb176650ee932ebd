use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory of the local content database
    #[serde(default = "default_db_dir")]
    pub db_root_dir: PathBuf,

    #[serde(default = "default_cache_capacity_bytes")]
    pub cache_capacity_bytes: u64,

    /// Background flush period, `None` flushes only on demand
    #[serde(default = "default_flush_every_ms")]
    pub flush_every_ms: Option<u64>,

    /// Drop content left by a previous process when opening
    #[serde(default = "default_reset_on_open")]
    pub reset_on_open: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_root_dir: default_db_dir(),
            cache_capacity_bytes: default_cache_capacity_bytes(),
            flush_every_ms: default_flush_every_ms(),
            reset_on_open: default_reset_on_open(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.db_root_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("db_root_dir cannot be empty".into()));
        }
        if self.cache_capacity_bytes == 0 {
            return Err(Error::InvalidConfig("cache_capacity_bytes must be > 0".into()));
        }
        if self.flush_every_ms == Some(0) {
            return Err(Error::InvalidConfig(
                "flush_every_ms must be > 0 when set".into(),
            ));
        }
        Ok(())
    }
}

fn default_db_dir() -> PathBuf {
    PathBuf::from("./db")
}
fn default_cache_capacity_bytes() -> u64 {
    10 * 1024 * 1024 //10MB
}
fn default_flush_every_ms() -> Option<u64> {
    Some(500)
}
fn default_reset_on_open() -> bool {
    true
}
