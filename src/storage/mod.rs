//! Local content store used to externalize release content.
//!
//! Only the active-slot lifecycle writes here: content is put when a release
//! takes a slot, deleted when the slot is vacated and never mutated in place.

mod mem_content_store;
mod sled_content_store;


use std::path::Path;

pub use mem_content_store::*;
pub use sled_content_store::*;
#[cfg(test)]
use mockall::automock;
use tracing::debug;
use tracing::warn;

use crate::constants::CONTENT_DB_DIR;
use crate::ContentRecord;
use crate::StorageConfig;
use crate::StorageError;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Every operation is atomic for its single key.
#[cfg_attr(test, automock)]
pub trait ContentStore: Send + Sync + 'static {
    fn put(
        &self,
        owner_key: &str,
        slot_key: &str,
        record: &ContentRecord,
    ) -> StorageResult<()>;

    fn get(
        &self,
        owner_key: &str,
        slot_key: &str,
    ) -> StorageResult<Option<ContentRecord>>;

    fn delete(
        &self,
        owner_key: &str,
        slot_key: &str,
    ) -> StorageResult<()>;

    /// Drops every stored record
    fn clear(&self) -> StorageResult<()>;

    /// Synchronously flushes dirty buffers, returns bytes flushed
    fn flush(&self) -> StorageResult<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn content_key(
    owner_key: &str,
    slot_key: &str,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner_key.len() + slot_key.len() + 1);
    key.extend_from_slice(owner_key.as_bytes());
    key.push(crate::constants::CONTENT_KEY_SEPARATOR);
    key.extend_from_slice(slot_key.as_bytes());
    key
}

pub fn init_sled_content_db(
    sled_db_root_path: impl AsRef<Path> + std::fmt::Debug,
    config: &StorageConfig,
) -> std::result::Result<sled::Db, std::io::Error> {
    debug!("init_sled_content_db from path: {:?}", &sled_db_root_path);

    let content_db_path = sled_db_root_path.as_ref().join(CONTENT_DB_DIR);

    sled::Config::default()
        .path(&content_db_path)
        .cache_capacity(config.cache_capacity_bytes)
        .flush_every_ms(config.flush_every_ms)
        .use_compression(true)
        .compression_factor(1)
        .open()
        .map_err(|e| {
            warn!(
                "Try to open DB at this location: {:?} and failed: {:?}",
                content_db_path, e
            );
            std::io::Error::other(e)
        })
}
