use std::sync::Arc;

use tracing::debug;
use tracing::info;

use super::content_key;
use super::ContentStore;
use super::StorageResult;
use crate::constants::CONTENT_TREE;
use crate::ContentRecord;

#[derive(Clone)]
pub struct SledContentStore {
    db: Arc<sled::Db>,
    tree: Arc<sled::Tree>,
}

impl std::fmt::Debug for SledContentStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledContentStore")
            .field("tree_len", &self.tree.len())
            .finish()
    }
}

impl SledContentStore {
    /// Opens the content tree. With `reset` set, records left by a previous
    /// process are dropped; the first full load rewrites every active slot.
    pub fn new(
        db: Arc<sled::Db>,
        reset: bool,
    ) -> StorageResult<Self> {
        let tree = db.open_tree(CONTENT_TREE)?;
        if reset && !tree.is_empty() {
            info!("reset content tree with {} stale records", tree.len());
            tree.clear()?;
        }
        Ok(SledContentStore {
            db,
            tree: Arc::new(tree),
        })
    }
}

impl ContentStore for SledContentStore {
    fn put(
        &self,
        owner_key: &str,
        slot_key: &str,
        record: &ContentRecord,
    ) -> StorageResult<()> {
        let value = bincode::serialize(record)?;
        self.tree.insert(content_key(owner_key, slot_key), value)?;
        debug!(owner_key, slot_key, release_id = record.release_id, "content stored");
        Ok(())
    }

    fn get(
        &self,
        owner_key: &str,
        slot_key: &str,
    ) -> StorageResult<Option<ContentRecord>> {
        match self.tree.get(content_key(owner_key, slot_key))? {
            Some(ivec) => Ok(Some(bincode::deserialize::<ContentRecord>(&ivec)?)),
            None => Ok(None),
        }
    }

    fn delete(
        &self,
        owner_key: &str,
        slot_key: &str,
    ) -> StorageResult<()> {
        self.tree.remove(content_key(owner_key, slot_key))?;
        debug!(owner_key, slot_key, "content removed");
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.tree.clear()?;
        Ok(())
    }

    fn flush(&self) -> StorageResult<usize> {
        let bytes = self.tree.flush()?;
        self.db.flush()?;
        Ok(bytes)
    }

    fn len(&self) -> usize {
        self.tree.len()
    }
}
