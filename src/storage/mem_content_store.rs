use dashmap::DashMap;

use super::content_key;
use super::ContentStore;
use super::StorageResult;
use crate::ContentRecord;

/// Heap-backed content store for tests and deployments that relax durability.
#[derive(Debug, Default)]
pub struct MemContentStore {
    records: DashMap<Vec<u8>, ContentRecord>,
}

impl MemContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentStore for MemContentStore {
    fn put(
        &self,
        owner_key: &str,
        slot_key: &str,
        record: &ContentRecord,
    ) -> StorageResult<()> {
        self.records.insert(content_key(owner_key, slot_key), record.clone());
        Ok(())
    }

    fn get(
        &self,
        owner_key: &str,
        slot_key: &str,
    ) -> StorageResult<Option<ContentRecord>> {
        Ok(self
            .records
            .get(&content_key(owner_key, slot_key))
            .map(|r| r.value().clone()))
    }

    fn delete(
        &self,
        owner_key: &str,
        slot_key: &str,
    ) -> StorageResult<()> {
        self.records.remove(&content_key(owner_key, slot_key));
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.records.clear();
        Ok(())
    }

    fn flush(&self) -> StorageResult<usize> {
        Ok(0)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
