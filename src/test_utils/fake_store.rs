use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::ConfigGroupRow;
use crate::Error;
use crate::FetchError;
use crate::GroupCounts;
use crate::GroupStore;
use crate::ReleaseRow;
use crate::ReleaseStore;
use crate::Result;

/// In-memory release table answering delta fetches like the real store:
/// a full snapshot returns every row, a delta returns rows with
/// `modify_time >= since`.
#[derive(Default)]
pub struct FakeReleaseStore {
    rows: Mutex<Vec<ReleaseRow>>,
    fetches: AtomicUsize,
    fail_with: Mutex<Option<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
    entered: Notify,
}

impl FakeReleaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a row, replacing the previous state of the same id.
    pub fn upsert(
        &self,
        row: ReleaseRow,
    ) {
        let mut rows = self.rows.lock();
        match rows.iter_mut().find(|r| r.id == row.id) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Fails the next fetch with `reason`.
    pub fn fail_next(
        &self,
        reason: &str,
    ) {
        *self.fail_with.lock() = Some(reason.to_string());
    }

    /// Makes every fetch wait on the returned gate after it took its
    /// snapshot of the table.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    pub fn release_hold(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    /// Notified each time a fetch has taken its snapshot.
    pub fn entered(&self) -> &Notify {
        &self.entered
    }
}

#[async_trait]
impl ReleaseStore for FakeReleaseStore {
    async fn fetch_release_deltas(
        &self,
        full_snapshot: bool,
        since: u64,
    ) -> Result<Vec<ReleaseRow>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let failure = self.fail_with.lock().take();
        if let Some(reason) = failure {
            return Err(Error::Fetch(FetchError::Unavailable(reason)));
        }
        let rows: Vec<ReleaseRow> = self
            .rows
            .lock()
            .iter()
            .filter(|r| full_snapshot || r.modify_time >= since)
            .cloned()
            .collect();

        self.entered.notify_one();
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(rows)
    }

    async fn count_releases_per_group(&self) -> Result<GroupCounts> {
        let mut counts = GroupCounts::new();
        for row in self.rows.lock().iter().filter(|r| r.valid) {
            *counts
                .entry(row.namespace.clone())
                .or_default()
                .entry(row.group.clone())
                .or_default() += 1;
        }
        Ok(counts)
    }
}

#[derive(Default)]
pub struct FakeGroupStore {
    rows: Mutex<Vec<ConfigGroupRow>>,
    fetches: AtomicUsize,
}

impl FakeGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(
        &self,
        row: ConfigGroupRow,
    ) {
        let mut rows = self.rows.lock();
        match rows.iter_mut().find(|r| r.id == row.id) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GroupStore for FakeGroupStore {
    async fn fetch_group_deltas(
        &self,
        full_snapshot: bool,
        since: u64,
    ) -> Result<Vec<ConfigGroupRow>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| full_snapshot || r.modify_time >= since)
            .cloned()
            .collect())
    }
}
