//! Incremental refresh scheduling shared by every cache.
//!
//! `BaseCache` owns the fetch watermark and the first-load flag, and makes
//! sure at most one refresh is in flight per cache: a caller arriving while a
//! refresh runs waits for that refresh and shares its outcome instead of
//! issuing its own fetch.

use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;
use tracing::warn;

use crate::metrics::CACHE_LAST_REFRESH_MS;
use crate::metrics::CACHE_REFRESH_TOTAL;
use crate::utils::time::now_ms;
use crate::Error;
use crate::Result;

/// What one fetch-and-apply pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub rows: usize,
    /// Largest modify time seen in the batch, `None` for an empty batch
    pub max_modify_time: Option<u64>,
}

impl FetchOutcome {
    pub fn empty() -> Self {
        Self::default()
    }
}

type SharedOutcome = std::result::Result<(), String>;
type InflightSlot = Mutex<Option<watch::Receiver<Option<SharedOutcome>>>>;

enum Role {
    Leader(watch::Sender<Option<SharedOutcome>>),
    Follower(watch::Receiver<Option<SharedOutcome>>),
}

/// Clears the in-flight slot even if the leading future is dropped mid-way,
/// so waiters see a closed channel and retry instead of hanging.
struct InflightGuard<'a> {
    slot: &'a InflightSlot,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

pub struct BaseCache {
    name: &'static str,
    last_fetch_time: AtomicU64,
    first_load: AtomicBool,
    inflight: InflightSlot,
}

impl std::fmt::Debug for BaseCache {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("BaseCache")
            .field("name", &self.name)
            .field("last_fetch_time", &self.last_fetch_time())
            .field("first_load", &self.is_first_load())
            .finish()
    }
}

impl BaseCache {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            last_fetch_time: AtomicU64::new(0),
            first_load: AtomicBool::new(true),
            inflight: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn last_fetch_time(&self) -> u64 {
        self.last_fetch_time.load(Ordering::Acquire)
    }

    pub fn is_first_load(&self) -> bool {
        self.first_load.load(Ordering::Acquire)
    }

    /// Runs `refresh(first_load, last_fetch_time)` unless another refresh is
    /// already in flight, in which case its outcome is shared.
    ///
    /// # Returns
    /// `Ok(true)` when the outcome was shared with another caller. Such a
    /// caller may not observe writes made after the shared refresh started;
    /// see [`crate::Refreshable::update_consistent`].
    pub async fn update<F, Fut>(
        &self,
        refresh: F,
    ) -> Result<bool>
    where
        F: FnOnce(bool, u64) -> Fut,
        Fut: Future<Output = Result<FetchOutcome>>,
    {
        let tx = loop {
            match self.join_or_lead() {
                Role::Leader(tx) => break tx,
                Role::Follower(mut rx) => {
                    let outcome = rx.wait_for(|o| o.is_some()).await.map(|o| o.clone());
                    match outcome {
                        Ok(Some(shared)) => {
                            return shared.map(|_| true).map_err(Error::SharedRefresh);
                        }
                        _ => {
                            debug!(cache = self.name, "in-flight refresh vanished, retrying");
                            continue;
                        }
                    }
                }
            }
        };

        let guard = InflightGuard {
            slot: &self.inflight,
        };
        let result = self.run(refresh).await;
        let shared = result.as_ref().map(|_| ()).map_err(|e| e.to_string());

        // Callers arriving from here on start a fresh refresh
        drop(guard);
        tx.send_replace(Some(shared));

        result.map(|_| false)
    }

    fn join_or_lead(&self) -> Role {
        let mut slot = self.inflight.lock();
        match slot.as_ref() {
            Some(rx) => Role::Follower(rx.clone()),
            None => {
                let (tx, rx) = watch::channel(None);
                *slot = Some(rx);
                Role::Leader(tx)
            }
        }
    }

    async fn run<F, Fut>(
        &self,
        refresh: F,
    ) -> Result<FetchOutcome>
    where
        F: FnOnce(bool, u64) -> Fut,
        Fut: Future<Output = Result<FetchOutcome>>,
    {
        let first_load = self.is_first_load();
        let since = self.last_fetch_time();

        let outcome = match refresh(first_load, since).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(cache = self.name, since, "refresh failed: {}", e);
                CACHE_REFRESH_TOTAL.with_label_values(&[self.name, "error"]).inc();
                return Err(e);
            }
        };

        if let Some(max_modify_time) = outcome.max_modify_time {
            // never regress the watermark
            self.last_fetch_time.fetch_max(max_modify_time, Ordering::AcqRel);
        }
        self.first_load.store(false, Ordering::Release);

        CACHE_REFRESH_TOTAL.with_label_values(&[self.name, "ok"]).inc();
        CACHE_LAST_REFRESH_MS
            .with_label_values(&[self.name])
            .set(now_ms() as f64);
        debug!(
            cache = self.name,
            first_load,
            since,
            rows = outcome.rows,
            watermark = self.last_fetch_time(),
            "refresh applied"
        );
        Ok(outcome)
    }

    /// Forgets the watermark so the next refresh requests a full snapshot.
    pub fn reset(&self) {
        self.last_fetch_time.store(0, Ordering::Release);
        self.first_load.store(true, Ordering::Release);
    }
}
