use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use prometheus::core::Collector;
use prometheus::IntGaugeVec;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::init_metrics;
use super::CONFIG_ACTIVE_RELEASE_COUNT;
use super::CONFIG_GROUP_COUNT;
use super::CONFIG_RELEASE_COUNT;
use super::CONFIG_RELEASE_STORED_COUNT;
use crate::GroupCache;
use crate::MonitoringConfig;
use crate::ReleaseCache;
use crate::Result;

const GROUP_LABELS: [&str; 2] = ["namespace", "group"];
const NAMESPACE_LABELS: [&str; 1] = ["namespace"];

/// Removes children of `gauge` whose label values, taken in `label_names`
/// order, are not in `live`. Live children are overwritten, never reset, so a
/// scrape never sees them missing.
pub(crate) fn sweep_stale(
    gauge: &IntGaugeVec,
    label_names: &[&str],
    live: &HashSet<Vec<String>>,
) {
    let mut stale = Vec::new();
    for family in gauge.collect() {
        for metric in family.get_metric() {
            let pairs: HashMap<&str, &str> = metric
                .get_label()
                .iter()
                .map(|p| (p.get_name(), p.get_value()))
                .collect();
            let values: Vec<String> = label_names
                .iter()
                .map(|n| pairs.get(n).copied().unwrap_or_default().to_string())
                .collect();
            if !live.contains(&values) {
                stale.push(values);
            }
        }
    }
    for values in stale {
        let values: Vec<&str> = values.iter().map(String::as_str).collect();
        if let Err(e) = gauge.remove_label_values(&values) {
            debug!("stale gauge child already gone: {}", e);
        }
    }
}

/// Samples cache sizes into gauges. Samples requested within
/// `min_interval` of the previous one are skipped.
pub struct MetricsReporter {
    releases: Arc<ReleaseCache>,
    groups: Arc<GroupCache>,
    min_interval: Duration,
    last_report: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for MetricsReporter {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("MetricsReporter")
            .field("min_interval", &self.min_interval)
            .field("last_report", &*self.last_report.lock())
            .finish()
    }
}

impl MetricsReporter {
    pub fn new(
        releases: Arc<ReleaseCache>,
        groups: Arc<GroupCache>,
        config: &MonitoringConfig,
    ) -> Self {
        init_metrics();
        Self {
            releases,
            groups,
            min_interval: config.min_report_interval(),
            last_report: Mutex::new(None),
        }
    }

    fn acquire_slot(&self) -> bool {
        let mut last = self.last_report.lock();
        if let Some(at) = *last {
            if at.elapsed() < self.min_interval {
                return false;
            }
        }
        *last = Some(Instant::now());
        true
    }

    /// Publishes a fresh sample. Returns `Ok(false)` when rate limited.
    pub async fn report(&self) -> Result<bool> {
        if !self.acquire_slot() {
            debug!("metrics report skipped, inside rate limit window");
            return Ok(false);
        }

        let mut live_groups = HashSet::new();
        for stats in self.releases.group_stats() {
            let labels = [stats.key.namespace.as_str(), stats.key.group.as_str()];
            CONFIG_RELEASE_COUNT
                .with_label_values(&labels)
                .set(stats.releases as i64);
            CONFIG_ACTIVE_RELEASE_COUNT
                .with_label_values(&labels)
                .set(stats.active as i64);
            live_groups.insert(vec![stats.key.namespace, stats.key.group]);
        }
        sweep_stale(&CONFIG_RELEASE_COUNT, &GROUP_LABELS, &live_groups);
        sweep_stale(&CONFIG_ACTIVE_RELEASE_COUNT, &GROUP_LABELS, &live_groups);

        let mut live_namespaces = HashSet::new();
        for (namespace, count) in self.groups.namespace_sizes() {
            CONFIG_GROUP_COUNT
                .with_label_values(&[namespace.as_str()])
                .set(count as i64);
            live_namespaces.insert(vec![namespace]);
        }
        sweep_stale(&CONFIG_GROUP_COUNT, &NAMESPACE_LABELS, &live_namespaces);

        let stored = self.releases.store().count_releases_per_group().await?;
        let mut live_stored = HashSet::new();
        for (namespace, groups) in &stored {
            for (group, count) in groups {
                CONFIG_RELEASE_STORED_COUNT
                    .with_label_values(&[namespace.as_str(), group.as_str()])
                    .set(*count as i64);
                live_stored.insert(vec![namespace.clone(), group.clone()]);
            }
        }
        sweep_stale(&CONFIG_RELEASE_STORED_COUNT, &GROUP_LABELS, &live_stored);
        Ok(true)
    }

    /// Reports every `period` until `cancel` fires.
    pub fn spawn(
        self: Arc<Self>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(?period, "metrics reporter started");
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!("metrics reporter stopped");
                        return;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = self.report().await {
                            warn!("metrics report failed: {}", e);
                        }
                    }
                }
            }
        })
    }
}
