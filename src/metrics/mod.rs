//! Prometheus gauges and counters of the config cache.
//!
//! All collectors live in the crate-level [`REGISTRY`]; an exporter outside
//! this crate scrapes it through [`gather_text`].

mod reporter;
pub use reporter::*;


use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::GaugeVec;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;

lazy_static! {
    pub static ref CONFIG_RELEASE_COUNT: IntGaugeVec = IntGaugeVec::new(
        Opts::new("config_release_count", "Releases mirrored per group"),
        &["namespace", "group"]
    )
    .expect("metric can not be created");

    pub static ref CONFIG_ACTIVE_RELEASE_COUNT: IntGaugeVec = IntGaugeVec::new(
        Opts::new("config_active_release_count", "Occupied active slots per group"),
        &["namespace", "group"]
    )
    .expect("metric can not be created");

    pub static ref CONFIG_RELEASE_STORED_COUNT: IntGaugeVec = IntGaugeVec::new(
        Opts::new("config_release_stored_count", "Releases per group as counted by the store"),
        &["namespace", "group"]
    )
    .expect("metric can not be created");

    pub static ref CONFIG_GROUP_COUNT: IntGaugeVec = IntGaugeVec::new(
        Opts::new("config_group_count", "Config groups per namespace"),
        &["namespace"]
    )
    .expect("metric can not be created");

    pub static ref CACHE_REFRESH_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cache_refresh_total", "Refresh attempts by outcome"),
        &["cache", "result"]
    )
    .expect("metric can not be created");

    pub static ref CACHE_LAST_REFRESH_MS: GaugeVec = GaugeVec::new(
        Opts::new("cache_last_refresh_ms", "Wall clock of the last successful refresh"),
        &["cache"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

pub(crate) fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CONFIG_RELEASE_COUNT.clone()),
        Box::new(CONFIG_ACTIVE_RELEASE_COUNT.clone()),
        Box::new(CONFIG_RELEASE_STORED_COUNT.clone()),
        Box::new(CONFIG_GROUP_COUNT.clone()),
        Box::new(CACHE_REFRESH_TOTAL.clone()),
        Box::new(CACHE_LAST_REFRESH_MS.clone()),
    ];
    for c in collectors {
        if let Err(e) = registry.register(c) {
            error!("collector can not be registered: {}", e);
        }
    }
}

/// Registers the collectors into [`REGISTRY`] once per process.
pub fn init_metrics() {
    REGISTER.call_once(|| register_custom_metrics(&REGISTRY));
}

/// Renders [`REGISTRY`] in the Prometheus text format.
pub fn gather_text() -> String {
    init_metrics();
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    }
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
