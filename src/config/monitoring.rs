use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Period of the gauge sampling tick (unit: milliseconds)
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,

    /// Samples requested inside this window after the last one are skipped
    #[serde(default = "default_min_report_interval_ms")]
    pub min_report_interval_ms: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            report_interval_ms: default_report_interval_ms(),
            min_report_interval_ms: default_min_report_interval_ms(),
        }
    }
}

impl MonitoringConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    pub fn min_report_interval(&self) -> Duration {
        Duration::from_millis(self.min_report_interval_ms)
    }

    /// Validates monitoring configuration
    /// # Errors
    /// Returns `Error::InvalidConfig` when reporting is enabled with a zero
    /// interval or a rate limit wider than the interval itself.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.report_interval_ms == 0 {
            return Err(Error::InvalidConfig("report_interval_ms must be > 0".into()));
        }
        if self.min_report_interval_ms > self.report_interval_ms {
            return Err(Error::InvalidConfig(format!(
                "min_report_interval_ms {} exceeds report_interval_ms {}",
                self.min_report_interval_ms, self.report_interval_ms
            )));
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}
fn default_report_interval_ms() -> u64 {
    30_000
}
fn default_min_report_interval_ms() -> u64 {
    5_000
}
