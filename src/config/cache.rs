use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Period of the background refresh tick (unit: milliseconds)
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Buffered release events per subscriber before lagging ones drop events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl CacheConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_ms == 0 {
            return Err(Error::InvalidConfig("refresh_interval_ms must be > 0".into()));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::InvalidConfig(
                "event_channel_capacity must be > 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_refresh_interval_ms() -> u64 {
    1000
}
fn default_event_channel_capacity() -> usize {
    1024
}
