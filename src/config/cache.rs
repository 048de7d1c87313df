use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Bounds of the per-path cache fed by watchers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Time an entry survives without a write (seconds)
    #[serde(default = "default_ttl")]
    pub ttl_in_secs: u64,

    /// Data points retained per path
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Background sweep period in milliseconds; 0 keeps expiry lazy-on-read only
    #[serde(default)]
    pub sweep_interval_in_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_in_secs: default_ttl(),
            capacity: default_capacity(),
            sweep_interval_in_ms: 0,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ttl_in_secs == 0 {
            return Err(Error::Config(ConfigError::Message("cache ttl must be > 0".to_string())));
        }
        if self.capacity == 0 {
            return Err(Error::Config(ConfigError::Message(
                "cache capacity must be > 0".to_string(),
            )));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_in_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_in_ms > 0).then(|| Duration::from_millis(self.sweep_interval_in_ms))
    }
}

// Two hours, one value per leaf: the event-cache sizing used by HA tests.
fn default_ttl() -> u64 {
    7_200
}
fn default_capacity() -> usize {
    1
}
