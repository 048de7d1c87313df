use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::proto::gnmi::subscription_list::Mode;
use crate::proto::gnmi::SubscriptionMode;
use crate::Error;
use crate::Result;

/// Overall mode of a subscription list
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListMode {
    /// Long-lived stream of updates
    #[default]
    Stream,
    /// One snapshot terminated by a sync response
    Once,
    /// Snapshot per client poll request
    Poll,
}

impl ListMode {
    pub fn to_proto(self) -> Mode {
        match self {
            ListMode::Stream => Mode::Stream,
            ListMode::Once => Mode::Once,
            ListMode::Poll => Mode::Poll,
        }
    }
}

/// Per-path sampling behaviour
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    #[default]
    TargetDefined,
    OnChange,
    Sample,
}

impl SampleMode {
    pub fn to_proto(self) -> SubscriptionMode {
        match self {
            SampleMode::TargetDefined => SubscriptionMode::TargetDefined,
            SampleMode::OnChange => SubscriptionMode::OnChange,
            SampleMode::Sample => SubscriptionMode::Sample,
        }
    }
}

/// Shape of the subscribed value
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// A single scalar; considered synced as soon as anything arrives
    Leaf,
    /// A container or list; nothing is exposed before the first sync
    #[default]
    Subtree,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubscriptionConfig {
    /// ONCE / POLL / STREAM
    #[serde(default)]
    pub list_mode: ListMode,

    /// Per-path mode used when the descriptor does not override it
    #[serde(default)]
    pub sample_mode: SampleMode,

    /// Interval between samples in SAMPLE mode (milliseconds)
    #[serde(default = "default_sample_interval")]
    pub sample_interval_in_ms: u64,

    /// Whether delete entries are acceptable in notifications
    #[serde(default = "default_deletes_expected")]
    pub deletes_expected: bool,

    /// Ask the device to skip the initial snapshot
    #[serde(default)]
    pub updates_only: bool,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            list_mode: ListMode::default(),
            sample_mode: SampleMode::default(),
            sample_interval_in_ms: default_sample_interval(),
            deletes_expected: default_deletes_expected(),
            updates_only: false,
        }
    }
}

impl SubscriptionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_mode == SampleMode::Sample && self.sample_interval_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "sample_interval_in_ms must be > 0 in SAMPLE mode".to_string(),
            )));
        }

        if self.updates_only && self.list_mode == ListMode::Once {
            return Err(Error::Config(ConfigError::Message(
                "updates_only has no meaning for ONCE subscriptions".to_string(),
            )));
        }

        Ok(())
    }

    /// Sample interval in nanoseconds as carried on the wire
    pub fn sample_interval_ns(&self) -> u64 {
        self.sample_interval_in_ms.saturating_mul(1_000_000)
    }
}

fn default_sample_interval() -> u64 {
    10_000
}
fn default_deletes_expected() -> bool {
    true
}
