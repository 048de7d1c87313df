//! Configuration management for the telemetry monitor.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Environment variable overrides
//! - Configuration file support
//! - Section-wise validation
//!
//! The loaded [`MonitorConfig`] is passed explicitly to whatever needs it;
//! nothing here is global.
mod cache;
mod subscription;
mod target;
mod transport;
pub use cache::*;
pub use subscription::*;
pub use target::*;
pub use transport::*;
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Main configuration container for the monitor components
///
/// Combines all section configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MonitorConfig {
    /// Subscription list shape and per-path modes
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    /// Per-path cache bounds
    #[serde(default)]
    pub cache: CacheConfig,
    /// Device connection parameters
    #[serde(default)]
    pub transport: TransportConfig,
    /// Paths monitored by the binary
    #[serde(default)]
    pub target: TargetConfig,
}

impl MonitorConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `MONITOR__` prefix (highest priority)
    ///
    /// # Note
    /// Callers MUST call `validate()` before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("MONITOR__CACHE__CAPACITY", "16");
    /// let cfg = MonitorConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("MONITOR")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config) // No validation - deferred to validate()
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("MONITOR")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config) // No validation - deferred to validate()
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.subscription.validate()?;
        self.cache.validate()?;
        self.transport.validate()?;
        self.target.validate()?;
        Ok(self)
    }
}
