use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use super::QueryKind;
use crate::Error;
use crate::Result;

/// What the binary monitors on the device
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TargetConfig {
    /// gNMI target name placed in the subscription prefix
    #[serde(default)]
    pub name: String,

    /// Textual paths, e.g. `/interfaces/interface[name=eth0]/state`
    #[serde(default)]
    pub paths: Vec<String>,

    #[serde(default)]
    pub query: QueryKind,
}

impl TargetConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self.paths.iter().find(|p| !p.starts_with('/')) {
            return Err(Error::Config(ConfigError::Message(format!(
                "target path {bad:?} must be absolute"
            ))));
        }
        Ok(())
    }
}
