use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Connection parameters used when dialing a device's gNMI endpoint
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransportConfig {
    /// Device gNMI endpoint, e.g. `http://192.0.2.1:9339`
    #[serde(default)]
    pub address: String,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Unary (Get) request timeout in milliseconds; 0 disables it
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,

    /// TCP keepalive in seconds
    #[serde(default = "default_tcp_keepalive")]
    pub tcp_keepalive_in_secs: u64,

    /// HTTP2 keepalive ping interval in seconds
    #[serde(default = "default_h2_keepalive_interval")]
    pub http2_keep_alive_interval_in_secs: u64,

    /// HTTP2 keepalive timeout in seconds
    #[serde(default = "default_h2_keepalive_timeout")]
    pub http2_keep_alive_timeout_in_secs: u64,

    /// Largest decoded gNMI message in bytes
    #[serde(default = "default_max_decoding_message_size")]
    pub max_decoding_message_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            connect_timeout_in_ms: default_connect_timeout(),
            request_timeout_in_ms: default_request_timeout(),
            tcp_keepalive_in_secs: default_tcp_keepalive(),
            http2_keep_alive_interval_in_secs: default_h2_keepalive_interval(),
            http2_keep_alive_timeout_in_secs: default_h2_keepalive_timeout(),
            max_decoding_message_size: default_max_decoding_message_size(),
        }
    }
}

impl TransportConfig {
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "transport connection timeout must be > 0".to_string(),
            )));
        }

        if self.request_timeout_in_ms != 0 && self.request_timeout_in_ms <= self.connect_timeout_in_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "transport request timeout {}ms must exceed connect timeout {}ms",
                self.request_timeout_in_ms, self.connect_timeout_in_ms
            ))));
        }

        if self.http2_keep_alive_timeout_in_secs >= self.http2_keep_alive_interval_in_secs {
            return Err(Error::Config(ConfigError::Message(format!(
                "transport keepalive timeout {}s must be < interval {}s",
                self.http2_keep_alive_timeout_in_secs, self.http2_keep_alive_interval_in_secs
            ))));
        }

        if self.max_decoding_message_size < 4 * 1024 * 1024 {
            return Err(Error::Config(ConfigError::Message(format!(
                "max decoding message size {} below the 4MB gRPC default",
                self.max_decoding_message_size
            ))));
        }

        Ok(())
    }

    /// The binary needs an address; library users may dial their own channel.
    pub fn require_address(&self) -> Result<&str> {
        if self.address.trim().is_empty() {
            return Err(Error::Config(ConfigError::NotFound("transport.address".to_string())));
        }
        Ok(&self.address)
    }
}

fn default_connect_timeout() -> u64 {
    5_000
}
fn default_request_timeout() -> u64 {
    30_000
}
fn default_tcp_keepalive() -> u64 {
    300
}
fn default_h2_keepalive_interval() -> u64 {
    30
}
fn default_h2_keepalive_timeout() -> u64 {
    10
}
fn default_max_decoding_message_size() -> usize {
    64 * 1024 * 1024
}
