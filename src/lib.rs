//! Streaming telemetry monitor.
//!
//! Opens gNMI subscriptions against a device, decodes the streamed
//! notifications into [`DataPoint`]s, gates them on the subscription's sync
//! response and hands the resulting batches to a [`Consumer`], typically the
//! bounded, expiring [`CachedConsumer`]. A [`BackgroundRunner`] fires test
//! callbacks on timers while watches run.
//!
//! ```ignore
//! let device = Arc::new(GrpcDevice::connect("dut", &config.transport).await?);
//! let cache = Arc::new(CachedConsumer::from_config(&config.cache));
//! let ctx = WatchContext::new(device, cache.clone(), config.subscription.clone());
//!
//! let request = WatchRequest::new(PathDescriptor::parse("/system/state"), QueryKind::Subtree);
//! let watcher = Watcher::start(&ctx, request, &token).await?;
//! // ...
//! watcher.cancel();
//! assert!(watcher.wait().await?);
//! ```

mod cache;
mod config;
mod datapoint;
mod errors;
mod metrics;
mod network;
mod path;
mod scheduler;
mod watch;

pub mod constants;
pub mod proto;

pub use cache::*;
pub use config::*;
pub use datapoint::*;
pub use errors::*;
pub use metrics::*;
pub use network::*;
pub use path::*;
pub use scheduler::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
