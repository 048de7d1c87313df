//! Pipeline counters.
//!
//! Collectors are owned by a [`PipelineMetrics`] value handed to the
//! components that update them; callers decide which registry exposes them.


use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;

use crate::Result;

#[derive(Clone, Debug)]
pub struct PipelineMetrics {
    /// Subscribe responses read from device streams, by response kind
    pub notifications_received: IntCounterVec,
    pub datapoints_decoded: IntCounter,
    pub batches_flushed: IntCounter,
    /// Terminal watcher outcomes, by outcome name
    pub watch_outcomes: IntCounterVec,
    pub cache_writes: IntCounter,
    pub cache_evictions: IntCounter,
    /// Recurring ticks skipped because the previous run was still in flight
    pub ticks_skipped: IntCounterVec,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            notifications_received: IntCounterVec::new(
                Opts::new("notifications_received", "Subscribe responses received"),
                &["kind"],
            )?,
            datapoints_decoded: IntCounter::new("datapoints_decoded", "Data points decoded")?,
            batches_flushed: IntCounter::new("batches_flushed", "Batches handed to consumers")?,
            watch_outcomes: IntCounterVec::new(
                Opts::new("watch_outcomes", "Terminal watcher outcomes"),
                &["outcome"],
            )?,
            cache_writes: IntCounter::new("cache_writes", "Data points written to the cache")?,
            cache_evictions: IntCounter::new("cache_evictions", "Expired cache entries removed")?,
            ticks_skipped: IntCounterVec::new(
                Opts::new("ticks_skipped", "Recurring ticks skipped to avoid overlap"),
                &["task"],
            )?,
        })
    }

    pub fn register(
        &self,
        registry: &Registry,
    ) -> Result<()> {
        registry.register(Box::new(self.notifications_received.clone()))?;
        registry.register(Box::new(self.datapoints_decoded.clone()))?;
        registry.register(Box::new(self.batches_flushed.clone()))?;
        registry.register(Box::new(self.watch_outcomes.clone()))?;
        registry.register(Box::new(self.cache_writes.clone()))?;
        registry.register(Box::new(self.cache_evictions.clone()))?;
        registry.register(Box::new(self.ticks_skipped.clone()))?;
        Ok(())
    }
}
