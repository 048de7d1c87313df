use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

use super::Consumer;
use super::Datasource;
use super::RingBuffer;
use crate::CacheConfig;
use crate::DataPoint;
use crate::Error;
use crate::PipelineMetrics;
use crate::Result;

/// Snapshot of one cache entry at lookup time.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry {
    /// Oldest to newest
    pub values: Vec<DataPoint>,
    pub expires_at: Instant,
}

impl CachedEntry {
    pub fn latest(&self) -> Option<&DataPoint> {
        self.values.last()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

struct Slot {
    ring: RingBuffer<DataPoint>,
    expires_at: Instant,
}

impl Slot {
    fn is_expired(
        &self,
        now: Instant,
    ) -> bool {
        now >= self.expires_at
    }

    fn snapshot(&self) -> CachedEntry {
        CachedEntry {
            values: self.ring.to_vec(),
            expires_at: self.expires_at,
        }
    }
}

/// Per-path history of the last `capacity` data points, each path expiring
/// `ttl` after its last write.
///
/// Every write to a key happens under that key's map-shard lock, so
/// concurrent writers to the same path cannot lose an entry between lookup
/// and insert. Expiry is applied lazily on read and, optionally, by a
/// background sweeper.
pub struct CachedConsumer {
    entries: DashMap<String, Slot>,
    ttl: Duration,
    capacity: usize,
    metrics: Option<PipelineMetrics>,
}

impl CachedConsumer {
    pub fn new(
        ttl: Duration,
        capacity: usize,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
            metrics: None,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.capacity)
    }

    pub fn with_metrics(
        mut self,
        metrics: PipelineMetrics,
    ) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn store(
        &self,
        point: DataPoint,
        now: Instant,
    ) {
        let key = point.path.to_string();
        let expires_at = now + self.ttl;
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if slot.is_expired(now) {
                    // An expired entry is gone even if nothing swept it yet
                    slot.ring.clear();
                    self.record_eviction(1);
                }
                slot.ring.push(point);
                slot.expires_at = expires_at;
            }
            Entry::Vacant(vacant) => {
                trace!(key = vacant.key().as_str(), "creating cache entry");
                let mut ring = RingBuffer::new(self.capacity);
                ring.push(point);
                vacant.insert(Slot { ring, expires_at });
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.cache_writes.inc();
        }
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| !slot.is_expired(now));
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            debug!(evicted, "swept expired cache entries");
            self.record_eviction(evicted);
        }
        evicted
    }

    /// Sweeps expired entries every `period` until `token` is cancelled.
    ///
    /// # Errors
    /// [`Error::ZeroPeriod`] if `period` is zero.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        period: Duration,
        token: CancellationToken,
    ) -> Result<JoinHandle<()>> {
        if period.is_zero() {
            return Err(Error::ZeroPeriod {
                task: "cache sweeper".to_string(),
            });
        }
        let cache = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("cache sweeper stopped");
                        return;
                    }
                    _ = interval.tick() => {
                        cache.evict_expired();
                    }
                }
            }
        }))
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|slot| !slot.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rendered paths of the live entries, sorted.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|slot| !slot.is_expired(now))
            .map(|slot| slot.key().clone())
            .collect();
        keys.sort();
        keys
    }

    fn record_eviction(
        &self,
        count: usize,
    ) {
        if let Some(metrics) = &self.metrics {
            metrics.cache_evictions.inc_by(count as u64);
        }
    }
}

impl Consumer for CachedConsumer {
    /// Sync markers have no path and are not cached.
    fn process(
        &self,
        batch: Vec<DataPoint>,
    ) {
        let now = Instant::now();
        for point in batch.into_iter().filter(|dp| !dp.sync) {
            self.store(point, now);
        }
    }
}

impl Datasource for CachedConsumer {
    fn get(
        &self,
        key: &str,
    ) -> Option<CachedEntry> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(slot) if !slot.is_expired(now) => return Some(slot.snapshot()),
            Some(_) => {}
            None => return None,
        }
        // Guard released above; the entry may have been refreshed meanwhile
        if self.entries.remove_if(key, |_, slot| slot.is_expired(now)).is_some() {
            self.record_eviction(1);
        }
        None
    }
}

impl std::fmt::Debug for CachedConsumer {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CachedConsumer")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .finish()
    }
}
