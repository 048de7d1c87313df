//! Sinks for flushed batches.
//!
//! A [`Consumer`] receives every batch a watcher flushes. The
//! [`CachedConsumer`] keeps the last N data points per path for a bounded
//! time and exposes them through the [`Datasource`] lookup boundary.

mod cached_consumer;
mod ring_buffer;

pub use cached_consumer::*;
pub use ring_buffer::*;


#[cfg(test)]
use mockall::automock;

use crate::DataPoint;

/// Receives flushed batches. Batches are never empty.
///
/// One consumer may be shared by several watchers at once, so
/// implementations do their own locking.
#[cfg_attr(test, automock)]
pub trait Consumer: Send + Sync + 'static {
    fn process(
        &self,
        batch: Vec<DataPoint>,
    );
}

/// Read side of a cache, keyed by a path's rendered string form.
pub trait Datasource: Send + Sync {
    fn get(
        &self,
        key: &str,
    ) -> Option<CachedEntry>;
}
