use tracing::trace;

use super::Decoded;
use crate::DataPoint;
use crate::ListMode;
use crate::QueryKind;

/// What the bundler hands back after each decoded response.
#[derive(Debug, Clone, PartialEq)]
pub enum Flush {
    /// Batches to deliver now; the stream goes on
    Batches(Vec<Vec<DataPoint>>),
    /// Last batch of a ONCE subscription; the watch is complete
    Terminal(Vec<DataPoint>),
}

impl Flush {
    pub fn batches(&self) -> &[Vec<DataPoint>] {
        match self {
            Flush::Batches(batches) => batches,
            Flush::Terminal(batch) => std::slice::from_ref(batch),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Flush::Terminal(_))
    }
}

/// Sync-gating state machine between the decoder and the consumer.
///
/// Subtree queries expose nothing until the first sync and then flush
/// everything received since the last flush as one batch. Leaf queries are
/// synced by their first response and flush one batch per data point; a
/// sync marker is only delivered when it arrives alone on the first sync,
/// signalling "present but no value yet" exactly once. ONCE subscriptions
/// accumulate until the sync and end with a single terminal batch.
#[derive(Debug)]
pub struct DatapointBundler {
    query: QueryKind,
    list_mode: ListMode,
    pending: Vec<DataPoint>,
    has_synced: bool,
}

impl DatapointBundler {
    pub fn new(
        query: QueryKind,
        list_mode: ListMode,
    ) -> Self {
        Self {
            query,
            list_mode,
            pending: Vec::new(),
            has_synced: false,
        }
    }

    pub fn push(
        &mut self,
        decoded: Decoded,
    ) -> Flush {
        let Decoded { points, sync } = decoded;
        self.pending.extend(points);

        if self.list_mode == ListMode::Once {
            if sync {
                self.has_synced = true;
                return Flush::Terminal(std::mem::take(&mut self.pending));
            }
            return Flush::Batches(Vec::new());
        }

        let is_leaf = self.query == QueryKind::Leaf;
        let first_sync = !self.has_synced && (sync || is_leaf);
        self.has_synced |= sync || is_leaf;
        if !self.has_synced {
            trace!(pending = self.pending.len(), "holding data points until first sync");
            return Flush::Batches(Vec::new());
        }

        let pending = std::mem::take(&mut self.pending);
        let batches = if is_leaf {
            let alone = pending.len() == 1;
            pending
                .into_iter()
                .filter(|dp| !dp.sync || (alone && first_sync))
                .map(|dp| vec![dp])
                .collect()
        } else if pending.is_empty() {
            Vec::new()
        } else {
            vec![pending]
        };
        Flush::Batches(batches)
    }

    pub fn has_synced(&self) -> bool {
        self.has_synced
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
