//! Decoded telemetry values.


use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::constants::ROOT_BUNDLE;
use crate::proto::gnmi::TypedValue;
use crate::Path;

/// A value of a telemetry path at a particular time.
///
/// Created by the notification decoder and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub path: Path,
    /// `None` means the path was deleted
    pub value: Option<TypedValue>,
    /// Time the value was updated on the device
    pub timestamp: SystemTime,
    /// Time the update was received by the monitor
    pub recv_timestamp: SystemTime,
    /// Marks the gNMI sync response
    pub sync: bool,
}

impl DataPoint {
    pub fn update(
        path: Path,
        value: TypedValue,
        timestamp: SystemTime,
        recv_timestamp: SystemTime,
    ) -> Self {
        Self {
            path,
            value: Some(value),
            timestamp,
            recv_timestamp,
            sync: false,
        }
    }

    pub fn delete(
        path: Path,
        timestamp: SystemTime,
        recv_timestamp: SystemTime,
    ) -> Self {
        Self {
            path,
            value: None,
            timestamp,
            recv_timestamp,
            sync: false,
        }
    }

    /// Sync markers carry no path and no value.
    pub fn sync_marker(recv_timestamp: SystemTime) -> Self {
        Self {
            path: Path::default(),
            value: None,
            timestamp: UNIX_EPOCH,
            recv_timestamp,
            sync: true,
        }
    }

    pub fn is_delete(&self) -> bool {
        !self.sync && self.value.is_none()
    }
}

impl fmt::Display for DataPoint {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.sync {
            return write!(f, "Sync (received {:?})", self.recv_timestamp);
        }
        match &self.value {
            Some(v) => write!(f, "Value: {v}")?,
            None => write!(f, "Value: <deleted>")?,
        }
        write!(
            f,
            "\nTimestamp: {:?}\nRecvTimestamp: {:?}\nPath: {}",
            self.timestamp, self.recv_timestamp, self.path
        )
    }
}

/// Latest device timestamp of the input data points, or the epoch when empty.
pub fn latest_timestamp(points: &[DataPoint]) -> SystemTime {
    points.iter().map(|dp| dp.timestamp).max().unwrap_or(UNIX_EPOCH)
}

/// Latest receive timestamp of the input data points, or the epoch when empty.
pub fn latest_recv_timestamp(points: &[DataPoint]) -> SystemTime {
    points
        .iter()
        .map(|dp| dp.recv_timestamp)
        .max()
        .unwrap_or(UNIX_EPOCH)
}

/// Splits data points into common-prefix groups.
///
/// Each group is keyed by the rendered first `prefix_len` elements of its
/// paths. Paths shorter than `prefix_len` land in the `/` group. Sync
/// markers have no path and are skipped. Keys iterate in sorted order.
pub fn bundle_by_prefix(
    points: &[DataPoint],
    prefix_len: usize,
) -> BTreeMap<String, Vec<DataPoint>> {
    let mut groups: BTreeMap<String, Vec<DataPoint>> = BTreeMap::new();
    for dp in points.iter().filter(|dp| !dp.sync) {
        let key = if dp.path.len() < prefix_len {
            ROOT_BUNDLE.to_string()
        } else {
            dp.path.prefix(prefix_len).to_string()
        };
        groups.entry(key).or_default().push(dp.clone());
    }
    groups
}
