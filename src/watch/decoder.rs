use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use tracing::debug;
use tracing::trace;

use crate::proto::gnmi::subscribe_response::Response;
use crate::proto::gnmi::Notification;
use crate::proto::gnmi::SubscribeResponse;
use crate::DataPoint;
use crate::Path;
use crate::ProtocolError;

/// Data points of one subscribe response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decoded {
    pub points: Vec<DataPoint>,
    pub sync: bool,
}

/// Turns raw subscribe responses into data points.
#[derive(Debug, Clone, Copy)]
pub struct NotificationDecoder {
    deletes_expected: bool,
}

impl NotificationDecoder {
    pub fn new(deletes_expected: bool) -> Self {
        Self { deletes_expected }
    }

    /// Decodes one response received at `recv_timestamp`.
    ///
    /// Deletes come before updates in the output whatever their order on the
    /// wire. A sync response decodes to a single sync marker.
    pub fn decode(
        &self,
        response: SubscribeResponse,
        recv_timestamp: SystemTime,
    ) -> std::result::Result<Decoded, ProtocolError> {
        match response.response {
            Some(Response::Update(notification)) => Ok(Decoded {
                points: self.decode_notification(notification, recv_timestamp)?,
                sync: false,
            }),
            Some(Response::SyncResponse(_)) => {
                debug!("received gNMI SyncResponse");
                Ok(Decoded {
                    points: vec![DataPoint::sync_marker(recv_timestamp)],
                    sync: true,
                })
            }
            None => Err(ProtocolError::EmptyResponse),
        }
    }

    fn decode_notification(
        &self,
        n: Notification,
        recv_timestamp: SystemTime,
    ) -> std::result::Result<Vec<DataPoint>, ProtocolError> {
        if !self.deletes_expected && !n.delete.is_empty() {
            return Err(ProtocolError::UnexpectedDeletes {
                paths: n.delete.iter().map(|p| Path::from(p).to_string()).collect(),
            });
        }

        let timestamp = device_time(n.timestamp);
        let prefix = n.prefix.as_ref();
        let mut points = Vec::with_capacity(n.delete.len() + n.update.len());

        for deleted in &n.delete {
            let path = Path::join(prefix, deleted)?.without_target();
            trace!(%path, "received gNMI delete");
            points.push(DataPoint::delete(path, timestamp, recv_timestamp));
        }

        for (index, update) in n.update.into_iter().enumerate() {
            let Some(relative) = update.path.as_ref() else {
                return Err(ProtocolError::NilUpdatePath { index });
            };
            let path = Path::join(prefix, relative)?.without_target();
            let Some(value) = update.val else {
                return Err(ProtocolError::NilUpdateValue { path: path.to_string() });
            };
            trace!(%path, %value, "received gNMI update");
            points.push(DataPoint::update(path, value, timestamp, recv_timestamp));
        }

        Ok(points)
    }
}

/// Device timestamps are nanoseconds since the epoch; negative ones clamp
/// to the epoch.
fn device_time(nanos: i64) -> SystemTime {
    u64::try_from(nanos)
        .map(|n| UNIX_EPOCH + Duration::from_nanos(n))
        .unwrap_or(UNIX_EPOCH)
}
