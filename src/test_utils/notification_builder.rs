use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::proto::gnmi;
use crate::proto::gnmi::Notification;
use crate::proto::gnmi::SubscribeResponse;
use crate::proto::gnmi::TypedValue;
use crate::proto::gnmi::Update;
use crate::DataPoint;
use crate::Path;

/// Wire path from `/a/b[k=v]/c`. Keys must not contain `/`.
pub fn gnmi_path(text: &str) -> gnmi::Path {
    let elem = text
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let mut parts = segment.split('[');
            let name = parts.next().unwrap_or_default().to_string();
            let key = parts
                .filter_map(|kv| kv.trim_end_matches(']').split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            gnmi::PathElem { name, key }
        })
        .collect();
    gnmi::Path {
        elem,
        ..Default::default()
    }
}

pub fn path(text: &str) -> Path {
    Path::from(&gnmi_path(text))
}

/// Update data point with a uint value; the device timestamp is `value`
/// seconds after the epoch.
pub fn point(
    text: &str,
    value: u64,
) -> DataPoint {
    let ts = UNIX_EPOCH + Duration::from_secs(value);
    DataPoint::update(path(text), TypedValue::uint(value), ts, SystemTime::now())
}

pub fn delete_point(text: &str) -> DataPoint {
    DataPoint::delete(path(text), UNIX_EPOCH, SystemTime::now())
}

pub fn sync_point() -> DataPoint {
    DataPoint::sync_marker(SystemTime::now())
}

/// Builder for update notifications.
#[derive(Debug, Default, Clone)]
pub struct NotificationBuilder {
    notification: Notification,
}

impl NotificationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(
        mut self,
        text: &str,
    ) -> Self {
        self.notification.prefix = Some(gnmi_path(text));
        self
    }

    pub fn prefix_path(
        mut self,
        prefix: gnmi::Path,
    ) -> Self {
        self.notification.prefix = Some(prefix);
        self
    }

    pub fn timestamp(
        mut self,
        nanos: i64,
    ) -> Self {
        self.notification.timestamp = nanos;
        self
    }

    pub fn update(
        mut self,
        text: &str,
        value: TypedValue,
    ) -> Self {
        self.notification.update.push(Update {
            path: Some(gnmi_path(text)),
            val: Some(value),
            duplicates: 0,
        });
        self
    }

    pub fn raw_update(
        mut self,
        update: Update,
    ) -> Self {
        self.notification.update.push(update);
        self
    }

    pub fn delete(
        mut self,
        text: &str,
    ) -> Self {
        self.notification.delete.push(gnmi_path(text));
        self
    }

    pub fn build(self) -> Notification {
        self.notification
    }

    pub fn response(self) -> SubscribeResponse {
        SubscribeResponse::update(self.notification)
    }
}

/// Shorthand for a one-update response.
pub fn update_response(
    text: &str,
    value: u64,
) -> SubscribeResponse {
    NotificationBuilder::new().update(text, TypedValue::uint(value)).response()
}
