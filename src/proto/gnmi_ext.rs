use std::fmt;

use super::gnmi::subscribe_request::Request;
use super::gnmi::subscribe_response::Response;
use super::gnmi::typed_value::Value;
use super::gnmi::Notification;
use super::gnmi::Poll;
use super::gnmi::SubscribeRequest;
use super::gnmi::SubscribeResponse;
use super::gnmi::SubscriptionList;
use super::gnmi::TypedValue;

impl SubscribeRequest {
    /// Initial request carrying the subscription list
    pub fn subscribe(list: SubscriptionList) -> Self {
        Self {
            request: Some(Request::Subscribe(list)),
        }
    }

    /// Poll trigger for a POLL-mode subscription
    pub fn poll() -> Self {
        Self {
            request: Some(Request::Poll(Poll {})),
        }
    }
}

impl SubscribeResponse {
    pub fn update(notification: Notification) -> Self {
        Self {
            response: Some(Response::Update(notification)),
        }
    }

    pub fn sync() -> Self {
        Self {
            response: Some(Response::SyncResponse(true)),
        }
    }

    pub fn is_sync(&self) -> bool {
        matches!(self.response, Some(Response::SyncResponse(_)))
    }
}

impl TypedValue {
    pub fn string(v: impl Into<String>) -> Self {
        Self {
            value: Some(Value::StringVal(v.into())),
        }
    }

    pub fn uint(v: u64) -> Self {
        Self {
            value: Some(Value::UintVal(v)),
        }
    }

    pub fn int(v: i64) -> Self {
        Self {
            value: Some(Value::IntVal(v)),
        }
    }

    pub fn boolean(v: bool) -> Self {
        Self {
            value: Some(Value::BoolVal(v)),
        }
    }

    pub fn json_ietf(v: impl Into<Vec<u8>>) -> Self {
        Self {
            value: Some(Value::JsonIetfVal(v.into())),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match &self.value {
            None => write!(f, "<empty>"),
            Some(Value::StringVal(v)) | Some(Value::AsciiVal(v)) => write!(f, "{v:?}"),
            Some(Value::IntVal(v)) => write!(f, "{v}"),
            Some(Value::UintVal(v)) => write!(f, "{v}"),
            Some(Value::BoolVal(v)) => write!(f, "{v}"),
            Some(Value::FloatVal(v)) => write!(f, "{v}"),
            Some(Value::DoubleVal(v)) => write!(f, "{v}"),
            Some(Value::JsonVal(v)) | Some(Value::JsonIetfVal(v)) => {
                write!(f, "{}", String::from_utf8_lossy(v))
            }
            Some(Value::BytesVal(v)) | Some(Value::ProtoBytes(v)) => {
                write!(f, "<{} bytes>", v.len())
            }
            Some(Value::LeaflistVal(arr)) => {
                write!(f, "[")?;
                for (i, e) in arr.element.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
        }
    }
}
