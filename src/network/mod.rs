//! Device collaborator abstraction.
//!
//! The monitor only needs two gNMI operations from a device: open a
//! bidirectional Subscribe stream and perform a unary Get. [`GnmiClient`]
//! captures exactly that; [`GrpcGnmiClient`] is the tonic-backed
//! implementation and [`GrpcDevice`] dials it from a [`crate::TransportConfig`].

mod grpc_device;

pub use grpc_device::*;


use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
#[cfg(test)]
use mockall::automock;
use tokio_stream::wrappers::ReceiverStream;
use tonic::async_trait;

use crate::proto::gnmi::GetRequest;
use crate::proto::gnmi::GetResponse;
use crate::proto::gnmi::SubscribeRequest;
use crate::proto::gnmi::SubscribeResponse;
use crate::TransportError;

/// Responses of an open Subscribe RPC, in arrival order.
pub type NotificationStream =
    Pin<Box<dyn Stream<Item = std::result::Result<SubscribeResponse, tonic::Status>> + Send>>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait GnmiClient: Send + Sync + 'static {
    /// Opens a Subscribe RPC. `requests` is the client half of the
    /// bidirectional stream; the first item is the subscription list.
    ///
    /// # Errors
    /// - [`TransportError::InvalidMetadata`] if `metadata` cannot be encoded
    /// - [`TransportError::Rpc`] if the device rejects the RPC
    async fn subscribe(
        &self,
        requests: ReceiverStream<SubscribeRequest>,
        metadata: BTreeMap<String, String>,
    ) -> std::result::Result<NotificationStream, TransportError>;

    /// Unary Get.
    async fn get(
        &self,
        request: GetRequest,
        metadata: BTreeMap<String, String>,
    ) -> std::result::Result<GetResponse, TransportError>;
}

/// A device under test, as far as telemetry is concerned.
pub trait Device: Send + Sync {
    fn name(&self) -> &str;

    /// Client used for every watch started against this device.
    fn gnmi(&self) -> Arc<dyn GnmiClient>;
}
