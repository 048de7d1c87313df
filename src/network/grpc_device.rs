use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_stream::wrappers::ReceiverStream;
use tonic::async_trait;
use tonic::metadata::Ascii;
use tonic::metadata::MetadataKey;
use tonic::metadata::MetadataMap;
use tonic::metadata::MetadataValue;
use tonic::transport::Channel;
use tonic::transport::Endpoint;
use tracing::debug;
use tracing::info;

use super::Device;
use super::GnmiClient;
use super::NotificationStream;
use crate::constants::GET_METHOD;
use crate::constants::SUBSCRIBE_METHOD;
use crate::proto::gnmi::g_nmi_client::GNmiClient;
use crate::proto::gnmi::GetRequest;
use crate::proto::gnmi::GetResponse;
use crate::proto::gnmi::SubscribeRequest;
use crate::TransportConfig;
use crate::TransportError;

/// gNMI client over a tonic channel.
#[derive(Debug, Clone)]
pub struct GrpcGnmiClient {
    inner: GNmiClient<Channel>,
    request_timeout: Option<Duration>,
}

impl GrpcGnmiClient {
    /// Dials `config.address` with the configured timeouts and keepalives.
    ///
    /// No request timeout is set on the channel: it would also bound
    /// long-lived Subscribe streams. Unary calls carry their own deadline.
    pub async fn connect(config: &TransportConfig) -> std::result::Result<Self, TransportError> {
        let endpoint = Endpoint::from_shared(config.address.clone())
            .map_err(|e| TransportError::InvalidUri(format!("{}: {e}", config.address)))?
            .connect_timeout(Duration::from_millis(config.connect_timeout_in_ms))
            .tcp_keepalive(Some(Duration::from_secs(config.tcp_keepalive_in_secs)))
            .http2_keep_alive_interval(Duration::from_secs(config.http2_keep_alive_interval_in_secs))
            .keep_alive_timeout(Duration::from_secs(config.http2_keep_alive_timeout_in_secs))
            .keep_alive_while_idle(true);

        let channel = endpoint.connect().await.map_err(|e| TransportError::Connect {
            address: config.address.clone(),
            message: e.to_string(),
        })?;
        info!(address = %config.address, "connected to gNMI endpoint");

        Ok(Self::from_channel(channel, config))
    }

    pub fn from_channel(
        channel: Channel,
        config: &TransportConfig,
    ) -> Self {
        Self {
            inner: GNmiClient::new(channel).max_decoding_message_size(config.max_decoding_message_size),
            request_timeout: (config.request_timeout_in_ms > 0)
                .then(|| Duration::from_millis(config.request_timeout_in_ms)),
        }
    }
}

#[async_trait]
impl GnmiClient for GrpcGnmiClient {
    async fn subscribe(
        &self,
        requests: ReceiverStream<SubscribeRequest>,
        metadata: BTreeMap<String, String>,
    ) -> std::result::Result<NotificationStream, TransportError> {
        let mut request = tonic::Request::new(requests);
        attach_metadata(request.metadata_mut(), &metadata)?;

        let response = self
            .inner
            .clone()
            .subscribe(request)
            .await
            .map_err(|status| TransportError::Rpc {
                method: SUBSCRIBE_METHOD,
                status,
            })?;
        debug!("gNMI Subscribe stream opened");
        Ok(Box::pin(response.into_inner()))
    }

    async fn get(
        &self,
        request: GetRequest,
        metadata: BTreeMap<String, String>,
    ) -> std::result::Result<GetResponse, TransportError> {
        let mut request = tonic::Request::new(request);
        attach_metadata(request.metadata_mut(), &metadata)?;
        if let Some(timeout) = self.request_timeout {
            request.set_timeout(timeout);
        }

        let response = self
            .inner
            .clone()
            .get(request)
            .await
            .map_err(|status| TransportError::Rpc {
                method: GET_METHOD,
                status,
            })?;
        Ok(response.into_inner())
    }
}

/// Copies request options metadata into outgoing gRPC metadata.
pub(crate) fn attach_metadata(
    target: &mut MetadataMap,
    metadata: &BTreeMap<String, String>,
) -> std::result::Result<(), TransportError> {
    for (key, value) in metadata {
        let name = MetadataKey::<Ascii>::from_bytes(key.as_bytes()).map_err(|e| TransportError::InvalidMetadata {
            key: key.clone(),
            message: e.to_string(),
        })?;
        let value = MetadataValue::<Ascii>::try_from(value.as_str()).map_err(|e| TransportError::InvalidMetadata {
            key: key.clone(),
            message: e.to_string(),
        })?;
        target.insert(name, value);
    }
    Ok(())
}

/// A named device reachable through one gNMI client.
#[derive(Clone)]
pub struct GrpcDevice {
    name: String,
    client: Arc<dyn GnmiClient>,
}

impl GrpcDevice {
    pub async fn connect(
        name: impl Into<String>,
        config: &TransportConfig,
    ) -> std::result::Result<Self, TransportError> {
        let client = GrpcGnmiClient::connect(config).await?;
        Ok(Self::with_client(name, Arc::new(client)))
    }

    /// Wraps an already built client, e.g. a fake in tests.
    pub fn with_client(
        name: impl Into<String>,
        client: Arc<dyn GnmiClient>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }
}

impl Device for GrpcDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn gnmi(&self) -> Arc<dyn GnmiClient> {
        self.client.clone()
    }
}

impl std::fmt::Debug for GrpcDevice {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("GrpcDevice").field("name", &self.name).finish()
    }
}
