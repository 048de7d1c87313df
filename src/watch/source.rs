use std::collections::BTreeMap;

use futures::stream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::constants::REQUEST_CHANNEL_CAPACITY;
use crate::proto::gnmi;
use crate::proto::gnmi::get_request::DataType;
use crate::proto::gnmi::Encoding;
use crate::proto::gnmi::GetRequest;
use crate::proto::gnmi::SubscribeRequest;
use crate::proto::gnmi::SubscribeResponse;
use crate::proto::gnmi::Subscription;
use crate::proto::gnmi::SubscriptionList;
use crate::proto::gnmi::SubscriptionMode;
use crate::GnmiClient;
use crate::ListMode;
use crate::NotificationStream;
use crate::Path;
use crate::RequestOptions;
use crate::SubscriptionConfig;
use crate::TransportError;

/// Where a watch gets its notifications from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSource {
    /// A single Get of config data replayed as a finite stream
    OneShot,
    /// A Subscribe RPC
    Stream,
}

/// Everything needed to open a source for a set of paths.
#[derive(Debug, Clone)]
pub struct SourceRequest<'a> {
    /// Target placed in the request prefix
    pub target: &'a str,
    pub paths: &'a [Path],
    pub list_mode: ListMode,
    pub options: &'a RequestOptions,
    pub subscription: &'a SubscriptionConfig,
}

/// An opened source.
pub struct OpenedSource {
    pub responses: NotificationStream,
    // Keeps the client half of a Subscribe stream open
    requests: Option<mpsc::Sender<SubscribeRequest>>,
    list_mode: ListMode,
}

impl OpenedSource {
    /// Handle for sending poll requests. Only POLL subscriptions have one.
    pub fn poller(&self) -> Option<Poller> {
        match (&self.requests, self.list_mode) {
            (Some(tx), ListMode::Poll) => Some(Poller { tx: tx.clone() }),
            _ => None,
        }
    }
}

/// Triggers a new snapshot on a POLL subscription.
#[derive(Debug, Clone)]
pub struct Poller {
    tx: mpsc::Sender<SubscribeRequest>,
}

impl Poller {
    pub async fn poll(&self) -> std::result::Result<(), TransportError> {
        self.tx
            .send(SubscribeRequest::poll())
            .await
            .map_err(|e| TransportError::RequestSendFailure {
                request_type: "Poll",
                message: e.to_string(),
            })
    }
}

impl NotificationSource {
    /// A Get only serves ONCE subscriptions that asked for config data.
    pub fn select(
        options: &RequestOptions,
        list_mode: ListMode,
    ) -> Self {
        if options.use_get_for_config && list_mode == ListMode::Once {
            NotificationSource::OneShot
        } else {
            NotificationSource::Stream
        }
    }

    pub async fn open(
        self,
        client: &dyn GnmiClient,
        request: SourceRequest<'_>,
    ) -> std::result::Result<OpenedSource, TransportError> {
        let list = subscription_list(&request);
        let metadata = request.options.metadata.clone();
        match self {
            NotificationSource::OneShot => open_one_shot(client, list, metadata).await,
            NotificationSource::Stream => open_stream(client, list, metadata, request.list_mode).await,
        }
    }
}

pub(crate) fn subscription_list(request: &SourceRequest<'_>) -> SubscriptionList {
    let mode = request
        .options
        .subscription_mode
        .unwrap_or_else(|| request.subscription.sample_mode.to_proto());
    let sample_interval = if mode == SubscriptionMode::Sample {
        request.subscription.sample_interval_ns()
    } else {
        0
    };

    let subscription = request
        .paths
        .iter()
        .map(|path| Subscription {
            path: Some(gnmi::Path {
                target: String::new(),
                ..path.to_proto()
            }),
            mode: mode as i32,
            sample_interval,
            ..Default::default()
        })
        .collect();

    SubscriptionList {
        prefix: Some(gnmi::Path {
            target: request.target.to_string(),
            ..Default::default()
        }),
        subscription,
        mode: request.list_mode.to_proto() as i32,
        encoding: Encoding::Proto as i32,
        updates_only: request.subscription.updates_only,
        ..Default::default()
    }
}

async fn open_one_shot(
    client: &dyn GnmiClient,
    list: SubscriptionList,
    metadata: BTreeMap<String, String>,
) -> std::result::Result<OpenedSource, TransportError> {
    let get = GetRequest {
        prefix: list.prefix,
        path: list.subscription.into_iter().filter_map(|s| s.path).collect(),
        r#type: DataType::Config as i32,
        encoding: Encoding::JsonIetf as i32,
    };
    debug!(?get, "serving ONCE subscription with gNMI Get");
    let response = client.get(get, metadata).await?;

    let replay = response
        .notification
        .into_iter()
        .map(SubscribeResponse::update)
        .chain(std::iter::once(SubscribeResponse::sync()))
        .map(Ok::<_, tonic::Status>);

    Ok(OpenedSource {
        responses: stream::iter(replay).boxed(),
        requests: None,
        list_mode: ListMode::Once,
    })
}

async fn open_stream(
    client: &dyn GnmiClient,
    list: SubscriptionList,
    metadata: BTreeMap<String, String>,
    list_mode: ListMode,
) -> std::result::Result<OpenedSource, TransportError> {
    let (tx, rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
    debug!(?list, "sending gNMI SubscribeRequest");
    tx.send(SubscribeRequest::subscribe(list))
        .await
        .map_err(|e| TransportError::RequestSendFailure {
            request_type: "Subscribe",
            message: e.to_string(),
        })?;

    let responses = client.subscribe(ReceiverStream::new(rx), metadata).await?;
    Ok(OpenedSource {
        responses,
        requests: Some(tx),
        list_mode,
    })
}
