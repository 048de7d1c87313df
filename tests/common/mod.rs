use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use gnmi_monitor::proto::gnmi;
use gnmi_monitor::proto::gnmi::GetRequest;
use gnmi_monitor::proto::gnmi::GetResponse;
use gnmi_monitor::proto::gnmi::Notification;
use gnmi_monitor::proto::gnmi::SubscribeRequest;
use gnmi_monitor::proto::gnmi::SubscribeResponse;
use gnmi_monitor::proto::gnmi::TypedValue;
use gnmi_monitor::proto::gnmi::Update;
use gnmi_monitor::GnmiClient;
use gnmi_monitor::NotificationStream;
use gnmi_monitor::TransportError;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::async_trait;
use tracing_subscriber::EnvFilter;

static LOGGER_INIT: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
}

type Feed = mpsc::UnboundedSender<Result<SubscribeResponse, tonic::Status>>;

/// gNMI client whose Subscribe streams are fed by the test.
///
/// Stream `i` belongs to the `i`-th Subscribe call. Every request the
/// watchers send is recorded.
#[derive(Default)]
pub struct LiveClient {
    feeds: Mutex<Vec<Feed>>,
    requests: Arc<Mutex<Vec<SubscribeRequest>>>,
    config: Mutex<Vec<Notification>>,
}

impl LiveClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Notifications returned by Get.
    pub fn with_config(notifications: Vec<Notification>) -> Arc<Self> {
        let client = Self::default();
        *client.config.lock() = notifications;
        Arc::new(client)
    }

    pub fn send(
        &self,
        stream: usize,
        response: SubscribeResponse,
    ) {
        if let Some(feed) = self.feeds.lock().get(stream) {
            let _ = feed.send(Ok(response));
        }
    }

    pub fn fail(
        &self,
        stream: usize,
        status: tonic::Status,
    ) {
        if let Some(feed) = self.feeds.lock().get(stream) {
            let _ = feed.send(Err(status));
        }
    }

    /// Ends stream `i` cleanly.
    pub fn close(
        &self,
        stream: usize,
    ) {
        if let Some(feed) = self.feeds.lock().get_mut(stream) {
            let (closed, _) = mpsc::unbounded_channel();
            *feed = closed;
        }
    }

    pub fn streams(&self) -> usize {
        self.feeds.lock().len()
    }

    pub fn requests(&self) -> Vec<SubscribeRequest> {
        self.requests.lock().clone()
    }

    pub async fn wait_for_requests(
        &self,
        n: usize,
    ) {
        eventually(|| self.requests.lock().len() >= n).await;
    }
}

#[async_trait]
impl GnmiClient for LiveClient {
    async fn subscribe(
        &self,
        mut requests: ReceiverStream<SubscribeRequest>,
        _metadata: BTreeMap<String, String>,
    ) -> Result<NotificationStream, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds.lock().push(tx);

        let log = self.requests.clone();
        tokio::spawn(async move {
            while let Some(request) = requests.next().await {
                log.lock().push(request);
            }
        });
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn get(
        &self,
        _request: GetRequest,
        _metadata: BTreeMap<String, String>,
    ) -> Result<GetResponse, TransportError> {
        Ok(GetResponse {
            notification: self.config.lock().clone(),
        })
    }
}

/// Polls `cond` until it holds, failing the test after five seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

pub fn wire_path(text: &str) -> gnmi::Path {
    gnmi::Path {
        elem: text
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|name| gnmi::PathElem {
                name: name.to_string(),
                key: Default::default(),
            })
            .collect(),
        ..Default::default()
    }
}

pub fn notification(
    prefix: &str,
    updates: &[(&str, u64)],
    deletes: &[&str],
) -> Notification {
    Notification {
        prefix: Some(wire_path(prefix)),
        update: updates
            .iter()
            .map(|(p, v)| Update {
                path: Some(wire_path(p)),
                val: Some(TypedValue::uint(*v)),
                duplicates: 0,
            })
            .collect(),
        delete: deletes.iter().map(|p| wire_path(p)).collect(),
        timestamp: 1,
        ..Default::default()
    }
}

pub fn update(
    prefix: &str,
    updates: &[(&str, u64)],
) -> SubscribeResponse {
    SubscribeResponse::update(notification(prefix, updates, &[]))
}
