use std::sync::Arc;

use futures::stream;
use futures::StreamExt;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use crate::network::MockGnmiClient;
use crate::proto::gnmi::SubscribeResponse;
use crate::Consumer;
use crate::DataPoint;
use crate::GrpcDevice;
use crate::NotificationStream;

static LOGGER_INIT: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
}

/// Consumer that keeps every batch it is handed.
#[derive(Default)]
pub struct RecordingConsumer {
    batches: Mutex<Vec<Vec<DataPoint>>>,
}

impl RecordingConsumer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn batches(&self) -> Vec<Vec<DataPoint>> {
        self.batches.lock().clone()
    }
}

impl Consumer for RecordingConsumer {
    fn process(
        &self,
        batch: Vec<DataPoint>,
    ) {
        self.batches.lock().push(batch);
    }
}

/// Stream yielding `items` and then ending.
pub fn finite_stream(items: Vec<Result<SubscribeResponse, tonic::Status>>) -> NotificationStream {
    stream::iter(items).boxed()
}

/// Stream yielding `items` and then staying open forever, like a live
/// subscription with nothing more to say.
pub fn open_stream(items: Vec<Result<SubscribeResponse, tonic::Status>>) -> NotificationStream {
    stream::iter(items).chain(stream::pending()).boxed()
}

/// Device whose client answers Subscribe once with `stream`.
pub fn device_with_stream(stream: NotificationStream) -> Arc<GrpcDevice> {
    let mut client = MockGnmiClient::new();
    let mut stream = Some(stream);
    client
        .expect_subscribe()
        .times(1)
        .returning(move |_, _| Ok(stream.take().unwrap_or_else(|| finite_stream(vec![]))));
    Arc::new(GrpcDevice::with_client("dut", Arc::new(client)))
}
