//! Timed callbacks driving a device while a watch observes it.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use gnmi_monitor::proto::gnmi::TypedValue;
use gnmi_monitor::BackgroundRunner;
use gnmi_monitor::CachedConsumer;
use gnmi_monitor::Datasource;
use gnmi_monitor::GrpcDevice;
use gnmi_monitor::ListMode;
use gnmi_monitor::PathDescriptor;
use gnmi_monitor::QueryKind;
use gnmi_monitor::SubscriptionConfig;
use gnmi_monitor::Trigger;
use gnmi_monitor::WatchContext;
use gnmi_monitor::WatchRequest;
use gnmi_monitor::Watcher;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::common::enable_logger;
use crate::common::eventually;
use crate::common::update;
use crate::common::LiveClient;

#[tokio::test]
async fn test_one_shot_change_is_observed_by_running_watch() {
    enable_logger();
    let client = LiveClient::new();
    let cache = Arc::new(CachedConsumer::new(Duration::from_secs(60), 4));
    let device = Arc::new(GrpcDevice::with_client("dut", client.clone()));
    let ctx = WatchContext::new(device, cache.clone(), SubscriptionConfig::default());

    let token = CancellationToken::new();
    let watcher = Watcher::start(
        &ctx,
        WatchRequest::new(PathDescriptor::parse("/interfaces/interface/state/oper-status"), QueryKind::Leaf),
        &token,
    )
    .await
    .unwrap();

    let runner = BackgroundRunner::new(token.child_token(), TaskTracker::new());
    let flapper = client.clone();
    runner.schedule("link flap", Trigger::After(Duration::from_millis(10)), move || {
        let client = flapper.clone();
        async move {
            client.send(0, update("/interfaces/interface/state", &[("oper-status", 2)]));
            Ok(())
        }
    })
    .unwrap();
    runner.wait().await;

    eventually(|| {
        cache
            .get("/interfaces/interface/state/oper-status")
            .and_then(|entry| entry.latest().and_then(|p| p.value.clone()))
            == Some(TypedValue::uint(2))
    })
    .await;

    token.cancel();
    assert!(watcher.wait().await.unwrap());
}

#[tokio::test]
async fn test_recurring_poller_until_shutdown() {
    enable_logger();
    let client = LiveClient::new();
    let cache = Arc::new(CachedConsumer::new(Duration::from_secs(60), 1));
    let device = Arc::new(GrpcDevice::with_client("dut", client.clone()));
    let ctx = WatchContext::new(device, cache, SubscriptionConfig::default());

    let token = CancellationToken::new();
    let watcher = Watcher::start(
        &ctx,
        WatchRequest::new(PathDescriptor::parse("/system/state"), QueryKind::Subtree).with_list_mode(ListMode::Poll),
        &token,
    )
    .await
    .unwrap();
    let poller = watcher.poller().cloned().expect("POLL watch has a poller");

    let runner = BackgroundRunner::new(CancellationToken::new(), TaskTracker::new());
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    runner.schedule("poll", Trigger::Every(Duration::from_millis(5)), move || {
        let poller = poller.clone();
        let counter = counter.clone();
        async move {
            poller.poll().await?;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
    .unwrap();

    eventually(|| polls.load(Ordering::SeqCst) >= 3).await;
    runner.shutdown();
    runner.wait().await;
    assert_eq!(runner.outstanding(), 0);

    let sent = polls.load(Ordering::SeqCst);
    // One subscription request plus every poll that went out
    client.wait_for_requests(sent + 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(polls.load(Ordering::SeqCst), sent);

    watcher.cancel();
    assert!(watcher.wait().await.unwrap());
}
