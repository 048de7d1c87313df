//! Watchers and monitors wired to a live-fed client and a real cache.

use std::sync::Arc;
use std::time::Duration;

use gnmi_monitor::proto::gnmi::subscribe_request::Request;
use gnmi_monitor::proto::gnmi::SubscribeResponse;
use gnmi_monitor::proto::gnmi::TypedValue;
use gnmi_monitor::CachedConsumer;
use gnmi_monitor::Datasource;
use gnmi_monitor::GrpcDevice;
use gnmi_monitor::ListMode;
use gnmi_monitor::Monitor;
use gnmi_monitor::PathDescriptor;
use gnmi_monitor::QueryKind;
use gnmi_monitor::SubscriptionConfig;
use gnmi_monitor::WatchContext;
use gnmi_monitor::WatchOutcome;
use gnmi_monitor::WatchRequest;
use gnmi_monitor::Watcher;
use tokio_util::sync::CancellationToken;

use crate::common::enable_logger;
use crate::common::eventually;
use crate::common::notification;
use crate::common::update;
use crate::common::LiveClient;

fn context(
    client: Arc<LiveClient>,
    cache: Arc<CachedConsumer>,
) -> WatchContext {
    let device = Arc::new(GrpcDevice::with_client("dut", client));
    WatchContext::new(device, cache, SubscriptionConfig::default())
}

fn cached_values(
    cache: &CachedConsumer,
    key: &str,
) -> Vec<TypedValue> {
    cache
        .get(key)
        .map(|entry| entry.values.iter().filter_map(|p| p.value.clone()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_leaf_updates_flow_into_bounded_cache() {
    enable_logger();
    let client = LiveClient::new();
    let cache = Arc::new(CachedConsumer::new(Duration::from_secs(60), 2));
    let ctx = context(client.clone(), cache.clone());

    let token = CancellationToken::new();
    let request = WatchRequest::new(PathDescriptor::parse("/system/state/counter"), QueryKind::Leaf);
    let watcher = Watcher::start(&ctx, request, &token).await.unwrap();

    for v in 1..=3 {
        client.send(0, update("/system/state", &[("counter", v)]));
    }
    eventually(|| {
        cached_values(&cache, "/system/state/counter") == vec![TypedValue::uint(2), TypedValue::uint(3)]
    })
    .await;

    watcher.cancel();
    assert!(matches!(watcher.outcome().await, WatchOutcome::Cancelled));
    assert!(watcher.wait().await.unwrap());
}

#[tokio::test]
async fn test_subtree_exposes_nothing_before_sync() {
    enable_logger();
    let client = LiveClient::new();
    let cache = Arc::new(CachedConsumer::new(Duration::from_secs(60), 4));
    let ctx = context(client.clone(), cache.clone());

    let token = CancellationToken::new();
    let request = WatchRequest::new(PathDescriptor::parse("/interfaces"), QueryKind::Subtree);
    let watcher = Watcher::start(&ctx, request, &token).await.unwrap();

    client.send(
        0,
        SubscribeResponse::update(notification(
            "/interfaces/interface[name=eth0]/state",
            &[("in-octets", 10), ("out-octets", 20)],
            &[],
        )),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(cache.is_empty());

    client.send(0, SubscribeResponse::sync());
    eventually(|| cache.len() == 2).await;
    assert_eq!(
        cache.keys(),
        vec![
            "/interfaces/interface[name=eth0]/state/in-octets".to_string(),
            "/interfaces/interface[name=eth0]/state/out-octets".to_string(),
        ]
    );

    client.close(0);
    assert!(matches!(watcher.outcome().await, WatchOutcome::Completed));
}

#[tokio::test]
async fn test_monitor_feeds_one_cache_from_several_watches() {
    enable_logger();
    let client = LiveClient::new();
    let cache = Arc::new(CachedConsumer::new(Duration::from_secs(60), 1));
    let ctx = context(client.clone(), cache.clone());

    let monitor = Monitor::new(
        ctx,
        vec![
            WatchRequest::new(PathDescriptor::parse("/system/cpu"), QueryKind::Leaf),
            WatchRequest::new(PathDescriptor::parse("/system/memory"), QueryKind::Leaf),
        ],
    );
    let root = CancellationToken::new();
    let handle = monitor.start(&root).await.unwrap();
    assert_eq!(client.streams(), 2);
    assert_eq!(handle.paths().len(), 2);

    client.send(0, update("/system", &[("cpu", 40)]));
    client.send(1, update("/system", &[("memory", 512)]));
    eventually(|| cache.len() == 2).await;
    assert_eq!(cached_values(&cache, "/system/cpu"), vec![TypedValue::uint(40)]);
    assert_eq!(cached_values(&cache, "/system/memory"), vec![TypedValue::uint(512)]);

    handle.stop().await.unwrap();
    // Stopping twice is harmless
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_monitor_stop_reports_stream_failure() {
    enable_logger();
    let client = LiveClient::new();
    let cache = Arc::new(CachedConsumer::new(Duration::from_secs(60), 1));
    let ctx = context(client.clone(), cache.clone());

    let monitor = Monitor::new(
        ctx,
        vec![
            WatchRequest::new(PathDescriptor::parse("/a"), QueryKind::Leaf),
            WatchRequest::new(PathDescriptor::parse("/b"), QueryKind::Leaf),
        ],
    );
    let handle = monitor.start(&CancellationToken::new()).await.unwrap();

    client.fail(1, tonic::Status::unavailable("device rebooting"));
    // Let the failing watcher settle before it can be cancelled
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(handle.stop().await.is_err());
}

#[tokio::test]
async fn test_parent_cancellation_stops_every_watch() {
    enable_logger();
    let client = LiveClient::new();
    let cache = Arc::new(CachedConsumer::new(Duration::from_secs(60), 1));
    let ctx = context(client.clone(), cache);

    let root = CancellationToken::new();
    let a = Watcher::start(&ctx, WatchRequest::new(PathDescriptor::parse("/a"), QueryKind::Leaf), &root)
        .await
        .unwrap();
    let b = Watcher::start(&ctx, WatchRequest::new(PathDescriptor::parse("/b"), QueryKind::Leaf), &root)
        .await
        .unwrap();

    root.cancel();
    assert!(matches!(a.outcome().await, WatchOutcome::Cancelled));
    assert!(matches!(b.outcome().await, WatchOutcome::Cancelled));
    assert!(a.is_finished() && b.is_finished());
}

#[tokio::test]
async fn test_deadline_ends_a_quiet_watch() {
    enable_logger();
    let client = LiveClient::new();
    let cache = Arc::new(CachedConsumer::new(Duration::from_secs(60), 1));
    let ctx = context(client.clone(), cache);

    let request = WatchRequest::new(PathDescriptor::parse("/quiet"), QueryKind::Leaf)
        .with_timeout(Duration::from_millis(30));
    let watcher = Watcher::start(&ctx, request, &CancellationToken::new()).await.unwrap();

    assert!(matches!(watcher.outcome().await, WatchOutcome::TimedOut));
    assert!(!watcher.wait().await.unwrap());
}

#[tokio::test]
async fn test_poll_subscription_sends_poll_requests() {
    enable_logger();
    let client = LiveClient::new();
    let cache = Arc::new(CachedConsumer::new(Duration::from_secs(60), 4));
    let ctx = context(client.clone(), cache.clone());

    let request = WatchRequest::new(PathDescriptor::parse("/system/state/uptime"), QueryKind::Leaf)
        .with_list_mode(ListMode::Poll);
    let watcher = Watcher::start(&ctx, request, &CancellationToken::new()).await.unwrap();
    client.wait_for_requests(1).await;

    let poller = watcher.poller().expect("POLL watch has a poller");
    poller.poll().await.unwrap();
    poller.poll().await.unwrap();
    client.wait_for_requests(3).await;

    let requests = client.requests();
    assert!(matches!(requests[0].request, Some(Request::Subscribe(_))));
    assert!(requests[1..].iter().all(|r| matches!(r.request, Some(Request::Poll(_)))));

    client.send(0, update("/system/state", &[("uptime", 100)]));
    eventually(|| cached_values(&cache, "/system/state/uptime") == vec![TypedValue::uint(100)]).await;

    watcher.cancel();
    assert!(watcher.wait().await.unwrap());
}

#[tokio::test]
async fn test_once_with_get_for_config_completes_from_snapshot() {
    enable_logger();
    let client = LiveClient::with_config(vec![notification(
        "/system/config",
        &[("hostname-len", 7), ("mtu", 9000)],
        &[],
    )]);
    let cache = Arc::new(CachedConsumer::new(Duration::from_secs(60), 1));
    let ctx = context(client.clone(), cache.clone());

    let request = WatchRequest::new(
        PathDescriptor::parse("/system/config").use_get_for_config(true),
        QueryKind::Subtree,
    )
    .with_list_mode(ListMode::Once);
    let watcher = Watcher::start(&ctx, request, &CancellationToken::new()).await.unwrap();

    assert!(matches!(watcher.outcome().await, WatchOutcome::Completed));
    assert_eq!(client.streams(), 0);
    assert_eq!(cached_values(&cache, "/system/config/mtu"), vec![TypedValue::uint(9000)]);
    assert_eq!(cache.len(), 2);
}
