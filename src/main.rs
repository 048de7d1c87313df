use std::sync::Arc;

use gnmi_monitor::CachedConsumer;
use gnmi_monitor::Consumer;
use gnmi_monitor::DataPoint;
use gnmi_monitor::GrpcDevice;
use gnmi_monitor::Monitor;
use gnmi_monitor::MonitorConfig;
use gnmi_monitor::PathDescriptor;
use gnmi_monitor::PipelineMetrics;
use gnmi_monitor::Result;
use gnmi_monitor::WatchContext;
use gnmi_monitor::WatchRequest;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Logs every flushed batch before caching it.
struct LoggingConsumer {
    cache: Arc<CachedConsumer>,
}

impl Consumer for LoggingConsumer {
    fn process(
        &self,
        batch: Vec<DataPoint>,
    ) {
        for dp in batch.iter().filter(|dp| !dp.sync) {
            match &dp.value {
                Some(value) => info!(path = %dp.path, %value, "update"),
                None => info!(path = %dp.path, "delete"),
            }
        }
        self.cache.process(batch);
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    init_observability();

    let config = MonitorConfig::new()?.validate()?;
    let address = config.transport.require_address()?;
    if config.target.paths.is_empty() {
        error!("no target.paths configured, nothing to monitor");
        return Ok(());
    }

    let metrics = PipelineMetrics::new()?;
    metrics.register(prometheus::default_registry())?;

    let shutdown = CancellationToken::new();
    let cache = Arc::new(CachedConsumer::from_config(&config.cache).with_metrics(metrics.clone()));
    let sweeper = config
        .cache
        .sweep_interval()
        .map(|period| cache.spawn_sweeper(period, shutdown.clone()))
        .transpose()?;

    info!(address, "dialing device");
    let device = Arc::new(GrpcDevice::connect(config.target.name.clone(), &config.transport).await?);
    let consumer = Arc::new(LoggingConsumer { cache: cache.clone() });
    let ctx = WatchContext::new(device, consumer, config.subscription.clone()).with_metrics(metrics);

    let requests = config
        .target
        .paths
        .iter()
        .map(|p| {
            WatchRequest::new(PathDescriptor::parse(p.clone()).with_target(config.target.name.clone()), config.target.query)
                .with_list_mode(config.subscription.list_mode)
        })
        .collect();
    let handle = Monitor::new(ctx, requests).start(&shutdown).await?;

    info!("Application started. Waiting for CTRL+C signal...");
    if let Err(e) = graceful_shutdown().await {
        error!("Failed to wait for shutdown signal: {:?}", e);
    }

    let stopped = handle.stop().await;
    shutdown.cancel();
    if let Some(sweeper) = sweeper {
        if let Err(e) = sweeper.await {
            error!("cache sweeper ended abnormally: {:?}", e);
        }
    }
    info!(cached_paths = cache.len(), "Exiting program.");
    stopped
}

async fn graceful_shutdown() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }
    info!("Shutdown completed");
    Ok(())
}

fn init_observability() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
