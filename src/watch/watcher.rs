use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::sleep_until;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::DatapointBundler;
use super::Flush;
use super::NotificationDecoder;
use super::NotificationSource;
use super::OpenedSource;
use super::Poller;
use super::SourceRequest;
use crate::resolve_path;
use crate::Consumer;
use crate::Device;
use crate::ListMode;
use crate::NotificationStream;
use crate::Path;
use crate::PathDescriptor;
use crate::PipelineMetrics;
use crate::QueryKind;
use crate::Result;
use crate::SubscriptionConfig;
use crate::TransportError;
use crate::WatchFailure;

/// What to watch and for how long.
#[derive(Debug, Clone)]
pub struct WatchRequest {
    pub descriptor: PathDescriptor,
    /// Paths actually subscribed; the resolved descriptor path when empty
    pub sub_paths: Vec<Path>,
    pub query: QueryKind,
    pub list_mode: ListMode,
    pub deadline: Option<Instant>,
}

impl WatchRequest {
    pub fn new(
        descriptor: PathDescriptor,
        query: QueryKind,
    ) -> Self {
        Self {
            descriptor,
            sub_paths: Vec::new(),
            query,
            list_mode: ListMode::Stream,
            deadline: None,
        }
    }

    pub fn with_sub_paths(
        mut self,
        sub_paths: Vec<Path>,
    ) -> Self {
        self.sub_paths = sub_paths;
        self
    }

    pub fn with_list_mode(
        mut self,
        list_mode: ListMode,
    ) -> Self {
        self.list_mode = list_mode;
        self
    }

    pub fn with_deadline(
        mut self,
        deadline: Instant,
    ) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(
        self,
        timeout: Duration,
    ) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

/// Terminal state of a watcher.
#[derive(Debug, Clone)]
pub enum WatchOutcome {
    /// The stream ended cleanly, or a ONCE subscription delivered its batch
    Completed,
    /// The deadline passed first
    TimedOut,
    /// The watcher's token was cancelled
    Cancelled,
    Failed(WatchFailure),
}

impl WatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchOutcome::Completed => "completed",
            WatchOutcome::TimedOut => "timed_out",
            WatchOutcome::Cancelled => "cancelled",
            WatchOutcome::Failed(_) => "failed",
        }
    }
}

/// Shared collaborators of every watcher started against one device.
#[derive(Clone)]
pub struct WatchContext {
    device: Arc<dyn Device>,
    consumer: Arc<dyn Consumer>,
    subscription: SubscriptionConfig,
    metrics: Option<PipelineMetrics>,
}

impl WatchContext {
    pub fn new(
        device: Arc<dyn Device>,
        consumer: Arc<dyn Consumer>,
        subscription: SubscriptionConfig,
    ) -> Self {
        Self {
            device,
            consumer,
            subscription,
            metrics: None,
        }
    }

    pub fn with_metrics(
        mut self,
        metrics: PipelineMetrics,
    ) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }
}

/// Handle of a running watch.
///
/// Dropping it does not stop the pipeline; cancel it through
/// [`Watcher::cancel`] or the parent token.
#[derive(Debug)]
pub struct Watcher {
    path: Path,
    token: CancellationToken,
    poller: Option<Poller>,
    outcome: watch::Receiver<Option<WatchOutcome>>,
}

impl Watcher {
    /// Resolves the path, opens the source and spawns the pipeline.
    ///
    /// Resolution and open failures are returned here. Cancelling `parent`
    /// or reaching the deadline while the source is still opening yields a
    /// watcher that has already settled.
    pub async fn start(
        ctx: &WatchContext,
        request: WatchRequest,
        parent: &CancellationToken,
    ) -> Result<Watcher> {
        let (path, options) = resolve_path(&request.descriptor)?;
        let sub_paths = if request.sub_paths.is_empty() {
            vec![path.clone()]
        } else {
            request.sub_paths.clone()
        };
        let token = parent.child_token();
        let source = NotificationSource::select(&options, request.list_mode);
        let client = ctx.device.gnmi();

        let opening = source.open(
            client.as_ref(),
            SourceRequest {
                target: path.target(),
                paths: &sub_paths,
                list_mode: request.list_mode,
                options: &options,
                subscription: &ctx.subscription,
            },
        );
        // Settles early when cancelled or out of time while still opening
        let opened: std::result::Result<OpenedSource, WatchOutcome> = tokio::select! {
            opened = opening => Ok(opened?),
            _ = token.cancelled() => Err(WatchOutcome::Cancelled),
            _ = deadline_elapsed(request.deadline) => Err(WatchOutcome::TimedOut),
        };
        let opened = match opened {
            Ok(opened) => opened,
            Err(outcome) => return Ok(Watcher::settled(path.without_target(), token, outcome)),
        };

        let path = path.without_target();
        info!(%path, device = ctx.device.name(), ?source, list_mode = ?request.list_mode, "watch started");

        let (tx, rx) = watch::channel(None);
        let poller = opened.poller();
        let pipeline = Pipeline {
            decoder: NotificationDecoder::new(ctx.subscription.deletes_expected),
            bundler: DatapointBundler::new(request.query, request.list_mode),
            consumer: ctx.consumer.clone(),
            metrics: ctx.metrics.clone(),
        };
        let deadline = request.deadline;
        let task_token = token.clone();
        let task_path = path.clone();
        tokio::spawn(async move {
            let outcome = pipeline.run(opened, &task_token, deadline).await;
            match &outcome {
                WatchOutcome::Failed(e) => error!(path = %task_path, "watch failed: {e}"),
                other => info!(path = %task_path, outcome = other.as_str(), "watch finished"),
            }
            let _ = tx.send(Some(outcome));
        });

        Ok(Watcher {
            path,
            token,
            poller,
            outcome: rx,
        })
    }

    fn settled(
        path: Path,
        token: CancellationToken,
        outcome: WatchOutcome,
    ) -> Watcher {
        info!(%path, outcome = outcome.as_str(), "watch ended before the source opened");
        let (_tx, rx) = watch::channel(Some(outcome));
        Watcher {
            path,
            token,
            poller: None,
            outcome: rx,
        }
    }

    /// Path being watched, without target.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Poll trigger; only POLL subscriptions have one.
    pub fn poller(&self) -> Option<&Poller> {
        self.poller.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Waits for the terminal outcome. Every call returns the same value.
    pub async fn outcome(&self) -> WatchOutcome {
        let mut rx = self.outcome.clone();
        let settled = rx.wait_for(Option::is_some).await.ok().and_then(|v| v.clone());
        settled.unwrap_or_else(|| {
            WatchOutcome::Failed(WatchFailure::Aborted(format!(
                "watch of {} ended without an outcome",
                self.path
            )))
        })
    }

    /// `Ok(true)` when completed or cancelled, `Ok(false)` on timeout, the
    /// failure otherwise.
    pub async fn wait(&self) -> Result<bool> {
        match self.outcome().await {
            WatchOutcome::Completed | WatchOutcome::Cancelled => Ok(true),
            WatchOutcome::TimedOut => Ok(false),
            WatchOutcome::Failed(e) => Err(e.into()),
        }
    }
}

struct Pipeline {
    decoder: NotificationDecoder,
    bundler: DatapointBundler,
    consumer: Arc<dyn Consumer>,
    metrics: Option<PipelineMetrics>,
}

impl Pipeline {
    async fn run(
        mut self,
        opened: OpenedSource,
        token: &CancellationToken,
        deadline: Option<Instant>,
    ) -> WatchOutcome {
        let OpenedSource { mut responses, .. } = opened;
        let outcome = self.receive_until(&mut responses, token, deadline).await;
        if let Some(metrics) = &self.metrics {
            metrics.watch_outcomes.with_label_values(&[outcome.as_str()]).inc();
        }
        outcome
    }

    async fn receive_until(
        &mut self,
        responses: &mut NotificationStream,
        token: &CancellationToken,
        deadline: Option<Instant>,
    ) -> WatchOutcome {
        let deadline_elapsed = deadline_elapsed(deadline);
        tokio::pin!(deadline_elapsed);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return WatchOutcome::Cancelled,
                _ = &mut deadline_elapsed => return WatchOutcome::TimedOut,
                next = responses.next() => {
                    let response = match next {
                        None => return WatchOutcome::Completed,
                        Some(Ok(response)) => response,
                        Some(Err(status)) => {
                            // The transport may surface our own cancellation as an error
                            if token.is_cancelled() {
                                return WatchOutcome::Cancelled;
                            }
                            if deadline.is_some_and(|d| Instant::now() >= d) {
                                return WatchOutcome::TimedOut;
                            }
                            return WatchOutcome::Failed(TransportError::Receive(status).into());
                        }
                    };
                    if let Some(metrics) = &self.metrics {
                        let kind = if response.is_sync() { "sync" } else { "update" };
                        metrics.notifications_received.with_label_values(&[kind]).inc();
                    }

                    let decoded = match self.decoder.decode(response, SystemTime::now()) {
                        Ok(decoded) => decoded,
                        Err(e) => return WatchOutcome::Failed(e.into()),
                    };
                    if let Some(metrics) = &self.metrics {
                        metrics.datapoints_decoded.inc_by(decoded.points.len() as u64);
                    }

                    let flush = self.bundler.push(decoded);
                    let terminal = flush.is_terminal();
                    self.deliver(flush);
                    if terminal {
                        return WatchOutcome::Completed;
                    }
                }
            }
        }
    }

    fn deliver(
        &self,
        flush: Flush,
    ) {
        let batches = match flush {
            Flush::Batches(batches) => batches,
            Flush::Terminal(batch) => vec![batch],
        };
        for batch in batches.into_iter().filter(|b| !b.is_empty()) {
            debug!(size = batch.len(), "flushing batch");
            if let Some(metrics) = &self.metrics {
                metrics.batches_flushed.inc();
            }
            self.consumer.process(batch);
        }
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
