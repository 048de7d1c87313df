//! Background test runner.
//!
//! Schedules callbacks on a one-shot timer or a recurring ticker while a
//! test does other work, typically with watchers running. All tasks of a
//! runner share one [`TaskTracker`], so the whole group can be awaited
//! together.


use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::time::interval_at;
use tokio::time::sleep;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::Error;
use crate::PipelineMetrics;
use crate::Result;

/// When a scheduled callback runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Once, after the delay
    After(Duration),
    /// On every period until the runner is shut down; a tick that finds the
    /// previous run still in flight is skipped
    Every(Duration),
}

#[derive(Debug, Clone)]
pub struct BackgroundRunner {
    token: CancellationToken,
    tracker: TaskTracker,
    metrics: Option<PipelineMetrics>,
}

impl BackgroundRunner {
    /// `token` ends recurring loops and pending one-shot timers; `tracker`
    /// is the join primitive every scheduled task is spawned on.
    pub fn new(
        token: CancellationToken,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            token,
            tracker,
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

    /// Schedules `task`. Errors it returns are logged; panics are caught and
    /// logged. Either way the tracker is released.
    ///
    /// # Errors
    /// [`Error::ZeroPeriod`] for `Trigger::Every(Duration::ZERO)`; nothing
    /// is spawned.
    pub fn schedule<F, Fut>(
        &self,
        name: impl Into<String>,
        trigger: Trigger,
        task: F,
    ) -> Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        if trigger == Trigger::Every(Duration::ZERO) {
            return Err(Error::ZeroPeriod { task: name });
        }
        let token = self.token.clone();
        match trigger {
            Trigger::After(delay) => {
                self.tracker.spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {
                            debug!(task = %name, "runner shut down before one-shot fired");
                        }
                        _ = sleep(delay) => invoke(&name, task).await,
                    }
                });
            }
            Trigger::Every(period) => {
                let tracker = self.tracker.clone();
                let metrics = self.metrics.clone();
                let task = Arc::new(task);
                self.tracker.spawn(async move {
                    let gate = Arc::new(Semaphore::new(1));
                    let mut ticker = interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    loop {
                        tokio::select! {
                            _ = token.cancelled() => {
                                debug!(task = %name, "recurring task stopped");
                                return;
                            }
                            _ = ticker.tick() => {}
                        }

                        let Ok(permit) = gate.clone().try_acquire_owned() else {
                            warn!(task = %name, "previous run still in flight, skipping tick");
                            if let Some(metrics) = &metrics {
                                metrics.ticks_skipped.with_label_values(&[name.as_str()]).inc();
                            }
                            continue;
                        };
                        let task = task.clone();
                        let name = name.clone();
                        tracker.spawn(async move {
                            invoke(&name, || (*task)()).await;
                            drop(permit);
                        });
                    }
                });
            }
        }
        Ok(())
    }

    /// Stops recurring loops and pending one-shot timers. Runs already in
    /// flight complete.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Waits until every scheduled task has finished. Recurring tasks only
    /// finish after [`Self::shutdown`].
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Tasks currently tracked, including recurring loops.
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }
}

async fn invoke<F, Fut>(
    name: &str,
    task: F,
) where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    match AssertUnwindSafe(async { task().await }).catch_unwind().await {
        Ok(Ok(())) => debug!(task = name, "background task finished"),
        Ok(Err(e)) => error!("background task: {name} encountered an error: {e:?}"),
        Err(panic) => error!("background task: {name} panicked: {}", panic_message(&*panic)),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
