use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::warn;

use super::WatchContext;
use super::WatchOutcome;
use super::WatchRequest;
use super::Watcher;
use crate::Path;
use crate::Result;

/// A set of watches feeding one shared consumer.
pub struct Monitor {
    ctx: WatchContext,
    requests: Vec<WatchRequest>,
}

impl Monitor {
    pub fn new(
        ctx: WatchContext,
        requests: Vec<WatchRequest>,
    ) -> Self {
        Self { ctx, requests }
    }

    /// Starts one watcher per request under a child of `parent`.
    ///
    /// If any watcher fails to start, the ones already running are
    /// cancelled and the error is returned.
    pub async fn start(
        &self,
        parent: &CancellationToken,
    ) -> Result<MonitorHandle> {
        let token = parent.child_token();
        let mut watchers = Vec::with_capacity(self.requests.len());
        for request in &self.requests {
            match Watcher::start(&self.ctx, request.clone(), &token).await {
                Ok(watcher) => watchers.push(watcher),
                Err(e) => {
                    warn!("monitor start aborted: {e}");
                    token.cancel();
                    for watcher in &watchers {
                        watcher.outcome().await;
                    }
                    return Err(e);
                }
            }
        }
        info!(
            device = self.ctx.device().name(),
            watches = watchers.len(),
            "monitor started"
        );
        Ok(MonitorHandle {
            token,
            watchers: Mutex::new(watchers),
        })
    }
}

/// Running monitor.
#[derive(Debug)]
pub struct MonitorHandle {
    token: CancellationToken,
    watchers: Mutex<Vec<Watcher>>,
}

impl MonitorHandle {
    pub fn paths(&self) -> Vec<Path> {
        self.watchers.lock().iter().map(|w| w.path().clone()).collect()
    }

    /// Cancels every watcher and waits for them to settle. Returns the first
    /// failure, if any watcher failed before being stopped. Calling it again
    /// is a no-op.
    pub async fn stop(&self) -> Result<()> {
        self.token.cancel();
        let watchers = std::mem::take(&mut *self.watchers.lock());

        let mut first_failure = None;
        for watcher in watchers {
            if let WatchOutcome::Failed(e) = watcher.outcome().await {
                warn!(path = %watcher.path(), "watcher had failed: {e}");
                first_failure.get_or_insert(e);
            }
        }
        info!("monitor stopped");
        match first_failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
