//! Background driver: turns sync requests and elapsed backoff deadlines into
//! serialized runs.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{OfflineQueue, RunOutcome};
use crate::connectivity::ConnectivityMonitor;

/// Tasks spawned by [`OfflineQueue::start`].
pub struct SyncHandles {
    shutdown: watch::Sender<bool>,
    driver: JoinHandle<()>,
    monitor: JoinHandle<()>,
}

impl SyncHandles {
    /// Stops both tasks. A run in progress finishes its current action first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        self.monitor.abort();
        let _ = self.driver.await;
        let _ = self.monitor.await;
    }
}

impl OfflineQueue {
    /// Spawns the sync driver and the connectivity monitor on the current
    /// tokio runtime.
    pub fn start(&self) -> SyncHandles {
        let (shutdown, rx) = watch::channel(false);
        let driver = tokio::spawn(self.clone().drive(rx));
        let monitor = tokio::spawn(ConnectivityMonitor::new(self.clone()).run());

        SyncHandles {
            shutdown,
            driver,
            monitor,
        }
    }

    async fn drive(self, mut shutdown: watch::Receiver<bool>) {
        info!("sync driver started");

        // Pick up whatever a previous process left behind.
        if self.is_online() {
            self.request_sync();
        }

        loop {
            let wait = self.until_next_due().await;

            tokio::select! {
                _ = self.inner.sync_requested.notified() => {}
                _ = sleep_for(wait) => debug!("backoff elapsed"),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            if *shutdown.borrow() {
                break;
            }
            if !self.is_online() {
                debug!("offline, sync deferred until reconnect");
                continue;
            }

            match self.sync_now().await {
                Ok(RunOutcome::Completed(report)) if !report.errors.is_empty() => {
                    warn!(errors = report.errors.len(), "sync run reported errors");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "sync run failed"),
            }
        }

        info!("sync driver stopped");
    }

    /// Time until the earliest deferred action becomes eligible.
    async fn until_next_due(&self) -> Option<Duration> {
        let now = self.inner.clock.now();
        match self.inner.store.load_state().await {
            Ok(state) => state
                .next_due(now)
                .and_then(|due| (due - now).to_std().ok()),
            Err(e) => {
                warn!(error = %e, "failed to read queue for wake-up");
                None
            }
        }
    }
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending().await,
    }
}
