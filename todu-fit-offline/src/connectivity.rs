//! Connectivity providers and the reconnect monitor.
//!
//! A provider publishes the online flag through a `watch` channel. The
//! [`ConnectivityMonitor`] follows that channel and asks the queue for a sync
//! run on every offline to online transition.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::queue::OfflineQueue;

pub trait ConnectivityProvider: Send + Sync {
    fn is_connected(&self) -> bool;

    /// A receiver that observes every change of the online flag.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Connectivity pushed in by the host, e.g. from a platform reachability
/// callback.
#[derive(Debug)]
pub struct ManualConnectivity {
    tx: watch::Sender<bool>,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// Records the current state. Subscribers are only woken on a change.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }
}

impl ConnectivityProvider for ManualConnectivity {
    fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Returns true if the server answers its health endpoint with a 2xx.
pub async fn check_server(http: &reqwest::Client, health_url: &str) -> bool {
    match http.get(health_url).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            debug!(url = health_url, error = %e, "health probe failed");
            false
        }
    }
}

/// Derives connectivity from periodically probing a health URL.
#[derive(Debug)]
pub struct HttpProbeConnectivity {
    state: ManualConnectivity,
    health_url: String,
    interval: Duration,
    http: reqwest::Client,
}

impl HttpProbeConnectivity {
    /// Starts out offline until the first probe says otherwise.
    pub fn new(health_url: impl Into<String>, interval: Duration, probe_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(probe_timeout)
            .build()
            .unwrap_or_default();
        Self {
            state: ManualConnectivity::new(false),
            health_url: health_url.into(),
            interval,
            http,
        }
    }

    pub fn health_url(&self) -> &str {
        &self.health_url
    }

    /// Probes once and records the result.
    pub async fn probe(&self) -> bool {
        let online = check_server(&self.http, &self.health_url).await;
        self.state.set_online(online);
        online
    }

    /// Probes on a fixed interval until the task is aborted.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                self.probe().await;
            }
        })
    }
}

impl ConnectivityProvider for HttpProbeConnectivity {
    fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

/// Requests a sync run whenever the device comes back online with work
/// waiting. Runs never overlap; the queue's single-flight guard absorbs any
/// flapping.
pub struct ConnectivityMonitor {
    queue: OfflineQueue,
    rx: watch::Receiver<bool>,
    online: bool,
}

impl ConnectivityMonitor {
    /// Captures the online flag now, so a transition that happens before
    /// [`run`](Self::run) is polled is still seen as a transition.
    pub fn new(queue: OfflineQueue) -> Self {
        let mut rx = queue.connectivity().subscribe();
        let online = *rx.borrow_and_update();
        Self { queue, rx, online }
    }

    /// Follows transitions until the provider goes away.
    pub async fn run(mut self) {
        let mut online = self.online;

        while self.rx.changed().await.is_ok() {
            let now_online = *self.rx.borrow_and_update();
            if now_online && !online {
                self.on_reconnect().await;
            } else if !now_online && online {
                info!("connectivity lost, queued actions will wait");
            }
            online = now_online;
        }

        debug!("connectivity provider closed, monitor stopping");
    }

    async fn on_reconnect(&self) {
        if self.queue.is_sync_in_progress() {
            debug!("back online during a sync run, nothing to request");
            return;
        }

        match self.queue.pending().await {
            Ok(pending) if pending.is_empty() => debug!("back online, queue is empty"),
            Ok(pending) => {
                info!(pending = pending.len(), "back online, requesting sync");
                self.queue.request_sync();
            }
            Err(e) => warn!(error = %e, "back online but failed to read queue"),
        }
    }
}
