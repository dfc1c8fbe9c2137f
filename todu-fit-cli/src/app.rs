//! Wires the offline queue from configuration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use todu_fit_offline::{
    ActionStore, ApiClient, ApiError, ApiRequest, ApiResponse, ConnectivityProvider, FileKvStore,
    HttpApiClient, HttpProbeConnectivity, KvStore, ManualConnectivity, OfflineQueue,
    SqliteKvStore, StorageError,
};

use crate::config::{Config, StorageBackend};

/// The queue plus the probe that decides whether it is online.
pub struct App {
    pub queue: OfflineQueue,
    pub probe: Option<Arc<HttpProbeConnectivity>>,
}

impl App {
    /// Opens the queue's storage and probes the server once, so the first
    /// command already knows whether it is online.
    pub async fn open(config: &Config) -> Result<Self, StorageError> {
        let data_dir = &config.data_dir.value;
        let kv: Arc<dyn KvStore> = match config.storage.value {
            StorageBackend::File => Arc::new(FileKvStore::new(data_dir.join("queue"))),
            StorageBackend::Sqlite => {
                Arc::new(SqliteKvStore::open(&data_dir.join("queue.db")).await?)
            }
        };

        let probe = match config.sync.health_url() {
            Some(health_url) => {
                let probe = Arc::new(HttpProbeConnectivity::new(
                    health_url,
                    Duration::from_millis(config.sync.probe_interval_ms),
                    Duration::from_millis(config.sync.probe_timeout_ms),
                ));
                probe.probe().await;
                Some(probe)
            }
            None => None,
        };

        let client: Arc<dyn ApiClient> = match &config.sync.server_url {
            Some(server_url) => Arc::new(HttpApiClient::new(server_url.clone())),
            None => Arc::new(DetachedApiClient),
        };
        let connectivity: Arc<dyn ConnectivityProvider> = match &probe {
            Some(probe) => probe.clone(),
            None => Arc::new(ManualConnectivity::new(false)),
        };

        let queue = OfflineQueue::builder(ActionStore::new(kv), client, connectivity)
            .with_config(config.queue.to_queue_config())
            .build();
        queue.refresh_status().await?;

        Ok(Self { queue, probe })
    }
}

/// Stands in for the remote API when no server is configured. The queue stays
/// offline in that case, so runs end before reaching it.
struct DetachedApiClient;

#[async_trait]
impl ApiClient for DetachedApiClient {
    async fn call(&self, _request: ApiRequest) -> Result<ApiResponse, ApiError> {
        Err(ApiError::Network("sync server not configured".to_string()))
    }
}
