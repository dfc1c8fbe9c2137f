//! Test doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use crate::backoff::BackoffPolicy;
use crate::clock::ManualClock;
use crate::config::QueueConfig;
use crate::connectivity::ManualConnectivity;
use crate::error::{ApiError, StorageError};
use crate::executor::{ApiClient, ApiRequest, ApiResponse};
use crate::models::{ActionDescriptor, ActionPayload, MealEntry, MealType};
use crate::queue::OfflineQueue;
use crate::storage::{ActionStore, KvStore, MemoryKvStore};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn meal(description: &str) -> ActionDescriptor {
    let entry = MealEntry::new(
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        MealType::Lunch,
        description,
    );
    ActionDescriptor::new(ActionPayload::MealCreate(entry))
}

/// Polls `cond` until it holds, failing the test after five seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Deterministic backoff: 1s, 2s, 4s, ...
pub fn test_config() -> QueueConfig {
    QueueConfig::default().with_backoff(
        BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(300)).without_jitter(),
    )
}

#[derive(Default)]
struct Script {
    requests: Vec<ApiRequest>,
    next_failures: HashMap<Uuid, VecDeque<ApiError>>,
    always: HashMap<Uuid, ApiError>,
    in_flight: usize,
    max_in_flight: usize,
}

/// An [`ApiClient`] that succeeds unless told otherwise and records every
/// request it sees.
#[derive(Default)]
pub struct ScriptedApiClient {
    script: Mutex<Script>,
    latency: Duration,
}

impl ScriptedApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The next call for `id` fails with `err`. Calls queue up per id.
    pub fn fail_next(&self, id: Uuid, err: ApiError) {
        self.lock()
            .next_failures
            .entry(id)
            .or_default()
            .push_back(err);
    }

    pub fn fail_always(&self, id: Uuid, err: ApiError) {
        self.lock().always.insert(id, err);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Idempotency keys in call order.
    pub fn executed_ids(&self) -> Vec<Uuid> {
        self.lock()
            .requests
            .iter()
            .map(|r| r.idempotency_key)
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }
}

#[async_trait]
impl ApiClient for ScriptedApiClient {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let id = request.idempotency_key;
        let outcome = {
            let mut script = self.lock();
            script.requests.push(request);
            script.in_flight += 1;
            script.max_in_flight = script.max_in_flight.max(script.in_flight);

            let scripted = script
                .next_failures
                .get_mut(&id)
                .and_then(|failures| failures.pop_front());
            match scripted
                .or_else(|| script.always.get(&id).cloned())
            {
                Some(err) => Err(err),
                None => Ok(ApiResponse::ok()),
            }
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.lock().in_flight -= 1;
        outcome
    }
}

/// A [`MemoryKvStore`] whose reads or writes can be made to fail.
#[derive(Default)]
pub struct FlakyKvStore {
    inner: MemoryKvStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn injected(key: &str) -> StorageError {
        StorageError::io(
            format!("{}.json", key),
            std::io::Error::new(std::io::ErrorKind::Other, "injected failure"),
        )
    }
}

#[async_trait]
impl KvStore for FlakyKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::injected(key));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected(key));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected(key));
        }
        self.inner.remove(key).await
    }
}

/// A queue wired to in-memory doubles, online, with the clock at [`t0`].
pub struct Harness {
    pub queue: OfflineQueue,
    pub api: Arc<ScriptedApiClient>,
    pub clock: Arc<ManualClock>,
    pub connectivity: Arc<ManualConnectivity>,
    pub kv: Arc<FlakyKvStore>,
    config: QueueConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(test_config(), ScriptedApiClient::new())
    }

    pub fn with_config(config: QueueConfig) -> Self {
        Self::with(config, ScriptedApiClient::new())
    }

    pub fn with(config: QueueConfig, api: ScriptedApiClient) -> Self {
        let api = Arc::new(api);
        let clock = Arc::new(ManualClock::new(t0()));
        let connectivity = Arc::new(ManualConnectivity::new(true));
        let kv = Arc::new(FlakyKvStore::new());
        let queue = build(&kv, &api, &clock, &connectivity, config.clone());

        Self {
            queue,
            api,
            clock,
            connectivity,
            kv,
            config,
        }
    }

    /// A second queue over the same storage, as after a process restart.
    pub fn reopen(&self) -> OfflineQueue {
        build(
            &self.kv,
            &self.api,
            &self.clock,
            &self.connectivity,
            self.config.clone(),
        )
    }

    pub fn store(&self) -> ActionStore {
        ActionStore::new(self.kv.clone())
    }
}

fn build(
    kv: &Arc<FlakyKvStore>,
    api: &Arc<ScriptedApiClient>,
    clock: &Arc<ManualClock>,
    connectivity: &Arc<ManualConnectivity>,
    config: QueueConfig,
) -> OfflineQueue {
    OfflineQueue::builder(
        ActionStore::new(kv.clone()),
        api.clone(),
        connectivity.clone(),
    )
    .with_config(config)
    .with_clock(clock.clone())
    .build()
}
