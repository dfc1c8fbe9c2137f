//! Queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::BackoffPolicy;
use crate::models::{DEFAULT_MAX_RETRIES, DEFAULT_PRIORITY};

/// What to do when the server rejects an action with a 4xx.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientErrorPolicy {
    /// Treat like any other failure: back off and retry until the budget runs out.
    #[default]
    Retry,
    /// Quarantine on the first rejection; the retry budget is left untouched.
    Quarantine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    pub backoff: BackoffPolicy,
    /// Upper bound on a single remote call.
    pub action_timeout: Duration,
    pub default_priority: i32,
    pub default_max_retries: u32,
    pub client_errors: ClientErrorPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            action_timeout: Duration::from_secs(30),
            default_priority: DEFAULT_PRIORITY,
            default_max_retries: DEFAULT_MAX_RETRIES,
            client_errors: ClientErrorPolicy::default(),
        }
    }
}

impl QueueConfig {
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    pub fn with_default_max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries.max(1);
        self
    }

    pub fn with_default_priority(mut self, priority: i32) -> Self {
        self.default_priority = priority;
        self
    }

    pub fn with_client_errors(mut self, policy: ClientErrorPolicy) -> Self {
        self.client_errors = policy;
        self
    }
}
