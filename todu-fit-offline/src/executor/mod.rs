//! Action executor: turns a queued action into one bounded remote call.

mod api;
mod http;

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

pub use api::{ApiClient, ApiRequest, ApiResponse};
pub use http::{HttpApiClient, IDEMPOTENCY_HEADER};

use crate::error::ApiError;
use crate::models::{ActionPayload, QueuedAction};

#[derive(Clone)]
pub struct ActionExecutor {
    client: Arc<dyn ApiClient>,
    timeout: Duration,
}

impl ActionExecutor {
    pub fn new(client: Arc<dyn ApiClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Executes `action` once. A call that outlives the timeout is abandoned
    /// and reported as [`ApiError::Timeout`].
    pub async fn execute(&self, action: &QueuedAction) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest {
            endpoint: action.endpoint.clone(),
            method: action.method,
            body: request_body(&action.payload)?,
            idempotency_key: action.id,
        };

        match tokio::time::timeout(self.timeout, self.client.call(request)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(
                    action_id = %action.id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "action timed out"
                );
                Err(ApiError::Timeout)
            }
        }
    }
}

/// The JSON body sent for each kind. Deletes carry no body.
fn request_body(payload: &ActionPayload) -> Result<Option<serde_json::Value>, ApiError> {
    let encoded = match payload {
        ActionPayload::MealCreate(meal) | ActionPayload::MealUpdate(meal) => {
            serde_json::to_value(meal)
        }
        ActionPayload::ReminderCreate(reminder) | ActionPayload::ReminderUpdate(reminder) => {
            serde_json::to_value(reminder)
        }
        ActionPayload::MealDelete(_) | ActionPayload::ReminderDelete(_) => return Ok(None),
    };

    encoded
        .map(Some)
        .map_err(|e| ApiError::InvalidRequest(format!("failed to encode payload: {}", e)))
}
