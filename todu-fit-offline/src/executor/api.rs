//! The remote API seam.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::HttpMethod;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub endpoint: String,
    pub method: HttpMethod,
    pub body: Option<serde_json::Value>,
    /// The queued action's id. Repeated deliveries of one action share it.
    pub idempotency_key: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            status: 200,
            body: None,
        }
    }
}

/// Performs one remote call. Implementations classify every failure into an
/// [`ApiError`]; they do not retry on their own.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}
