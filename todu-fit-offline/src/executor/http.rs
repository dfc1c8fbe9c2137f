//! `reqwest` implementation of [`ApiClient`].

use async_trait::async_trait;
use tracing::debug;

use super::api::{ApiClient, ApiRequest, ApiResponse};
use crate::error::ApiError;
use crate::models::HttpMethod;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Sends queued actions to a REST service rooted at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins the base URL and an endpoint, adding a scheme when missing.
    fn build_url(&self, endpoint: &str) -> String {
        let base = if self.base_url.starts_with("http://") || self.base_url.starts_with("https://")
        {
            self.base_url.clone()
        } else {
            format!("http://{}", self.base_url)
        };

        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

fn classify(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_builder() {
        ApiError::InvalidRequest(err.to_string())
    } else {
        ApiError::Network(err.to_string())
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.build_url(&request.endpoint);

        debug!(
            method = %request.method,
            url = %url,
            idempotency_key = %request.idempotency_key,
            "sending queued action"
        );

        let mut builder = self
            .http
            .request(request.method.into(), &url)
            .header(IDEMPOTENCY_HEADER, request.idempotency_key.to_string());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let text = response.text().await.map_err(classify)?;

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), text));
        }

        // Non-JSON bodies are kept verbatim.
        let body = if text.trim().is_empty() {
            None
        } else {
            Some(
                serde_json::from_str(&text)
                    .unwrap_or_else(|_| serde_json::Value::String(text)),
            )
        };

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}
