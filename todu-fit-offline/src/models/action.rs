use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::payload::ActionPayload;

/// Priority given to actions that do not ask for one. Lower runs first.
pub const DEFAULT_PRIORITY: i32 = 5;
/// Attempts allowed before an action is quarantined.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(format!("Invalid HTTP method '{}'", s)),
        }
    }
}

/// A mutation intent as handed to the enqueuer.
///
/// Only the payload is required; endpoint and method default to the payload's
/// route, priority and retry budget to the queue configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDescriptor {
    pub payload: ActionPayload,
    pub endpoint: Option<String>,
    pub method: Option<HttpMethod>,
    pub priority: Option<i32>,
    pub max_retries: Option<u32>,
}

impl ActionDescriptor {
    pub fn new(payload: ActionPayload) -> Self {
        Self {
            payload,
            endpoint: None,
            method: None,
            priority: None,
            max_retries: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Every action gets at least one attempt; 0 is raised to 1 when stamped.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

impl From<ActionPayload> for ActionDescriptor {
    fn from(payload: ActionPayload) -> Self {
        Self::new(payload)
    }
}

/// A durable, replayable mutation intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedAction {
    pub id: Uuid,
    #[serde(flatten)]
    pub payload: ActionPayload,
    pub endpoint: String,
    pub method: HttpMethod,
    pub retry_count: u32,
    pub max_retries: u32,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl QueuedAction {
    /// Stamps a descriptor into a fresh action.
    pub fn from_descriptor(
        descriptor: ActionDescriptor,
        now: DateTime<Utc>,
        default_priority: i32,
        default_max_retries: u32,
    ) -> Self {
        let (route_endpoint, route_method) = descriptor.payload.default_route();
        Self {
            id: Uuid::new_v4(),
            endpoint: descriptor.endpoint.unwrap_or(route_endpoint),
            method: descriptor.method.unwrap_or(route_method),
            payload: descriptor.payload,
            retry_count: 0,
            max_retries: descriptor
                .max_retries
                .unwrap_or(default_max_retries)
                .max(1),
            priority: descriptor.priority.unwrap_or(default_priority),
            created_at: now,
            scheduled_for: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// True once any backoff delay has elapsed.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for.map_or(true, |at| at <= now)
    }

    /// Execution order: priority, then creation time, then id.
    pub fn execution_order(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// The quarantine reset: fresh retry budget, no backoff, everything else kept.
    pub fn revived(mut self) -> Self {
        self.retry_count = 0;
        self.scheduled_for = None;
        self
    }
}
