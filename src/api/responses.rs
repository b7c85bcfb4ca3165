//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::LifecycleEvent;

/// Body of POST /trackers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountRequest {
    pub course_id: String,
}

/// Body of POST /trackers/:id/navigate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavigateRequest {
    #[serde(default)]
    pub course_id: Option<String>,
}

/// Response to a page lifecycle signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleResponse {
    pub event: LifecycleEvent,
    pub trackers_notified: usize,
    pub timestamp: DateTime<Utc>,
}

impl LifecycleResponse {
    pub fn new(event: LifecycleEvent, trackers_notified: usize) -> Self {
        Self {
            event,
            trackers_notified,
            timestamp: Utc::now(),
        }
    }
}

/// Service status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub active_trackers: usize,
    pub store: String,
    pub key_prefix: String,
    pub tick_interval_ms: u64,
    pub flush_every: u32,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
