//! Shared API models

use serde::{Deserialize, Serialize};

/// Generic API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub storage_ok: bool,
    pub event_count: usize,
    pub event_capacity: usize,
    pub photo_count: usize,
    pub photo_capacity: usize,
    pub subscribers: usize,
    pub published_events: u64,
    pub motion_state: String,
    pub feedback_state: String,
}

/// Photo upload result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: i64,
    pub photo_ref: String,
    pub size: usize,
}
