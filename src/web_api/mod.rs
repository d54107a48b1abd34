//! WebAPI - REST + SSE Endpoints
//!
//! ## Responsibilities
//!
//! - Event history and live event stream
//! - Photo listing, fetch and upload
//! - Health reporting
//!
//! HTML rendering is left to a separate frontend.

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let event_count = state.events.count().await;
    let photo_count = state.photos.count().await;
    let storage_ok = event_count.is_ok() && photo_count.is_ok();

    let response = HealthResponse {
        status: if storage_ok { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        storage_ok,
        event_count: event_count.unwrap_or(0),
        event_capacity: state.events.capacity(),
        photo_count: photo_count.unwrap_or(0),
        photo_capacity: state.photos.capacity(),
        subscribers: state.realtime.subscriber_count(),
        published_events: state.realtime.published_count(),
        motion_state: format!("{:?}", state.pipeline.motion_state()),
        feedback_state: format!("{:?}", state.feedback.state().await),
    };

    Json(response)
}
