//! API Routes

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap},
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::{ApiResponse, UploadResponse};
use crate::photo_log_service::{Photo, JPEG_MIME};
use crate::state::AppState;

/// Default history page size
const DEFAULT_EVENT_LIMIT: usize = 500;
/// Debug view page size
const DEBUG_EVENT_LIMIT: usize = 20;
/// Default photo listing size
const DEFAULT_PHOTO_LIMIT: usize = 50;
/// Upload body limit
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Events
        .route("/api/events", get(list_events))
        .route("/api/events/stream", get(event_stream))
        .route("/api/debug/events", get(debug_events))
        // Photos
        .route(
            "/api/photos",
            get(list_photos)
                .post(upload_photo)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/photo/:id", get(get_photo))
        .with_state(state)
}

// ========================================
// Event Handlers
// ========================================

#[derive(Debug, Default, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    let events = state.events.list_recent(limit).await?;
    Ok(Json(ApiResponse::success(events)))
}

/// Last few events, unwrapped, for quick inspection
async fn debug_events(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let events = state.events.list_recent(DEBUG_EVENT_LIMIT).await?;
    Ok(Json(events))
}

/// Live stream: one `data:` JSON event per published event, no replay
async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>> {
    let subscription = state.realtime.subscribe();
    tracing::debug!(subscriber_id = %subscription.id(), "SSE stream opened");

    let stream = subscription.filter_map(|event| async move {
        match SseEvent::default().json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize event for SSE");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

// ========================================
// Photo Handlers
// ========================================

async fn list_photos(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_PHOTO_LIMIT);
    let photos = state.photos.list_summaries(limit).await?;
    Ok(Json(ApiResponse::success(photos)))
}

async fn get_photo(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    let photo = state.photos.get(id).await?;
    if photo.bytes.is_empty() {
        return Err(Error::NotFound(format!("photo {} has no image data", id)));
    }

    Ok((
        [
            (header::CONTENT_TYPE, photo.mime),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        photo.bytes,
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
struct UploadQuery {
    filename: Option<String>,
}

/// Store a raw image body straight into the photo log (no event is emitted)
async fn upload_photo(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    if body.is_empty() {
        return Err(Error::Validation("empty upload".to_string()));
    }

    let filename = query
        .filename
        .map(|f| sanitize_filename(&f))
        .filter(|f| !f.is_empty());
    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| v.starts_with("image/"))
        .map(str::to_string)
        .or_else(|| filename.as_deref().and_then(mime_from_filename).map(str::to_string))
        .ok_or_else(|| Error::Validation("upload is not an image".to_string()))?;

    let size = body.len();
    let photo = Photo::new(
        filename,
        mime,
        body.to_vec(),
        state.pipeline.recorder().clock().now_epoch(),
    );
    let id = state.photos.append(&photo).await?;

    tracing::info!(photo_id = id, size = size, "Photo uploaded");

    Ok(Json(ApiResponse::success(UploadResponse {
        id,
        photo_ref: crate::photo_log_service::photo_ref_for(id),
        size,
    })))
}

/// Keep only the final path component
fn sanitize_filename(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn mime_from_filename(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some(JPEG_MIME),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
