//! CaptureOrchestrator - Photo for a Motion Trigger
//!
//! ## Responsibilities
//!
//! - Run one detached capture task per accepted motion trigger
//! - Store the image in the photo log
//! - Record exactly one `MotionPhotoReady` event under the trigger's
//!   correlation id, with a null photo reference when nothing was stored
//!
//! Capture tasks are not supervised or retried. The returned `JoinHandle` may
//! be dropped; the task keeps running until the camera answers or times out.

use crate::error::Result;
use crate::event_normalizer::PartialEvent;
use crate::feedback_controller::FeedbackController;
use crate::ingest_pipeline::EventRecorder;
use crate::photo_log_service::{photo_ref_for, Photo, PhotoLog};
use crate::snapshot_service::{Camera, CaptureError};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default capture timeout
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(15);

/// CaptureOrchestrator instance
#[derive(Clone)]
pub struct CaptureOrchestrator {
    camera: Arc<dyn Camera>,
    photos: PhotoLog,
    recorder: Arc<EventRecorder>,
    feedback: Arc<FeedbackController>,
    timeout: Duration,
}

impl CaptureOrchestrator {
    pub fn new(
        camera: Arc<dyn Camera>,
        photos: PhotoLog,
        recorder: Arc<EventRecorder>,
        feedback: Arc<FeedbackController>,
        timeout: Duration,
    ) -> Self {
        Self {
            camera,
            photos,
            recorder,
            feedback,
            timeout,
        }
    }

    /// Start the capture for `correlation_id` in the background
    pub fn capture(&self, correlation_id: String) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let photo_ref = match this.capture_and_store().await {
                Ok(photo_ref) => Some(photo_ref),
                Err(e) => {
                    tracing::warn!(
                        correlation_id = %correlation_id,
                        error = %e,
                        "Motion photo not captured"
                    );
                    None
                }
            };

            this.recorder
                .record(PartialEvent::photo_ready(&correlation_id, photo_ref))
                .await;
        })
    }

    async fn capture_and_store(&self) -> Result<String> {
        self.feedback.set_busy().await;
        let captured = tokio::time::timeout(self.timeout, self.camera.capture_now()).await;
        self.feedback.clear_busy().await;

        let bytes = match captured {
            Ok(Ok(bytes)) if bytes.is_empty() => return Err(CaptureError::Empty.into()),
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(CaptureError::Timeout(self.timeout).into()),
        };

        let filename = Local::now().format("motion_%Y-%m-%d_%H-%M-%S.jpg").to_string();
        let photo = Photo::new(
            Some(filename),
            self.camera.mime(),
            bytes,
            self.recorder.clock().now_epoch(),
        );

        let id = self.photos.append(&photo).await?;
        tracing::info!(photo_id = id, size = photo.bytes.len(), "Motion photo stored");
        Ok(photo_ref_for(id))
    }
}
