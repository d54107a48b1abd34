//! IngestPipeline - Device Signals to Events
//!
//! ## Responsibilities
//!
//! - Badge scans: access decision, feedback, `AccessGranted`/`AccessDenied`
//! - Motion edges: debounce, `MotionDetected`, photo capture launch
//! - Device sessions run under the supervisor
//!
//! ## Design
//!
//! The pipeline is the one service object shared by every task. Nothing here
//! is global; `main` builds it once and hands out `Arc`s.

mod recorder;

pub use recorder::EventRecorder;

use crate::access_table::{AccessDecision, AccessTable};
use crate::capture_orchestrator::CaptureOrchestrator;
use crate::device_adapters::{AccessOutcome, BadgeReader, DeviceError, MotionSensor};
use crate::event_normalizer::{Event, PartialEvent};
use crate::feedback_controller::{FeedbackController, FeedbackState};
use crate::motion_debounce::{DebounceEngine, MotionState, RearmPolicy, TriggerOutcome};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Result of feeding one motion edge to the pipeline
#[derive(Debug)]
pub enum MotionOutcome {
    /// Base event recorded, capture task launched
    Recorded(Event),
    /// Inside the cooldown window
    Suppressed { retry_in: Duration },
}

/// IngestPipeline instance
pub struct IngestPipeline {
    access: AccessTable,
    recorder: Arc<EventRecorder>,
    debounce: Mutex<DebounceEngine>,
    capture: CaptureOrchestrator,
    feedback: Arc<FeedbackController>,
}

impl IngestPipeline {
    pub fn new(
        access: AccessTable,
        recorder: Arc<EventRecorder>,
        debounce: DebounceEngine,
        capture: CaptureOrchestrator,
        feedback: Arc<FeedbackController>,
    ) -> Self {
        Self {
            access,
            recorder,
            debounce: Mutex::new(debounce),
            capture,
            feedback,
        }
    }

    pub fn recorder(&self) -> &Arc<EventRecorder> {
        &self.recorder
    }

    pub fn motion_state(&self) -> MotionState {
        self.engine().state()
    }

    pub fn rearm_policy(&self) -> RearmPolicy {
        self.engine().rearm_policy()
    }

    fn engine(&self) -> std::sync::MutexGuard<'_, DebounceEngine> {
        self.debounce.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Handle one scanned badge
    pub async fn handle_badge(&self, uid: &str) -> (AccessDecision, Event) {
        let decision = self.access.decide(uid);

        let state = if decision.is_granted() {
            FeedbackState::Positive
        } else {
            FeedbackState::Negative
        };
        self.feedback.signal(state).await;

        let event = self.recorder.record(PartialEvent::access(uid, &decision)).await;
        tracing::info!(
            uid = %uid,
            subject = decision.subject_name(),
            granted = decision.is_granted(),
            "Badge handled"
        );
        (decision, event)
    }

    /// Handle one rising motion edge observed at `now`
    ///
    /// The base event is recorded (id assigned, published) before the capture
    /// task is spawned, so its follow-up can never overtake it.
    pub async fn handle_motion(&self, now: Instant) -> MotionOutcome {
        let outcome = self.engine().on_rising_edge(now);

        match outcome {
            TriggerOutcome::Suppressed { since_last } => {
                let retry_in = self.engine().cooldown().saturating_sub(since_last);
                MotionOutcome::Suppressed { retry_in }
            }
            TriggerOutcome::Accepted { correlation_id } => {
                let event = self
                    .recorder
                    .record(PartialEvent::motion_detected(&correlation_id))
                    .await;
                // Detached on purpose; the handle is not awaited
                let _capture = self.capture.capture(correlation_id);
                MotionOutcome::Recorded(event)
            }
        }
    }

    /// Sensor cleared; allow the next episode
    pub fn rearm_motion(&self) {
        self.engine().rearm();
    }

    /// Badge session: scan, decide, acknowledge, repeat
    pub async fn run_badge_session<B: BadgeReader>(&self, mut reader: B) -> Result<(), DeviceError> {
        loop {
            let uid = reader.next_uid().await?;
            let (decision, _event) = self.handle_badge(&uid).await;
            reader.acknowledge(AccessOutcome::from(&decision)).await?;
        }
    }

    /// Motion session: wait for motion, debounce, re-arm per policy, repeat
    pub async fn run_motion_session<M: MotionSensor>(&self, mut sensor: M) -> Result<(), DeviceError> {
        loop {
            sensor.wait_for_motion().await?;

            match self.handle_motion(Instant::now()).await {
                MotionOutcome::Recorded(_) => {
                    if self.rearm_policy() == RearmPolicy::Cleared {
                        sensor.wait_for_no_motion().await?;
                        self.rearm_motion();
                    }
                }
                MotionOutcome::Suppressed { retry_in } => {
                    // Level stays high in cooldown mode; wait for the window to open
                    tokio::time::sleep(retry_in).await;
                }
            }
        }
    }
}
