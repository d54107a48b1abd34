//! Event types

use crate::access_table::AccessDecision;
use serde::{Deserialize, Serialize};

/// Event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    AccessGranted,
    AccessDenied,
    MotionDetected,
    MotionPhotoReady,
    /// Kind string not recognised when decoding
    #[serde(other)]
    Unknown,
}

impl EventKind {
    /// Convert to string for logging/storage labels
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AccessGranted => "AccessGranted",
            EventKind::AccessDenied => "AccessDenied",
            EventKind::MotionDetected => "MotionDetected",
            EventKind::MotionPhotoReady => "MotionPhotoReady",
            EventKind::Unknown => "Unknown",
        }
    }
}

/// Event as produced by callers or decoded from storage, before normalization
///
/// Every field is optional. Decoding is lenient: missing fields default to
/// `None` and an unrecognised kind string becomes [`EventKind::Unknown`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialEvent {
    pub id: Option<i64>,
    pub kind: Option<EventKind>,
    pub created_at_wall: Option<String>,
    pub created_at_epoch: Option<f64>,
    pub subject_id: Option<String>,
    pub subject_name: Option<String>,
    pub photo_ref: Option<String>,
    pub correlation_id: Option<String>,
}

impl PartialEvent {
    /// Badge scan outcome
    pub fn access(uid: &str, decision: &AccessDecision) -> Self {
        let kind = if decision.is_granted() {
            EventKind::AccessGranted
        } else {
            EventKind::AccessDenied
        };

        Self {
            kind: Some(kind),
            subject_id: Some(uid.to_string()),
            subject_name: Some(decision.subject_name().to_string()),
            ..Default::default()
        }
    }

    /// Accepted motion trigger
    pub fn motion_detected(correlation_id: &str) -> Self {
        Self {
            kind: Some(EventKind::MotionDetected),
            correlation_id: Some(correlation_id.to_string()),
            ..Default::default()
        }
    }

    /// Outcome of the capture attempt for a motion trigger
    ///
    /// `photo_ref` is `None` when the capture did not materialize.
    pub fn photo_ready(correlation_id: &str, photo_ref: Option<String>) -> Self {
        Self {
            kind: Some(EventKind::MotionPhotoReady),
            correlation_id: Some(correlation_id.to_string()),
            photo_ref,
            ..Default::default()
        }
    }
}

/// Normalized event
///
/// Only [`EventNormalizer::normalize`](super::EventNormalizer::normalize)
/// builds these; the log assigns `id` on insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub(super) id: Option<i64>,
    pub(super) kind: EventKind,
    pub(super) created_at_wall: String,
    pub(super) created_at_epoch: f64,
    pub(super) subject_id: Option<String>,
    pub(super) subject_name: Option<String>,
    pub(super) photo_ref: Option<String>,
    pub(super) correlation_id: Option<String>,
}

impl Event {
    /// Log-assigned id; `None` if the event was never persisted
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn created_at_wall(&self) -> &str {
        &self.created_at_wall
    }

    pub fn created_at_epoch(&self) -> f64 {
        self.created_at_epoch
    }

    pub fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref()
    }

    pub fn subject_name(&self) -> Option<&str> {
        self.subject_name.as_deref()
    }

    pub fn photo_ref(&self) -> Option<&str> {
        self.photo_ref.as_deref()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Record the id assigned by the event log
    ///
    /// Ids are immutable once assigned; a second call is ignored.
    pub(crate) fn assign_id(&mut self, id: i64) {
        if self.id.is_none() {
            self.id = Some(id);
        }
    }

    /// Back to the partial form (for storage and re-normalization)
    pub fn into_partial(self) -> PartialEvent {
        PartialEvent {
            id: self.id,
            kind: Some(self.kind),
            created_at_wall: Some(self.created_at_wall),
            created_at_epoch: Some(self.created_at_epoch),
            subject_id: self.subject_id,
            subject_name: self.subject_name,
            photo_ref: self.photo_ref,
            correlation_id: self.correlation_id,
        }
    }
}
