//! EventNormalizer - Defaults and Dual Timestamps
//!
//! ## Responsibilities
//!
//! - Turn a [`PartialEvent`] into a complete [`Event`]
//! - Stamp a human-readable wall time and a numeric epoch
//! - Keep epochs strictly increasing so ordering never ties
//!
//! Normalizing an already-normalized event is a no-op.

mod types;

pub use types::*;

use chrono::{DateTime, Local, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Wall-clock format (microsecond resolution)
pub const WALL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Strictly increasing microsecond clock
///
/// Two stamps taken within the same microsecond are separated by bumping the
/// later one forward, so epochs issued by one clock never collide.
#[derive(Debug, Default)]
pub struct EventClock {
    last_micros: AtomicI64,
}

impl EventClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next epoch in microseconds
    pub fn now_micros(&self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let mut last = self.last_micros.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_micros.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }

    /// Next epoch in float seconds
    pub fn now_epoch(&self) -> f64 {
        micros_to_epoch(self.now_micros())
    }
}

pub fn micros_to_epoch(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}

/// Local wall string for an epoch in float seconds
pub fn wall_from_epoch(epoch: f64) -> String {
    wall_from_micros((epoch * 1_000_000.0).round() as i64)
}

fn wall_from_micros(micros: i64) -> String {
    let local = DateTime::<Utc>::from_timestamp_micros(micros)
        .map(|utc| utc.with_timezone(&Local))
        .unwrap_or_else(Local::now);
    local.format(WALL_FORMAT).to_string()
}

/// EventNormalizer instance
#[derive(Debug, Default)]
pub struct EventNormalizer {
    clock: EventClock,
}

impl EventNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock(&self) -> &EventClock {
        &self.clock
    }

    /// Fill every missing field and return a complete event
    ///
    /// - missing kind → [`EventKind::Unknown`] (never an error)
    /// - missing or empty wall time / non-positive epoch → stamped now;
    ///   a supplied epoch alone also determines the wall string
    /// - empty strings in optional fields are treated as absent
    pub fn normalize(&self, partial: PartialEvent) -> Event {
        let PartialEvent {
            id,
            kind,
            created_at_wall,
            created_at_epoch,
            subject_id,
            subject_name,
            photo_ref,
            correlation_id,
        } = partial;

        let wall = non_empty(created_at_wall);
        let epoch = created_at_epoch.filter(|e| e.is_finite() && *e > 0.0);

        let (created_at_wall, created_at_epoch) = match (wall, epoch) {
            (Some(wall), Some(epoch)) => (wall, epoch),
            (None, Some(epoch)) => (wall_from_epoch(epoch), epoch),
            (Some(wall), None) => (wall, self.clock.now_epoch()),
            (None, None) => {
                let micros = self.clock.now_micros();
                (wall_from_micros(micros), micros_to_epoch(micros))
            }
        };

        let kind = kind.unwrap_or_else(|| {
            tracing::debug!("Event without kind normalized as Unknown");
            EventKind::Unknown
        });

        Event {
            id,
            kind,
            created_at_wall,
            created_at_epoch,
            subject_id: non_empty(subject_id),
            subject_name: non_empty(subject_name),
            photo_ref: non_empty(photo_ref),
            correlation_id: non_empty(correlation_id),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_table::AccessDecision;

    #[test]
    fn test_empty_partial_gets_defaults() {
        let normalizer = EventNormalizer::new();
        let event = normalizer.normalize(PartialEvent::default());

        assert_eq!(event.kind(), EventKind::Unknown);
        assert_eq!(event.id(), None);
        assert!(event.subject_id().is_none());
        assert!(event.subject_name().is_none());
        assert!(event.photo_ref().is_none());
        assert!(event.correlation_id().is_none());
        assert!(event.created_at_epoch() > 0.0);
        assert!(!event.created_at_wall().is_empty());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = EventNormalizer::new();
        let decision = AccessDecision::Grant("Alice".to_string());
        let event = normalizer.normalize(PartialEvent::access("AAAA", &decision));

        let again = normalizer.normalize(event.clone().into_partial());
        assert_eq!(again, event);
    }

    #[test]
    fn test_access_partial_maps_decision() {
        let normalizer = EventNormalizer::new();
        let denied = normalizer.normalize(PartialEvent::access(
            "ZZZZ",
            &AccessDecision::Deny("Unknown".to_string()),
        ));

        assert_eq!(denied.kind(), EventKind::AccessDenied);
        assert_eq!(denied.subject_id(), Some("ZZZZ"));
        assert_eq!(denied.subject_name(), Some("Unknown"));
    }

    #[test]
    fn test_epochs_strictly_increase() {
        let normalizer = EventNormalizer::new();
        let mut last = 0.0;
        for _ in 0..1000 {
            let event = normalizer.normalize(PartialEvent::motion_detected("motion-1"));
            assert!(event.created_at_epoch() > last);
            last = event.created_at_epoch();
        }
    }

    #[test]
    fn test_supplied_epoch_derives_wall() {
        let normalizer = EventNormalizer::new();
        let event = normalizer.normalize(PartialEvent {
            created_at_epoch: Some(1_700_000_000.25),
            ..Default::default()
        });

        assert_eq!(event.created_at_epoch(), 1_700_000_000.25);
        assert!(event.created_at_wall().ends_with(".250000"));
    }

    #[test]
    fn test_empty_correlation_id_is_absent() {
        let normalizer = EventNormalizer::new();
        let event = normalizer.normalize(PartialEvent::motion_detected(""));
        assert!(event.correlation_id().is_none());
    }

    #[test]
    fn test_unknown_kind_string_decodes_as_unknown() {
        let partial: PartialEvent =
            serde_json::from_str(r#"{"kind":"RFID","subject_id":"AAAA"}"#).unwrap();
        assert_eq!(partial.kind, Some(EventKind::Unknown));
        assert_eq!(partial.subject_id.as_deref(), Some("AAAA"));
    }

    #[test]
    fn test_assign_id_is_write_once() {
        let normalizer = EventNormalizer::new();
        let mut event = normalizer.normalize(PartialEvent::default());
        event.assign_id(7);
        event.assign_id(9);
        assert_eq!(event.id(), Some(7));
    }
}
