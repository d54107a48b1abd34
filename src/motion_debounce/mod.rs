//! MotionDebounce - Debounce & Correlation Engine
//!
//! ## Responsibilities
//!
//! - Suppress rising edges inside the cooldown window
//! - Issue a process-unique correlation id per accepted trigger
//! - Track the motion state (`Idle → Triggered → Cooldown → Idle`)
//!
//! The engine is a pure state machine driven by the caller's clock, so it is
//! tested without a sensor or real time. Emitting events and launching the
//! capture are the ingest pipeline's job.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Default cooldown between accepted triggers
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2);

/// Motion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    Idle,
    Triggered,
    /// Accepted trigger, waiting to re-arm
    Cooldown,
}

/// When an accepted episode returns to `Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RearmPolicy {
    /// Wait for the sensor's no-motion edge
    #[default]
    Cleared,
    /// Re-arm at once; only the cooldown window debounces
    Cooldown,
}

impl FromStr for RearmPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cleared" => Ok(RearmPolicy::Cleared),
            "cooldown" | "snappy" => Ok(RearmPolicy::Cooldown),
            other => Err(format!("unknown re-arm policy '{}'", other)),
        }
    }
}

/// Result of a rising edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Accepted { correlation_id: String },
    /// Inside the cooldown window; nothing is emitted
    Suppressed { since_last: Duration },
}

/// Correlation id generator (`motion-{millis}`, strictly increasing)
#[derive(Debug, Default)]
pub struct CorrelationIds {
    last_millis: AtomicI64,
}

impl CorrelationIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_millis.load(Ordering::Relaxed);
        let millis = loop {
            let next = now.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break next,
                Err(current) => last = current,
            }
        };
        format!("motion-{}", millis)
    }
}

/// DebounceEngine instance
#[derive(Debug)]
pub struct DebounceEngine {
    cooldown: Duration,
    rearm_policy: RearmPolicy,
    state: MotionState,
    last_accepted: Option<Instant>,
    ids: CorrelationIds,
}

impl DebounceEngine {
    pub fn new(cooldown: Duration, rearm_policy: RearmPolicy) -> Self {
        Self {
            cooldown,
            rearm_policy,
            state: MotionState::Idle,
            last_accepted: None,
            ids: CorrelationIds::new(),
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn rearm_policy(&self) -> RearmPolicy {
        self.rearm_policy
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Handle a rising edge observed at `now`
    ///
    /// The window is measured from the last accepted trigger, so a flood of
    /// suppressed edges never extends it.
    pub fn on_rising_edge(&mut self, now: Instant) -> TriggerOutcome {
        self.state = MotionState::Triggered;

        if let Some(last) = self.last_accepted {
            let since_last = now.saturating_duration_since(last);
            if since_last < self.cooldown {
                self.state = MotionState::Idle;
                tracing::debug!(since_last_ms = since_last.as_millis() as u64, "Motion suppressed (cooldown)");
                return TriggerOutcome::Suppressed { since_last };
            }
        }

        self.last_accepted = Some(now);
        let correlation_id = self.ids.next_id();

        self.state = match self.rearm_policy {
            RearmPolicy::Cleared => MotionState::Cooldown,
            RearmPolicy::Cooldown => MotionState::Idle,
        };

        tracing::info!(correlation_id = %correlation_id, "Motion trigger accepted");
        TriggerOutcome::Accepted { correlation_id }
    }

    /// Sensor reported no motion; return to `Idle`
    pub fn rearm(&mut self) {
        if self.state != MotionState::Idle {
            tracing::debug!("Motion re-armed");
        }
        self.state = MotionState::Idle;
    }
}

impl Default for DebounceEngine {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN, RearmPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(start: Instant, secs: f64) -> Instant {
        start + Duration::from_secs_f64(secs)
    }

    fn accepted(outcome: &TriggerOutcome) -> bool {
        matches!(outcome, TriggerOutcome::Accepted { .. })
    }

    #[test]
    fn test_cooldown_window_example() {
        let mut engine = DebounceEngine::new(Duration::from_secs_f64(2.0), RearmPolicy::Cooldown);
        let start = Instant::now();

        let outcomes: Vec<TriggerOutcome> = [0.0, 1.0, 2.5]
            .iter()
            .map(|t| engine.on_rising_edge(at(start, *t)))
            .collect();

        assert!(accepted(&outcomes[0]));
        assert!(!accepted(&outcomes[1]));
        assert!(accepted(&outcomes[2]));
    }

    #[test]
    fn test_suppressed_edges_do_not_extend_window() {
        let mut engine = DebounceEngine::new(Duration::from_secs(2), RearmPolicy::Cooldown);
        let start = Instant::now();

        assert!(accepted(&engine.on_rising_edge(at(start, 0.0))));
        assert!(!accepted(&engine.on_rising_edge(at(start, 1.5))));
        assert!(!accepted(&engine.on_rising_edge(at(start, 1.9))));
        assert!(accepted(&engine.on_rising_edge(at(start, 2.0))));
    }

    #[test]
    fn test_state_transitions_cleared_policy() {
        let mut engine = DebounceEngine::new(Duration::from_secs(2), RearmPolicy::Cleared);
        let start = Instant::now();
        assert_eq!(engine.state(), MotionState::Idle);

        engine.on_rising_edge(start);
        assert_eq!(engine.state(), MotionState::Cooldown);

        engine.rearm();
        assert_eq!(engine.state(), MotionState::Idle);

        engine.on_rising_edge(at(start, 0.5));
        assert_eq!(engine.state(), MotionState::Idle);
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let mut engine = DebounceEngine::new(Duration::ZERO, RearmPolicy::Cooldown);
        let start = Instant::now();

        let mut ids = std::collections::HashSet::new();
        for i in 0..500 {
            match engine.on_rising_edge(at(start, i as f64)) {
                TriggerOutcome::Accepted { correlation_id } => {
                    assert!(correlation_id.starts_with("motion-"));
                    assert!(ids.insert(correlation_id));
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_rearm_policy_parse() {
        assert_eq!("cleared".parse::<RearmPolicy>().unwrap(), RearmPolicy::Cleared);
        assert_eq!("Snappy".parse::<RearmPolicy>().unwrap(), RearmPolicy::Cooldown);
        assert!("sometimes".parse::<RearmPolicy>().is_err());
    }
}
