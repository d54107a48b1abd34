//! FeedbackController - Status LED with Auto-Revert
//!
//! ## Responsibilities
//!
//! - Map access outcomes and capture activity to an indicator color
//! - Revert Positive/Negative back to Idle after a fixed delay
//! - Last caller wins: a new signal cancels the pending revert
//!
//! ## Design
//!
//! State, generation counter and the pending revert task share one lock. A
//! revert timer only applies Idle if the generation it was armed with is still
//! current, so a timer that already woke up cannot undo a newer signal.

use crate::device_adapters::{Indicator, Rgb};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Default revert delay
pub const DEFAULT_REVERT_AFTER: Duration = Duration::from_millis(1000);

/// Indicator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackState {
    #[default]
    Idle,
    Positive,
    Negative,
    /// Capture in progress; cleared explicitly
    Busy,
}

impl FeedbackState {
    pub fn color(&self) -> Rgb {
        match self {
            FeedbackState::Idle => Rgb::BLUE,
            FeedbackState::Positive => Rgb::GREEN,
            FeedbackState::Negative => Rgb::RED,
            FeedbackState::Busy => Rgb::WHITE,
        }
    }

    fn auto_reverts(&self) -> bool {
        matches!(self, FeedbackState::Positive | FeedbackState::Negative)
    }
}

struct Inner {
    state: FeedbackState,
    generation: u64,
    revert: Option<JoinHandle<()>>,
}

/// FeedbackController instance
pub struct FeedbackController {
    indicator: Arc<dyn Indicator>,
    revert_after: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl FeedbackController {
    pub fn new(indicator: Arc<dyn Indicator>, revert_after: Duration) -> Self {
        Self {
            indicator,
            revert_after,
            inner: Arc::new(Mutex::new(Inner {
                state: FeedbackState::Idle,
                generation: 0,
                revert: None,
            })),
        }
    }

    /// Drive the indicator to the Idle color (call once at startup)
    pub async fn init(&self) {
        let _inner = self.inner.lock().await;
        apply(self.indicator.as_ref(), FeedbackState::Idle).await;
    }

    pub async fn state(&self) -> FeedbackState {
        self.inner.lock().await.state
    }

    /// Apply `state` now; Positive/Negative revert to Idle after the delay
    pub async fn signal(&self, state: FeedbackState) {
        let mut inner = self.inner.lock().await;

        if let Some(pending) = inner.revert.take() {
            pending.abort();
        }
        inner.generation += 1;
        inner.state = state;
        apply(self.indicator.as_ref(), state).await;

        if state.auto_reverts() {
            inner.revert = Some(self.arm_revert(inner.generation));
        }

        tracing::debug!(state = ?state, generation = inner.generation, "Feedback signalled");
    }

    pub async fn set_busy(&self) {
        self.signal(FeedbackState::Busy).await;
    }

    /// Leave Busy; a newer Positive/Negative is left alone
    pub async fn clear_busy(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state != FeedbackState::Busy {
            return;
        }

        inner.generation += 1;
        inner.state = FeedbackState::Idle;
        apply(self.indicator.as_ref(), FeedbackState::Idle).await;
    }

    /// Cancel any pending revert and switch the indicator off
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(pending) = inner.revert.take() {
            pending.abort();
        }
        inner.generation += 1;
        inner.state = FeedbackState::Idle;
        if let Err(e) = self.indicator.set_color(Rgb::OFF).await {
            tracing::warn!(error = %e, "Failed to switch indicator off");
        }
    }

    fn arm_revert(&self, generation: u64) -> JoinHandle<()> {
        let inner = self.inner.clone();
        let indicator = self.indicator.clone();
        let delay = self.revert_after;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut inner = inner.lock().await;
            if inner.generation != generation {
                return;
            }
            inner.state = FeedbackState::Idle;
            inner.revert = None;
            apply(indicator.as_ref(), FeedbackState::Idle).await;
            tracing::debug!(generation = generation, "Feedback reverted to idle");
        })
    }
}

async fn apply(indicator: &dyn Indicator, state: FeedbackState) {
    if let Err(e) = indicator.set_color(state.color()).await {
        tracing::warn!(state = ?state, error = %e, "Failed to set indicator color");
    }
}
