//! Device task supervisor
//!
//! One long-lived loop per input device: connect, run a session until it
//! fails, back off, reconnect. Transient faults are retried forever with a
//! capped exponential delay; a fatal fault ends only this device's task.

use super::{DeviceConnector, DeviceError};
use std::future::Future;
use std::time::Duration;

/// Backoff settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(30))
    }
}

/// Run `session` against freshly connected devices until a fatal error
///
/// A session that returns `Ok(())` ended on its own (e.g. the device closed
/// cleanly); the supervisor reconnects after the initial delay.
pub async fn run_supervised<C, F, Fut>(connector: C, policy: RetryPolicy, mut session: F)
where
    C: DeviceConnector,
    F: FnMut(C::Device) -> Fut,
    Fut: Future<Output = Result<(), DeviceError>>,
{
    let name = connector.name();
    let mut delay = policy.initial;

    loop {
        let result = match connector.connect().await {
            Ok(device) => {
                tracing::info!(device = name, "Device connected");
                delay = policy.initial;
                session(device).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!(device = name, "Device session ended, reconnecting");
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    device = name,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "Device fault, retrying"
                );
            }
            Err(e) => {
                tracing::error!(device = name, error = %e, "Fatal device fault, task stopped");
                return;
            }
        }

        tokio::time::sleep(delay).await;
        delay = policy.next_delay(delay);
    }
}
