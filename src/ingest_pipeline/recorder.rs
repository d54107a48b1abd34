//! Event recorder
//!
//! Single entry point for every producer: normalize, append, publish. The
//! three steps run under one lock so epochs, ids and live delivery all follow
//! the same order.

use crate::event_log_service::EventLog;
use crate::event_normalizer::{Event, EventClock, EventNormalizer, PartialEvent};
use crate::realtime_hub::RealtimeHub;
use std::sync::Arc;
use tokio::sync::Mutex;

/// EventRecorder instance
pub struct EventRecorder {
    normalizer: EventNormalizer,
    events: EventLog,
    hub: Arc<RealtimeHub>,
    ingest_lock: Mutex<()>,
}

impl EventRecorder {
    pub fn new(events: EventLog, hub: Arc<RealtimeHub>) -> Self {
        Self {
            normalizer: EventNormalizer::new(),
            events,
            hub,
            ingest_lock: Mutex::new(()),
        }
    }

    pub fn clock(&self) -> &EventClock {
        self.normalizer.clock()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Normalize, persist and broadcast one event
    ///
    /// Ids come from the log only; a caller-supplied id is discarded. A
    /// storage fault is logged and the event is still broadcast, with no id.
    pub async fn record(&self, partial: PartialEvent) -> Event {
        let partial = PartialEvent { id: None, ..partial };
        let _guard = self.ingest_lock.lock().await;

        let mut event = self.normalizer.normalize(partial);
        match self.events.append(&event).await {
            Ok(id) => event.assign_id(id),
            Err(e) => {
                tracing::error!(
                    kind = event.kind().as_str(),
                    error = %e,
                    "Failed to persist event, broadcasting without id"
                );
            }
        }

        self.hub.publish(&event);

        tracing::info!(
            event_id = ?event.id(),
            kind = event.kind().as_str(),
            correlation_id = ?event.correlation_id(),
            "Event recorded"
        );
        event
    }
}
