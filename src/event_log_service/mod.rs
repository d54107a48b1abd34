//! EventLogService - Event Recording
//!
//! ## Responsibilities
//!
//! - Encode normalized events for the bounded log
//! - Decode stored rows leniently (corrupt payloads become empty events)
//! - Provide the event log type used by the pipeline and the web API

use crate::bounded_log::{BoundedLog, LogEntry, LogRecord, NewEntry};
use crate::error::Result;
use crate::event_normalizer::{Event, EventNormalizer, PartialEvent};

/// Default event log capacity
pub const DEFAULT_MAX_EVENTS: usize = 250;

/// Event log
pub type EventLog = BoundedLog<Event>;

const CONTENT_TYPE: &str = "application/json";

impl LogRecord for Event {
    const NAME: &'static str = "event";

    fn to_entry(&self) -> Result<NewEntry> {
        let mut partial = self.clone().into_partial();
        // The row id is authoritative
        partial.id = None;

        Ok(NewEntry {
            created_at: self.created_at_wall().to_string(),
            created_at_epoch: self.created_at_epoch(),
            label: Some(self.kind().as_str().to_string()),
            content_type: Some(CONTENT_TYPE.to_string()),
            payload: serde_json::to_vec(&partial)?,
        })
    }

    fn from_entry(entry: LogEntry) -> Self {
        let mut partial = match entry.payload.as_deref() {
            Some(bytes) => serde_json::from_slice::<PartialEvent>(bytes).unwrap_or_else(|e| {
                tracing::warn!(event_id = entry.id, error = %e, "Corrupt event payload, using empty event");
                PartialEvent::default()
            }),
            None => {
                tracing::warn!(event_id = entry.id, "Event row without payload, using empty event");
                PartialEvent::default()
            }
        };

        // Row columns are authoritative for id and timestamps
        partial.id = Some(entry.id);
        partial.created_at_wall = Some(entry.created_at);
        partial.created_at_epoch = Some(entry.created_at_epoch);

        EventNormalizer::new().normalize(partial)
    }

    fn with_id(mut self, id: i64) -> Self {
        self.assign_id(id);
        self
    }
}
