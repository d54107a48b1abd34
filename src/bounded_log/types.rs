//! Bounded log types

use crate::error::Result;
use async_trait::async_trait;

/// Stored row, independent of the record type it encodes
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LogEntry {
    pub id: i64,
    pub created_at: String,
    pub created_at_epoch: f64,
    /// Short label (event kind, photo filename)
    pub label: Option<String>,
    /// MIME type of the payload
    pub content_type: Option<String>,
    pub payload: Option<Vec<u8>>,
}

/// Stored row without its payload
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LogEntryMeta {
    pub id: i64,
    pub created_at: String,
    pub created_at_epoch: f64,
    pub label: Option<String>,
    pub content_type: Option<String>,
    /// Payload size in bytes
    pub payload_len: i64,
}

impl From<&LogEntry> for LogEntryMeta {
    fn from(entry: &LogEntry) -> Self {
        Self {
            id: entry.id,
            created_at: entry.created_at.clone(),
            created_at_epoch: entry.created_at_epoch,
            label: entry.label.clone(),
            content_type: entry.content_type.clone(),
            payload_len: entry.payload.as_ref().map_or(0, |p| p.len() as i64),
        }
    }
}

/// Row to insert; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub created_at: String,
    pub created_at_epoch: f64,
    pub label: Option<String>,
    pub content_type: Option<String>,
    pub payload: Vec<u8>,
}

impl NewEntry {
    pub(crate) fn into_entry(self, id: i64) -> LogEntry {
        LogEntry {
            id,
            created_at: self.created_at,
            created_at_epoch: self.created_at_epoch,
            label: self.label,
            content_type: self.content_type,
            payload: Some(self.payload),
        }
    }
}

/// Capped append-only store
///
/// Implementations must make insert and eviction atomic to readers: after
/// `append` returns, at most `capacity()` rows exist, and no reader ever sees
/// more than that or a partially written row.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Insert a row, evict the oldest rows beyond capacity, return the new id
    async fn append(&self, entry: NewEntry) -> Result<i64>;

    /// Newest first by epoch, then id, at most `limit` rows
    async fn list_recent(&self, limit: usize) -> Result<Vec<LogEntry>>;

    /// Same order as `list_recent`, without loading payloads
    async fn list_recent_meta(&self, limit: usize) -> Result<Vec<LogEntryMeta>> {
        let entries = self.list_recent(limit).await?;
        Ok(entries.iter().map(LogEntryMeta::from).collect())
    }

    async fn get(&self, id: i64) -> Result<Option<LogEntry>>;

    async fn count(&self) -> Result<usize>;

    fn capacity(&self) -> usize;
}

/// Record type that can live in a bounded log
pub trait LogRecord: Sized + Send + Sync {
    /// Name used in log messages
    const NAME: &'static str;

    /// Encode for storage
    fn to_entry(&self) -> Result<NewEntry>;

    /// Decode a stored row
    ///
    /// Total: a payload that cannot be decoded yields an empty record built
    /// from the row's id and timestamps.
    fn from_entry(entry: LogEntry) -> Self;

    /// Attach the id assigned on append
    fn with_id(self, id: i64) -> Self;
}
