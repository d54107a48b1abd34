//! BoundedLog - Capped Append-Only Record Store
//!
//! ## Responsibilities
//!
//! - Assign strictly increasing ids on append
//! - Evict the oldest records (by id) beyond capacity, atomically with the insert
//! - Serve newest-first history and point lookups
//!
//! ## Design
//!
//! Record encoding ([`LogRecord`]) is separate from storage ([`LogStore`]), so
//! events and photos share one SQLite implementation and one in-memory ring
//! buffer.

mod repository;
mod ring_buffer;
mod types;

pub use repository::{connect_sqlite, SqliteLogStore};
pub use ring_buffer::MemoryLogStore;
pub use types::*;

use crate::error::{Error, Result};
use std::marker::PhantomData;
use std::sync::Arc;

/// BoundedLog instance
pub struct BoundedLog<R> {
    store: Arc<dyn LogStore>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for BoundedLog<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: LogRecord> BoundedLog<R> {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// In-memory log (no durability)
    pub fn in_memory(capacity: usize) -> Result<Self> {
        Ok(Self::new(Arc::new(MemoryLogStore::new(R::NAME, capacity)?)))
    }

    /// Store a record and return its id
    pub async fn append(&self, record: &R) -> Result<i64> {
        let entry = record.to_entry()?;
        let id = self.store.append(entry).await?;
        tracing::debug!(log = R::NAME, id = id, "Record appended");
        Ok(id)
    }

    /// Newest records first, at most `limit`
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<R>> {
        let entries = self.store.list_recent(limit).await?;
        Ok(entries.into_iter().map(R::from_entry).collect())
    }

    /// Row metadata, newest first, without decoding or loading payloads
    pub async fn list_recent_meta(&self, limit: usize) -> Result<Vec<LogEntryMeta>> {
        self.store.list_recent_meta(limit).await
    }

    pub async fn get(&self, id: i64) -> Result<R> {
        self.store
            .get(id)
            .await?
            .map(R::from_entry)
            .ok_or_else(|| Error::NotFound(format!("{} {} not found", R::NAME, id)))
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal record for exercising the generic layer
    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: Option<i64>,
        text: String,
        epoch: f64,
    }

    impl LogRecord for Note {
        const NAME: &'static str = "note";

        fn to_entry(&self) -> Result<NewEntry> {
            Ok(NewEntry {
                created_at: self.epoch.to_string(),
                created_at_epoch: self.epoch,
                label: None,
                content_type: Some("text/plain".to_string()),
                payload: self.text.as_bytes().to_vec(),
            })
        }

        fn from_entry(entry: LogEntry) -> Self {
            Self {
                id: Some(entry.id),
                text: entry
                    .payload
                    .and_then(|p| String::from_utf8(p).ok())
                    .unwrap_or_default(),
                epoch: entry.created_at_epoch,
            }
        }

        fn with_id(mut self, id: i64) -> Self {
            self.id = Some(id);
            self
        }
    }

    fn note(text: &str, epoch: f64) -> Note {
        Note {
            id: None,
            text: text.to_string(),
            epoch,
        }
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let log: BoundedLog<Note> = BoundedLog::in_memory(3).unwrap();
        let id = log.append(&note("a", 1.0)).await.unwrap();

        assert_eq!(log.get(id).await.unwrap().text, "a");
        assert!(matches!(log.get(id + 1).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_evicted_record_is_not_found() {
        let log: BoundedLog<Note> = BoundedLog::in_memory(2).unwrap();
        let first = log.append(&note("a", 1.0)).await.unwrap();
        log.append(&note("b", 2.0)).await.unwrap();
        log.append(&note("c", 3.0)).await.unwrap();

        assert!(matches!(log.get(first).await, Err(Error::NotFound(_))));
        assert_eq!(log.count().await.unwrap(), 2);
        assert_eq!(log.capacity(), 2);

        let texts: Vec<String> = log
            .list_recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.text)
            .collect();
        assert_eq!(texts, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_sqlite_backed_log() {
        let pool = repository::tests::memory_pool().await;
        let store = SqliteLogStore::new(pool, "notes", 5).await.unwrap();
        let log: BoundedLog<Note> = BoundedLog::new(Arc::new(store));

        let id = log.append(&note("hello", 10.0)).await.unwrap();
        let stored = log.get(id).await.unwrap();
        assert_eq!(stored, note("hello", 10.0).with_id(id));
    }
}
