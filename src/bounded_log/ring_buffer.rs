//! In-memory bounded store (ring buffer)
//!
//! Used when durable storage is disabled and in tests. Same contract as the
//! SQLite store minus durability across restarts.

use super::types::{LogEntry, LogEntryMeta, LogStore, NewEntry};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Ring buffer for entries
struct EntryRingBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_id: i64,
}

impl EntryRingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    fn push(&mut self, entry: NewEntry) -> i64 {
        let id = self.next_id;
        self.next_id += 1;

        // Ids are pushed in ascending order, so the front is always the oldest id
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.into_entry(id));
        id
    }

    /// Newest first, borrowed
    fn latest(&self, count: usize) -> Vec<&LogEntry> {
        let mut latest: Vec<&LogEntry> = self.entries.iter().collect();
        latest.sort_by(|a, b| {
            b.created_at_epoch
                .total_cmp(&a.created_at_epoch)
                .then(b.id.cmp(&a.id))
        });
        latest.truncate(count);
        latest
    }

    fn get(&self, id: i64) -> Option<LogEntry> {
        // Ascending ids allow a binary search
        self.entries
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .and_then(|idx| self.entries.get(idx).cloned())
    }
}

/// MemoryLogStore instance
pub struct MemoryLogStore {
    name: &'static str,
    capacity: usize,
    buffer: RwLock<EntryRingBuffer>,
}

impl MemoryLogStore {
    /// Create new store; capacity must be at least 1
    pub fn new(name: &'static str, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config(format!("capacity for '{}' must be at least 1", name)));
        }
        Ok(Self {
            name,
            capacity,
            buffer: RwLock::new(EntryRingBuffer::new(capacity)),
        })
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, entry: NewEntry) -> Result<i64> {
        let mut buffer = self.buffer.write().await;
        let id = buffer.push(entry);
        tracing::debug!(store = self.name, id = id, "Entry added to ring buffer");
        Ok(id)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let buffer = self.buffer.read().await;
        Ok(buffer.latest(limit).into_iter().cloned().collect())
    }

    async fn list_recent_meta(&self, limit: usize) -> Result<Vec<LogEntryMeta>> {
        let buffer = self.buffer.read().await;
        Ok(buffer.latest(limit).into_iter().map(LogEntryMeta::from).collect())
    }

    async fn get(&self, id: i64) -> Result<Option<LogEntry>> {
        let buffer = self.buffer.read().await;
        Ok(buffer.get(id))
    }

    async fn count(&self) -> Result<usize> {
        let buffer = self.buffer.read().await;
        Ok(buffer.entries.len())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(epoch: f64) -> NewEntry {
        NewEntry {
            created_at: format!("t{}", epoch),
            created_at_epoch: epoch,
            label: None,
            content_type: None,
            payload: b"{}".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_cap_evicts_oldest_id() {
        let store = MemoryLogStore::new("events", 250).unwrap();
        for i in 1..=251 {
            let id = store.append(entry(i as f64)).await.unwrap();
            assert_eq!(id, i);
        }

        assert_eq!(store.count().await.unwrap(), 250);
        assert!(store.get(1).await.unwrap().is_none());
        assert!(store.get(2).await.unwrap().is_some());
        assert!(store.get(251).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_holds_min_of_appends_and_cap() {
        for total in [0usize, 1, 4, 5, 6, 17] {
            let store = MemoryLogStore::new("events", 5).unwrap();
            for i in 0..total {
                store.append(entry(i as f64 + 1.0)).await.unwrap();
            }

            let kept: Vec<i64> = store
                .list_recent(100)
                .await
                .unwrap()
                .into_iter()
                .map(|e| e.id)
                .collect();
            let expected: Vec<i64> = (1..=total as i64).rev().take(5).collect();
            assert_eq!(kept, expected, "total appends = {}", total);
        }
    }

    #[tokio::test]
    async fn test_list_recent_orders_by_epoch_then_id() {
        let store = MemoryLogStore::new("events", 10).unwrap();
        store.append(entry(5.0)).await.unwrap(); // id 1
        store.append(entry(3.0)).await.unwrap(); // id 2
        store.append(entry(5.0)).await.unwrap(); // id 3

        let ids: Vec<i64> = store
            .list_recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);

        let limited = store.list_recent(1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, 3);
    }

    #[tokio::test]
    async fn test_list_recent_meta_reports_payload_size() {
        let store = MemoryLogStore::new("photos", 2).unwrap();
        store.append(entry(1.0)).await.unwrap();
        let mut big = entry(2.0);
        big.payload = vec![0; 1024];
        store.append(big).await.unwrap();

        let meta = store.list_recent_meta(10).await.unwrap();
        let sizes: Vec<(i64, i64)> = meta.iter().map(|m| (m.id, m.payload_len)).collect();
        assert_eq!(sizes, vec![(2, 1024), (1, 2)]);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(matches!(MemoryLogStore::new("events", 0), Err(Error::Config(_))));
    }
}
