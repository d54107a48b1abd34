//! PhotoLogService - Photo Retention
//!
//! Photos live in their own bounded log with an independent cap. Events refer
//! to them only through [`Photo::photo_ref`]; evicting a photo never touches
//! the event log.

use crate::bounded_log::{BoundedLog, LogEntry, LogEntryMeta, LogRecord, NewEntry};
use crate::error::Result;
use crate::event_normalizer::wall_from_epoch;
use serde::Serialize;

/// Default photo log capacity
pub const DEFAULT_MAX_PHOTOS: usize = 250;

pub const JPEG_MIME: &str = "image/jpeg";
const FALLBACK_MIME: &str = "application/octet-stream";

/// Photo log
pub type PhotoLog = BoundedLog<Photo>;

/// Stored image
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub id: Option<i64>,
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
    pub mime: String,
    pub created_at: String,
    pub created_at_epoch: f64,
}

impl Photo {
    pub fn new(filename: Option<String>, mime: impl Into<String>, bytes: Vec<u8>, epoch: f64) -> Self {
        Self {
            id: None,
            filename,
            bytes,
            mime: mime.into(),
            created_at: wall_from_epoch(epoch),
            created_at_epoch: epoch,
        }
    }

    /// Retrieval path used as `Event.photo_ref`
    pub fn photo_ref(&self) -> Option<String> {
        self.id.map(photo_ref_for)
    }
}

impl BoundedLog<Photo> {
    /// Newest photo metadata; image bytes are never loaded
    pub async fn list_summaries(&self, limit: usize) -> Result<Vec<PhotoSummary>> {
        let rows = self.list_recent_meta(limit).await?;
        Ok(rows.into_iter().map(PhotoSummary::from).collect())
    }
}

pub fn photo_ref_for(id: i64) -> String {
    format!("/photo/{}", id)
}

/// Photo metadata without the image bytes
#[derive(Debug, Clone, Serialize)]
pub struct PhotoSummary {
    pub id: i64,
    pub filename: Option<String>,
    pub mime: String,
    pub size: usize,
    pub created_at: String,
    pub created_at_epoch: f64,
    pub photo_ref: String,
}

impl From<LogEntryMeta> for PhotoSummary {
    fn from(meta: LogEntryMeta) -> Self {
        Self {
            id: meta.id,
            filename: meta.label,
            mime: meta
                .content_type
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| FALLBACK_MIME.to_string()),
            size: meta.payload_len.max(0) as usize,
            created_at: meta.created_at,
            created_at_epoch: meta.created_at_epoch,
            photo_ref: photo_ref_for(meta.id),
        }
    }
}

impl LogRecord for Photo {
    const NAME: &'static str = "photo";

    fn to_entry(&self) -> Result<NewEntry> {
        Ok(NewEntry {
            created_at: self.created_at.clone(),
            created_at_epoch: self.created_at_epoch,
            label: self.filename.clone(),
            content_type: Some(self.mime.clone()),
            payload: self.bytes.clone(),
        })
    }

    fn from_entry(entry: LogEntry) -> Self {
        let bytes = entry.payload.unwrap_or_else(|| {
            tracing::warn!(photo_id = entry.id, "Photo row without payload, using empty photo");
            Vec::new()
        });

        Self {
            id: Some(entry.id),
            filename: entry.label,
            bytes,
            mime: entry
                .content_type
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| FALLBACK_MIME.to_string()),
            created_at: entry.created_at,
            created_at_epoch: entry.created_at_epoch,
        }
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id.get_or_insert(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_ref_uses_id() {
        let photo = Photo::new(None, JPEG_MIME, vec![0xFF, 0xD8], 1_700_000_000.0);
        assert_eq!(photo.photo_ref(), None);
        assert_eq!(photo.with_id(12).photo_ref().as_deref(), Some("/photo/12"));
    }

    #[test]
    fn test_row_without_payload_is_empty_photo() {
        let photo = Photo::from_entry(LogEntry {
            id: 4,
            created_at: "2026-01-13 12:00:00.000000".to_string(),
            created_at_epoch: 1.0,
            label: None,
            content_type: None,
            payload: None,
        });

        assert_eq!(photo.id, Some(4));
        assert!(photo.bytes.is_empty());
        assert_eq!(photo.mime, FALLBACK_MIME);
    }

    #[tokio::test]
    async fn test_summaries_omit_bytes() {
        let log = PhotoLog::in_memory(5).unwrap();
        let id = log
            .append(&Photo::new(
                Some("motion_2026-01-13_12-34-56.jpg".to_string()),
                JPEG_MIME,
                vec![1, 2, 3],
                1_700_000_000.5,
            ))
            .await
            .unwrap();

        let summaries = log.list_summaries(10).await.unwrap();
        assert_eq!(summaries.len(), 1);
        let json = serde_json::to_value(&summaries[0]).unwrap();
        assert_eq!(json["id"], id);
        assert_eq!(json["size"], 3);
        assert_eq!(json["mime"], JPEG_MIME);
        assert_eq!(json["photo_ref"], format!("/photo/{}", id));
        assert!(json.get("bytes").is_none());
    }

    #[tokio::test]
    async fn test_photo_log_keeps_independent_cap() {
        let log = PhotoLog::in_memory(2).unwrap();
        for i in 0..3 {
            log.append(&Photo::new(None, JPEG_MIME, vec![i], 10.0 + i as f64))
                .await
                .unwrap();
        }

        assert_eq!(log.count().await.unwrap(), 2);
        let newest = log.list_recent(1).await.unwrap();
        assert_eq!(newest[0].bytes, vec![2]);
        assert_eq!(newest[0].mime, JPEG_MIME);
    }
}
