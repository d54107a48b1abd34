//! Doorwatch Library
//!
//! Badge access and motion-camera event server
//!
//! ## Architecture
//!
//! 1. AccessTable - Badge uid to name lookup, grant/deny decision
//! 2. EventNormalizer - Canonical event shape and clock
//! 3. MotionDebounce - Rising-edge cooldown and re-arm policy
//! 4. BoundedLog - Capacity-capped append-only store (SQLite or memory)
//! 5. EventLogService / PhotoLogService - Event and photo logs
//! 6. SnapshotService - Camera capture (fswebcam)
//! 7. CaptureOrchestrator - Motion photo capture and follow-up event
//! 8. FeedbackController - Status LED with timed revert
//! 9. RealtimeHub - Live event fan-out (SSE)
//! 10. DeviceAdapters - Serial badge reader, PIR sensor, RGB LED, supervision
//! 11. IngestPipeline - Ordered record/publish of every event
//! 12. WebAPI - REST + SSE endpoints
//!
//! ## Design Principles
//!
//! - Every event goes through one pipeline: normalize, persist, publish
//! - Hardware sits behind traits so the pipeline runs without devices

pub mod access_table;
pub mod bounded_log;
pub mod capture_orchestrator;
pub mod device_adapters;
pub mod error;
pub mod event_log_service;
pub mod event_normalizer;
pub mod feedback_controller;
pub mod ingest_pipeline;
pub mod models;
pub mod motion_debounce;
pub mod photo_log_service;
pub mod realtime_hub;
pub mod snapshot_service;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
