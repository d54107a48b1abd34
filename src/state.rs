//! Application state
//!
//! Holds all shared components and state

use crate::access_table::AccessTable;
use crate::bounded_log::{connect_sqlite, BoundedLog, LogRecord, SqliteLogStore};
use crate::capture_orchestrator::{CaptureOrchestrator, DEFAULT_CAPTURE_TIMEOUT};
use crate::device_adapters::{
    Indicator, NoopIndicator, RetryPolicy, SysfsRgbIndicator, DEFAULT_PIR_VALUE_PATH,
    DEFAULT_POLL_INTERVAL,
};
use crate::error::{Error, Result};
use crate::event_log_service::{EventLog, DEFAULT_MAX_EVENTS};
use crate::feedback_controller::{FeedbackController, DEFAULT_REVERT_AFTER};
use crate::ingest_pipeline::{EventRecorder, IngestPipeline};
use crate::motion_debounce::{DebounceEngine, RearmPolicy, DEFAULT_COOLDOWN};
use crate::photo_log_service::{PhotoLog, DEFAULT_MAX_PHOTOS};
use crate::realtime_hub::RealtimeHub;
use crate::snapshot_service::{Camera, FswebcamCamera, DEFAULT_CAMERA_DEVICE, DEFAULT_RESOLUTION};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Storage backend for both bounded logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Storage backend for events and photos
    pub storage_backend: StorageBackend,
    /// Event database URL
    pub events_database_url: String,
    /// Photo database URL
    pub photos_database_url: String,
    /// Event log capacity
    pub max_events: usize,
    /// Photo log capacity
    pub max_photos: usize,
    /// Raw `UID=Name;...` access table (None = built-in badges)
    pub access_uids: Option<String>,
    /// Serial device of the badge reader
    pub serial_port: PathBuf,
    pub badge_reader_enabled: bool,
    /// GPIO value file of the PIR sensor
    pub pir_value_path: PathBuf,
    pub motion_enabled: bool,
    pub motion_cooldown: Duration,
    pub motion_rearm: RearmPolicy,
    pub motion_poll_interval: Duration,
    /// Camera device for fswebcam
    pub camera_device: String,
    pub photo_resolution: String,
    pub capture_timeout: Duration,
    /// RGB LED GPIO value files (all three required to drive the LED)
    pub rgb_paths: Option<(PathBuf, PathBuf, PathBuf)>,
    pub rgb_active_high: bool,
    /// Positive/Negative feedback duration
    pub led_feedback: Duration,
    /// Device retry backoff
    pub device_retry: RetryPolicy,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        let rgb_paths = match (
            std::env::var("RGB_RED_PATH"),
            std::env::var("RGB_GREEN_PATH"),
            std::env::var("RGB_BLUE_PATH"),
        ) {
            (Ok(r), Ok(g), Ok(b)) => Some((PathBuf::from(r), PathBuf::from(g), PathBuf::from(b))),
            _ => None,
        };

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 5000),
            storage_backend: env_parse("STORAGE_BACKEND", StorageBackend::Sqlite),
            events_database_url: env_or("EVENTS_DATABASE_URL", "sqlite://events.db"),
            photos_database_url: env_or("PHOTOS_DATABASE_URL", "sqlite://photos.db"),
            max_events: env_parse("MAX_EVENTS", DEFAULT_MAX_EVENTS),
            max_photos: env_parse("MAX_PHOTOS", DEFAULT_MAX_PHOTOS),
            access_uids: std::env::var("ACCESS_UIDS").ok().filter(|v| !v.trim().is_empty()),
            serial_port: PathBuf::from(env_or("SERIAL_PORT", "/dev/ttyACM0")),
            badge_reader_enabled: env_flag("BADGE_READER_ENABLED", true),
            pir_value_path: PathBuf::from(env_or("PIR_VALUE_PATH", DEFAULT_PIR_VALUE_PATH)),
            motion_enabled: env_flag("MOTION_ENABLED", true),
            motion_cooldown: env_secs("MOTION_COOLDOWN_SECS", DEFAULT_COOLDOWN),
            motion_rearm: env_parse("MOTION_REARM", RearmPolicy::default()),
            motion_poll_interval: Duration::from_millis(env_parse(
                "MOTION_POLL_MS",
                DEFAULT_POLL_INTERVAL.as_millis() as u64,
            )),
            camera_device: env_or("CAMERA_DEVICE", DEFAULT_CAMERA_DEVICE),
            photo_resolution: env_or("PHOTO_RESOLUTION", DEFAULT_RESOLUTION),
            capture_timeout: env_secs("CAPTURE_TIMEOUT_SECS", DEFAULT_CAPTURE_TIMEOUT),
            rgb_paths,
            rgb_active_high: env_flag("RGB_ACTIVE_HIGH", true),
            led_feedback: Duration::from_millis(env_parse(
                "LED_FEEDBACK_MS",
                DEFAULT_REVERT_AFTER.as_millis() as u64,
            )),
            device_retry: RetryPolicy::new(
                env_secs("DEVICE_RETRY_SECS", Duration::from_secs(2)),
                env_secs("DEVICE_RETRY_MAX_SECS", Duration::from_secs(30)),
            ),
        }
    }
}

impl AppConfig {
    /// Access table from `ACCESS_UIDS`, or the built-in badges
    pub fn access_table(&self) -> Result<AccessTable> {
        match &self.access_uids {
            Some(raw) => AccessTable::parse(raw),
            None => Ok(AccessTable::default()),
        }
    }

    /// Bind address for the HTTP server
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Application state shared across handlers and device tasks
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// IngestPipeline (badge + motion handling)
    pub pipeline: Arc<IngestPipeline>,
    /// Event log (bounded)
    pub events: EventLog,
    /// Photo log (bounded)
    pub photos: PhotoLog,
    /// RealtimeHub (SSE)
    pub realtime: Arc<RealtimeHub>,
    /// FeedbackController (status LED)
    pub feedback: Arc<FeedbackController>,
    /// Process start (for uptime)
    pub started_at: Instant,
}

impl AppState {
    /// Build every component from config, with the fswebcam camera and the
    /// configured indicator
    pub async fn build(config: AppConfig) -> Result<Self> {
        let camera: Arc<dyn Camera> = Arc::new(FswebcamCamera::new(
            config.camera_device.clone(),
            config.photo_resolution.clone(),
            config.capture_timeout,
        ));

        let indicator: Arc<dyn Indicator> = match &config.rgb_paths {
            Some((r, g, b)) => Arc::new(SysfsRgbIndicator::new(r, g, b, config.rgb_active_high)),
            None => {
                tracing::info!("RGB LED not configured, feedback is log-only");
                Arc::new(NoopIndicator)
            }
        };

        let (events, photos) = match config.storage_backend {
            StorageBackend::Sqlite => (
                open_sqlite_log(&config.events_database_url, "events", config.max_events).await?,
                open_sqlite_log(&config.photos_database_url, "photos", config.max_photos).await?,
            ),
            StorageBackend::Memory => {
                tracing::warn!("In-memory storage selected, history is lost on restart");
                (
                    EventLog::in_memory(config.max_events)?,
                    PhotoLog::in_memory(config.max_photos)?,
                )
            }
        };

        Self::assemble(config, events, photos, camera, indicator)
    }

    /// Wire components around already-built logs and collaborators
    pub fn assemble(
        config: AppConfig,
        events: EventLog,
        photos: PhotoLog,
        camera: Arc<dyn Camera>,
        indicator: Arc<dyn Indicator>,
    ) -> Result<Self> {
        let access = config.access_table()?;
        if access.is_empty() {
            tracing::warn!("Access table is empty, every badge will be denied");
        }

        let realtime = Arc::new(RealtimeHub::new());
        let feedback = Arc::new(FeedbackController::new(indicator, config.led_feedback));
        let recorder = Arc::new(EventRecorder::new(events.clone(), realtime.clone()));
        let capture = CaptureOrchestrator::new(
            camera,
            photos.clone(),
            recorder.clone(),
            feedback.clone(),
            config.capture_timeout,
        );
        let debounce = DebounceEngine::new(config.motion_cooldown, config.motion_rearm);

        let pipeline = Arc::new(IngestPipeline::new(
            access,
            recorder,
            debounce,
            capture,
            feedback.clone(),
        ));

        Ok(Self {
            config,
            pipeline,
            events,
            photos,
            realtime,
            feedback,
            started_at: Instant::now(),
        })
    }
}

async fn open_sqlite_log<R: LogRecord>(
    url: &str,
    table: &'static str,
    capacity: usize,
) -> Result<BoundedLog<R>> {
    let pool = connect_sqlite(url)
        .await
        .map_err(|e| Error::Config(format!("cannot open {}: {}", url, e)))?;
    let store = SqliteLogStore::new(pool, table, capacity).await?;
    Ok(BoundedLog::new(Arc::new(store)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("SQLite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_default_config_values() {
        let config = AppConfig::default();
        // Values below are not overridden in the test environment
        assert!(config.max_events > 0);
        assert!(config.max_photos > 0);
        assert!(!config.bind_addr().is_empty());
    }

    #[test]
    fn test_access_table_falls_back_to_defaults() {
        let config = AppConfig {
            access_uids: None,
            ..AppConfig::default()
        };
        assert!(config.access_table().unwrap().decide("61D1AA17").is_granted());

        let config = AppConfig {
            access_uids: Some("AAAA=Alice".to_string()),
            ..AppConfig::default()
        };
        let table = config.access_table().unwrap();
        assert!(table.decide("AAAA").is_granted());
        assert!(!table.decide("61D1AA17").is_granted());

        let config = AppConfig {
            access_uids: Some("broken".to_string()),
            ..AppConfig::default()
        };
        assert!(config.access_table().is_err());
    }

    #[tokio::test]
    async fn test_zero_capacity_rejected_by_both_backends() {
        let config = AppConfig {
            storage_backend: StorageBackend::Memory,
            max_events: 0,
            ..AppConfig::default()
        };
        assert!(matches!(AppState::build(config).await, Err(Error::Config(_))));

        let config = AppConfig {
            storage_backend: StorageBackend::Sqlite,
            events_database_url: "sqlite::memory:".to_string(),
            max_events: 0,
            ..AppConfig::default()
        };
        assert!(matches!(AppState::build(config).await, Err(Error::Config(_))));
    }
}
