//! PIR motion sensor on a sysfs GPIO value file
//!
//! The pin must already be exported and configured as an input; the sensor
//! just polls `/sys/class/gpio/gpioN/value` for `1` (motion) or `0`.

use super::{DeviceConnector, DeviceError, MotionSensor};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// Default GPIO value file (BCM 18)
pub const DEFAULT_PIR_VALUE_PATH: &str = "/sys/class/gpio/gpio18/value";

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Polling motion sensor
pub struct SysfsMotionSensor {
    path: PathBuf,
    poll_interval: Duration,
}

impl SysfsMotionSensor {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
        }
    }

    /// Current level; `true` while motion is reported
    pub async fn is_active(&self) -> Result<bool, DeviceError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(DeviceError::Unavailable(format!(
                "unexpected GPIO value '{}' in {}",
                other,
                self.path.display()
            ))),
        }
    }

    async fn wait_for_level(&self, active: bool) -> Result<(), DeviceError> {
        loop {
            if self.is_active().await? == active {
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl MotionSensor for SysfsMotionSensor {
    async fn wait_for_motion(&mut self) -> Result<(), DeviceError> {
        self.wait_for_level(true).await
    }

    async fn wait_for_no_motion(&mut self) -> Result<(), DeviceError> {
        self.wait_for_level(false).await
    }
}

/// Connects by checking the value file is readable
pub struct SysfsMotionConnector {
    path: PathBuf,
    poll_interval: Duration,
}

impl SysfsMotionConnector {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
        }
    }
}

#[async_trait]
impl DeviceConnector for SysfsMotionConnector {
    type Device = SysfsMotionSensor;

    fn name(&self) -> &'static str {
        "motion_sensor"
    }

    async fn connect(&self) -> Result<Self::Device, DeviceError> {
        if self.poll_interval.is_zero() {
            return Err(DeviceError::Misconfigured("motion poll interval must be > 0".to_string()));
        }

        let sensor = SysfsMotionSensor::new(self.path.clone(), self.poll_interval);
        sensor.is_active().await.map_err(|e| match e {
            DeviceError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                DeviceError::Unavailable(format!("{} not found", self.path.display()))
            }
            other => other,
        })?;

        tracing::info!(path = %self.path.display(), "PIR motion sensor ready");
        Ok(sensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn value_file(initial: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value");
        std::fs::write(&path, initial).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_reads_level() {
        let (_dir, path) = value_file("1\n");
        let sensor = SysfsMotionSensor::new(&path, DEFAULT_POLL_INTERVAL);
        assert!(sensor.is_active().await.unwrap());

        std::fs::write(&path, "0\n").unwrap();
        assert!(!sensor.is_active().await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_for_motion_returns_on_high() {
        let (_dir, path) = value_file("0\n");
        let mut sensor = SysfsMotionSensor::new(&path, Duration::from_millis(5));

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            tokio::fs::write(&writer_path, "1\n").await.unwrap();
        });

        tokio::time::timeout(Duration::from_secs(5), sensor.wait_for_motion())
            .await
            .expect("motion not seen")
            .unwrap();
        writer.await.unwrap();

        // Already high: returns at once; low wait blocks until cleared
        sensor.wait_for_motion().await.unwrap();
        std::fs::write(&path, "0").unwrap();
        sensor.wait_for_no_motion().await.unwrap();
    }

    #[tokio::test]
    async fn test_garbage_value_is_transient() {
        let (_dir, path) = value_file("x");
        let sensor = SysfsMotionSensor::new(&path, DEFAULT_POLL_INTERVAL);
        let err = sensor.is_active().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_connect_missing_file_is_unavailable() {
        let connector = SysfsMotionConnector::new("/nonexistent/gpio18/value", DEFAULT_POLL_INTERVAL);
        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, DeviceError::Unavailable(_)));

        let connector = SysfsMotionConnector::new("/nonexistent/gpio18/value", Duration::ZERO);
        let err = connector.connect().await.err().unwrap();
        assert!(!err.is_transient());
    }
}
