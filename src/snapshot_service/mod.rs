//! SnapshotService - Still Image Capture
//!
//! ## Responsibilities
//!
//! - Camera collaborator contract ("take one photo now")
//! - fswebcam capture straight to stdout (no temp files)
//! - Typed capture failures so callers can soft-fail

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Default camera device
pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";

/// Default resolution
pub const DEFAULT_RESOLUTION: &str = "1280x720";

/// Capture errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// Camera or capture tool missing
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    /// Capture ran but produced no bytes
    #[error("camera returned an empty image")]
    Empty,

    #[error("capture timed out after {0:?}")]
    Timeout(Duration),

    #[error("capture failed: {0}")]
    Failed(String),
}

/// Camera collaborator
#[async_trait]
pub trait Camera: Send + Sync {
    /// Take one photo now and return the encoded image
    async fn capture_now(&self) -> Result<Vec<u8>, CaptureError>;

    /// MIME type of the returned bytes
    fn mime(&self) -> &'static str {
        "image/jpeg"
    }
}

/// USB camera captured through fswebcam
pub struct FswebcamCamera {
    program: String,
    device: String,
    resolution: String,
    timeout: Duration,
}

impl FswebcamCamera {
    pub fn new(device: impl Into<String>, resolution: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: "fswebcam".to_string(),
            device: device.into(),
            resolution: resolution.into(),
            timeout,
        }
    }

    /// Use a different executable (same command line)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl Camera for FswebcamCamera {
    /// Uses kill_on_drop(true): when the timeout fires and the future is
    /// dropped, the child gets SIGKILL instead of lingering on the device.
    async fn capture_now(&self) -> Result<Vec<u8>, CaptureError> {
        // -q: quiet, --no-banner: raw frame, "-": JPEG to stdout
        let child = Command::new(&self.program)
            .args([
                "-q",
                "-d",
                self.device.as_str(),
                "-r",
                self.resolution.as_str(),
                "--no-banner",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CaptureError::Unavailable(format!("{} spawn failed: {}", self.program, e)))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(CaptureError::Failed(format!(
                        "{} exited with {}: {}",
                        self.program,
                        output.status,
                        stderr.trim()
                    )));
                }

                if output.stdout.is_empty() {
                    return Err(CaptureError::Empty);
                }

                tracing::debug!(
                    device = %self.device,
                    size = output.stdout.len(),
                    "Photo captured via fswebcam"
                );
                Ok(output.stdout)
            }
            Ok(Err(e)) => Err(CaptureError::Failed(format!("{} execution failed: {}", self.program, e))),
            Err(_) => {
                tracing::warn!(
                    timeout_sec = self.timeout.as_secs_f64(),
                    device = %self.device,
                    "fswebcam timeout, process killed via kill_on_drop"
                );
                Err(CaptureError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(program: &str) -> FswebcamCamera {
        FswebcamCamera::new(DEFAULT_CAMERA_DEVICE, DEFAULT_RESOLUTION, Duration::from_secs(5))
            .with_program(program)
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let result = camera("/nonexistent/fswebcam").capture_now().await;
        assert!(matches!(result, Err(CaptureError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_empty_output_is_empty_error() {
        // `true` accepts any arguments and prints nothing
        let result = camera("true").capture_now().await;
        assert_eq!(result, Err(CaptureError::Empty));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let result = camera("false").capture_now().await;
        assert!(matches!(result, Err(CaptureError::Failed(_))));
    }
}
