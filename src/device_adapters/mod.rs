//! DeviceAdapters - Badge Reader, Motion Sensor, Indicator
//!
//! ## Responsibilities
//!
//! - Collaborator traits the pipeline depends on
//! - OS-level implementations (serial device file, sysfs GPIO value files)
//! - Supervised device tasks with transient/fatal error split and backoff
//!
//! Port parameters (baud rate, GPIO export/direction) are configured outside
//! this process; adapters only read and write the files the OS exposes.

mod badge_reader;
mod indicator;
mod motion_sensor;
mod supervisor;

pub use badge_reader::{SerialBadgeConnector, SerialBadgeReader};
pub use indicator::{NoopIndicator, SysfsRgbIndicator};
pub use motion_sensor::{
    SysfsMotionConnector, SysfsMotionSensor, DEFAULT_PIR_VALUE_PATH, DEFAULT_POLL_INTERVAL,
};
pub use supervisor::{run_supervised, RetryPolicy};

use crate::access_table::AccessDecision;
use async_trait::async_trait;
use serde::Serialize;

/// Device errors
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Device not present or not yet ready
    #[error("device unavailable: {0}")]
    Unavailable(String),

    /// Stream closed by the device
    #[error("device disconnected")]
    Disconnected,

    #[error("device IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Retrying cannot help (bad configuration)
    #[error("device misconfigured: {0}")]
    Misconfigured(String),
}

impl DeviceError {
    /// Whether a supervisor should retry after this error
    ///
    /// Every open or IO failure is retried (device nodes can report EACCES
    /// until udev applies group permissions); only bad configuration is fatal.
    pub fn is_transient(&self) -> bool {
        !matches!(self, DeviceError::Misconfigured(_))
    }
}

/// Outcome relayed back to the badge reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOutcome {
    Grant,
    Deny,
}

impl AccessOutcome {
    /// Line sent to the reader firmware
    pub fn wire_line(&self) -> &'static [u8] {
        match self {
            AccessOutcome::Grant => b"AUTH\n",
            AccessOutcome::Deny => b"DENY\n",
        }
    }
}

impl From<&AccessDecision> for AccessOutcome {
    fn from(decision: &AccessDecision) -> Self {
        if decision.is_granted() {
            AccessOutcome::Grant
        } else {
            AccessOutcome::Deny
        }
    }
}

/// Badge reader collaborator
#[async_trait]
pub trait BadgeReader: Send {
    /// Next scanned uid (blocks until one arrives)
    async fn next_uid(&mut self) -> Result<String, DeviceError>;

    /// Relay the access outcome to the device
    async fn acknowledge(&mut self, outcome: AccessOutcome) -> Result<(), DeviceError>;
}

/// Motion collaborator
#[async_trait]
pub trait MotionSensor: Send {
    /// Returns once motion is active (immediately if it already is)
    async fn wait_for_motion(&mut self) -> Result<(), DeviceError>;

    /// Returns once motion is no longer active
    async fn wait_for_no_motion(&mut self) -> Result<(), DeviceError>;
}

/// Opens a device for one supervised session
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    type Device: Send;

    /// Name used in log messages
    fn name(&self) -> &'static str;

    async fn connect(&self) -> Result<Self::Device, DeviceError>;
}

/// RGB color command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
    pub const GREEN: Rgb = Rgb { r: 0, g: 255, b: 0 };
    pub const BLUE: Rgb = Rgb { r: 0, g: 0, b: 255 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };
    pub const OFF: Rgb = Rgb { r: 0, g: 0, b: 0 };
}

/// Indicator collaborator
#[async_trait]
pub trait Indicator: Send + Sync {
    async fn set_color(&self, color: Rgb) -> Result<(), DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_transient_classification() {
        assert!(DeviceError::Disconnected.is_transient());
        assert!(DeviceError::Unavailable("no tty".to_string()).is_transient());
        assert!(DeviceError::Io(io::Error::from(io::ErrorKind::NotFound)).is_transient());
        assert!(DeviceError::Io(io::Error::from(io::ErrorKind::PermissionDenied)).is_transient());
        assert!(!DeviceError::Misconfigured("empty path".to_string()).is_transient());
    }

    #[test]
    fn test_outcome_wire_lines() {
        let grant = AccessOutcome::from(&AccessDecision::Grant("Alice".to_string()));
        let deny = AccessOutcome::from(&AccessDecision::Deny("Unknown".to_string()));
        assert_eq!(grant.wire_line(), b"AUTH\n");
        assert_eq!(deny.wire_line(), b"DENY\n");
    }
}
