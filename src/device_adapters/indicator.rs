//! RGB status LED
//!
//! Each channel is one GPIO value file; a channel is lit when its component is
//! non-zero. Common-anode LEDs are driven active-low.

use super::{DeviceError, Indicator, Rgb};
use async_trait::async_trait;
use std::path::PathBuf;

/// Three-pin RGB LED on sysfs GPIO value files
pub struct SysfsRgbIndicator {
    red: PathBuf,
    green: PathBuf,
    blue: PathBuf,
    active_high: bool,
}

impl SysfsRgbIndicator {
    pub fn new(red: impl Into<PathBuf>, green: impl Into<PathBuf>, blue: impl Into<PathBuf>, active_high: bool) -> Self {
        Self {
            red: red.into(),
            green: green.into(),
            blue: blue.into(),
            active_high,
        }
    }

    fn level(&self, component: u8) -> &'static str {
        match (component > 0, self.active_high) {
            (true, true) | (false, false) => "1",
            (true, false) | (false, true) => "0",
        }
    }
}

#[async_trait]
impl Indicator for SysfsRgbIndicator {
    async fn set_color(&self, color: Rgb) -> Result<(), DeviceError> {
        tokio::fs::write(&self.red, self.level(color.r)).await?;
        tokio::fs::write(&self.green, self.level(color.g)).await?;
        tokio::fs::write(&self.blue, self.level(color.b)).await?;
        tracing::trace!(r = color.r, g = color.g, b = color.b, "Indicator color set");
        Ok(())
    }
}

/// Indicator used when no LED is configured
#[derive(Debug, Default)]
pub struct NoopIndicator;

#[async_trait]
impl Indicator for NoopIndicator {
    async fn set_color(&self, _color: Rgb) -> Result<(), DeviceError> {
        Ok(())
    }
}
