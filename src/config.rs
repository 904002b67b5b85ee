// SPDX-License-Identifier: GPL-3.0-only

//! Persistent settings
//!
//! Settings are read from `<config_dir>/quadcam/config.json` when it exists.
//! Every field is optional in the file; missing ones take their defaults.
//! Command line flags are applied on top by the binary.

use crate::backends::camera::FormatRequest;
use crate::constants::{
    APP_DIR_NAME, DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH,
    DEFAULT_DEVICE_INDEX, DEFAULT_FRAME_PERIOD, DEFAULT_PIXEL_FORMAT, DEFAULT_SHUTDOWN_TIMEOUT,
};
use crate::errors::{AppError, AppResult};
use crate::pipelines::SelectionStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera index (`/dev/videoN`)
    pub device: usize,
    /// Requested capture width
    pub width: u32,
    /// Requested capture height
    pub height: u32,
    /// Requested frame rate, `None` keeps the device default
    pub fps: Option<u32>,
    /// Requested pixel format FourCC (e.g. "MJPG", "YUYV", "GREY")
    pub pixel_format: String,
    /// Consumer cycle period in milliseconds; 0 or `None` runs unpaced
    pub pace_ms: Option<u64>,
    /// Which qualifying quadrilateral to keep
    pub selection: SelectionStrategy,
    /// How long shutdown waits for the capture thread
    pub shutdown_timeout_ms: u64,
    /// Where snapshots go, defaults to the pictures directory
    pub snapshot_dir: Option<PathBuf>,
    /// Run without the terminal viewer
    pub headless: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE_INDEX,
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: Some(DEFAULT_CAPTURE_FPS),
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            pace_ms: Some(DEFAULT_FRAME_PERIOD.as_millis() as u64),
            selection: SelectionStrategy::default(),
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT.as_millis() as u64,
            snapshot_dir: None,
            headless: false,
        }
    }
}

impl Config {
    /// Default location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Read settings from a JSON file
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Settings from the default location, or defaults when there is no file
    pub fn load_default() -> AppResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values no device or loop could work with
    pub fn validate(&self) -> AppResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AppError::Config(format!(
                "capture size {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.pixel_format.is_empty() || self.pixel_format.len() > 4 {
            return Err(AppError::Config(format!(
                "pixel format {:?} is not a FourCC",
                self.pixel_format
            )));
        }
        if self.fps == Some(0) {
            return Err(AppError::Config("frame rate must be positive".into()));
        }
        Ok(())
    }

    /// Capture request handed to the camera backend
    pub fn capture_request(&self) -> FormatRequest {
        FormatRequest {
            width: self.width,
            height: self.height,
            fps: self.fps,
            pixel_format: self.pixel_format.to_ascii_uppercase(),
        }
    }

    /// Fixed cycle period, `None` when unpaced
    pub fn frame_period(&self) -> Option<Duration> {
        self.pace_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Snapshot directory, falling back to the pictures directory
    pub fn snapshot_dir(&self) -> PathBuf {
        self.snapshot_dir
            .clone()
            .unwrap_or_else(crate::storage::default_snapshot_dir)
    }
}
