// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture and detection application
//!
//! Only failures that end a run or an operation live here. An empty camera
//! read and a frame without a target are ordinary outcomes and are modelled
//! as `None` where they occur.

use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Camera-related errors
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    /// Display / terminal errors
    #[error("Display error: {0}")]
    Display(String),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
    /// Storage/filesystem errors
    #[error("Storage error: {0}")]
    Storage(String),
    /// Image decoding or encoding errors
    #[error("Image error: {0}")]
    Image(String),
}

/// Camera-specific errors
#[derive(Debug, Clone, Error)]
pub enum CameraError {
    /// The capture device could not be opened
    #[error("Could not open camera #{index}: {reason}")]
    DeviceUnavailable { index: usize, reason: String },
    /// The device delivers a pixel format we cannot decode
    #[error("Format not supported: {0}")]
    FormatNotSupported(String),
    /// A captured buffer could not be decoded
    #[error("Decode failed: {0}")]
    Decode(String),
    /// Stream level I/O failure
    #[error("I/O error: {0}")]
    Io(String),
}

impl AppError {
    /// Process exit code for this error
    ///
    /// 1 is reserved for a camera that could not be opened.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Camera(CameraError::DeviceUnavailable { .. }) => 1,
            _ => 2,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Image(err.to_string())
    }
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::Io(err.to_string())
    }
}
