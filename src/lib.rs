// SPDX-License-Identifier: GPL-3.0-only

//! quadcam - live square-target detection for classifier input
//!
//! A capture thread keeps only the newest camera frame in a single-slot
//! mailbox. The paced main loop takes that frame, looks for a square target,
//! warps it to 28×28 and derives normalized and complementary feature
//! vectors from it.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Main loop, pacing and the display abstraction
//! - [`backends`]: Camera backend abstraction and V4L2 capture
//! - [`pipelines`]: Detection, rectification and feature encoding
//! - [`config`]: User configuration handling
//! - [`storage`]: Snapshot files
//! - [`terminal`]: Terminal viewer
//!
//! # Example
//!
//! ```no_run
//! use quadcam::backends::camera::FrameImage;
//! use quadcam::pipelines::{QuadDetector, encode};
//!
//! let frame = FrameImage::Rgb(image::open("target.png").unwrap().to_rgb8());
//! if let Some(detection) = QuadDetector::default().detect(&frame) {
//!     let features = encode(Some(&detection.rectified)).unwrap();
//!     println!("{} values", features.complementary.len());
//! }
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{MainLoop, RunSummary};
pub use backends::camera::{CameraFrame, FrameSource, LatestFrame};
pub use config::Config;
pub use errors::{AppError, AppResult, CameraError};
pub use pipelines::{Detection, FeatureEncoding, QuadDetector, SelectionStrategy};
