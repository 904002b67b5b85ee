// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Running the live detector (terminal or headless)
//! - Listing available cameras
//! - Running detection on a still image

use clap::Args;
use quadcam::app::{HeadlessDisplay, RunSummary, run_session};
use quadcam::backends::camera::FrameImage;
use quadcam::backends::camera::v4l2::{V4l2Source, enumerate_devices, enumerate_formats};
use quadcam::config::Config;
use quadcam::errors::AppResult;
use quadcam::pipelines::detection::OrderedCorners;
use quadcam::pipelines::{FeatureEncoding, QuadDetector, SelectionStrategy, encode};
use quadcam::terminal::TerminalDisplay;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Flags for the live detector; each one overrides the config file
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Camera index to use (from 'quadcam list')
    #[arg(short, long)]
    pub device: Option<usize>,

    /// Requested capture width
    #[arg(long)]
    pub width: Option<u32>,

    /// Requested capture height
    #[arg(long)]
    pub height: Option<u32>,

    /// Requested frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Requested pixel format FourCC (MJPG, YUYV, GREY)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Consumer cycle period in milliseconds, 0 for unpaced
    #[arg(long)]
    pub pace_ms: Option<u64>,

    /// Which quadrilateral to keep when several qualify
    #[arg(long, value_enum)]
    pub selection: Option<SelectionStrategy>,

    /// Directory for snapshots taken with 's'
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Log detections instead of drawing to the terminal
    #[arg(long)]
    pub headless: bool,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Load the config file and apply command line overrides
    pub fn resolve(&self) -> AppResult<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_default()?,
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut Config) {
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(fps) = self.fps {
            config.fps = Some(fps);
        }
        if let Some(format) = &self.format {
            config.pixel_format = format.clone();
        }
        if let Some(pace_ms) = self.pace_ms {
            config.pace_ms = Some(pace_ms);
        }
        if let Some(selection) = self.selection {
            config.selection = selection;
        }
        if let Some(dir) = &self.snapshot_dir {
            config.snapshot_dir = Some(dir.clone());
        }
        if self.headless {
            config.headless = true;
        }
    }
}

/// Run the live detector until Escape
pub fn run(args: &RunArgs) -> AppResult<()> {
    let config = args.resolve()?;

    // Fails with DeviceUnavailable before any thread is started
    let source = V4l2Source::open(config.device, &config.capture_request())?;

    let summary = if config.headless {
        run_session(source, HeadlessDisplay::install()?, &config)?
    } else {
        run_session(source, TerminalDisplay::new()?, &config)?
    };

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Processed {} frames in {} cycles over {}s, {} with a target, {} snapshots",
        summary.frames_processed,
        summary.cycles,
        summary.counter,
        summary.detections,
        summary.snapshots
    );
}

/// List all available cameras
pub fn list_cameras() -> AppResult<()> {
    let cameras = enumerate_devices();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        println!("  [{}] {} ({})", camera.index, camera.card, camera.path);

        // Group by resolution, keep the formats each one is offered in
        let mut resolutions: Vec<(u32, u32, Vec<String>)> = Vec::new();
        for (fourcc, width, height) in enumerate_formats(camera) {
            match resolutions
                .iter_mut()
                .find(|(w, h, _)| *w == width && *h == height)
            {
                Some(existing) => {
                    if !existing.2.contains(&fourcc) {
                        existing.2.push(fourcc);
                    }
                }
                None => resolutions.push((width, height, vec![fourcc])),
            }
        }

        // Sort by resolution (highest first)
        resolutions.sort_by(|a, b| (b.0 * b.1).cmp(&(a.0 * a.1)));

        if !resolutions.is_empty() {
            let res_strs: Vec<String> = resolutions
                .iter()
                .take(3)
                .map(|(w, h, fourccs)| format!("{}x{} {}", w, h, fourccs.join("/")))
                .collect();
            println!("      Formats: {}", res_strs.join(", "));
        }
        println!("      Driver: {}", camera.driver);
        println!();
    }

    Ok(())
}

/// JSON report printed by `quadcam detect`
#[derive(Debug, Serialize)]
pub struct DetectReport {
    pub image: PathBuf,
    pub width: u32,
    pub height: u32,
    pub selection: SelectionStrategy,
    pub detected: bool,
    pub corners: Option<OrderedCorners>,
    pub area: Option<f64>,
    pub features: Option<FeatureEncoding>,
}

/// Run detection and encoding on a still image
pub fn detect_report(path: &Path, selection: SelectionStrategy) -> AppResult<DetectReport> {
    let image = image::open(path)?.to_rgb8();
    let (width, height) = image.dimensions();

    let detection = QuadDetector::new(selection).detect(&FrameImage::Rgb(image));
    let features = encode(detection.as_ref().map(|d| &d.rectified));
    info!(
        path = %path.display(),
        detected = detection.is_some(),
        "Still image processed"
    );

    Ok(DetectReport {
        image: path.to_path_buf(),
        width,
        height,
        selection,
        detected: detection.is_some(),
        corners: detection.as_ref().map(|d| d.corners),
        area: detection.as_ref().map(|d| d.area),
        features,
    })
}

/// Print the detection report for a still image as JSON
pub fn detect_image(path: &Path, selection: SelectionStrategy) -> AppResult<()> {
    let report = detect_report(path, selection)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = RunArgs {
            device: Some(3),
            format: Some("yuyv".to_string()),
            pace_ms: Some(0),
            selection: Some(SelectionStrategy::LargestArea),
            headless: true,
            ..RunArgs::default()
        };
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.device, 3);
        assert_eq!(config.capture_request().pixel_format, "YUYV");
        assert_eq!(config.frame_period(), None);
        assert_eq!(config.selection, SelectionStrategy::LargestArea);
        assert!(config.headless);
        assert_eq!(config.width, Config::default().width);
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let missing = Path::new("/nonexistent/quadcam-test.png");
        assert!(detect_report(missing, SelectionStrategy::FirstMatch).is_err());
    }
}
