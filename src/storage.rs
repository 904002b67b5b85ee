// SPDX-License-Identifier: GPL-3.0-only

//! Snapshot files for rectified targets
//!
//! A snapshot is a PNG of the 28×28 rectified image plus a JSON sidecar with
//! its feature vectors, both sharing one timestamped stem.

use crate::constants::APP_DIR_NAME;
use crate::errors::{AppError, AppResult};
use crate::pipelines::FeatureEncoding;
use crate::pipelines::detection::OrderedCorners;
use chrono::Local;
use image::GrayImage;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Paths written for one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub image: PathBuf,
    pub features: PathBuf,
}

#[derive(Serialize)]
struct SnapshotRecord<'a> {
    captured_at: String,
    corners: &'a OrderedCorners,
    #[serde(flatten)]
    features: &'a FeatureEncoding,
}

/// Default snapshot directory (`~/Pictures/quadcam`)
pub fn default_snapshot_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Write the rectified image and its features into `dir`
pub fn save_snapshot(
    dir: &Path,
    rectified: &GrayImage,
    corners: &OrderedCorners,
    features: &FeatureEncoding,
) -> AppResult<SnapshotPaths> {
    std::fs::create_dir_all(dir)?;

    let now = Local::now();
    let stem = format!("TARGET_{}", now.format("%Y%m%d_%H%M%S_%3f"));
    let paths = SnapshotPaths {
        image: dir.join(format!("{}.png", stem)),
        features: dir.join(format!("{}.json", stem)),
    };

    rectified.save(&paths.image)?;

    let record = SnapshotRecord {
        captured_at: now.to_rfc3339(),
        corners,
        features,
    };
    let file = std::fs::File::create(&paths.features)?;
    write_json(file, &record)?;

    info!(path = %paths.image.display(), "Snapshot saved");
    Ok(paths)
}

/// Pretty-print `value` and flush, so a short write surfaces as an error
fn write_json<W: Write, T: Serialize>(sink: W, value: &T) -> AppResult<()> {
    let mut writer = BufWriter::new(sink);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| AppError::Storage(e.to_string()))?;
    writer.flush()?;
    Ok(())
}
