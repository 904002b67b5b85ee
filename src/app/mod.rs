// SPDX-License-Identifier: GPL-3.0-only

//! Consumer side of the capture pipeline
//!
//! # Architecture
//!
//! - `pacing`: clock abstraction, 1 Hz frame counter and fixed-period pacer
//! - `display`: the `Display` collaborator, key codes and overlays
//! - `headless`: a `Display` that renders nothing and maps Ctrl+C to Escape
//!
//! # Main Types
//!
//! - [`MainLoop`]: takes the newest frame, detects, encodes and displays
//! - [`CycleReport`]: what one consumer cycle did
//! - [`RunSummary`]: totals returned when the operator exits
//!
//! [`run_session`] wires a [`FrameSource`] to a [`Display`] and owns the
//! capture thread for the duration of the run.

pub mod display;
pub mod headless;
pub mod pacing;

pub use display::{Display, Key, Overlay, annotate_frame};
pub use headless::HeadlessDisplay;
pub use pacing::{Clock, FrameCounter, Pacer, SystemClock};

use crate::backends::camera::{
    CaptureLoopController, FrameImage, FrameSource, LatestFrame, spawn_capture,
};
use crate::config::Config;
use crate::constants::{CAMERA_WINDOW, IDLE_POLL_INTERVAL, KEY_POLL_TIMEOUT, RECTIFIED_WINDOW};
use crate::errors::AppResult;
use crate::pipelines::{Detection, FeatureEncoding, QuadDetector, encode};
use crate::storage;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Key that writes a snapshot of the current target
pub const SNAPSHOT_KEY: Key = Key::Char('s');

/// Outcome of one consumer cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Sequence number of the processed frame, `None` while waiting for the
    /// first one
    pub sequence: Option<u64>,
    /// Whether a target was found in the frame
    pub detected: bool,
    /// Feature vectors for the target, when found
    pub features: Option<FeatureEncoding>,
    /// Counter value shown this cycle
    pub counter: u64,
    /// The operator asked to exit
    pub exit: bool,
}

impl CycleReport {
    pub fn is_waiting(&self) -> bool {
        self.sequence.is_none()
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub frames_processed: u64,
    pub detections: u64,
    pub snapshots: u64,
    pub counter: u64,
}

/// The paced consumer loop
pub struct MainLoop<D: Display, C: Clock = SystemClock> {
    mailbox: LatestFrame,
    display: D,
    clock: C,
    detector: QuadDetector,
    counter: FrameCounter,
    pacer: Pacer,
    snapshot_dir: PathBuf,
    summary: RunSummary,
}

impl<D: Display, C: Clock> MainLoop<D, C> {
    /// Unpaced loop with the default detector; the counter starts now
    pub fn new(mailbox: LatestFrame, display: D, clock: C) -> Self {
        let counter = FrameCounter::new(clock.now());
        Self {
            mailbox,
            display,
            clock,
            detector: QuadDetector::default(),
            counter,
            pacer: Pacer::unpaced(),
            snapshot_dir: storage::default_snapshot_dir(),
            summary: RunSummary::default(),
        }
    }

    pub fn with_detector(mut self, detector: QuadDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_snapshot_dir(mut self, dir: PathBuf) -> Self {
        self.snapshot_dir = dir;
        self
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            counter: self.counter.value(),
            ..self.summary
        }
    }

    /// Run one consumer cycle
    pub fn step(&mut self) -> AppResult<CycleReport> {
        let started = self.clock.now();
        self.summary.cycles += 1;

        let Some(frame) = self.mailbox.take_latest() else {
            self.clock.sleep(IDLE_POLL_INTERVAL);
            self.counter.update(self.clock.now());
            let key = self.display.poll_key(Duration::ZERO)?;
            return Ok(CycleReport {
                counter: self.counter.value(),
                exit: key == Some(Key::Escape),
                ..CycleReport::default()
            });
        };

        self.summary.frames_processed += 1;
        let detection = self.detector.detect(&frame.image);
        let features = encode(detection.as_ref().map(|d| &d.rectified));
        if detection.is_some() {
            self.summary.detections += 1;
        }

        if self.counter.update(self.clock.now()) {
            trace!(counter = self.counter.value(), "Frame counter tick");
        }

        let overlay = Overlay::counter(
            self.counter.value(),
            detection.as_ref().map(|d| d.corners),
        );
        self.display.show(CAMERA_WINDOW, &frame.image, &overlay)?;
        if let Some(detection) = &detection {
            let rectified = FrameImage::Luma(detection.rectified.clone());
            self.display
                .show(RECTIFIED_WINDOW, &rectified, &Overlay::default())?;
        }

        let key = self.display.poll_key(KEY_POLL_TIMEOUT)?;
        if key == Some(SNAPSHOT_KEY) {
            self.snapshot(detection.as_ref(), features.as_ref());
        }

        let slept = self.pacer.pace(&self.clock, started);
        trace!(
            sequence = frame.sequence,
            detected = detection.is_some(),
            slept_ms = slept.as_millis() as u64,
            "Cycle complete"
        );

        Ok(CycleReport {
            sequence: Some(frame.sequence),
            detected: detection.is_some(),
            features,
            counter: self.counter.value(),
            exit: key == Some(Key::Escape),
        })
    }

    /// Cycle until the display reports Escape
    pub fn run(&mut self) -> AppResult<RunSummary> {
        info!(
            strategy = %self.detector.strategy(),
            period_ms = self.pacer.period().map(|p| p.as_millis() as u64),
            "Main loop started"
        );

        loop {
            let report = self.step()?;
            if report.exit {
                break;
            }
        }

        let summary = self.summary();
        info!(
            cycles = summary.cycles,
            frames = summary.frames_processed,
            detections = summary.detections,
            counter = summary.counter,
            "Main loop finished"
        );
        Ok(summary)
    }

    fn snapshot(&mut self, detection: Option<&Detection>, features: Option<&FeatureEncoding>) {
        let (Some(detection), Some(features)) = (detection, features) else {
            debug!("Snapshot requested without a target in view");
            return;
        };

        match storage::save_snapshot(
            &self.snapshot_dir,
            &detection.rectified,
            &detection.corners,
            features,
        ) {
            Ok(_) => self.summary.snapshots += 1,
            Err(e) => warn!(error = %e, "Failed to save snapshot"),
        }
    }
}

/// Stop the capture thread, then release its source
///
/// Returns whether the source was released here. When the thread does not
/// finish within `timeout` it is detached and the source is released when
/// the thread eventually drops it.
pub fn shutdown_capture<S: FrameSource + 'static>(
    capture: CaptureLoopController<S>,
    timeout: Duration,
) -> bool {
    match capture.stop(timeout) {
        Some(mut source) => {
            source.release();
            info!("Capture stopped and device released");
            true
        }
        None => {
            warn!("Capture thread did not return its source");
            false
        }
    }
}

/// Run the full producer/consumer pipeline until the operator exits
pub fn run_session<S, D>(source: S, display: D, config: &Config) -> AppResult<RunSummary>
where
    S: FrameSource + 'static,
    D: Display,
{
    let mailbox = LatestFrame::new();
    let capture = spawn_capture(source, mailbox.clone())?;

    let mut main_loop = MainLoop::new(mailbox, display, SystemClock)
        .with_detector(QuadDetector::new(config.selection))
        .with_pacer(Pacer::new(config.frame_period()))
        .with_snapshot_dir(config.snapshot_dir());

    let result = main_loop.run();
    // Tear the display down before joining so the terminal is restored early
    drop(main_loop);

    shutdown_capture(capture, config.shutdown_timeout());
    result
}
