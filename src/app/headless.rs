// SPDX-License-Identifier: GPL-3.0-only

//! Display for runs without a terminal
//!
//! Nothing is rendered. Detections are summarized in the log once per
//! counter tick and Ctrl+C is reported as Escape.

use super::display::{Display, Key, Overlay};
use crate::backends::camera::FrameImage;
use crate::constants::RECTIFIED_WINDOW;
use crate::errors::{AppError, AppResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

pub struct HeadlessDisplay {
    interrupted: Arc<AtomicBool>,
    last_counter: Option<String>,
    frames: u64,
    targets: u64,
}

impl HeadlessDisplay {
    /// Install the process Ctrl+C handler and return a display observing it
    pub fn install() -> AppResult<Self> {
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .map_err(|e| AppError::Display(format!("failed to install Ctrl+C handler: {}", e)))?;

        info!("Running headless, press Ctrl+C to stop");
        Ok(Self::with_flag(interrupted))
    }

    /// Display observing an externally owned interrupt flag
    pub fn with_flag(interrupted: Arc<AtomicBool>) -> Self {
        Self {
            interrupted,
            last_counter: None,
            frames: 0,
            targets: 0,
        }
    }
}

impl Display for HeadlessDisplay {
    fn show(&mut self, window: &str, _image: &FrameImage, overlay: &Overlay) -> AppResult<()> {
        if window == RECTIFIED_WINDOW {
            self.targets += 1;
            return Ok(());
        }

        self.frames += 1;
        if overlay.text != self.last_counter {
            if self.last_counter.is_some() {
                info!(
                    counter = overlay.text.as_deref().unwrap_or_default(),
                    frames = self.frames,
                    targets = self.targets,
                    "Detection status"
                );
                self.frames = 0;
                self.targets = 0;
            }
            self.last_counter = overlay.text.clone();
        }
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> AppResult<Option<Key>> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Ok(Some(Key::Escape));
        }
        if !timeout.is_zero() {
            std::thread::sleep(timeout);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_maps_to_escape() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut display = HeadlessDisplay::with_flag(Arc::clone(&flag));

        assert_eq!(display.poll_key(Duration::ZERO).expect("poll"), None);
        flag.store(true, Ordering::SeqCst);
        assert_eq!(
            display.poll_key(Duration::ZERO).expect("poll"),
            Some(Key::Escape)
        );
    }

    #[test]
    fn test_counts_reset_each_tick() {
        let mut display = HeadlessDisplay::with_flag(Arc::new(AtomicBool::new(false)));
        let frame = FrameImage::Luma(image::GrayImage::new(2, 2));

        display
            .show("USB Camera", &frame, &Overlay::counter(0, None))
            .expect("show");
        display
            .show(RECTIFIED_WINDOW, &frame, &Overlay::default())
            .expect("show");
        assert_eq!((display.frames, display.targets), (1, 1));

        display
            .show("USB Camera", &frame, &Overlay::counter(1, None))
            .expect("show");
        assert_eq!((display.frames, display.targets), (0, 0));
    }
}
