// SPDX-License-Identifier: GPL-3.0-only

//! Single-slot mailbox between the capture thread and the consumer
//!
//! The slot only ever holds the newest frame. Publishing overwrites whatever
//! is there, so a slow consumer silently skips frames instead of queueing
//! them. The lock is held for one replace or one clone, never across a
//! camera read or a processing pass.

use super::types::CameraFrame;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Slot {
    frame: Option<CameraFrame>,
    generation: u64,
}

/// Shared latest-frame buffer
///
/// Cloning the handle shares the slot; hand one clone to the producer and
/// keep another for the consumer.
#[derive(Clone, Default)]
pub struct LatestFrame {
    slot: Arc<Mutex<Slot>>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A panicking holder cannot leave a half-written frame behind: the
        // slot is replaced in a single assignment.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the slot contents unconditionally
    pub fn publish(&self, frame: CameraFrame) {
        let previous = {
            let mut slot = self.lock();
            slot.generation += 1;
            slot.frame.replace(frame)
        };
        // Free the replaced buffer outside the lock
        drop(previous);
    }

    /// Deep copy of the current frame, or `None` before the first publish
    pub fn take_latest(&self) -> Option<CameraFrame> {
        self.lock().frame.clone()
    }

    /// Number of frames published so far
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }
}

impl std::fmt::Debug for LatestFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.lock();
        f.debug_struct("LatestFrame")
            .field("generation", &slot.generation)
            .field("sequence", &slot.frame.as_ref().map(|frame| frame.sequence))
            .finish()
    }
}
