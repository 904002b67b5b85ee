// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌──────────────┐  read()   ┌──────────────┐  publish()  ┌─────────────┐
//! │ FrameSource  │ ────────► │ capture loop │ ──────────► │ LatestFrame │
//! │ (V4L2 / mock)│           │  (thread)    │             │  (1 slot)   │
//! └──────────────┘           └──────────────┘             └─────────────┘
//! ```

pub mod frame_loop;
pub mod latest_frame;
pub mod types;
pub mod v4l2;

pub use frame_loop::{CaptureLoopController, StopToken, spawn_capture};
pub use latest_frame::LatestFrame;
pub use types::*;

/// A device yielding successive frames on demand
///
/// Implementations are moved onto the capture thread, so they only need to
/// be `Send`.
pub trait FrameSource: Send {
    /// Block until the next frame is available
    ///
    /// `None` means the read produced no usable data (empty buffer, decode
    /// failure, disconnected device). Callers skip it and read again.
    fn read(&mut self) -> Option<CameraFrame>;

    /// Stop streaming and close the device
    ///
    /// Calling it more than once has no further effect.
    fn release(&mut self);

    /// Format the device acknowledged when it was opened
    fn negotiated(&self) -> Option<&NegotiatedFormat> {
        None
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn read(&mut self) -> Option<CameraFrame> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn negotiated(&self) -> Option<&NegotiatedFormat> {
        (**self).negotiated()
    }
}
