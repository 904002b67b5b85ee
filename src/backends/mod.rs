// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! # Architecture
//!
//! The backend layer abstracts hardware access, providing a consistent API
//! regardless of the underlying capture method:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            App Layer (MainLoop)             │
//! └────────────────────┬────────────────────────┘
//!                      │ LatestFrame
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                  │
//! │     ┌──────────────────────────────┐        │
//! │     │ Camera (FrameSource / V4L2)  │        │
//! │     └──────────────────────────────┘        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Camera backend with device enumeration and frame capture

pub mod camera;
