// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame processing on the consumer side
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ Camera Frame │ ──▶ │  Detection        │ ──▶ │  Encoding        │
//! │ (RGB / Luma) │     │  - edges/contours │     │  - 784 normalized│
//! │              │     │  - quad filters   │     │  - 1568 pairs    │
//! │              │     │  - 28×28 warp     │     │                  │
//! └──────────────┘     └───────────────────┘     └──────────────────┘
//! ```
//!
//! Both stages run synchronously on the calling thread and hold no state
//! between frames.
//!
//! # Modules
//!
//! - [`detection`]: square-target search and rectification
//! - [`encoding`]: normalized and complementary feature vectors

pub mod detection;
pub mod encoding;

pub use detection::{Detection, QuadDetector, SelectionStrategy};
pub use encoding::{FeatureEncoding, encode};
