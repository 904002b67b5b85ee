// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Detection thresholds are fixed policy, not tuning knobs. Changing any of
//! them changes which targets are accepted.

use std::time::Duration;

/// Edge length of the rectified target image in pixels
pub const RECTIFIED_SIZE: u32 = 28;

/// Number of values in the normalized feature vector (28 * 28)
pub const FEATURE_LEN: usize = (RECTIFIED_SIZE * RECTIFIED_SIZE) as usize;

/// Number of values in the complementary encoding (two per pixel)
pub const COMPLEMENTARY_LEN: usize = FEATURE_LEN * 2;

/// Gaussian sigma used before edge detection.
///
/// Matches the sigma a 5x5 kernel gets when it is derived from the kernel size.
pub const BLUR_SIGMA: f32 = 1.1;

/// Canny hysteresis thresholds
pub const CANNY_LOW_THRESHOLD: f32 = 50.0;
pub const CANNY_HIGH_THRESHOLD: f32 = 150.0;

/// Boundaries enclosing less than this many square pixels are ignored
pub const MIN_CONTOUR_AREA: f64 = 1000.0;

/// Polygon approximation tolerance as a fraction of the boundary arc length
pub const APPROX_EPSILON_RATIO: f64 = 0.02;

/// Accepted bounding-box width/height range for a candidate quadrilateral
pub const MIN_ASPECT_RATIO: f64 = 0.8;
pub const MAX_ASPECT_RATIO: f64 = 1.2;

/// Consumer back-off when no frame has been published yet
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default period for the fixed-cadence loop (10 Hz)
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(100);

/// Interval between frame counter increments
pub const COUNTER_TICK: Duration = Duration::from_secs(1);

/// How long the display waits for a key press each cycle
pub const KEY_POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Keycode reported for the escape key
pub const ESCAPE_KEYCODE: u32 = 27;

/// Upper bound on waiting for the capture thread during shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Window receiving the annotated camera frame
pub const CAMERA_WINDOW: &str = "USB Camera";

/// Window receiving the rectified target
pub const RECTIFIED_WINDOW: &str = "Rectified";

/// Fixed overlay position for the frame counter (column, row)
pub const OVERLAY_POSITION: (u16, u16) = (1, 0);

/// Default capture request
pub const DEFAULT_DEVICE_INDEX: usize = 0;
pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
pub const DEFAULT_CAPTURE_FPS: u32 = 30;
pub const DEFAULT_PIXEL_FORMAT: &str = "MJPG";

/// Number of mmap buffers requested from the driver
pub const CAPTURE_BUFFER_COUNT: u32 = 4;

/// Application directory name under the user config / pictures dirs
pub const APP_DIR_NAME: &str = "quadcam";
