// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use quadcam::constants::*;
use std::time::Duration;

#[test]
fn test_feature_lengths_follow_rectified_size() {
    assert_eq!(RECTIFIED_SIZE, 28);
    assert_eq!(FEATURE_LEN, 784);
    assert_eq!(COMPLEMENTARY_LEN, 2 * FEATURE_LEN);
}

#[test]
fn test_detection_thresholds() {
    assert_eq!(CANNY_LOW_THRESHOLD, 50.0);
    assert_eq!(CANNY_HIGH_THRESHOLD, 150.0);
    assert!(CANNY_LOW_THRESHOLD < CANNY_HIGH_THRESHOLD);
    assert_eq!(MIN_CONTOUR_AREA, 1000.0);
    assert_eq!(APPROX_EPSILON_RATIO, 0.02);
}

#[test]
fn test_aspect_bounds_contain_square() {
    assert!(MIN_ASPECT_RATIO < 1.0 && 1.0 < MAX_ASPECT_RATIO);
    assert_eq!((MIN_ASPECT_RATIO, MAX_ASPECT_RATIO), (0.8, 1.2));
}

#[test]
fn test_timing_constants() {
    assert_eq!(IDLE_POLL_INTERVAL, Duration::from_millis(10));
    assert_eq!(DEFAULT_FRAME_PERIOD, Duration::from_millis(100));
    assert_eq!(COUNTER_TICK, Duration::from_secs(1));
    assert!(
        DEFAULT_FRAME_PERIOD < COUNTER_TICK,
        "Paced cycles must be shorter than a counter tick"
    );
}

#[test]
fn test_escape_keycode() {
    assert_eq!(ESCAPE_KEYCODE, 27);
}
