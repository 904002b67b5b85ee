// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end detection and encoding on synthetic frames

use approx::assert_relative_eq;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use quadcam::backends::camera::FrameImage;
use quadcam::constants::{COMPLEMENTARY_LEN, FEATURE_LEN, RECTIFIED_SIZE};
use quadcam::pipelines::detection::quad_candidate;
use quadcam::pipelines::{QuadDetector, SelectionStrategy, encode};

const SIZE: u32 = 320;

/// White frame with a centered black square of `side` pixels
fn centered_square(side: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(SIZE, SIZE, Rgb([255, 255, 255]));
    let offset = ((SIZE - side) / 2) as i32;
    draw_filled_rect_mut(
        &mut img,
        Rect::at(offset, offset).of_size(side, side),
        Rgb([0, 0, 0]),
    );
    img
}

#[test]
fn test_centered_square_end_to_end() {
    let frame = FrameImage::Rgb(centered_square(200));
    let detection = QuadDetector::default()
        .detect(&frame)
        .expect("square should be detected");

    assert_eq!(
        detection.rectified.dimensions(),
        (RECTIFIED_SIZE, RECTIFIED_SIZE)
    );

    let features = encode(Some(&detection.rectified)).expect("features");
    assert_eq!(features.normalized.len(), FEATURE_LEN);
    assert_eq!(features.complementary.len(), COMPLEMENTARY_LEN);

    // The warp maps the square onto the whole 28x28 grid, so its interior
    // fills the center while the outermost ring straddles the border
    let edge = RECTIFIED_SIZE as usize;
    for y in 4..edge - 4 {
        for x in 4..edge - 4 {
            let v = features.normalized[y * edge + x];
            assert!(v < 0.1, "interior ({x}, {y}) = {v}");
        }
    }

    for ((lo, hi), &v) in features.pairs().zip(&features.normalized) {
        assert_relative_eq!(lo + hi, 1.0, epsilon = 1e-6);
        assert_eq!(hi, v);
    }
}

#[test]
fn test_square_in_frame_with_background_margin() {
    // Small square: the rectified image is all target, but the detection
    // outline sits where the input frame was white around it
    let frame = FrameImage::Rgb(centered_square(100));
    let detection = QuadDetector::default()
        .detect(&frame)
        .expect("square should be detected");

    let (x0, y0) = detection.corners.top_left;
    let (x1, y1) = detection.corners.bottom_right;
    assert!((105..=115).contains(&x0) && (105..=115).contains(&y0));
    assert!((205..=215).contains(&x1) && (205..=215).contains(&y1));
}

#[test]
fn test_blank_frame_has_no_detection() {
    let frame = FrameImage::Rgb(RgbImage::from_pixel(SIZE, SIZE, Rgb([255, 255, 255])));
    let detection = QuadDetector::default().detect(&frame);

    assert!(detection.is_none());
    assert!(encode(detection.as_ref().map(|d| &d.rectified)).is_none());
}

#[test]
fn test_rectangle_outside_aspect_range_is_ignored() {
    let mut img = GrayImage::from_pixel(SIZE, SIZE, Luma([255]));
    draw_filled_rect_mut(&mut img, Rect::at(40, 100).of_size(240, 120), Luma([0]));
    assert!(QuadDetector::default().detect_luma(&img).is_none());
}

#[test]
fn test_small_square_is_ignored() {
    // 20 x 20 encloses well under the minimum area
    let mut img = GrayImage::from_pixel(SIZE, SIZE, Luma([255]));
    draw_filled_rect_mut(&mut img, Rect::at(150, 150).of_size(20, 20), Luma([0]));
    assert!(QuadDetector::default().detect_luma(&img).is_none());
}

#[test]
fn test_perspective_quad_is_rectified() {
    // Mildly skewed dark quadrilateral, still within the aspect bounds
    let mut img = GrayImage::from_pixel(SIZE, SIZE, Luma([255]));
    let quad = [
        Point::new(70, 60),
        Point::new(250, 75),
        Point::new(240, 250),
        Point::new(80, 240),
    ];
    draw_polygon_mut(&mut img, &quad, Luma([0]));

    let detection = QuadDetector::default()
        .detect_luma(&img)
        .expect("skewed quad should be detected");
    assert!(detection.corners.is_distinct());

    let center = detection.rectified.get_pixel(RECTIFIED_SIZE / 2, RECTIFIED_SIZE / 2)[0];
    assert!(center < 30, "center intensity {center}");
}

#[test]
fn test_selection_strategies_differ_on_two_targets() {
    // Smaller square first in raster order, larger one below it
    let mut img = GrayImage::from_pixel(400, 400, Luma([255]));
    draw_filled_rect_mut(&mut img, Rect::at(20, 20).of_size(60, 60), Luma([0]));
    draw_filled_rect_mut(&mut img, Rect::at(150, 150).of_size(200, 200), Luma([0]));

    let first = QuadDetector::new(SelectionStrategy::FirstMatch)
        .detect_luma(&img)
        .expect("first match");
    let largest = QuadDetector::new(SelectionStrategy::LargestArea)
        .detect_luma(&img)
        .expect("largest area");

    assert!(first.area < largest.area);
    assert!(first.corners.top_left.0 < 100);
    assert!(largest.corners.top_left.0 > 100);
}

#[test]
fn test_candidate_filters_on_polygons() {
    let square = vec![
        Point::new(0, 0),
        Point::new(50, 0),
        Point::new(50, 50),
        Point::new(0, 50),
    ];
    assert!(quad_candidate(&square).is_some());

    // Same area, stretched outside [0.8, 1.2]
    let wide = vec![
        Point::new(0, 0),
        Point::new(100, 0),
        Point::new(100, 25),
        Point::new(0, 25),
    ];
    assert!(quad_candidate(&wide).is_none());
}
