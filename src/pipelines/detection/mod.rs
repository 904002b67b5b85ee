// SPDX-License-Identifier: GPL-3.0-only

//! Square-target detection and rectification
//!
//! ```text
//! frame ─► luminance ─► blur ─► Canny ─► outer contours
//!                                              │
//!            ┌─────────────── per contour ─────┘
//!            ▼
//!   area ≥ min ─► Douglas-Peucker ─► 4 vertices? convex? aspect ok?
//!                                              │
//!                          selected quad ◄─────┘
//!                                │
//!               corner ordering ─► homography ─► 28×28 rectified
//! ```
//!
//! "No quadrilateral in this frame" is a normal outcome and is returned as
//! `None`, never as an error.

pub mod corners;
pub mod geometry;

pub use corners::{OrderedCorners, order_corners};

use crate::backends::camera::FrameImage;
use crate::constants::{
    APPROX_EPSILON_RATIO, BLUR_SIGMA, CANNY_HIGH_THRESHOLD, CANNY_LOW_THRESHOLD,
    MAX_ASPECT_RATIO, MIN_ASPECT_RATIO, MIN_CONTOUR_AREA, RECTIFIED_SIZE,
};
use geometry::{approx_poly_dp, bounding_box, compress_chain, is_convex, perimeter, polygon_area};
use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// How to choose among several qualifying quadrilaterals
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// First qualifying contour in tracing order; later ones are not examined
    #[default]
    FirstMatch,
    /// Qualifying contour with the largest enclosed area
    LargestArea,
}

impl std::fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionStrategy::FirstMatch => write!(f, "first-match"),
            SelectionStrategy::LargestArea => write!(f, "largest-area"),
        }
    }
}

/// A contour that passed every quadrilateral filter
#[derive(Debug, Clone, PartialEq)]
pub struct QuadCandidate {
    /// Simplified polygon vertices in contour order
    pub quad: [Point<i32>; 4],
    /// Area enclosed by the traced contour
    pub area: f64,
}

/// Result of one successful detection pass
#[derive(Debug, Clone)]
pub struct Detection {
    pub quad: [Point<i32>; 4],
    pub corners: OrderedCorners,
    pub area: f64,
    /// Warped luminance, `RECTIFIED_SIZE` pixels square
    pub rectified: GrayImage,
}

/// Single-channel view of a frame, `None` for an empty frame
pub fn to_luminance(image: &FrameImage) -> Option<GrayImage> {
    if image.is_empty() {
        return None;
    }
    Some(match image {
        FrameImage::Rgb(rgb) => image::imageops::grayscale(rgb),
        FrameImage::Luma(gray) => gray.clone(),
    })
}

/// Blurred two-threshold edge map
pub fn edge_map(gray: &GrayImage) -> GrayImage {
    let blurred = imageproc::filter::gaussian_blur_f32(gray, BLUR_SIGMA);
    imageproc::edges::canny(&blurred, CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD)
}

/// Outermost boundaries of an edge map in discovery order
///
/// Holes and anything nested inside another boundary are skipped. Points are
/// chain-compressed so straight runs contribute only their endpoints.
pub fn external_contours(edges: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| compress_chain(&c.points))
        .collect()
}

/// Apply the quadrilateral filters to one contour
pub fn quad_candidate(contour: &[Point<i32>]) -> Option<QuadCandidate> {
    let area = polygon_area(contour);
    if area < MIN_CONTOUR_AREA {
        return None;
    }

    let approx = approx_poly_dp(contour, APPROX_EPSILON_RATIO * perimeter(contour));
    let quad: [Point<i32>; 4] = approx.as_slice().try_into().ok()?;
    if !is_convex(&quad) {
        trace!(area, "Rejecting concave quadrilateral");
        return None;
    }

    let aspect = bounding_box(&quad)?.aspect_ratio();
    if !(MIN_ASPECT_RATIO..=MAX_ASPECT_RATIO).contains(&aspect) {
        trace!(area, aspect, "Rejecting quadrilateral by aspect ratio");
        return None;
    }

    Some(QuadCandidate { quad, area })
}

/// Warp the ordered corners onto the canonical square
pub fn rectify(gray: &GrayImage, corners: &OrderedCorners) -> Option<GrayImage> {
    let edge = (RECTIFIED_SIZE - 1) as f32;
    let target = [(0.0, 0.0), (edge, 0.0), (edge, edge), (0.0, edge)];

    let projection = Projection::from_control_points(corners.control_points(), target)?;
    let mut out = GrayImage::new(RECTIFIED_SIZE, RECTIFIED_SIZE);
    warp_into(gray, &projection, Interpolation::Bilinear, Luma([0]), &mut out);
    Some(out)
}

/// Fixed-policy square detector
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadDetector {
    strategy: SelectionStrategy,
}

impl QuadDetector {
    pub fn new(strategy: SelectionStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// Pick a quadrilateral from contours according to the strategy
    pub fn select<'a, I>(&self, contours: I) -> Option<QuadCandidate>
    where
        I: IntoIterator<Item = &'a [Point<i32>]>,
    {
        let mut candidates = contours.into_iter().filter_map(quad_candidate);
        match self.strategy {
            SelectionStrategy::FirstMatch => candidates.next(),
            SelectionStrategy::LargestArea => candidates.fold(None, |best, c| match best {
                Some(b) if b.area >= c.area => Some(b),
                _ => Some(c),
            }),
        }
    }

    /// Run the full pipeline on one frame
    pub fn detect(&self, frame: &FrameImage) -> Option<Detection> {
        let gray = to_luminance(frame)?;
        self.detect_luma(&gray)
    }

    /// Run the pipeline on an already single-channel image
    pub fn detect_luma(&self, gray: &GrayImage) -> Option<Detection> {
        if gray.width() == 0 || gray.height() == 0 {
            return None;
        }

        let edges = edge_map(gray);
        let contours = external_contours(&edges);
        trace!(contours = contours.len(), "Traced outer contours");

        let candidate = self.select(contours.iter().map(Vec::as_slice))?;
        let corners = order_corners(&candidate.quad);
        if !corners.is_distinct() {
            debug!(?corners, "Corner labels collapsed, quad is near 45°");
        }

        let Some(rectified) = rectify(gray, &corners) else {
            debug!(?corners, "Degenerate corners, no projective solution");
            return None;
        };

        debug!(
            area = candidate.area,
            top_left = ?corners.top_left,
            bottom_right = ?corners.bottom_right,
            "Quadrilateral detected"
        );

        Some(Detection {
            quad: candidate.quad,
            corners,
            area: candidate.area,
            rectified,
        })
    }
}
