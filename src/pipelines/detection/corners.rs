// SPDX-License-Identifier: GPL-3.0-only

//! Canonical corner labelling for a detected quadrilateral
//!
//! Labels come from the classic sum/difference rule:
//!
//! | role         | rule               |
//! |--------------|--------------------|
//! | top-left     | smallest `x + y`   |
//! | bottom-right | largest `x + y`    |
//! | top-right    | smallest `y - x`   |
//! | bottom-left  | largest `y - x`    |
//!
//! The rule assumes the quad is roughly axis-aligned. For a square rotated
//! near 45° two corners share the extreme sum or difference and the same
//! point can win two roles, producing a folded warp. That case is reported
//! by [`OrderedCorners::is_distinct`] rather than corrected here.
//!
//! Ties are broken toward the smaller `(y, x)`, so the labelling never
//! depends on the order the points arrive in.

use imageproc::point::Point;
use serde::Serialize;
use std::cmp::Reverse;

/// Quad corners in top-left, top-right, bottom-right, bottom-left order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderedCorners {
    pub top_left: (i32, i32),
    pub top_right: (i32, i32),
    pub bottom_right: (i32, i32),
    pub bottom_left: (i32, i32),
}

impl OrderedCorners {
    pub fn as_array(&self) -> [(i32, i32); 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Control points for a projective solve, in canonical order
    pub fn control_points(&self) -> [(f32, f32); 4] {
        self.as_array().map(|(x, y)| (x as f32, y as f32))
    }

    /// False when one point was assigned to more than one role
    pub fn is_distinct(&self) -> bool {
        let corners = self.as_array();
        (0..4).all(|i| (i + 1..4).all(|j| corners[i] != corners[j]))
    }
}

/// Label four points with the sum/difference rule
pub fn order_corners(points: &[Point<i32>; 4]) -> OrderedCorners {
    let sum = |p: &Point<i32>| p.x + p.y;
    let diff = |p: &Point<i32>| p.y - p.x;

    let min_by = |key: &dyn Fn(&Point<i32>) -> i32| {
        let p = points
            .iter()
            .min_by_key(|p| (key(p), p.y, p.x))
            .unwrap_or(&points[0]);
        (p.x, p.y)
    };
    let max_by = |key: &dyn Fn(&Point<i32>) -> i32| {
        let p = points
            .iter()
            .max_by_key(|p| (key(p), Reverse(p.y), Reverse(p.x)))
            .unwrap_or(&points[0]);
        (p.x, p.y)
    };

    OrderedCorners {
        top_left: min_by(&sum),
        top_right: min_by(&diff),
        bottom_right: max_by(&sum),
        bottom_left: max_by(&diff),
    }
}
