// SPDX-License-Identifier: GPL-3.0-only

//! Polygon helpers for traced contours
//!
//! Every function treats its input as a closed polygon: the last point
//! connects back to the first.

use imageproc::point::Point;

/// Axis-aligned bounding box in pixel units, inclusive of both edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Width over height
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return f64::INFINITY;
        }
        self.width as f64 / self.height as f64
    }
}

/// Bounding box of a point set, `None` when empty
pub fn bounding_box(points: &[Point<i32>]) -> Option<BoundingBox> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(BoundingBox {
        x: min_x,
        y: min_y,
        width: (max_x - min_x) as u32 + 1,
        height: (max_y - min_y) as u32 + 1,
    })
}

/// Length of the closed boundary
pub fn perimeter(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut prev = points[points.len() - 1];
    for &p in points {
        let dx = (p.x - prev.x) as f64;
        let dy = (p.y - prev.y) as f64;
        total += dx.hypot(dy);
        prev = p;
    }
    total
}

/// Enclosed area via the shoelace formula
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0i64;
    let mut prev = points[points.len() - 1];
    for &p in points {
        twice += prev.x as i64 * p.y as i64 - p.x as i64 * prev.y as i64;
        prev = p;
    }
    (twice as f64 / 2.0).abs()
}

fn cross(o: Point<i32>, a: Point<i32>, b: Point<i32>) -> i64 {
    let (ax, ay) = ((a.x - o.x) as i64, (a.y - o.y) as i64);
    let (bx, by) = ((b.x - o.x) as i64, (b.y - o.y) as i64);
    ax * by - ay * bx
}

/// True when every turn along the polygon bends the same way
///
/// Collinear vertices do not break convexity, but a polygon whose turns are
/// all collinear is degenerate and rejected.
pub fn is_convex(points: &[Point<i32>]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }

    let mut sign = 0i64;
    for i in 0..n {
        let turn = cross(points[i], points[(i + 1) % n], points[(i + 2) % n]).signum();
        if turn == 0 {
            continue;
        }
        if sign == 0 {
            sign = turn;
        } else if turn != sign {
            return false;
        }
    }
    sign != 0
}

/// Drop points that lie in the middle of a straight run
///
/// Traced boundaries list every pixel; only the points where the direction
/// changes are needed to describe the same polygon.
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity(n / 2);
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let curr = points[i];
        let next = points[(i + 1) % n];

        let straight = cross(prev, curr, next) == 0 && {
            let d1 = (curr.x - prev.x, curr.y - prev.y);
            let d2 = (next.x - curr.x, next.y - curr.y);
            d1.0 as i64 * d2.0 as i64 + d1.1 as i64 * d2.1 as i64 > 0
        };
        if !straight {
            out.push(curr);
        }
    }

    if out.is_empty() {
        // Fully collinear input; keep its two extremes
        out.push(points[0]);
        out.push(points[n / 2]);
    }
    out
}

fn squared_distance(a: Point<i32>, b: Point<i32>) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> usize {
    let mut best = 0;
    let mut best_dist = -1;
    for (i, &p) in points.iter().enumerate() {
        let d = squared_distance(origin, p);
        if d > best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

/// Distance from `p` to the line through `a` and `b`
fn line_distance(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let len_sq = squared_distance(a, b);
    if len_sq == 0 {
        return (squared_distance(p, a) as f64).sqrt();
    }
    (cross(a, b, p) as f64).abs() / (len_sq as f64).sqrt()
}

/// Douglas-Peucker on an open chain
///
/// Appends the kept points to `out`, excluding the chain's final point so
/// consecutive chains can be concatenated without duplicates.
fn simplify_chain(chain: &[Point<i32>], epsilon: f64, out: &mut Vec<Point<i32>>) {
    let n = chain.len();
    if n == 0 {
        return;
    }
    if n < 3 {
        out.push(chain[0]);
        return;
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let mut split = start;
        let mut max_dist = 0.0;
        for i in start + 1..end {
            let d = line_distance(chain[i], chain[start], chain[end]);
            if d > max_dist {
                max_dist = d;
                split = i;
            }
        }
        if max_dist > epsilon {
            keep[split] = true;
            stack.push((split, end));
            stack.push((start, split));
        }
    }

    out.extend(
        chain[..n - 1]
            .iter()
            .zip(&keep[..n - 1])
            .filter(|&(_, &k)| k)
            .map(|(&p, _)| p),
    );
}

/// Douglas-Peucker approximation of a closed contour
///
/// The contour is cut at two mutually distant points and each half is
/// simplified on its own, so the result does not depend on where tracing
/// started. Vertices keep the contour's winding order.
pub fn approx_poly_dp(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if (squared_distance(points[a], points[b]) as f64).sqrt() <= epsilon {
        return vec![points[a]];
    }

    let (first, second) = (a.min(b), a.max(b));
    let forward = &points[first..=second];
    let wrapped: Vec<Point<i32>> = points[second..]
        .iter()
        .chain(&points[..=first])
        .copied()
        .collect();

    let mut poly = Vec::new();
    simplify_chain(forward, epsilon, &mut poly);
    simplify_chain(&wrapped, epsilon, &mut poly);
    poly
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(coords: &[(i32, i32)]) -> Vec<Point<i32>> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    /// Every pixel along the border of an axis-aligned square
    fn traced_square(x0: i32, y0: i32, side: i32) -> Vec<Point<i32>> {
        let mut out = Vec::new();
        for x in x0..x0 + side {
            out.push(Point::new(x, y0));
        }
        for y in y0..y0 + side {
            out.push(Point::new(x0 + side, y));
        }
        for x in (x0 + 1..=x0 + side).rev() {
            out.push(Point::new(x, y0 + side));
        }
        for y in (y0 + 1..=y0 + side).rev() {
            out.push(Point::new(x0, y));
        }
        out
    }

    #[test]
    fn test_area_and_perimeter_of_square() {
        let square = pts(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        assert_relative_eq!(polygon_area(&square), 100.0);
        assert_relative_eq!(perimeter(&square), 40.0);

        // Winding direction does not change the area
        let reversed: Vec<_> = square.iter().rev().copied().collect();
        assert_relative_eq!(polygon_area(&reversed), 100.0);
    }

    #[test]
    fn test_bounding_box() {
        let bbox = bounding_box(&pts(&[(3, 4), (12, 4), (12, 9)])).expect("non-empty");
        assert_eq!(
            bbox,
            BoundingBox {
                x: 3,
                y: 4,
                width: 10,
                height: 6
            }
        );
        assert!(bounding_box(&[]).is_none());
    }

    #[test]
    fn test_convexity() {
        assert!(is_convex(&pts(&[(0, 0), (4, 0), (4, 4), (0, 4)])));
        assert!(is_convex(&pts(&[(0, 4), (4, 4), (4, 0), (0, 0)])));
        // Dart shape with a reflex vertex
        assert!(!is_convex(&pts(&[(0, 0), (4, 2), (8, 0), (4, 8)])));
        // All points on one line
        assert!(!is_convex(&pts(&[(0, 0), (1, 1), (2, 2), (3, 3)])));
    }

    #[test]
    fn test_compress_chain_keeps_corners() {
        let traced = traced_square(5, 5, 20);
        let compressed = compress_chain(&traced);
        assert_eq!(compressed.len(), 4);
        assert_relative_eq!(polygon_area(&compressed), 400.0);
    }

    #[test]
    fn test_approx_square_from_every_start_point() {
        let traced = traced_square(10, 10, 50);
        for shift in [0, 7, 50, 123] {
            let mut rotated = traced.clone();
            rotated.rotate_left(shift);
            let eps = 0.02 * perimeter(&rotated);
            let poly = approx_poly_dp(&rotated, eps);
            assert_eq!(poly.len(), 4, "start offset {shift}");
            assert!(is_convex(&poly));
        }
    }

    #[test]
    fn test_approx_keeps_four_point_input() {
        let quad = pts(&[(0, 0), (40, 2), (42, 41), (1, 39)]);
        let poly = approx_poly_dp(&quad, 0.02 * perimeter(&quad));
        assert_eq!(poly, quad);
    }

    #[test]
    fn test_approx_collapses_tiny_contour() {
        let blob = pts(&[(0, 0), (1, 0), (1, 1), (0, 1)]);
        assert_eq!(approx_poly_dp(&blob, 5.0).len(), 1);
    }

    #[test]
    fn test_approx_triangle_stays_triangle() {
        let tri = pts(&[(0, 0), (30, 0), (30, 1), (15, 30)]);
        let poly = approx_poly_dp(&tri, 2.0);
        assert_eq!(poly.len(), 3);
    }
}
