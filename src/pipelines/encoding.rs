// SPDX-License-Identifier: GPL-3.0-only

//! Feature vectors derived from the rectified target

use image::GrayImage;
use serde::Serialize;

/// Classifier input for one rectified image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureEncoding {
    /// Row-major intensities scaled to `[0, 1]`
    pub normalized: Vec<f32>,
    /// `(1 - v, v)` per normalized value, flattened
    pub complementary: Vec<f32>,
}

impl FeatureEncoding {
    /// Complementary values grouped back into per-pixel pairs
    pub fn pairs(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.complementary.chunks_exact(2).map(|p| (p[0], p[1]))
    }
}

/// Encode a rectified image; no image means no features this cycle
pub fn encode(rectified: Option<&GrayImage>) -> Option<FeatureEncoding> {
    let image = rectified?;

    let normalized: Vec<f32> = image.as_raw().iter().map(|&p| p as f32 / 255.0).collect();
    let complementary = normalized.iter().flat_map(|&v| [1.0 - v, v]).collect();

    Some(FeatureEncoding {
        normalized,
        complementary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{COMPLEMENTARY_LEN, FEATURE_LEN, RECTIFIED_SIZE};
    use approx::assert_relative_eq;
    use image::Luma;

    #[test]
    fn test_absent_image_encodes_to_nothing() {
        assert!(encode(None).is_none());
    }

    #[test]
    fn test_lengths_and_row_major_order() {
        let mut img = GrayImage::new(RECTIFIED_SIZE, RECTIFIED_SIZE);
        img.put_pixel(1, 0, Luma([255]));
        img.put_pixel(0, 1, Luma([51]));

        let enc = encode(Some(&img)).expect("image present");
        assert_eq!(enc.normalized.len(), FEATURE_LEN);
        assert_eq!(enc.complementary.len(), COMPLEMENTARY_LEN);

        assert_relative_eq!(enc.normalized[1], 1.0);
        assert_relative_eq!(enc.normalized[RECTIFIED_SIZE as usize], 0.2);
        assert_relative_eq!(enc.complementary[2], 0.0);
        assert_relative_eq!(enc.complementary[3], 1.0);
    }

    #[test]
    fn test_pairs_are_complementary() {
        let img = GrayImage::from_fn(RECTIFIED_SIZE, RECTIFIED_SIZE, |x, y| {
            Luma([((x * 9 + y * 7) % 256) as u8])
        });
        let enc = encode(Some(&img)).expect("image present");

        for ((lo, hi), &v) in enc.pairs().zip(&enc.normalized) {
            assert_relative_eq!(lo + hi, 1.0, epsilon = 1e-6);
            assert_eq!(hi, v);
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
