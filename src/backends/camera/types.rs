// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use image::{GrayImage, RgbImage};
use std::time::Instant;

/// Pixel storage for a captured or derived frame
///
/// Cloning deep-copies the pixel buffer, so a clone handed to another thread
/// never aliases the producer's memory.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameImage {
    /// 8-bit RGB color
    Rgb(RgbImage),
    /// 8-bit single-channel luminance
    Luma(GrayImage),
}

impl FrameImage {
    pub fn width(&self) -> u32 {
        match self {
            FrameImage::Rgb(img) => img.width(),
            FrameImage::Luma(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            FrameImage::Rgb(img) => img.height(),
            FrameImage::Luma(img) => img.height(),
        }
    }

    /// A frame with no pixels carries no data
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Channel count of the underlying buffer
    pub fn channels(&self) -> u8 {
        match self {
            FrameImage::Rgb(_) => 3,
            FrameImage::Luma(_) => 1,
        }
    }

    /// RGB value at `(x, y)`, clamped to the image bounds
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if self.is_empty() {
            return (0, 0, 0);
        }
        let x = x.min(self.width() - 1);
        let y = y.min(self.height() - 1);
        match self {
            FrameImage::Rgb(img) => {
                let p = img.get_pixel(x, y);
                (p[0], p[1], p[2])
            }
            FrameImage::Luma(img) => {
                let v = img.get_pixel(x, y)[0];
                (v, v, v)
            }
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub image: FrameImage,
    /// Monotonic sequence number assigned by the source
    pub sequence: u64,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    pub fn new(image: FrameImage, sequence: u64) -> Self {
        Self {
            image,
            sequence,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}

/// Device information from V4L2 capability
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Zero-based index (`/dev/videoN`)
    pub index: usize,
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Device path (e.g., /dev/video0)
    pub path: String,
}

/// Framerate as a fraction (numerator/denominator)
/// Stores exact framerate to handle NTSC rates like 59.94fps (60000/1001)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    /// Create a new framerate from numerator and denominator
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    /// Create a framerate from an integer (e.g., 30 becomes 30/1)
    pub fn from_int(fps: u32) -> Self {
        Self { num: fps, denom: 1 }
    }

    /// Build from a V4L2 frame interval (seconds per frame)
    pub fn from_interval(numerator: u32, denominator: u32) -> Self {
        Self::new(denominator, numerator)
    }

    /// Get the framerate as a floating point value
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    /// Get the rounded integer framerate
    pub fn as_int(&self) -> u32 {
        self.as_f64().round() as u32
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show decimal for non-integer framerates (NTSC)
        if self.denom != 1 {
            write!(f, "{:.2}", self.as_f64())
        } else {
            write!(f, "{}", self.num)
        }
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self { num: 30, denom: 1 }
    }
}

/// Camera format description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: Option<Framerate>,
    pub pixel_format: String, // FourCC code (e.g., "MJPG", "YUYV", "GREY")
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(fps) = &self.framerate {
            write!(
                f,
                "{}x{} {} @ {}fps",
                self.width, self.height, self.pixel_format, fps
            )
        } else {
            write!(f, "{}x{} {}", self.width, self.height, self.pixel_format)
        }
    }
}

/// Capture settings asked of the device
///
/// Drivers treat every field as a hint; what they actually apply is recorded
/// in [`NegotiatedFormat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRequest {
    pub width: u32,
    pub height: u32,
    pub fps: Option<u32>,
    pub pixel_format: String,
}

impl FormatRequest {
    pub fn as_format(&self) -> CameraFormat {
        CameraFormat {
            width: self.width,
            height: self.height,
            framerate: self.fps.map(Framerate::from_int),
            pixel_format: self.pixel_format.clone(),
        }
    }
}

/// One field the device did not honor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatMismatch {
    Resolution {
        requested: (u32, u32),
        actual: (u32, u32),
    },
    PixelFormat {
        requested: String,
        actual: String,
    },
    Framerate {
        requested: u32,
        actual: Option<Framerate>,
    },
}

impl std::fmt::Display for FormatMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatMismatch::Resolution { requested, actual } => write!(
                f,
                "resolution {}x{} requested, {}x{} applied",
                requested.0, requested.1, actual.0, actual.1
            ),
            FormatMismatch::PixelFormat { requested, actual } => {
                write!(f, "pixel format {} requested, {} applied", requested, actual)
            }
            FormatMismatch::Framerate { requested, actual } => match actual {
                Some(fps) => write!(f, "{}fps requested, {}fps applied", requested, fps),
                None => write!(f, "{}fps requested, device reports no rate", requested),
            },
        }
    }
}

/// Request/acknowledgment pair from device configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub requested: FormatRequest,
    pub actual: CameraFormat,
}

impl NegotiatedFormat {
    /// Every requested field the device reported back differently
    pub fn mismatches(&self) -> Vec<FormatMismatch> {
        let mut out = Vec::new();

        let requested_res = (self.requested.width, self.requested.height);
        let actual_res = (self.actual.width, self.actual.height);
        if requested_res != actual_res {
            out.push(FormatMismatch::Resolution {
                requested: requested_res,
                actual: actual_res,
            });
        }

        if !self
            .requested
            .pixel_format
            .eq_ignore_ascii_case(self.actual.pixel_format.trim())
        {
            out.push(FormatMismatch::PixelFormat {
                requested: self.requested.pixel_format.clone(),
                actual: self.actual.pixel_format.clone(),
            });
        }

        if let Some(fps) = self.requested.fps {
            let honored = self.actual.framerate.is_some_and(|f| f.as_int() == fps);
            if !honored {
                out.push(FormatMismatch::Framerate {
                    requested: fps,
                    actual: self.actual.framerate,
                });
            }
        }

        out
    }

    pub fn is_exact(&self) -> bool {
        self.mismatches().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FormatRequest {
        FormatRequest {
            width: 640,
            height: 480,
            fps: Some(30),
            pixel_format: "MJPG".to_string(),
        }
    }

    #[test]
    fn test_exact_negotiation_has_no_mismatch() {
        let negotiated = NegotiatedFormat {
            requested: request(),
            actual: request().as_format(),
        };
        assert!(negotiated.is_exact());
    }

    #[test]
    fn test_negotiation_reports_each_discrepancy() {
        let negotiated = NegotiatedFormat {
            requested: request(),
            actual: CameraFormat {
                width: 1280,
                height: 720,
                framerate: Some(Framerate::from_interval(1001, 30000)),
                pixel_format: "YUYV".to_string(),
            },
        };

        let mismatches = negotiated.mismatches();
        assert_eq!(mismatches.len(), 2);
        assert!(matches!(mismatches[0], FormatMismatch::Resolution { .. }));
        assert!(matches!(mismatches[1], FormatMismatch::PixelFormat { .. }));
    }

    #[test]
    fn test_missing_framerate_is_a_mismatch() {
        let mut actual = request().as_format();
        actual.framerate = None;
        let negotiated = NegotiatedFormat {
            requested: request(),
            actual,
        };
        assert_eq!(
            negotiated.mismatches(),
            vec![FormatMismatch::Framerate {
                requested: 30,
                actual: None
            }]
        );
    }

    #[test]
    fn test_frame_clone_is_deep() {
        let mut original = CameraFrame::new(FrameImage::Luma(GrayImage::new(4, 4)), 7);
        let copy = original.clone();
        if let FrameImage::Luma(img) = &mut original.image {
            img.put_pixel(0, 0, image::Luma([200]));
        }
        assert_eq!(copy.image.rgb_at(0, 0), (0, 0, 0));
        assert_eq!(copy.sequence, 7);
    }

    #[test]
    fn test_empty_frame() {
        let frame = CameraFrame::new(FrameImage::Rgb(RgbImage::new(0, 0)), 0);
        assert!(frame.is_empty());
    }
}
