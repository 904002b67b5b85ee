// SPDX-License-Identifier: GPL-3.0-only

//! Direct V4L2 capture
//!
//! Opens `/dev/videoN` through the v4l crate, negotiates a format
//! best-effort and decodes each mmap buffer into an owned [`FrameImage`].
//! MJPG, YUYV and GREY buffers are understood; anything else is rejected
//! when the device is opened.

use super::FrameSource;
use super::types::*;
use crate::errors::CameraError;
use image::{GrayImage, ImageFormat, RgbImage};
use std::path::Path;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::framesize::FrameSizeEnum;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::video::capture::Parameters;
use v4l::{Format, FourCC};

const FOURCC_MJPG: &[u8; 4] = b"MJPG";
const FOURCC_YUYV: &[u8; 4] = b"YUYV";
const FOURCC_GREY: &[u8; 4] = b"GREY";

/// Pixel layouts the decoder understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferLayout {
    Mjpeg,
    Yuyv,
    Grey,
}

impl BufferLayout {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        if fourcc == FourCC::new(FOURCC_MJPG) {
            Some(Self::Mjpeg)
        } else if fourcc == FourCC::new(FOURCC_YUYV) {
            Some(Self::Yuyv)
        } else if fourcc == FourCC::new(FOURCC_GREY) {
            Some(Self::Grey)
        } else {
            None
        }
    }
}

/// Camera opened through V4L2 with an active mmap stream
pub struct V4l2Source {
    index: usize,
    // Declared before `device` so the stream is torn down first on drop
    stream: Option<MmapStream<'static>>,
    device: Option<Device>,
    negotiated: NegotiatedFormat,
    layout: BufferLayout,
    stride: u32,
    sequence: u64,
    failed_reads: u64,
}

impl V4l2Source {
    /// Open camera `index` and configure it as close to `request` as it allows
    pub fn open(index: usize, request: &FormatRequest) -> Result<Self, CameraError> {
        let unavailable = |reason: String| CameraError::DeviceUnavailable { index, reason };

        info!(index, request = %request.as_format(), "Opening V4L2 device");

        let device = Device::new(index).map_err(|e| unavailable(e.to_string()))?;

        let requested_fourcc = fourcc_from_str(&request.pixel_format);
        let format = Format::new(request.width, request.height, requested_fourcc);
        let applied = match device.set_format(&format) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "Could not set format, using current device format");
                device.format().map_err(|e| unavailable(e.to_string()))?
            }
        };

        let framerate = match request.fps {
            Some(fps) => match device.set_params(&Parameters::with_fps(fps)) {
                Ok(params) => Some(Framerate::from_interval(
                    params.interval.numerator,
                    params.interval.denominator,
                )),
                Err(e) => {
                    warn!(error = %e, fps, "Could not set frame rate");
                    current_framerate(&device)
                }
            },
            None => current_framerate(&device),
        };

        let negotiated = NegotiatedFormat {
            requested: request.clone(),
            actual: CameraFormat {
                width: applied.width,
                height: applied.height,
                framerate,
                pixel_format: fourcc_to_string(applied.fourcc),
            },
        };

        info!(actual = %negotiated.actual, "V4L2 format configured");
        for mismatch in negotiated.mismatches() {
            warn!(%mismatch, "Device did not honor capture request");
        }

        let layout = BufferLayout::from_fourcc(applied.fourcc).ok_or_else(|| {
            CameraError::FormatNotSupported(negotiated.actual.pixel_format.clone())
        })?;

        let stream = MmapStream::with_buffers(
            &device,
            Type::VideoCapture,
            crate::constants::CAPTURE_BUFFER_COUNT,
        )
        .map_err(|e| unavailable(format!("failed to start stream: {}", e)))?;

        info!(index, "V4L2 capture stream started");

        Ok(Self {
            index,
            stream: Some(stream),
            device: Some(device),
            negotiated,
            layout,
            stride: applied.stride,
            sequence: 0,
            failed_reads: 0,
        })
    }
}

impl FrameSource for V4l2Source {
    fn read(&mut self) -> Option<CameraFrame> {
        let layout = self.layout;
        let width = self.negotiated.actual.width;
        let height = self.negotiated.actual.height;
        let stride = self.stride;

        let stream = self.stream.as_mut()?;
        let (buf, meta) = match stream.next() {
            Ok(frame) => frame,
            Err(e) => {
                self.failed_reads += 1;
                if self.failed_reads % 100 == 1 {
                    warn!(error = %e, failed_reads = self.failed_reads, "Failed to capture frame");
                }
                return None;
            }
        };

        let used = (meta.bytesused as usize).min(buf.len());
        if used == 0 {
            return None;
        }

        match decode_buffer(layout, &buf[..used], width, height, stride) {
            Ok(image) => {
                self.sequence += 1;
                Some(CameraFrame::new(image, self.sequence))
            }
            Err(e) => {
                debug!(error = %e, sequence = meta.sequence, "Dropping undecodable buffer");
                None
            }
        }
    }

    fn release(&mut self) {
        if self.stream.is_none() && self.device.is_none() {
            return;
        }
        info!(index = self.index, "Releasing V4L2 device");
        // Stream first: it unmaps buffers that belong to the device handle
        drop(self.stream.take());
        drop(self.device.take());
    }

    fn negotiated(&self) -> Option<&NegotiatedFormat> {
        Some(&self.negotiated)
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        self.release();
    }
}

fn current_framerate(device: &Device) -> Option<Framerate> {
    device
        .params()
        .ok()
        .filter(|p| p.interval.numerator != 0)
        .map(|p| Framerate::from_interval(p.interval.numerator, p.interval.denominator))
}

/// Build a FourCC from a config string, padding short codes with spaces
fn fourcc_from_str(code: &str) -> FourCC {
    let mut repr = [b' '; 4];
    for (slot, byte) in repr.iter_mut().zip(code.bytes()) {
        *slot = byte.to_ascii_uppercase();
    }
    FourCC::new(&repr)
}

fn fourcc_to_string(fourcc: FourCC) -> String {
    fourcc
        .str()
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{:?}", fourcc.repr))
}

/// Decode one driver buffer into an owned image
fn decode_buffer(
    layout: BufferLayout,
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
) -> Result<FrameImage, CameraError> {
    match layout {
        BufferLayout::Mjpeg => image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map(|img| FrameImage::Rgb(img.to_rgb8()))
            .map_err(|e| CameraError::Decode(e.to_string())),
        BufferLayout::Yuyv => {
            let stride = if stride == 0 { width * 2 } else { stride };
            yuyv_to_rgb(data, width, height, stride)
                .map(FrameImage::Rgb)
                .ok_or_else(|| short_buffer(data.len(), stride, height))
        }
        BufferLayout::Grey => {
            let stride = if stride == 0 { width } else { stride };
            grey_to_luma(data, width, height, stride)
                .map(FrameImage::Luma)
                .ok_or_else(|| short_buffer(data.len(), stride, height))
        }
    }
}

fn short_buffer(len: usize, stride: u32, height: u32) -> CameraError {
    CameraError::Decode(format!(
        "buffer of {} bytes is shorter than {} rows of {} bytes",
        len, height, stride
    ))
}

/// Convert YUYV (YUV 4:2:2) to RGB
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients for YUV to RGB conversion.
pub(crate) fn yuyv_to_rgb(data: &[u8], width: u32, height: u32, stride: u32) -> Option<RgbImage> {
    let row_bytes = (width as usize) * 2;
    let stride = stride as usize;
    if width == 0 || height == 0 || stride < row_bytes {
        return None;
    }
    if data.len() < stride * (height as usize - 1) + row_bytes {
        return None;
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for row in data.chunks(stride).take(height as usize) {
        for chunk in row[..row_bytes].chunks_exact(4) {
            let y0 = chunk[0] as f32;
            let u = chunk[1] as f32 - 128.0;
            let y1 = chunk[2] as f32;
            let v = chunk[3] as f32 - 128.0;

            for y in [y0, y1] {
                rgb.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
                rgb.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
                rgb.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
            }
        }
        // Odd widths leave one trailing pixel without a chroma pair
        if width % 2 == 1 {
            let y = row[row_bytes - 2];
            rgb.extend_from_slice(&[y, y, y]);
        }
    }

    RgbImage::from_raw(width, height, rgb)
}

fn grey_to_luma(data: &[u8], width: u32, height: u32, stride: u32) -> Option<GrayImage> {
    let row_bytes = width as usize;
    let stride = stride as usize;
    if width == 0 || height == 0 || stride < row_bytes {
        return None;
    }
    if data.len() < stride * (height as usize - 1) + row_bytes {
        return None;
    }

    let mut luma = Vec::with_capacity((width * height) as usize);
    for row in data.chunks(stride).take(height as usize) {
        luma.extend_from_slice(&row[..row_bytes]);
    }
    GrayImage::from_raw(width, height, luma)
}

/// Enumerate V4L2 capture devices under `/dev`
pub fn enumerate_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for entry in std::fs::read_dir("/dev").into_iter().flatten().flatten() {
        let path = entry.path();
        let Some(index) = video_index(&path) else {
            continue;
        };

        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            debug!(path = %path.display(), "Skipping non-capture node");
            continue;
        }

        devices.push(DeviceInfo {
            index,
            card: caps.card.clone(),
            driver: caps.driver.clone(),
            path: path.to_string_lossy().to_string(),
        });
    }

    devices.sort_by_key(|d| d.index);
    devices
}

/// Discrete formats the device advertises, as (fourcc, width, height)
pub fn enumerate_formats(device: &DeviceInfo) -> Vec<(String, u32, u32)> {
    let Ok(dev) = Device::with_path(&device.path) else {
        return Vec::new();
    };

    let mut formats = Vec::new();
    for description in dev.enum_formats().unwrap_or_default() {
        let fourcc = fourcc_to_string(description.fourcc);
        for size in dev.enum_framesizes(description.fourcc).unwrap_or_default() {
            if let FrameSizeEnum::Discrete(discrete) = size.size {
                formats.push((fourcc.clone(), discrete.width, discrete.height));
            }
        }
    }
    formats
}

fn video_index(path: &Path) -> Option<usize> {
    path.file_name()?
        .to_str()?
        .strip_prefix("video")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_padding() {
        assert_eq!(fourcc_from_str("mjpg"), FourCC::new(b"MJPG"));
        assert_eq!(fourcc_from_str("Y8"), FourCC::new(b"Y8  "));
        assert_eq!(fourcc_to_string(FourCC::new(b"Y8  ")), "Y8");
    }

    #[test]
    fn test_yuyv_gray_pixels() {
        // Neutral chroma (128) leaves luma unchanged
        let data = vec![
            16, 128, 235, 128, // row 0
            100, 128, 50, 128, // row 1
        ];
        let rgb = yuyv_to_rgb(&data, 2, 2, 4).expect("valid buffer");

        assert_eq!(rgb.get_pixel(0, 0).0, [16, 16, 16]);
        assert_eq!(rgb.get_pixel(1, 0).0, [235, 235, 235]);
        assert_eq!(rgb.get_pixel(1, 1).0, [50, 50, 50]);
    }

    #[test]
    fn test_yuyv_honors_stride_padding() {
        let data = vec![
            10, 128, 20, 128, 0, 0, // row 0 + 2 bytes padding
            30, 128, 40, 128, 0, 0, // row 1 + 2 bytes padding
        ];
        let rgb = yuyv_to_rgb(&data, 2, 2, 6).expect("valid buffer");
        assert_eq!(rgb.get_pixel(0, 1).0, [30, 30, 30]);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        assert!(yuyv_to_rgb(&[0u8; 6], 2, 2, 4).is_none());
        assert!(grey_to_luma(&[0u8; 3], 2, 2, 2).is_none());
    }

    #[test]
    fn test_grey_copy_without_stride() {
        let data = vec![1, 2, 99, 3, 4, 99];
        let luma = grey_to_luma(&data, 2, 2, 3).expect("valid buffer");
        assert_eq!(luma.into_raw(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_video_index() {
        assert_eq!(video_index(Path::new("/dev/video2")), Some(2));
        assert_eq!(video_index(Path::new("/dev/video-loop")), None);
        assert_eq!(video_index(Path::new("/dev/media0")), None);
    }

    #[test]
    fn test_open_missing_device_is_unavailable() {
        let request = FormatRequest {
            width: 640,
            height: 480,
            fps: Some(30),
            pixel_format: "MJPG".to_string(),
        };
        match V4l2Source::open(250, &request) {
            Err(CameraError::DeviceUnavailable { index, .. }) => assert_eq!(index, 250),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("device 250 should not exist"),
        }
    }
}
