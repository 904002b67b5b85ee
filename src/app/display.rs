// SPDX-License-Identifier: GPL-3.0-only

//! Display collaborator seen by the main loop

use crate::backends::camera::FrameImage;
use crate::constants::{ESCAPE_KEYCODE, OVERLAY_POSITION};
use crate::errors::AppResult;
use crate::pipelines::detection::OrderedCorners;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use std::time::Duration;

/// Outline color drawn around a detected target
const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Key reported by a display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Char(char),
    Other(u32),
}

impl Key {
    pub fn from_keycode(code: u32) -> Self {
        if code == ESCAPE_KEYCODE {
            return Key::Escape;
        }
        match char::from_u32(code) {
            Some(c) if !c.is_control() => Key::Char(c),
            _ => Key::Other(code),
        }
    }

    pub fn keycode(&self) -> u32 {
        match self {
            Key::Escape => ESCAPE_KEYCODE,
            Key::Char(c) => *c as u32,
            Key::Other(code) => *code,
        }
    }
}

/// Annotations rendered on top of a window's image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    /// Text placed at `position`
    pub text: Option<String>,
    /// Column and row of the text, in display cells
    pub position: (u16, u16),
    /// Target outline drawn into the image
    pub outline: Option<OrderedCorners>,
}

impl Overlay {
    /// Frame counter at the fixed overlay position
    pub fn counter(value: u64, outline: Option<OrderedCorners>) -> Self {
        Self {
            text: Some(value.to_string()),
            position: OVERLAY_POSITION,
            outline,
        }
    }
}

/// Window-oriented output with keyboard input
pub trait Display {
    /// Present `image` in the named window
    fn show(&mut self, window: &str, image: &FrameImage, overlay: &Overlay) -> AppResult<()>;

    /// Wait up to `timeout` for a key press
    fn poll_key(&mut self, timeout: Duration) -> AppResult<Option<Key>>;
}

impl<D: Display + ?Sized> Display for Box<D> {
    fn show(&mut self, window: &str, image: &FrameImage, overlay: &Overlay) -> AppResult<()> {
        (**self).show(window, image, overlay)
    }

    fn poll_key(&mut self, timeout: Duration) -> AppResult<Option<Key>> {
        (**self).poll_key(timeout)
    }
}

/// RGB copy of `image` with the overlay outline drawn in
pub fn annotate_frame(image: &FrameImage, overlay: &Overlay) -> RgbImage {
    let mut rgb = match image {
        FrameImage::Rgb(img) => img.clone(),
        FrameImage::Luma(img) => image::DynamicImage::ImageLuma8(img.clone()).to_rgb8(),
    };

    if let Some(corners) = &overlay.outline {
        let points = corners.control_points();
        for i in 0..points.len() {
            let start = points[i];
            let end = points[(i + 1) % points.len()];
            draw_line_segment_mut(&mut rgb, start, end, OUTLINE_COLOR);
        }
    }

    rgb
}
