// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based camera viewer
//!
//! Renders the camera window and the rectified target side by side using
//! Unicode half-block characters for improved vertical resolution. Windows
//! are redrawn when keys are polled, so every `show` of a cycle lands in a
//! single frame.

use crate::app::{Display, Key, Overlay, annotate_frame};
use crate::backends::camera::FrameImage;
use crate::constants::{CAMERA_WINDOW, RECTIFIED_WINDOW};
use crate::errors::{AppError, AppResult};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};
use std::io::{self, Stdout, stdout};
use std::time::Duration;
use tracing::debug;

fn display_error(err: io::Error) -> AppError {
    AppError::Display(err.to_string())
}

/// Full-screen terminal display
pub struct TerminalDisplay {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    camera: Option<FrameImage>,
    camera_overlay: Overlay,
    rectified: Option<FrameImage>,
    restored: bool,
}

impl TerminalDisplay {
    /// Switch the terminal to raw mode on the alternate screen
    pub fn new() -> AppResult<Self> {
        enable_raw_mode().map_err(display_error)?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen).map_err(display_error)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout)).map_err(display_error)?;

        Ok(Self {
            terminal,
            camera: None,
            camera_overlay: Overlay::default(),
            rectified: None,
            restored: false,
        })
    }

    fn draw(&mut self) -> AppResult<()> {
        let camera = self.camera.as_ref();
        let rectified = self.rectified.as_ref();
        let overlay = &self.camera_overlay;

        self.terminal
            .draw(|f| {
                let area = f.area();
                let body_height = area.height.saturating_sub(1);

                // Rectified panel is square in pixels: width == 2 * rows
                let side_width = (body_height.saturating_mul(2)).min(area.width / 3);
                let camera_area = Rect {
                    x: area.x,
                    y: area.y,
                    width: area.width.saturating_sub(side_width),
                    height: body_height,
                };
                let rectified_area = Rect {
                    x: area.x + camera_area.width,
                    y: area.y,
                    width: side_width,
                    height: body_height,
                };

                f.render_widget(
                    FrameWidget {
                        image: camera,
                        placeholder: "Waiting for camera...",
                    },
                    camera_area,
                );
                f.render_widget(
                    FrameWidget {
                        image: rectified,
                        placeholder: "No target",
                    },
                    rectified_area,
                );

                if let Some(text) = &overlay.text {
                    let (col, row) = overlay.position;
                    if col < camera_area.width && row < camera_area.height {
                        f.buffer_mut().set_string(
                            camera_area.x + col,
                            camera_area.y + row,
                            text,
                            Style::default().fg(Color::Black).bg(Color::Yellow),
                        );
                    }
                }

                let message = status_message(overlay.outline.is_some());
                let status_area = Rect {
                    x: area.x,
                    y: area.height.saturating_sub(1),
                    width: area.width,
                    height: 1,
                };
                f.render_widget(StatusBar { message: &message }, status_area);
            })
            .map_err(display_error)?;
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()
    }
}

impl Display for TerminalDisplay {
    fn show(&mut self, window: &str, image: &FrameImage, overlay: &Overlay) -> AppResult<()> {
        match window {
            CAMERA_WINDOW => {
                self.camera = Some(FrameImage::Rgb(annotate_frame(image, overlay)));
                self.camera_overlay = overlay.clone();
            }
            RECTIFIED_WINDOW => self.rectified = Some(image.clone()),
            other => debug!(window = other, "Ignoring unknown window"),
        }
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> AppResult<Option<Key>> {
        self.draw()?;

        if event::poll(timeout).map_err(display_error)?
            && let Event::Key(key) = event::read().map_err(display_error)?
            && key.kind == KeyEventKind::Press
        {
            return Ok(map_key(key.code, key.modifiers));
        }
        Ok(None)
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Esc, `q` and Ctrl+C all end the run
fn map_key(code: KeyCode, modifiers: KeyModifiers) -> Option<Key> {
    match code {
        KeyCode::Esc => Some(Key::Escape),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(Key::Escape),
        KeyCode::Char('q') => Some(Key::Escape),
        KeyCode::Char(c) => Some(Key::Char(c)),
        _ => None,
    }
}

fn status_message(target_in_view: bool) -> String {
    let target = if target_in_view {
        "target: locked"
    } else {
        "target: searching"
    };
    format!("{} | 's' snapshot | Esc/'q' quit", target)
}

/// Widget that renders an image using half-block characters
struct FrameWidget<'a> {
    image: Option<&'a FrameImage>,
    placeholder: &'a str,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(image) = self.image.filter(|img| !img.is_empty()) else {
            let msg = self.placeholder;
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        let (display_width, display_height) =
            fit_half_blocks(image.width(), image.height(), area.width, area.height);
        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = image.width() as f64 / display_width as f64;
        let y_scale = image.height() as f64 / (display_height * 2) as f64;

        // Upper half (▀) takes the fg color, lower half the bg color
        for ty in 0..display_height {
            for tx in 0..display_width {
                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let (r, g, b) = image.rgb_at(src_x, src_y_top);
                let top = Color::Rgb(r, g, b);
                let (r, g, b) = image.rgb_at(src_x, src_y_bottom);
                let bottom = Color::Rgb(r, g, b);

                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(top);
                    cell.set_bg(bottom);
                }
            }
        }
    }
}

/// Largest cell grid keeping the image aspect ratio
///
/// Each terminal cell displays 2 vertical pixels.
fn fit_half_blocks(width: u32, height: u32, cols: u16, rows: u16) -> (u16, u16) {
    if width == 0 || height == 0 || cols == 0 || rows == 0 {
        return (0, 0);
    }
    let aspect = width as f64 / height as f64;
    let term_width = cols as f64;
    let term_height = (rows as f64) * 2.0;

    if term_width / term_height > aspect {
        // Terminal is wider - fit to height
        let w = term_height * aspect;
        ((w as u16).min(cols), rows)
    } else {
        // Terminal is taller - fit to width
        let h = term_width / aspect;
        (cols, ((h / 2.0) as u16).min(rows))
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key(KeyCode::Esc, KeyModifiers::NONE), Some(Key::Escape));
        assert_eq!(
            map_key(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(Key::Escape)
        );
        assert_eq!(map_key(KeyCode::Char('q'), KeyModifiers::NONE), Some(Key::Escape));
        assert_eq!(
            map_key(KeyCode::Char('s'), KeyModifiers::NONE),
            Some(Key::Char('s'))
        );
        assert_eq!(map_key(KeyCode::Up, KeyModifiers::NONE), None);
    }

    #[test]
    fn test_fit_keeps_aspect() {
        // 4:3 image in an 80x24 terminal is limited by height: 48 px rows
        assert_eq!(fit_half_blocks(640, 480, 80, 24), (64, 24));
        // Square image in a tall narrow area is limited by width
        assert_eq!(fit_half_blocks(28, 28, 10, 40), (10, 5));
        assert_eq!(fit_half_blocks(0, 28, 10, 40), (0, 0));
    }

    #[test]
    fn test_frame_widget_paints_half_blocks() {
        let img = GrayImage::from_fn(4, 4, |_, y| Luma([if y % 2 == 0 { 255 } else { 0 }]));
        let frame = FrameImage::Luma(img);
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);

        FrameWidget {
            image: Some(&frame),
            placeholder: "",
        }
        .render(area, &mut buf);

        let cell = &buf[(0, 0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 255, 255));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 0));
    }

    #[test]
    fn test_placeholder_without_image() {
        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        FrameWidget {
            image: None,
            placeholder: "No target",
        }
        .render(area, &mut buf);

        let row: String = (0..20).map(|x| buf[(x, 1)].symbol().to_string()).collect();
        assert!(row.contains("No target"));
    }
}
