//! Drawing surface contract.
//!
//! All pixels are produced by the host (Canvas 2D in the browser). The core only
//! talks to this trait, so the whole runtime can run headless against
//! `RecordingSurface` in tests.

use glam::Vec2;
use crate::api::types::{Color, ImageHandle, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_css(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// Font size in pixels.
    pub size: f32,
    pub color: Color,
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 20.0,
            color: Color::WHITE,
            align: TextAlign::Left,
        }
    }
}

/// A 2D raster surface updated in place every frame.
pub trait Surface {
    /// Backend identifier (e.g. "canvas2d", "recording").
    fn backend(&self) -> &'static str;

    fn width(&self) -> f32;

    fn height(&self) -> f32;

    fn resize(&mut self, width: u32, height: u32);

    /// Fill the whole surface with `color`.
    fn clear(&mut self, color: Color);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32);

    /// Blit `src` (or the full image when `None`) into `dst`.
    /// Returns an error if the host could not draw the image.
    fn draw_image(
        &mut self,
        image: ImageHandle,
        src: Option<Rect>,
        dst: Rect,
        flip_x: bool,
    ) -> Result<(), String>;

    fn fill_text(&mut self, text: &str, pos: Vec2, style: &TextStyle);

    /// Global alpha for subsequent draws.
    fn set_alpha(&mut self, alpha: f32);
}
