//! Thin drawing facade over a host-provided raster surface.

pub mod recording;
pub mod surface;

use glam::Vec2;
use crate::api::error::{EngineError, EngineResult};
use crate::api::types::{Color, ImageHandle, Rect};
use surface::{Surface, TextStyle};

pub use recording::{DrawCommand, DrawLog, RecordingSurface};
pub use surface::TextAlign;

pub struct Renderer {
    surface: Box<dyn Surface>,
    background: Color,
}

impl Renderer {
    /// Wrap `surface` and size it to the world.
    /// Fails when the surface does not take the requested size, which is how
    /// a detached or context-less surface shows up.
    pub fn new(mut surface: Box<dyn Surface>, width: u32, height: u32) -> EngineResult<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::SurfaceUnavailable(format!(
                "cannot size surface to {width}x{height}"
            )));
        }
        surface.resize(width, height);
        if surface.width() != width as f32 || surface.height() != height as f32 {
            return Err(EngineError::SurfaceUnavailable(format!(
                "{} surface refused size {width}x{height}",
                surface.backend()
            )));
        }
        log::info!("renderer: {} surface {}x{}", surface.backend(), width, height);
        Ok(Self {
            surface,
            background: Color::SKY,
        })
    }

    pub fn width(&self) -> f32 {
        self.surface.width()
    }

    pub fn height(&self) -> f32 {
        self.surface.height()
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
    }

    /// Clear to the current background color.
    pub fn clear(&mut self) {
        self.surface.clear(self.background);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.surface.fill_rect(rect, color);
    }

    pub fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32) {
        self.surface.stroke_rect(rect, color, line_width);
    }

    pub fn blit(
        &mut self,
        image: ImageHandle,
        src: Option<Rect>,
        dst: Rect,
        flip_x: bool,
    ) -> Result<(), String> {
        self.surface.draw_image(image, src, dst, flip_x)
    }

    pub fn text(&mut self, text: &str, pos: Vec2, style: &TextStyle) {
        self.surface.fill_text(text, pos, style);
    }

    /// Full-surface translucent wash, used under overlay text.
    pub fn overlay(&mut self, color: Color) {
        let rect = Rect::new(0.0, 0.0, self.surface.width(), self.surface.height());
        self.surface.fill_rect(rect, color);
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.surface.set_alpha(alpha);
    }

    pub fn surface_mut(&mut self) -> &mut dyn Surface {
        self.surface.as_mut()
    }
}
