use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use glam::Vec2;
use crate::api::types::{Color, ImageHandle, Rect};
use crate::renderer::surface::{Surface, TextStyle};

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    FillRect { rect: Rect, color: Color },
    StrokeRect { rect: Rect, color: Color },
    Image { image: ImageHandle, src: Option<Rect>, dst: Rect, flip_x: bool },
    Text { text: String, pos: Vec2, size: f32 },
    Alpha(f32),
}

/// Shared view of a `RecordingSurface`'s command log.
/// Stays readable after the surface itself is boxed into a `Renderer`.
#[derive(Debug, Clone, Default)]
pub struct DrawLog(Rc<RefCell<Vec<DrawCommand>>>);

impl DrawLog {
    fn push(&self, command: DrawCommand) {
        self.0.borrow_mut().push(command);
    }

    pub fn commands(&self) -> Vec<DrawCommand> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// All text drawn so far, in order.
    pub fn texts(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Fill rectangles drawn so far, in order.
    pub fn filled(&self) -> Vec<(Rect, Color)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillRect { rect, color } => Some((*rect, *color)),
                _ => None,
            })
            .collect()
    }

    /// Image blits drawn so far, in order.
    pub fn images(&self) -> Vec<(ImageHandle, Option<Rect>, Rect, bool)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Image { image, src, dst, flip_x } => Some((*image, *src, *dst, *flip_x)),
                _ => None,
            })
            .collect()
    }
}

/// Headless surface that records every draw call instead of rasterizing.
pub struct RecordingSurface {
    width: u32,
    height: u32,
    log: DrawLog,
    broken_images: HashSet<ImageHandle>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            log: DrawLog::default(),
            broken_images: HashSet::new(),
        }
    }

    /// Make draws of `image` fail, to exercise fallbacks.
    pub fn with_broken_image(mut self, image: ImageHandle) -> Self {
        self.broken_images.insert(image);
        self
    }

    pub fn log(&self) -> DrawLog {
        self.log.clone()
    }
}

impl Surface for RecordingSurface {
    fn backend(&self) -> &'static str {
        "recording"
    }

    fn width(&self) -> f32 {
        self.width as f32
    }

    fn height(&self) -> f32 {
        self.height as f32
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn clear(&mut self, color: Color) {
        self.log.push(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.log.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, _line_width: f32) {
        self.log.push(DrawCommand::StrokeRect { rect, color });
    }

    fn draw_image(
        &mut self,
        image: ImageHandle,
        src: Option<Rect>,
        dst: Rect,
        flip_x: bool,
    ) -> Result<(), String> {
        if self.broken_images.contains(&image) {
            return Err(format!("image {} is broken", image.0));
        }
        self.log.push(DrawCommand::Image { image, src, dst, flip_x });
        Ok(())
    }

    fn fill_text(&mut self, text: &str, pos: Vec2, style: &TextStyle) {
        self.log.push(DrawCommand::Text {
            text: text.to_string(),
            pos,
            size: style.size,
        });
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.log.push(DrawCommand::Alpha(alpha));
    }
}
