use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use glam::Vec2;
use hop_engine::{Color, ImageHandle, Rect, Surface, TextStyle};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};
use crate::js::describe;

/// Decoded images by handle, filled by `WebFetcher` and read by `CanvasSurface`.
pub type ImageStore = Rc<RefCell<HashMap<ImageHandle, HtmlImageElement>>>;

/// `Surface` over a Canvas 2D context.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    images: ImageStore,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement, images: ImageStore) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        ctx.set_image_smoothing_enabled(false);
        Ok(Self { canvas, ctx, images })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn blit(
        &self,
        image: &HtmlImageElement,
        src: Option<Rect>,
        dst: Rect,
    ) -> Result<(), JsValue> {
        match src {
            Some(s) => self
                .ctx
                .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    image,
                    s.x as f64,
                    s.y as f64,
                    s.w as f64,
                    s.h as f64,
                    dst.x as f64,
                    dst.y as f64,
                    dst.w as f64,
                    dst.h as f64,
                ),
            None => self.ctx.draw_image_with_html_image_element_and_dw_and_dh(
                image,
                dst.x as f64,
                dst.y as f64,
                dst.w as f64,
                dst.h as f64,
            ),
        }
    }
}

impl Surface for CanvasSurface {
    fn backend(&self) -> &'static str {
        "canvas2d"
    }

    fn width(&self) -> f32 {
        self.canvas.width() as f32
    }

    fn height(&self) -> f32 {
        self.canvas.height() as f32
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        // Resizing resets context state.
        self.ctx.set_image_smoothing_enabled(false);
    }

    fn clear(&mut self, color: Color) {
        self.ctx.set_global_alpha(1.0);
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx
            .fill_rect(0.0, 0.0, self.canvas.width() as f64, self.canvas.height() as f64);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx
            .fill_rect(rect.x as f64, rect.y as f64, rect.w as f64, rect.h as f64);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32) {
        self.ctx.set_stroke_style_str(&color.to_css());
        self.ctx.set_line_width(line_width as f64);
        self.ctx
            .stroke_rect(rect.x as f64, rect.y as f64, rect.w as f64, rect.h as f64);
    }

    fn draw_image(
        &mut self,
        image: ImageHandle,
        src: Option<Rect>,
        dst: Rect,
        flip_x: bool,
    ) -> Result<(), String> {
        let images = self.images.borrow();
        let element = images
            .get(&image)
            .ok_or_else(|| format!("no image for handle {}", image.0))?;
        if !element.complete() || element.natural_width() == 0 {
            return Err(format!("image {} is not decoded", image.0));
        }
        if !flip_x {
            return self.blit(element, src, dst).map_err(|e| describe(&e));
        }

        // Mirror around the destination's vertical center line.
        self.ctx.save();
        let drawn = self
            .ctx
            .translate((dst.x + dst.w) as f64, dst.y as f64)
            .and_then(|_| self.ctx.scale(-1.0, 1.0))
            .and_then(|_| self.blit(element, src, Rect::new(0.0, 0.0, dst.w, dst.h)));
        self.ctx.restore();
        drawn.map_err(|e| describe(&e))
    }

    fn fill_text(&mut self, text: &str, pos: Vec2, style: &TextStyle) {
        self.ctx.set_font(&format!("bold {}px sans-serif", style.size));
        self.ctx.set_text_align(style.align.as_css());
        self.ctx.set_fill_style_str(&style.color.to_css());
        if let Err(e) = self.ctx.fill_text(text, pos.x as f64, pos.y as f64) {
            log::debug!("canvas: fill_text failed: {}", describe(&e));
        }
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.ctx.set_global_alpha(alpha.clamp(0.0, 1.0) as f64);
    }
}
