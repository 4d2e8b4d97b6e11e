//! Screen-space text and panels drawn over the scene.

use glam::Vec2;
use crate::api::types::{Color, Rect};
use crate::engine::rules::Progress;
use crate::input::manager::VirtualButton;
use crate::renderer::surface::{TextAlign, TextStyle};
use crate::renderer::Renderer;

const HUD_MARGIN: f32 = 10.0;
const HUD_LINE: f32 = 26.0;
const BUTTON_COLOR: Color = Color { r: 255, g: 255, b: 255, a: 128 };

fn hud_style() -> TextStyle {
    TextStyle { size: 20.0, color: Color::WHITE, align: TextAlign::Left }
}

fn centered(size: f32) -> TextStyle {
    TextStyle { size, color: Color::WHITE, align: TextAlign::Center }
}

/// Level name, score, and collection progress when the level has a target.
pub fn draw_hud(renderer: &mut Renderer, level_name: &str, progress: &Progress) {
    let style = hud_style();
    let mut y = HUD_MARGIN + style.size;
    renderer.text(level_name, Vec2::new(HUD_MARGIN, y), &style);
    y += HUD_LINE;
    renderer.text(&format!("Score: {}", progress.score), Vec2::new(HUD_MARGIN, y), &style);
    if progress.required > 0 {
        y += HUD_LINE;
        let line = format!("Collected: {}/{}", progress.collected, progress.required);
        renderer.text(&line, Vec2::new(HUD_MARGIN, y), &style);
    }
}

/// Outline every on-screen button; pressed ones are filled.
pub fn draw_buttons(renderer: &mut Renderer, buttons: &[VirtualButton]) {
    for button in buttons {
        if button.pressed {
            renderer.fill_rect(button.rect, BUTTON_COLOR);
        }
        renderer.stroke_rect(button.rect, Color::WHITE, 2.0);
    }
}

pub fn draw_level_complete(renderer: &mut Renderer, level_name: &str) {
    let center = Vec2::new(renderer.width() / 2.0, renderer.height() / 2.0);
    renderer.overlay(Color::SHADE);
    renderer.text("Level Complete!", center, &centered(48.0));
    renderer.text(level_name, center + Vec2::new(0.0, 40.0), &centered(24.0));
}

pub fn draw_game_complete(renderer: &mut Renderer, score: u32) {
    let center = Vec2::new(renderer.width() / 2.0, renderer.height() / 2.0);
    renderer.overlay(Color::SHADE);
    renderer.text("You Win!", center - Vec2::new(0.0, 40.0), &centered(48.0));
    renderer.text(&format!("Final Score: {score}"), center + Vec2::new(0.0, 10.0), &centered(28.0));
    renderer.text("Press any key to play again", center + Vec2::new(0.0, 50.0), &centered(20.0));
}

/// Left, right and jump button rectangles for a touch screen of the given size.
pub fn default_button_rects(width: f32, height: f32) -> [Rect; 3] {
    let size = 64.0;
    let y = height - size - HUD_MARGIN;
    [
        Rect::new(HUD_MARGIN, y, size, size),
        Rect::new(HUD_MARGIN * 2.0 + size, y, size, size),
        Rect::new(width - size - HUD_MARGIN, y, size, size),
    ]
}
