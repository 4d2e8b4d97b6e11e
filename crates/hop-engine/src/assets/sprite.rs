//! Spritesheet frame tables and animation timing.

use serde::{Deserialize, Serialize};
use crate::api::types::Rect;

/// How to cut an image into frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteLayout {
    /// Explicit frame rectangles in image pixels. Wins over the grid when set.
    #[serde(default)]
    pub frames: Vec<Rect>,
    /// Grid cell size used to tile the sheet when no explicit frames are given.
    #[serde(default)]
    pub frame_width: Option<f32>,
    #[serde(default)]
    pub frame_height: Option<f32>,
    /// Seconds each frame stays on screen.
    #[serde(default = "default_frame_duration")]
    pub frame_duration: f32,
    #[serde(default = "default_looping", rename = "loop")]
    pub looping: bool,
}

fn default_frame_duration() -> f32 {
    0.1
}

fn default_looping() -> bool {
    true
}

impl Default for SpriteLayout {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            frame_width: None,
            frame_height: None,
            frame_duration: default_frame_duration(),
            looping: true,
        }
    }
}

impl SpriteLayout {
    /// Regular grid of `frame_width` x `frame_height` cells.
    pub fn grid(frame_width: f32, frame_height: f32, fps: f32) -> Self {
        Self {
            frame_width: Some(frame_width),
            frame_height: Some(frame_height),
            frame_duration: 1.0 / fps,
            ..Default::default()
        }
    }

    /// Build the frame table for an image of the given pixel size.
    /// Empty when no frame can be produced.
    pub fn frame_table(&self, image_width: u32, image_height: u32) -> Vec<Rect> {
        if !self.frames.is_empty() {
            return self.frames.clone();
        }
        let (w, h) = (image_width as f32, image_height as f32);
        match (self.frame_width, self.frame_height) {
            (Some(fw), Some(fh)) if fw > 0.0 && fh > 0.0 => {
                let cols = (w / fw).floor() as u32;
                let rows = (h / fh).floor() as u32;
                (0..rows)
                    .flat_map(|row| {
                        (0..cols).map(move |col| Rect::new(col as f32 * fw, row as f32 * fh, fw, fh))
                    })
                    .collect()
            }
            (None, None) if w > 0.0 && h > 0.0 => vec![Rect::new(0.0, 0.0, w, h)],
            _ => Vec::new(),
        }
    }
}

/// Runtime view over a spritesheet: frame table plus animation cursor.
#[derive(Debug, Clone)]
pub struct Sprite {
    /// Asset id of the backing image.
    pub image_id: String,
    pub frames: Vec<Rect>,
    pub current_frame: usize,
    pub frame_duration: f32,
    /// Time accumulated on the current frame.
    pub elapsed: f32,
    pub looping: bool,
}

impl Sprite {
    pub fn new(image_id: impl Into<String>, frames: Vec<Rect>, frame_duration: f32, looping: bool) -> Self {
        Self {
            image_id: image_id.into(),
            frames,
            current_frame: 0,
            frame_duration,
            elapsed: 0.0,
            looping,
        }
    }

    pub fn frame(&self) -> Option<Rect> {
        self.frames.get(self.current_frame).copied()
    }

    /// Whether a non-looping animation has reached its last frame.
    pub fn is_finished(&self) -> bool {
        !self.looping && self.current_frame + 1 >= self.frames.len()
    }

    pub fn reset(&mut self) {
        self.current_frame = 0;
        self.elapsed = 0.0;
    }

    /// Advance by `dt` seconds. Returns true if the frame changed.
    /// Single-frame sprites never advance; non-looping sprites hold the last frame.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.frames.len() < 2 || self.frame_duration <= 0.0 {
            return false;
        }
        if self.is_finished() {
            return false;
        }

        self.elapsed += dt;
        let mut changed = false;

        while self.elapsed >= self.frame_duration {
            self.elapsed -= self.frame_duration;
            self.current_frame += 1;
            changed = true;

            if self.current_frame >= self.frames.len() {
                if self.looping {
                    self.current_frame = 0;
                } else {
                    self.current_frame = self.frames.len() - 1;
                    self.elapsed = 0.0;
                    break;
                }
            }
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(count: usize, looping: bool) -> Sprite {
        let frames = (0..count).map(|i| Rect::new(i as f32 * 16.0, 0.0, 16.0, 16.0)).collect();
        Sprite::new("sheet", frames, 0.1, looping)
    }

    #[test]
    fn grid_tiles_row_major() {
        let layout = SpriteLayout::grid(16.0, 16.0, 10.0);
        let frames = layout.frame_table(48, 32);
        assert_eq!(frames.len(), 6);
        assert_eq!(frames[1], Rect::new(16.0, 0.0, 16.0, 16.0));
        assert_eq!(frames[3], Rect::new(0.0, 16.0, 16.0, 16.0));
    }

    #[test]
    fn explicit_frames_win() {
        let layout = SpriteLayout {
            frames: vec![Rect::new(1.0, 2.0, 3.0, 4.0)],
            ..SpriteLayout::grid(16.0, 16.0, 10.0)
        };
        assert_eq!(layout.frame_table(64, 64), vec![Rect::new(1.0, 2.0, 3.0, 4.0)]);
    }

    #[test]
    fn oversized_cells_produce_nothing() {
        let layout = SpriteLayout::grid(64.0, 64.0, 10.0);
        assert!(layout.frame_table(32, 32).is_empty());
        assert!(SpriteLayout::default().frame_table(0, 0).is_empty());
    }

    #[test]
    fn whole_image_when_no_grid() {
        assert_eq!(SpriteLayout::default().frame_table(20, 10), vec![Rect::new(0.0, 0.0, 20.0, 10.0)]);
    }

    #[test]
    fn looping_sprite_wraps() {
        let mut sprite = strip(4, true);
        sprite.tick(0.15);
        assert_eq!(sprite.current_frame, 1);
        sprite.tick(0.3);
        assert_eq!(sprite.current_frame, 0);
    }

    #[test]
    fn non_looping_sprite_holds_last_frame() {
        let mut sprite = strip(3, false);
        sprite.tick(0.35);
        assert_eq!(sprite.current_frame, 2);
        assert!(sprite.is_finished());
        assert!(!sprite.tick(1.0));
        assert_eq!(sprite.current_frame, 2);
    }

    #[test]
    fn single_frame_never_advances() {
        let mut sprite = strip(1, true);
        assert!(!sprite.tick(5.0));
        assert_eq!(sprite.current_frame, 0);
    }
}
