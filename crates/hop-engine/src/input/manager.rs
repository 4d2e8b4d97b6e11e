//! Unified keyboard + touch + virtual-button input state.
//!
//! Level-triggered queries (`is_pressed`, `horizontal`, `jump`) reflect what is
//! held right now. Edge-triggered queries (`just_pressed`, `just_released`) are
//! recomputed by `update()`, which must run exactly once per frame before the
//! gameplay rules read input.

use std::collections::HashSet;
use glam::Vec2;
use crate::api::types::Rect;
use crate::input::queue::{InputEvent, Key};

/// Displacement (in surface units) a touch must travel before it counts as a swipe.
pub const SWIPE_THRESHOLD: f32 = 30.0;

const LEFT_KEYS: [Key; 2] = [Key::ArrowLeft, Key::A];
const RIGHT_KEYS: [Key; 2] = [Key::ArrowRight, Key::D];
const UP_KEYS: [Key; 2] = [Key::ArrowUp, Key::W];
const DOWN_KEYS: [Key; 2] = [Key::ArrowDown, Key::S];
const JUMP_KEYS: [Key; 3] = [Key::Space, Key::ArrowUp, Key::W];
const ACTION_KEYS: [Key; 2] = [Key::X, Key::Enter];

/// What an on-screen button stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualAction {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Action,
}

#[derive(Debug, Clone)]
pub struct VirtualButton {
    pub rect: Rect,
    pub action: VirtualAction,
    pub pressed: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct TouchState {
    start: Vec2,
    current: Vec2,
}

pub struct InputManager {
    listening: bool,
    pressed: HashSet<Key>,
    previous: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,
    touch: Option<TouchState>,
    buttons: Vec<VirtualButton>,
    pending_gesture: bool,
    gesture: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            listening: false,
            pressed: HashSet::new(),
            previous: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
            touch: None,
            buttons: Vec::new(),
            pending_gesture: false,
            gesture: false,
        }
    }

    /// Begin accepting events. No-op when already listening.
    pub fn start(&mut self) {
        if self.listening {
            return;
        }
        self.listening = true;
        log::debug!("input: listening");
    }

    /// Stop accepting events. No-op when already stopped.
    /// Held state is dropped because the matching releases will never arrive.
    pub fn stop(&mut self) {
        if !self.listening {
            return;
        }
        self.listening = false;
        self.pressed.clear();
        self.touch = None;
        self.release_buttons();
        log::debug!("input: stopped");
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Stop and forget everything, virtual buttons included.
    pub fn dispose(&mut self) {
        self.stop();
        self.pressed.clear();
        self.previous.clear();
        self.just_pressed.clear();
        self.just_released.clear();
        self.buttons.clear();
        self.touch = None;
        self.pending_gesture = false;
        self.gesture = false;
    }

    pub fn add_virtual_button(&mut self, rect: Rect, action: VirtualAction) {
        self.buttons.push(VirtualButton { rect, action, pressed: false });
    }

    pub fn virtual_buttons(&self) -> &[VirtualButton] {
        &self.buttons
    }

    /// Feed one host event. Ignored while not listening.
    pub fn handle_event(&mut self, event: InputEvent) {
        if !self.listening {
            return;
        }
        if event.is_gesture() {
            self.pending_gesture = true;
        }
        match event {
            InputEvent::KeyDown { key } => {
                self.pressed.insert(key);
            }
            InputEvent::KeyUp { key } => {
                self.pressed.remove(&key);
            }
            InputEvent::TouchStart { x, y } => {
                let point = Vec2::new(x, y);
                self.touch = Some(TouchState { start: point, current: point });
                self.press_buttons_at(point);
            }
            InputEvent::TouchMove { x, y } => {
                let point = Vec2::new(x, y);
                if let Some(touch) = self.touch.as_mut() {
                    touch.current = point;
                }
                self.press_buttons_at(point);
            }
            InputEvent::TouchEnd => {
                self.touch = None;
                // A release anywhere cancels every virtual press.
                self.release_buttons();
            }
            InputEvent::Click { .. } => {}
        }
    }

    fn press_buttons_at(&mut self, point: Vec2) {
        for button in self.buttons.iter_mut().filter(|b| b.rect.contains(point)) {
            button.pressed = true;
        }
    }

    fn release_buttons(&mut self) {
        for button in &mut self.buttons {
            button.pressed = false;
        }
    }

    /// Recompute edge sets. Call once per frame before any query.
    pub fn update(&mut self) {
        self.just_pressed = self.pressed.difference(&self.previous).copied().collect();
        self.just_released = self.previous.difference(&self.pressed).copied().collect();
        self.previous = self.pressed.clone();
        self.gesture = std::mem::take(&mut self.pending_gesture);
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    pub fn just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    /// Any key press, touch or click since the previous `update()`.
    pub fn any_just_pressed(&self) -> bool {
        !self.just_pressed.is_empty() || self.gesture
    }

    fn any_pressed(&self, keys: &[Key]) -> bool {
        keys.iter().any(|k| self.pressed.contains(k))
    }

    fn button_pressed(&self, action: VirtualAction) -> bool {
        self.buttons.iter().any(|b| b.action == action && b.pressed)
    }

    /// Swipe direction per axis: -1, 0 or 1 once displacement passes the threshold.
    pub fn swipe(&self) -> Vec2 {
        let Some(touch) = self.touch else {
            return Vec2::ZERO;
        };
        let delta = touch.current - touch.start;
        let axis = |d: f32| if d.abs() > SWIPE_THRESHOLD { d.signum() } else { 0.0 };
        Vec2::new(axis(delta.x), axis(delta.y))
    }

    /// Horizontal axis in [-1, 1]; negative is left.
    pub fn horizontal(&self) -> f32 {
        let mut axis = 0.0;
        if self.any_pressed(&LEFT_KEYS) {
            axis -= 1.0;
        }
        if self.any_pressed(&RIGHT_KEYS) {
            axis += 1.0;
        }
        axis += self.swipe().x;
        if self.button_pressed(VirtualAction::Left) {
            axis -= 1.0;
        }
        if self.button_pressed(VirtualAction::Right) {
            axis += 1.0;
        }
        f32::clamp(axis, -1.0, 1.0)
    }

    /// Vertical axis in [-1, 1]; negative is up.
    pub fn vertical(&self) -> f32 {
        let mut axis = 0.0;
        if self.any_pressed(&UP_KEYS) {
            axis -= 1.0;
        }
        if self.any_pressed(&DOWN_KEYS) {
            axis += 1.0;
        }
        axis += self.swipe().y;
        if self.button_pressed(VirtualAction::Up) {
            axis -= 1.0;
        }
        if self.button_pressed(VirtualAction::Down) {
            axis += 1.0;
        }
        f32::clamp(axis, -1.0, 1.0)
    }

    pub fn jump(&self) -> bool {
        self.any_pressed(&JUMP_KEYS) || self.button_pressed(VirtualAction::Jump)
    }

    pub fn action(&self) -> bool {
        self.any_pressed(&ACTION_KEYS) || self.button_pressed(VirtualAction::Action)
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
