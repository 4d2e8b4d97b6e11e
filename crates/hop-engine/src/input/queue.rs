/// Logical keys the runtime understands.
/// Mapped from DOM `KeyboardEvent.code` so layouts do not move the controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    A,
    D,
    W,
    S,
    X,
    Z,
    Space,
    Enter,
    Escape,
    M,
    Other,
}

impl Key {
    pub fn from_code(code: &str) -> Key {
        match code {
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "KeyA" => Key::A,
            "KeyD" => Key::D,
            "KeyW" => Key::W,
            "KeyS" => Key::S,
            "KeyX" => Key::X,
            "KeyZ" => Key::Z,
            "Space" => Key::Space,
            "Enter" | "NumpadEnter" => Key::Enter,
            "Escape" => Key::Escape,
            "KeyM" => Key::M,
            _ => Key::Other,
        }
    }
}

/// Input event types the engine understands.
/// Coordinates are surface-local, already corrected for canvas offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown { key: Key },
    KeyUp { key: Key },
    /// A touch began at (x, y). Only the first touch is tracked.
    TouchStart { x: f32, y: f32 },
    TouchMove { x: f32, y: f32 },
    TouchEnd,
    /// A mouse click. Counts as a user gesture but never moves the player.
    Click { x: f32, y: f32 },
}

impl InputEvent {
    /// Whether this event counts as a user gesture for audio unlock.
    pub fn is_gesture(&self) -> bool {
        matches!(
            self,
            InputEvent::KeyDown { .. } | InputEvent::TouchStart { .. } | InputEvent::Click { .. }
        )
    }
}

/// A queue of input events.
/// The host pushes events as they arrive; the engine drains them once per frame.
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drain all pending events. Returns a Vec and clears the queue.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}
