/// Measures frame deltas from a host millisecond clock.
/// The delta is capped so a long pause (a backgrounded tab) does not
/// teleport everything in one step.
pub struct FrameClock {
    last_ms: Option<f64>,
    max_dt: f32,
}

impl FrameClock {
    pub fn new(max_dt: f32) -> Self {
        Self { last_ms: None, max_dt }
    }

    /// Forget the previous timestamp; the next tick yields zero.
    pub fn reset(&mut self) {
        self.last_ms = None;
    }

    /// Seconds since the previous tick, clamped to `[0, max_dt]`.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        dt.clamp(0.0, self.max_dt)
    }

    pub fn max_dt(&self) -> f32 {
        self.max_dt
    }
}
