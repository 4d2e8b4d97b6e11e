use std::cell::RefCell;
use std::rc::Rc;
use hop_engine::{Engine, EngineOptions, HostEvent, Rect, VirtualAction};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlCanvasElement;
use crate::audio::{ContextSlot, WebAudio};
use crate::canvas::{CanvasSurface, ImageStore};
use crate::fetch::WebFetcher;
use crate::listeners::Listeners;

/// Host events waiting for the next frame. Every browser callback pushes
/// here; the runner drains it on the frame thread before the engine ticks.
pub type EventQueue = Rc<RefCell<Vec<HostEvent>>>;

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Owns the engine and its browser seams.
///
/// Lives in a `thread_local!` in the crate root, because wasm-bindgen
/// cannot export a struct holding trait objects directly.
pub struct WebRunner {
    engine: Engine,
    events: EventQueue,
    listeners: Option<Listeners>,
    /// Pending `requestAnimationFrame` id.
    frame_request: Option<i32>,
}

impl WebRunner {
    /// Wire the engine to the canvas with id `canvas_id` and initialize it.
    pub fn new(canvas_id: &str, params_json: &str, manifest_json: Option<&str>) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element #{canvas_id}")))?
            .dyn_into::<HtmlCanvasElement>()?;

        let events = EventQueue::default();
        let images = ImageStore::default();
        let slot = ContextSlot::default();
        let surface = CanvasSurface::new(canvas.clone(), images.clone())?;
        let fetcher = WebFetcher::new(events.clone(), images);
        let audio = WebAudio::new(events.clone(), slot.clone());

        let options = EngineOptions::from_json(params_json, manifest_json).map_err(js_error)?;
        let mut engine = Engine::new(Box::new(fetcher), Box::new(audio));
        engine.initialize(Box::new(surface), options).map_err(js_error)?;

        let touch = web_sys::window().is_some_and(|w| w.navigator().max_touch_points() > 0);
        if touch {
            engine.add_touch_controls().map_err(js_error)?;
        }
        let listeners = Listeners::attach(&canvas, events.clone(), slot)?;

        Ok(Self {
            engine,
            events,
            listeners: Some(listeners),
            frame_request: None,
        })
    }

    /// Apply everything the browser queued since the last frame.
    pub fn drain(&mut self) {
        let pending = std::mem::take(&mut *self.events.borrow_mut());
        for event in pending {
            self.engine.handle_event(event);
        }
    }

    pub fn frame(&mut self, now_ms: f64) {
        self.frame_request = None;
        self.drain();
        self.engine.frame(now_ms);
    }

    pub fn start(&mut self) -> Result<(), JsValue> {
        self.drain();
        self.engine.start().map_err(js_error)
    }

    pub fn stop(&mut self) {
        self.engine.stop();
        if let (Some(id), Some(window)) = (self.frame_request.take(), web_sys::window()) {
            let _ = window.cancel_animation_frame(id);
        }
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub fn set_frame_request(&mut self, id: i32) {
        self.frame_request = Some(id);
    }

    pub fn has_frame_request(&self) -> bool {
        self.frame_request.is_some()
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), JsValue> {
        self.engine.resize(width, height).map_err(js_error)
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.engine.set_muted(muted);
    }

    pub fn add_virtual_button(&mut self, rect: Rect, action: VirtualAction) {
        self.engine.add_virtual_button(rect, action);
    }

    pub fn dispose(&mut self) {
        self.stop();
        if let Some(mut listeners) = self.listeners.take() {
            listeners.detach();
        }
        self.engine.dispose();
        self.events.borrow_mut().clear();
    }
}
