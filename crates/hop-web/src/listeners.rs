use hop_engine::{HostEvent, InputEvent, Key};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Event, EventTarget, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent};
use crate::audio::ContextSlot;
use crate::runner::EventQueue;

type Handler = Closure<dyn FnMut(Event)>;

/// DOM listeners feeding the event queue: keyboard on the window,
/// touch and mouse on the canvas. Removed on `detach` or drop.
pub struct Listeners {
    attached: Vec<(EventTarget, &'static str, Handler)>,
}

/// Canvas-local coordinates, scaled from CSS pixels to canvas pixels.
fn local_point(canvas: &HtmlCanvasElement, client_x: i32, client_y: i32) -> (f32, f32) {
    let bounds = canvas.get_bounding_client_rect();
    let sx = if bounds.width() > 0.0 { canvas.width() as f64 / bounds.width() } else { 1.0 };
    let sy = if bounds.height() > 0.0 { canvas.height() as f64 / bounds.height() } else { 1.0 };
    (
        ((client_x as f64 - bounds.left()) * sx) as f32,
        ((client_y as f64 - bounds.top()) * sy) as f32,
    )
}

fn push(events: &EventQueue, event: InputEvent) {
    events.borrow_mut().push(HostEvent::Input(event));
}

impl Listeners {
    pub fn attach(canvas: &HtmlCanvasElement, events: EventQueue, audio: ContextSlot) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let mut listeners = Self { attached: Vec::new() };

        {
            let events = events.clone();
            let audio = audio.clone();
            listeners.add(window.clone().into(), "keydown", move |event| {
                let Some(event) = event.dyn_ref::<KeyboardEvent>() else { return };
                let key = Key::from_code(&event.code());
                if key != Key::Other {
                    event.prevent_default();
                }
                audio.resume();
                push(&events, InputEvent::KeyDown { key });
            })?;
        }
        {
            let events = events.clone();
            listeners.add(window.into(), "keyup", move |event| {
                let Some(event) = event.dyn_ref::<KeyboardEvent>() else { return };
                push(&events, InputEvent::KeyUp { key: Key::from_code(&event.code()) });
            })?;
        }

        let target: EventTarget = canvas.clone().into();
        for (name, starts) in [("touchstart", true), ("touchmove", false)] {
            let events = events.clone();
            let audio = audio.clone();
            let canvas = canvas.clone();
            listeners.add(target.clone(), name, move |event| {
                let Some(event) = event.dyn_ref::<TouchEvent>() else { return };
                event.prevent_default();
                let Some(touch) = event.touches().get(0) else { return };
                let (x, y) = local_point(&canvas, touch.client_x(), touch.client_y());
                if starts {
                    audio.resume();
                    push(&events, InputEvent::TouchStart { x, y });
                } else {
                    push(&events, InputEvent::TouchMove { x, y });
                }
            })?;
        }
        for name in ["touchend", "touchcancel"] {
            let events = events.clone();
            listeners.add(target.clone(), name, move |event| {
                event.prevent_default();
                push(&events, InputEvent::TouchEnd);
            })?;
        }
        {
            let canvas = canvas.clone();
            listeners.add(target, "mousedown", move |event| {
                let Some(event) = event.dyn_ref::<MouseEvent>() else { return };
                let (x, y) = local_point(&canvas, event.client_x(), event.client_y());
                audio.resume();
                push(&events, InputEvent::Click { x, y });
            })?;
        }

        log::debug!("listeners: {} attached", listeners.attached.len());
        Ok(listeners)
    }

    fn add(
        &mut self,
        target: EventTarget,
        name: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<(), JsValue> {
        let handler = Handler::new(handler);
        target.add_event_listener_with_callback(name, handler.as_ref().unchecked_ref())?;
        self.attached.push((target, name, handler));
        Ok(())
    }

    pub fn detach(&mut self) {
        for (target, name, handler) in self.attached.drain(..) {
            let _ = target.remove_event_listener_with_callback(name, handler.as_ref().unchecked_ref());
        }
    }
}

impl Drop for Listeners {
    fn drop(&mut self) {
        self.detach();
    }
}
