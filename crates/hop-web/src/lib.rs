pub mod audio;
pub mod canvas;
pub mod fetch;
mod js;
pub mod listeners;
pub mod runner;

use std::cell::RefCell;
use hop_engine::{Rect, VirtualAction};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

pub use runner::WebRunner;

thread_local! {
    static RUNNER: RefCell<Option<WebRunner>> = RefCell::new(None);
    static FRAME: RefCell<Option<Closure<dyn FnMut(f64)>>> = RefCell::new(None);
}

fn with_runner<R>(f: impl FnOnce(&mut WebRunner) -> R) -> Option<R> {
    RUNNER.with(|cell| {
        let mut borrow = cell.borrow_mut();
        match borrow.as_mut() {
            Some(runner) => Some(f(runner)),
            None => {
                log::warn!("hop: game not initialized, call game_init() first");
                None
            }
        }
    })
}

fn on_frame(now_ms: f64) {
    let running = with_runner(|r| {
        r.frame(now_ms);
        r.is_running()
    });
    if running == Some(true) {
        request_frame();
    }
}

fn request_frame() {
    if with_runner(|r| r.has_frame_request()) != Some(false) {
        return;
    }
    let requested = FRAME.with(|slot| {
        let mut slot = slot.borrow_mut();
        let callback = slot.get_or_insert_with(|| Closure::new(on_frame));
        web_sys::window()?
            .request_animation_frame(callback.as_ref().unchecked_ref())
            .map_err(|e| log::error!("hop: requestAnimationFrame failed: {:?}", e))
            .ok()
    });
    if let Some(id) = requested {
        with_runner(|r| r.set_frame_request(id));
    }
}

/// Bind the engine to `<canvas id=canvas_id>` and load level 0.
/// `params_json` is the game parameter document; `manifest_json` the optional
/// asset manifest.
#[wasm_bindgen]
pub fn game_init(canvas_id: &str, params_json: &str, manifest_json: Option<String>) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    if RUNNER.with(|cell| cell.borrow().is_some()) {
        return Err(JsValue::from_str("game already initialized"));
    }
    let runner = WebRunner::new(canvas_id, params_json, manifest_json.as_deref())?;
    RUNNER.with(|cell| {
        *cell.borrow_mut() = Some(runner);
    });
    log::info!("hop: initialized on #{}", canvas_id);
    Ok(())
}

#[wasm_bindgen]
pub fn game_start() -> Result<(), JsValue> {
    with_runner(|r| r.start()).unwrap_or_else(|| Err(JsValue::from_str("game not initialized")))?;
    request_frame();
    Ok(())
}

#[wasm_bindgen]
pub fn game_stop() {
    with_runner(|r| r.stop());
}

#[wasm_bindgen]
pub fn game_resize(width: u32, height: u32) -> Result<(), JsValue> {
    with_runner(|r| r.resize(width, height)).unwrap_or_else(|| Err(JsValue::from_str("game not initialized")))
}

#[wasm_bindgen]
pub fn game_set_muted(muted: bool) {
    with_runner(|r| r.set_muted(muted));
}

/// Add an on-screen button. `action` is one of left, right, up, down, jump
/// or action.
#[wasm_bindgen]
pub fn game_add_virtual_button(x: f32, y: f32, width: f32, height: f32, action: &str) -> Result<(), JsValue> {
    let action = match action {
        "left" => VirtualAction::Left,
        "right" => VirtualAction::Right,
        "up" => VirtualAction::Up,
        "down" => VirtualAction::Down,
        "jump" => VirtualAction::Jump,
        "action" => VirtualAction::Action,
        other => return Err(JsValue::from_str(&format!("unknown button action '{other}'"))),
    };
    with_runner(|r| r.add_virtual_button(Rect::new(x, y, width, height), action));
    Ok(())
}

#[wasm_bindgen]
pub fn game_dispose() {
    if let Some(mut runner) = RUNNER.with(|cell| cell.borrow_mut().take()) {
        runner.dispose();
    }
    FRAME.with(|slot| slot.borrow_mut().take());
    log::info!("hop: disposed");
}
