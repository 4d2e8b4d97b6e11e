//! Small helpers over raw JS values and promises.

use std::cell::RefCell;
use std::rc::Rc;
use js_sys::Promise;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsValue;

/// Human-readable text for a thrown JS value.
pub fn describe(e: &JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{e:?}"))
}

/// Run `done` once `promise` settles, with its value or rejection reason.
///
/// The two settle callbacks are handed to JS and freed by it; exactly one of
/// them ever runs `done`.
pub fn on_settle(promise: &Promise, done: impl FnOnce(Result<JsValue, JsValue>) + 'static) {
    let done = Rc::new(RefCell::new(Some(done)));
    let resolved = {
        let done = done.clone();
        Closure::once(move |value: JsValue| {
            if let Some(f) = done.borrow_mut().take() {
                f(Ok(value));
            }
        })
    };
    let rejected = Closure::once(move |reason: JsValue| {
        if let Some(f) = done.borrow_mut().take() {
            f(Err(reason));
        }
    });
    let _ = promise.then2(&resolved, &rejected);
    resolved.forget();
    rejected.forget();
}
