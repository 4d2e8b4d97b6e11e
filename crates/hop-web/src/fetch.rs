use std::cell::Cell;
use std::rc::Rc;
use hop_engine::{AssetFetcher, AssetKind, AssetPayload, HostEvent, ImageHandle, LoadTicket};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlImageElement, Response};
use crate::canvas::ImageStore;
use crate::js::{describe, on_settle};
use crate::runner::EventQueue;

/// Loads images through `<img>` elements and everything else through `fetch`.
/// Every outcome is queued as `HostEvent::AssetLoaded`.
pub struct WebFetcher {
    events: EventQueue,
    images: ImageStore,
    next_image: Rc<Cell<u32>>,
}

impl WebFetcher {
    pub fn new(events: EventQueue, images: ImageStore) -> Self {
        Self { events, images, next_image: Rc::new(Cell::new(1)) }
    }

    fn load_image(&self, ticket: LoadTicket, url: &str) {
        let image = match HtmlImageElement::new() {
            Ok(image) => image,
            Err(e) => {
                finish(&self.events, ticket, Err(describe(&e)));
                return;
            }
        };
        let handle = ImageHandle(self.next_image.get());
        self.next_image.set(handle.0 + 1);

        let onload = {
            let events = self.events.clone();
            let images = self.images.clone();
            let ticket = ticket.clone();
            let element = image.clone();
            Closure::once_into_js(move || {
                let payload = AssetPayload::Image {
                    handle,
                    width: element.natural_width(),
                    height: element.natural_height(),
                };
                images.borrow_mut().insert(handle, element);
                finish(&events, ticket, Ok(payload));
            })
        };
        let onerror = {
            let events = self.events.clone();
            let url = url.to_string();
            Closure::once_into_js(move || {
                finish(&events, ticket, Err(format!("could not load image {url}")));
            })
        };
        image.set_onload(Some(onload.unchecked_ref()));
        image.set_onerror(Some(onerror.unchecked_ref()));
        image.set_src(url);
    }

    fn load_data(&self, ticket: LoadTicket, url: &str, kind: AssetKind) {
        let Some(window) = web_sys::window() else {
            finish(&self.events, ticket, Err("no window".to_string()));
            return;
        };
        let events = self.events.clone();
        on_settle(&window.fetch_with_str(url), move |result| {
            let response = match result.and_then(|value| value.dyn_into::<Response>()) {
                Ok(response) => response,
                Err(e) => return finish(&events, ticket, Err(describe(&e))),
            };
            if !response.ok() {
                return finish(&events, ticket, Err(format!("HTTP {}", response.status())));
            }
            let body = match kind {
                AssetKind::Json => response.json(),
                _ => response.array_buffer(),
            };
            let body = match body {
                Ok(body) => body,
                Err(e) => return finish(&events, ticket, Err(describe(&e))),
            };
            on_settle(&body, move |result| {
                let payload = result
                    .map_err(|e| describe(&e))
                    .and_then(|value| decode(value, kind));
                finish(&events, ticket, payload);
            });
        });
    }
}

fn decode(value: JsValue, kind: AssetKind) -> Result<AssetPayload, String> {
    match kind {
        AssetKind::Json => {
            let text: String = js_sys::JSON::stringify(&value)
                .map_err(|e| describe(&e))?
                .into();
            serde_json::from_str(&text)
                .map(AssetPayload::Json)
                .map_err(|e| e.to_string())
        }
        _ => Ok(AssetPayload::Binary(js_sys::Uint8Array::new(&value).to_vec())),
    }
}

fn finish(events: &EventQueue, ticket: LoadTicket, result: Result<AssetPayload, String>) {
    events.borrow_mut().push(HostEvent::AssetLoaded { ticket, result });
}

impl AssetFetcher for WebFetcher {
    fn fetch(&mut self, ticket: LoadTicket, url: &str, kind: AssetKind) {
        log::debug!("fetch: '{}' <- {}", ticket.id, url);
        if kind.is_image() {
            self.load_image(ticket, url);
        } else {
            self.load_data(ticket, url, kind);
        }
    }
}
