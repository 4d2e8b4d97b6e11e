use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use hop_engine::{AudioBackend, BufferHandle, HostEvent, LoadTicket, VoiceId};
use js_sys::ArrayBuffer;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    AudioBuffer, AudioBufferSourceNode, AudioContext, AudioContextState, AudioScheduledSourceNode, GainNode,
    Response,
};
use crate::js::{describe, on_settle};
use crate::runner::EventQueue;

/// The page's audio context, shared with the DOM listeners so a user
/// gesture can resume it while the gesture is still being handled.
#[derive(Clone, Default)]
pub struct ContextSlot(Rc<RefCell<Option<AudioContext>>>);

impl ContextSlot {
    pub fn get(&self) -> Option<AudioContext> {
        self.0.borrow().clone()
    }

    fn set(&self, ctx: AudioContext) {
        *self.0.borrow_mut() = Some(ctx);
    }

    /// Resume a context the browser created suspended.
    pub fn resume(&self) {
        if let Some(ctx) = self.0.borrow().as_ref() {
            if ctx.state() == AudioContextState::Suspended {
                let _ = ctx.resume();
            }
        }
    }
}

type Voices = Rc<RefCell<HashMap<VoiceId, AudioBufferSourceNode>>>;

/// Web Audio backend: one `AudioContext`, one master `GainNode`, a fresh
/// source node per voice.
pub struct WebAudio {
    events: EventQueue,
    slot: ContextSlot,
    master: Option<GainNode>,
    buffers: Rc<RefCell<HashMap<BufferHandle, AudioBuffer>>>,
    next_buffer: Rc<Cell<u32>>,
    voices: Voices,
}

impl WebAudio {
    pub fn new(events: EventQueue, slot: ContextSlot) -> Self {
        Self {
            events,
            slot,
            master: None,
            buffers: Rc::default(),
            next_buffer: Rc::new(Cell::new(1)),
            voices: Rc::default(),
        }
    }

    fn start_source(
        &self,
        ctx: &AudioContext,
        master: &GainNode,
        voice: VoiceId,
        buffer: &AudioBuffer,
        volume: f32,
        looping: bool,
    ) -> Result<AudioBufferSourceNode, JsValue> {
        let source = ctx.create_buffer_source()?;
        source.set_buffer(Some(buffer));
        source.set_loop(looping);
        let gain = ctx.create_gain()?;
        gain.gain().set_value(volume);
        source.connect_with_audio_node(&gain)?;
        gain.connect_with_audio_node(master)?;

        let events = self.events.clone();
        let voices = self.voices.clone();
        let ended = Closure::once_into_js(move || {
            if voices.borrow_mut().remove(&voice).is_some() {
                events.borrow_mut().push(HostEvent::VoiceEnded(voice));
            }
        });
        let scheduled: &AudioScheduledSourceNode = source.as_ref();
        scheduled.set_onended(Some(ended.unchecked_ref()));
        scheduled.start()?;
        Ok(source)
    }
}

fn decoded(events: &EventQueue, ticket: LoadTicket, result: Result<BufferHandle, String>) {
    events.borrow_mut().push(HostEvent::SoundDecoded { ticket, result });
}

impl AudioBackend for WebAudio {
    fn create_context(&mut self) -> Result<(), String> {
        if self.slot.get().is_some() {
            return Ok(());
        }
        let ctx = AudioContext::new().map_err(|e| describe(&e))?;
        let master = ctx.create_gain().map_err(|e| describe(&e))?;
        master
            .connect_with_audio_node(&ctx.destination())
            .map_err(|e| describe(&e))?;
        self.master = Some(master);
        self.slot.set(ctx);
        self.slot.resume();
        Ok(())
    }

    fn request_decode(&mut self, ticket: LoadTicket, url: &str) {
        let (Some(ctx), Some(window)) = (self.slot.get(), web_sys::window()) else {
            decoded(&self.events, ticket, Err("audio context not created".to_string()));
            return;
        };
        let events = self.events.clone();
        let buffers = self.buffers.clone();
        let next_buffer = self.next_buffer.clone();
        on_settle(&window.fetch_with_str(url), move |result| {
            let body = result
                .and_then(|value| value.dyn_into::<Response>())
                .and_then(|response| response.array_buffer());
            let body = match body {
                Ok(body) => body,
                Err(e) => return decoded(&events, ticket, Err(describe(&e))),
            };
            on_settle(&body, move |result| {
                let decoding = result
                    .and_then(|value| value.dyn_into::<ArrayBuffer>())
                    .and_then(|data| ctx.decode_audio_data(&data));
                let decoding = match decoding {
                    Ok(promise) => promise,
                    Err(e) => return decoded(&events, ticket, Err(describe(&e))),
                };
                on_settle(&decoding, move |result| {
                    match result.and_then(|value| value.dyn_into::<AudioBuffer>()) {
                        Ok(buffer) => {
                            let handle = BufferHandle(next_buffer.get());
                            next_buffer.set(handle.0 + 1);
                            buffers.borrow_mut().insert(handle, buffer);
                            decoded(&events, ticket, Ok(handle));
                        }
                        Err(e) => decoded(&events, ticket, Err(describe(&e))),
                    }
                });
            });
        });
    }

    fn start_voice(
        &mut self,
        voice: VoiceId,
        buffer: BufferHandle,
        volume: f32,
        looping: bool,
    ) -> Result<(), String> {
        let (Some(ctx), Some(master)) = (self.slot.get(), self.master.as_ref()) else {
            return Err("audio context not created".to_string());
        };
        let buffers = self.buffers.borrow();
        let data = buffers
            .get(&buffer)
            .ok_or_else(|| format!("unknown buffer {}", buffer.0))?;
        let source = self
            .start_source(&ctx, master, voice, data, volume, looping)
            .map_err(|e| describe(&e))?;
        self.voices.borrow_mut().insert(voice, source);
        Ok(())
    }

    fn stop_voice(&mut self, voice: VoiceId) {
        if let Some(source) = self.voices.borrow_mut().remove(&voice) {
            let scheduled: &AudioScheduledSourceNode = source.as_ref();
            scheduled.set_onended(None);
            let _ = scheduled.stop();
        }
    }

    fn set_master_gain(&mut self, gain: f32) {
        if let Some(master) = self.master.as_ref() {
            master.gain().set_value(gain);
        }
    }
}
