use std::cell::RefCell;
use std::rc::Rc;
use crate::api::types::{BufferHandle, LoadTicket, VoiceId};

/// Host seam for audio output.
///
/// The browser only allows an audio context after a user gesture, so
/// `create_context` is called lazily by `SoundManager::unlock`. Decodes are
/// asynchronous and report back as `HostEvent::SoundDecoded`; natural voice
/// completion reports back as `HostEvent::VoiceEnded`.
pub trait AudioBackend {
    fn create_context(&mut self) -> Result<(), String>;

    fn request_decode(&mut self, ticket: LoadTicket, url: &str);

    /// Start `buffer` on a fresh voice routed through the master gain.
    fn start_voice(
        &mut self,
        voice: VoiceId,
        buffer: BufferHandle,
        volume: f32,
        looping: bool,
    ) -> Result<(), String>;

    fn stop_voice(&mut self, voice: VoiceId);

    /// Gain of the single shared stage every voice passes through.
    fn set_master_gain(&mut self, gain: f32);
}

/// Calls observed by `NullAudio`.
#[derive(Debug, Clone, Default)]
pub struct AudioLog {
    pub contexts: u32,
    pub decodes: Vec<(LoadTicket, String)>,
    pub started: Vec<(VoiceId, BufferHandle, f32, bool)>,
    pub stopped: Vec<VoiceId>,
    pub gains: Vec<f32>,
}

/// Silent backend. Records what it was asked to do.
#[derive(Debug, Clone, Default)]
pub struct NullAudio {
    log: Rc<RefCell<AudioLog>>,
    refuse_context: bool,
}

impl NullAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose context creation always fails (no audio device).
    pub fn unavailable() -> Self {
        Self {
            refuse_context: true,
            ..Self::default()
        }
    }

    pub fn log(&self) -> AudioLog {
        self.log.borrow().clone()
    }
}

impl AudioBackend for NullAudio {
    fn create_context(&mut self) -> Result<(), String> {
        if self.refuse_context {
            return Err("no audio device".to_string());
        }
        self.log.borrow_mut().contexts += 1;
        Ok(())
    }

    fn request_decode(&mut self, ticket: LoadTicket, url: &str) {
        self.log.borrow_mut().decodes.push((ticket, url.to_string()));
    }

    fn start_voice(
        &mut self,
        voice: VoiceId,
        buffer: BufferHandle,
        volume: f32,
        looping: bool,
    ) -> Result<(), String> {
        self.log.borrow_mut().started.push((voice, buffer, volume, looping));
        Ok(())
    }

    fn stop_voice(&mut self, voice: VoiceId) {
        self.log.borrow_mut().stopped.push(voice);
    }

    fn set_master_gain(&mut self, gain: f32) {
        self.log.borrow_mut().gains.push(gain);
    }
}
