//! Sound loading and playback bookkeeping.
//!
//! Shared decoded buffers live in `sounds`; every `play_sound` call gets its
//! own `VoiceId` that is reaped when the host reports the voice ended.
//! Background music occupies a single slot.

use std::collections::HashMap;
use crate::api::error::{EngineError, EngineResult};
use crate::api::types::{BufferHandle, LoadTicket, VoiceId};
use crate::audio::backend::AudioBackend;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundOptions {
    pub looping: bool,
    pub volume: f32,
}

impl Default for SoundOptions {
    fn default() -> Self {
        Self { looping: false, volume: 1.0 }
    }
}

#[derive(Debug, Clone)]
struct Sound {
    url: String,
    buffer: Option<BufferHandle>,
    error: Option<String>,
    /// Decode has been handed to the backend.
    requested: bool,
    options: SoundOptions,
}

#[derive(Debug, Clone)]
struct Voice {
    sound: String,
}

pub struct SoundManager {
    backend: Box<dyn AudioBackend>,
    context_ready: bool,
    sounds: HashMap<String, Sound>,
    voices: HashMap<VoiceId, Voice>,
    music: Option<VoiceId>,
    /// Music asked for before it could start (no context or not decoded yet).
    pending_music: Option<String>,
    next_voice: u32,
    master_volume: f32,
    muted: bool,
    generation: u64,
}

impl SoundManager {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            context_ready: false,
            sounds: HashMap::new(),
            voices: HashMap::new(),
            music: None,
            pending_music: None,
            next_voice: 1,
            master_volume: 1.0,
            muted: false,
            generation: 0,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.context_ready
    }

    /// Create the audio context. Call from the first user gesture.
    /// Decodes requested before this point are issued now.
    pub fn unlock(&mut self) -> EngineResult<()> {
        if self.context_ready {
            return Ok(());
        }
        self.backend
            .create_context()
            .map_err(EngineError::AudioUnavailable)?;
        self.context_ready = true;
        self.apply_gain();
        log::info!("audio: context created");

        let generation = self.generation;
        for (id, sound) in self.sounds.iter_mut().filter(|(_, s)| !s.requested) {
            sound.requested = true;
            self.backend.request_decode(LoadTicket { id: id.clone(), generation }, &sound.url);
        }
        self.try_start_pending_music();
        Ok(())
    }

    /// Register a sound. Idempotent for loaded or in-flight ids; a failed id
    /// is retried.
    pub fn load_sound(&mut self, id: &str, url: &str, options: SoundOptions) {
        if let Some(existing) = self.sounds.get(id) {
            if existing.error.is_none() {
                return;
            }
        }
        let mut sound = Sound {
            url: url.to_string(),
            buffer: None,
            error: None,
            requested: false,
            options,
        };
        if self.context_ready {
            sound.requested = true;
            self.backend.request_decode(
                LoadTicket { id: id.to_string(), generation: self.generation },
                url,
            );
        }
        self.sounds.insert(id.to_string(), sound);
    }

    /// Apply a decode completion reported by the host.
    pub fn complete_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<BufferHandle, String>,
    ) -> EngineResult<()> {
        if ticket.generation != self.generation {
            log::debug!("audio: dropping late decode for '{}'", ticket.id);
            return Ok(());
        }
        let Some(sound) = self.sounds.get_mut(&ticket.id) else {
            return Ok(());
        };
        match result {
            Ok(buffer) => {
                sound.buffer = Some(buffer);
                self.try_start_pending_music();
                Ok(())
            }
            Err(reason) => {
                log::warn!("audio: '{}' failed to decode: {}", ticket.id, reason);
                sound.error = Some(reason.clone());
                Err(EngineError::AssetLoad { id: ticket.id.clone(), reason })
            }
        }
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.sounds.get(id).is_some_and(|s| s.buffer.is_some())
    }

    /// Play a loaded sound with its default options.
    /// Returns `None` when audio is locked or the sound is not ready.
    pub fn play_sound(&mut self, id: &str) -> Option<VoiceId> {
        let options = self.sounds.get(id)?.options;
        self.play_sound_with(id, options)
    }

    pub fn play_sound_with(&mut self, id: &str, options: SoundOptions) -> Option<VoiceId> {
        if !self.context_ready {
            return None;
        }
        let buffer = self.sounds.get(id)?.buffer?;
        let voice = VoiceId(self.next_voice);
        self.next_voice += 1;
        let volume = options.volume.clamp(0.0, 1.0);
        if let Err(e) = self.backend.start_voice(voice, buffer, volume, options.looping) {
            log::warn!("audio: could not start '{}': {}", id, e);
            return None;
        }
        self.voices.insert(voice, Voice { sound: id.to_string() });
        Some(voice)
    }

    /// The host reports a voice finished on its own.
    pub fn voice_ended(&mut self, voice: VoiceId) {
        self.voices.remove(&voice);
        if self.music == Some(voice) {
            self.music = None;
        }
    }

    pub fn stop_sound(&mut self, voice: VoiceId) {
        if self.voices.remove(&voice).is_some() {
            self.backend.stop_voice(voice);
        }
        if self.music == Some(voice) {
            self.music = None;
        }
    }

    /// Start `id` as background music, replacing whatever is playing.
    /// If it cannot start yet, it starts as soon as audio unlocks and the
    /// track is decoded.
    pub fn play_music(&mut self, id: &str) -> Option<VoiceId> {
        self.stop_music();
        let options = SoundOptions {
            looping: true,
            ..self.sounds.get(id).map(|s| s.options).unwrap_or_default()
        };
        match self.play_sound_with(id, options) {
            Some(voice) => {
                self.music = Some(voice);
                Some(voice)
            }
            None => {
                self.pending_music = Some(id.to_string());
                None
            }
        }
    }

    pub fn stop_music(&mut self) {
        self.pending_music = None;
        if let Some(voice) = self.music.take() {
            self.stop_sound(voice);
        }
    }

    pub fn music(&self) -> Option<VoiceId> {
        self.music
    }

    fn try_start_pending_music(&mut self) {
        let Some(id) = self.pending_music.clone() else {
            return;
        };
        if self.context_ready && self.is_loaded(&id) {
            self.play_music(&id);
        }
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
        self.apply_gain();
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.apply_gain();
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn apply_gain(&mut self) {
        if !self.context_ready {
            return;
        }
        let gain = if self.muted { 0.0 } else { self.master_volume };
        self.backend.set_master_gain(gain);
    }

    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    /// Which sound a voice is playing.
    pub fn voice_sound(&self, voice: VoiceId) -> Option<&str> {
        self.voices.get(&voice).map(|v| v.sound.as_str())
    }

    /// Stop everything and forget all sounds. Late decodes are dropped.
    pub fn dispose(&mut self) {
        let voices: Vec<VoiceId> = self.voices.keys().copied().collect();
        for voice in voices {
            self.backend.stop_voice(voice);
        }
        self.voices.clear();
        self.sounds.clear();
        self.music = None;
        self.pending_music = None;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::NullAudio;

    fn manager() -> (SoundManager, NullAudio) {
        let backend = NullAudio::new();
        (SoundManager::new(Box::new(backend.clone())), backend)
    }

    fn decode_all(sounds: &mut SoundManager, backend: &NullAudio) {
        for (i, (ticket, _)) in backend.log().decodes.iter().enumerate() {
            sounds.complete_load(ticket, Ok(BufferHandle(i as u32 + 1))).unwrap();
        }
    }

    #[test]
    fn decodes_wait_for_unlock() {
        let (mut sounds, backend) = manager();
        sounds.load_sound("jump", "jump.wav", SoundOptions::default());
        assert!(backend.log().decodes.is_empty());
        assert_eq!(sounds.play_sound("jump"), None);

        sounds.unlock().unwrap();
        sounds.unlock().unwrap();
        assert_eq!(backend.log().contexts, 1);
        assert_eq!(backend.log().decodes.len(), 1);
    }

    #[test]
    fn load_is_idempotent() {
        let (mut sounds, backend) = manager();
        sounds.unlock().unwrap();
        sounds.load_sound("jump", "jump.wav", SoundOptions::default());
        sounds.load_sound("jump", "jump.wav", SoundOptions::default());
        assert_eq!(backend.log().decodes.len(), 1);
    }

    #[test]
    fn each_play_gets_its_own_voice_and_is_reaped() {
        let (mut sounds, backend) = manager();
        sounds.unlock().unwrap();
        sounds.load_sound("coin", "coin.mp3", SoundOptions::default());
        decode_all(&mut sounds, &backend);

        let a = sounds.play_sound("coin").unwrap();
        let b = sounds.play_sound("coin").unwrap();
        assert_ne!(a, b);
        assert_eq!(sounds.active_count(), 2);
        assert_eq!(sounds.voice_sound(a), Some("coin"));

        sounds.voice_ended(a);
        assert_eq!(sounds.active_count(), 1);
        assert!(backend.log().stopped.is_empty());
    }

    #[test]
    fn music_slot_replaces_previous_track() {
        let (mut sounds, backend) = manager();
        sounds.unlock().unwrap();
        sounds.load_sound("music_a", "a.ogg", SoundOptions::default());
        sounds.load_sound("music_b", "b.ogg", SoundOptions::default());
        decode_all(&mut sounds, &backend);

        let first = sounds.play_music("music_a").unwrap();
        let second = sounds.play_music("music_b").unwrap();
        assert_eq!(backend.log().stopped, vec![first]);
        assert_eq!(sounds.music(), Some(second));
        assert!(backend.log().started.iter().all(|s| s.3));
    }

    #[test]
    fn music_requested_early_starts_after_unlock_and_decode() {
        let (mut sounds, backend) = manager();
        sounds.load_sound("music_theme", "theme.ogg", SoundOptions::default());
        assert_eq!(sounds.play_music("music_theme"), None);
        sounds.unlock().unwrap();
        assert!(sounds.music().is_none());
        decode_all(&mut sounds, &backend);
        assert!(sounds.music().is_some());
    }

    #[test]
    fn mute_goes_through_shared_gain() {
        let (mut sounds, backend) = manager();
        sounds.set_master_volume(0.5);
        sounds.unlock().unwrap();
        sounds.set_muted(true);
        sounds.set_muted(false);
        assert_eq!(backend.log().gains, vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn unavailable_audio_reports_error() {
        let mut sounds = SoundManager::new(Box::new(NullAudio::unavailable()));
        assert!(matches!(sounds.unlock(), Err(EngineError::AudioUnavailable(_))));
        assert!(!sounds.is_unlocked());
    }

    #[test]
    fn late_decode_after_dispose_is_ignored() {
        let (mut sounds, backend) = manager();
        sounds.unlock().unwrap();
        sounds.load_sound("jump", "jump.wav", SoundOptions::default());
        let ticket = backend.log().decodes[0].0.clone();
        sounds.dispose();
        sounds.complete_load(&ticket, Ok(BufferHandle(1))).unwrap();
        assert!(!sounds.is_loaded("jump"));
    }
}
