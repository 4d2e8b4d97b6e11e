//! The runtime: lifecycle state machine, per-frame tick and level flow.
//!
//! The host owns scheduling. It calls `frame(now_ms)` once per display
//! refresh and feeds asynchronous results back through `handle_event`.
//! Nothing here blocks on a load.

pub mod level;
pub mod overlay;
pub mod platforms;
pub mod rules;

use std::collections::HashMap;
use crate::api::error::{EngineError, EngineResult};
use crate::api::types::{Color, EntityId, HostEvent, Rect};
use crate::assets::fetcher::AssetFetcher;
use crate::assets::manager::AssetManager;
use crate::assets::manifest::{AssetManifest, MAIN_BACKGROUND};
use crate::audio::backend::AudioBackend;
use crate::audio::manager::{SoundManager, SoundOptions};
use crate::core::scene::Scene;
use crate::core::time::FrameClock;
use crate::input::manager::{InputManager, VirtualAction};
use crate::renderer::surface::Surface;
use crate::renderer::Renderer;
use level::{spawn_level, GameParams, LevelBackground};
use rules::{Progress, RuleEvent};

/// Name of the scene levels are spawned into.
pub const LEVEL_SCENE: &str = "level";

const JUMP_SOUND: &str = "jump";
const STOMP_SOUND: &str = "stomp";
const HURT_SOUND: &str = "hurt";

/// Runtime tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Seconds the "level complete" overlay stays up before the next level.
    pub transition_delay: f32,
    /// Frame delta cap in seconds.
    pub max_frame_dt: f32,
    /// Upward speed given to the player after defeating an enemy.
    pub defeat_bounce: f32,
    pub defeat_bonus: u32,
    /// Seconds a temporary platform survives after the player jumps off it.
    pub temporary_platform_delay: f32,
    pub music_volume: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transition_delay: 2.0,
            max_frame_dt: 0.1,
            defeat_bounce: 7.0,
            defeat_bonus: 50,
            temporary_platform_delay: 0.5,
            music_volume: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    /// Ready, frame loop not running.
    Initialized,
    Running,
    Stopped,
    Disposed,
}

/// Level flow between levels. Anything other than `None` suspends gameplay
/// rules while rendering continues.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    None,
    LevelComplete { next: usize, remaining: f32 },
    /// Last level done. Waits for any key or tap to restart.
    GameComplete,
}

/// Everything `initialize` needs besides the surface.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub params: GameParams,
    pub manifest: AssetManifest,
    pub config: EngineConfig,
}

impl EngineOptions {
    /// Parse game parameters and an optional asset manifest.
    pub fn from_json(params_json: &str, manifest_json: Option<&str>) -> EngineResult<Self> {
        let params = GameParams::from_json(params_json)?;
        let manifest = match manifest_json {
            Some(json) => AssetManifest::from_json(json)?,
            None => AssetManifest::default(),
        };
        Ok(Self { params, manifest, config: EngineConfig::default() })
    }
}

/// Optional embedder callbacks.
#[derive(Default)]
pub struct EngineHooks {
    /// After the gameplay pass, with the frame delta.
    pub on_update: Option<Box<dyn FnMut(f32)>>,
    /// Last thing drawn each frame, over the overlays.
    pub on_render: Option<Box<dyn FnMut(&mut Renderer)>>,
    pub on_start: Option<Box<dyn FnMut()>>,
    pub on_stop: Option<Box<dyn FnMut()>>,
}

pub struct Engine {
    state: EngineState,
    transition: Transition,
    config: EngineConfig,
    params: GameParams,
    manifest: AssetManifest,
    renderer: Option<Renderer>,
    scene: Scene,
    active_scene: String,
    parked: HashMap<String, Scene>,
    input: InputManager,
    assets: AssetManager,
    sounds: SoundManager,
    audio_failed: bool,
    clock: FrameClock,
    hooks: EngineHooks,
    level_index: usize,
    level_name: String,
    player: Option<EntityId>,
    progress: Progress,
}

impl Engine {
    pub fn new(fetcher: Box<dyn AssetFetcher>, audio: Box<dyn AudioBackend>) -> Self {
        let config = EngineConfig::default();
        Self {
            state: EngineState::Uninitialized,
            transition: Transition::None,
            clock: FrameClock::new(config.max_frame_dt),
            config,
            params: GameParams::default(),
            manifest: AssetManifest::default(),
            renderer: None,
            scene: Scene::default(),
            active_scene: LEVEL_SCENE.to_string(),
            parked: HashMap::new(),
            input: InputManager::new(),
            assets: AssetManager::new(fetcher),
            sounds: SoundManager::new(audio),
            audio_failed: false,
            hooks: EngineHooks::default(),
            level_index: 0,
            level_name: String::new(),
            player: None,
            progress: Progress::default(),
        }
    }

    /// Bind the surface, start preloading and load level 0.
    /// Callable once per engine. A surface that cannot be sized is fatal.
    pub fn initialize(&mut self, surface: Box<dyn Surface>, options: EngineOptions) -> EngineResult<()> {
        if self.state != EngineState::Uninitialized {
            return Err(EngineError::AlreadyInitialized);
        }
        let world = options.params.world_size();
        self.renderer = Some(Renderer::new(surface, world.x as u32, world.y as u32)?);
        self.clock = FrameClock::new(options.config.max_frame_dt);
        self.config = options.config;
        self.params = options.params;
        self.manifest = options.manifest;
        self.scene = Scene::new(self.params.physics());
        self.active_scene = LEVEL_SCENE.to_string();
        self.preload();

        self.state = EngineState::Initialized;
        if let Err(e) = self.load_level(0) {
            self.state = EngineState::Uninitialized;
            self.renderer = None;
            return Err(e);
        }
        if let Some(music) = self.manifest.main_music() {
            self.sounds.play_music(&music);
        }
        log::info!(
            "engine: initialized {}x{} with {} level(s)",
            world.x,
            world.y,
            self.params.level_count()
        );
        Ok(())
    }

    fn preload(&mut self) {
        for request in self.manifest.requests() {
            self.assets.load_asset(&request.id, &request.url, Some(request.kind));
        }
        for request in self.manifest.sound_requests() {
            let options = if request.music {
                SoundOptions { looping: true, volume: self.config.music_volume }
            } else {
                SoundOptions::default()
            };
            self.sounds.load_sound(&request.id, &request.url, options);
        }
        log::debug!("engine: preloading {} asset(s)", self.assets.pending_count());
    }

    fn ensure_initialized(&self) -> EngineResult<()> {
        match self.state {
            EngineState::Uninitialized | EngineState::Disposed => Err(EngineError::NotInitialized),
            _ => Ok(()),
        }
    }

    /// Replace the level scene's contents with level `index` and make it
    /// active. Score carries over; collection counters reset.
    /// An invalid index is logged and the current level stays.
    pub fn load_level(&mut self, index: usize) -> EngineResult<()> {
        self.ensure_initialized()?;
        let target = if self.active_scene == LEVEL_SCENE {
            &mut self.scene
        } else {
            self.parked
                .get_mut(LEVEL_SCENE)
                .ok_or_else(|| EngineError::UnknownScene(LEVEL_SCENE.to_string()))?
        };
        let info = match spawn_level(target, &self.params, index, &self.manifest) {
            Ok(info) => info,
            Err(e) => {
                log::error!("engine: level {} not loaded: {}", index, e);
                return Err(e);
            }
        };
        self.switch_scene(LEVEL_SCENE)?;

        self.level_index = index;
        self.level_name = info.name;
        self.player = info.player;
        self.progress.start_level(info.required);
        self.apply_background(index, info.background);
        Ok(())
    }

    fn apply_background(&mut self, index: usize, background: Option<LevelBackground>) {
        let mut color = Color::SKY;
        let image = match background {
            Some(LevelBackground::Color(c)) => {
                color = c;
                None
            }
            Some(LevelBackground::Image(url)) => {
                let id = format!("level_bg_{index}");
                self.assets.load_asset(&id, &url, None);
                Some(id)
            }
            None => self.manifest.backgrounds.main.as_ref().map(|_| MAIN_BACKGROUND.to_string()),
        };
        self.scene.set_background(image);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_background(color);
        }
    }

    /// Begin the frame loop. No-op when already running.
    pub fn start(&mut self) -> EngineResult<()> {
        self.ensure_initialized()?;
        if self.state == EngineState::Running {
            return Ok(());
        }
        self.clock.reset();
        self.input.start();
        if let Some(hook) = self.hooks.on_start.as_mut() {
            hook();
        }
        self.state = EngineState::Running;
        log::info!("engine: started");
        Ok(())
    }

    /// Halt the frame loop. No-op unless running.
    pub fn stop(&mut self) {
        if self.state != EngineState::Running {
            return;
        }
        self.input.stop();
        if let Some(hook) = self.hooks.on_stop.as_mut() {
            hook();
        }
        self.state = EngineState::Stopped;
        log::info!("engine: stopped");
    }

    /// One scheduled frame at host time `now_ms`. Ignored unless running.
    pub fn frame(&mut self, now_ms: f64) {
        if self.state != EngineState::Running {
            return;
        }
        let dt = self.clock.tick(now_ms);
        self.step(dt);
    }

    /// Advance the game by `dt` seconds and draw.
    pub fn step(&mut self, dt: f32) {
        if self.ensure_initialized().is_err() {
            return;
        }
        self.input.update();
        match self.transition {
            Transition::None => self.tick_gameplay(dt),
            Transition::LevelComplete { next, remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.transition = Transition::LevelComplete { next, remaining };
                } else {
                    self.transition = Transition::None;
                    // Logged by load_level; the finished level stays playable.
                    let _ = self.load_level(next);
                }
            }
            Transition::GameComplete => {
                if self.input.any_just_pressed() {
                    self.restart();
                }
            }
        }
        if let Some(hook) = self.hooks.on_update.as_mut() {
            hook(dt);
        }
        self.render();
    }

    fn tick_gameplay(&mut self, dt: f32) {
        self.assets.update_sprites(dt);
        platforms::update_moving(&mut self.scene, dt);
        platforms::decay_temporary(&mut self.scene, dt);
        self.scene.update(dt);

        if self.active_scene != LEVEL_SCENE {
            return;
        }
        let Some(player) = self.player else {
            return;
        };
        let events = rules::run(
            &mut self.scene,
            player,
            &self.input,
            &mut self.progress,
            &self.config,
            self.params.world_size(),
        );
        for event in events {
            self.react(event);
        }
    }

    fn react(&mut self, event: RuleEvent) {
        match event {
            RuleEvent::Jumped => {
                self.sounds.play_sound(JUMP_SOUND);
            }
            RuleEvent::Collected { sound, .. } => {
                if let Some(sound) = sound {
                    self.sounds.play_sound(&sound);
                }
            }
            RuleEvent::EnemyDefeated(_) => {
                self.sounds.play_sound(STOMP_SOUND);
            }
            RuleEvent::PlayerHit | RuleEvent::FellOut => {
                self.sounds.play_sound(HURT_SOUND);
            }
            RuleEvent::ReachedExit | RuleEvent::LevelComplete => self.go_to_next_level(),
        }
    }

    /// Leave the current level: show "level complete" and load the next one
    /// after the transition delay, or show the final score after the last.
    /// Ignored while a transition is already under way.
    pub fn go_to_next_level(&mut self) {
        if self.transition != Transition::None {
            return;
        }
        let next = self.level_index + 1;
        if next < self.params.level_count() {
            log::info!("engine: '{}' complete", self.level_name);
            self.transition = Transition::LevelComplete { next, remaining: self.config.transition_delay };
        } else {
            log::info!("engine: game complete, score {}", self.progress.score);
            self.transition = Transition::GameComplete;
        }
        self.render();
    }

    fn restart(&mut self) {
        self.transition = Transition::None;
        self.progress.reset();
        // Level 0 always exists.
        let _ = self.load_level(0);
    }

    fn render(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        self.scene.render(renderer, &self.assets);
        overlay::draw_hud(renderer, &self.level_name, &self.progress);
        overlay::draw_buttons(renderer, self.input.virtual_buttons());
        match self.transition {
            Transition::None => {}
            Transition::LevelComplete { .. } => overlay::draw_level_complete(renderer, &self.level_name),
            Transition::GameComplete => overlay::draw_game_complete(renderer, self.progress.score),
        }
        if let Some(hook) = self.hooks.on_render.as_mut() {
            hook(renderer);
        }
    }

    /// Apply one host event: input, or an asynchronous load result.
    pub fn handle_event(&mut self, event: HostEvent) {
        if self.state == EngineState::Disposed {
            if let HostEvent::AssetLoaded { ticket, .. } = &event {
                log::debug!("engine: dropping '{}' loaded after dispose", ticket.id);
            }
            return;
        }
        match event {
            HostEvent::Input(input) => {
                if input.is_gesture() {
                    self.unlock_audio();
                }
                self.input.handle_event(input);
            }
            HostEvent::AssetLoaded { ticket, result } => {
                if self.assets.complete_load(&ticket, result).is_err() {
                    return;
                }
                if let Some(layout) = self.manifest.sheets.get(&ticket.id) {
                    if self.assets.is_loaded(&ticket.id) {
                        self.assets.create_sprite(&ticket.id, &ticket.id, layout);
                    }
                }
            }
            HostEvent::SoundDecoded { ticket, result } => {
                // Failures are logged by the sound manager.
                let _ = self.sounds.complete_load(&ticket, result);
            }
            HostEvent::VoiceEnded(voice) => self.sounds.voice_ended(voice),
        }
    }

    fn unlock_audio(&mut self) {
        if self.audio_failed || self.sounds.is_unlocked() {
            return;
        }
        if let Err(e) = self.sounds.unlock() {
            log::warn!("engine: {}", e);
            self.audio_failed = true;
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) -> EngineResult<()> {
        self.ensure_initialized()?;
        let renderer = self.renderer.as_mut().ok_or(EngineError::NotInitialized)?;
        renderer.resize(width, height);
        Ok(())
    }

    /// Tear everything down. Loads still in flight complete into nothing.
    pub fn dispose(&mut self) {
        if self.state == EngineState::Disposed {
            return;
        }
        self.stop();
        self.scene.clear();
        for scene in self.parked.values_mut() {
            scene.clear();
        }
        self.parked.clear();
        self.input.dispose();
        self.assets.dispose();
        self.sounds.dispose();
        self.renderer = None;
        self.player = None;
        self.transition = Transition::None;
        self.state = EngineState::Disposed;
        log::info!("engine: disposed");
    }

    /// Register a named scene. Registering under the active name replaces
    /// the active scene.
    pub fn add_scene(&mut self, name: impl Into<String>, scene: Scene) {
        let name = name.into();
        if name == self.active_scene {
            let mut old = std::mem::replace(&mut self.scene, scene);
            old.clear();
        } else if let Some(mut old) = self.parked.insert(name, scene) {
            old.clear();
        }
    }

    /// Make a registered scene active, parking the current one.
    pub fn switch_scene(&mut self, name: &str) -> EngineResult<()> {
        if name == self.active_scene {
            return Ok(());
        }
        let next = self
            .parked
            .remove(name)
            .ok_or_else(|| EngineError::UnknownScene(name.to_string()))?;
        let previous = std::mem::replace(&mut self.scene, next);
        let previous_name = std::mem::replace(&mut self.active_scene, name.to_string());
        self.parked.insert(previous_name, previous);
        log::debug!("engine: switched to scene '{}'", name);
        Ok(())
    }

    pub fn active_scene(&self) -> &str {
        &self.active_scene
    }

    pub fn add_virtual_button(&mut self, rect: Rect, action: VirtualAction) {
        self.input.add_virtual_button(rect, action);
    }

    /// Left, right and jump buttons along the bottom of the surface.
    pub fn add_touch_controls(&mut self) -> EngineResult<()> {
        let renderer = self.renderer.as_ref().ok_or(EngineError::NotInitialized)?;
        let [left, right, jump] = overlay::default_button_rects(renderer.width(), renderer.height());
        self.input.add_virtual_button(left, VirtualAction::Left);
        self.input.add_virtual_button(right, VirtualAction::Right);
        self.input.add_virtual_button(jump, VirtualAction::Jump);
        Ok(())
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.sounds.set_muted(muted);
    }

    pub fn set_hooks(&mut self, hooks: EngineHooks) {
        self.hooks = hooks;
    }

    pub fn hooks_mut(&mut self) -> &mut EngineHooks {
        &mut self.hooks
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition != Transition::None
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn params(&self) -> &GameParams {
        &self.params
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn input(&self) -> &InputManager {
        &self.input
    }

    pub fn assets(&self) -> &AssetManager {
        &self.assets
    }

    pub fn sounds(&self) -> &SoundManager {
        &self.sounds
    }

    pub fn sounds_mut(&mut self) -> &mut SoundManager {
        &mut self.sounds
    }

    pub fn renderer(&self) -> Option<&Renderer> {
        self.renderer.as_ref()
    }

    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn level_name(&self) -> &str {
        &self.level_name
    }

    pub fn score(&self) -> u32 {
        self.progress.score
    }

    pub fn collected(&self) -> u32 {
        self.progress.collected
    }

    pub fn required(&self) -> u32 {
        self.progress.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use glam::Vec2;
    use crate::api::types::{ImageHandle, LoadTicket};
    use crate::assets::asset::AssetPayload;
    use crate::assets::fetcher::RecordingFetcher;
    use crate::audio::backend::NullAudio;
    use crate::components::entity::Tag;
    use crate::input::queue::{InputEvent, Key};
    use crate::renderer::{DrawLog, RecordingSurface};

    const DT: f32 = 1.0 / 60.0;

    const TWO_LEVELS: &str = r##"{
        "world": { "levels": [
            { "name": "Meadow", "requiredCollectibles": 1,
              "platforms": [ { "x": 0, "y": 500, "width": 800, "height": 40 } ] },
            { "name": "Caves", "background": "#202020",
              "platforms": [ { "x": 0, "y": 500, "width": 800, "height": 40 } ] }
        ] },
        "player": { "startX": 50, "startY": 300 },
        "collectibles": [ { "x": 55, "y": 305, "value": 10 } ]
    }"##;

    struct Harness {
        engine: Engine,
        draws: DrawLog,
        fetcher: RecordingFetcher,
        audio: NullAudio,
    }

    fn harness(params: &str, manifest: Option<&str>) -> Harness {
        let fetcher = RecordingFetcher::new();
        let audio = NullAudio::new();
        let mut engine = Engine::new(Box::new(fetcher.clone()), Box::new(audio.clone()));
        let surface = RecordingSurface::new(800, 600);
        let draws = surface.log();
        let options = EngineOptions::from_json(params, manifest).unwrap();
        engine.initialize(Box::new(surface), options).unwrap();
        Harness { engine, draws, fetcher, audio }
    }

    fn press(engine: &mut Engine, key: Key) {
        engine.handle_event(HostEvent::Input(InputEvent::KeyDown { key }));
    }

    #[test]
    fn initialize_loads_first_level() {
        let h = harness(TWO_LEVELS, None);
        assert_eq!(h.engine.state(), EngineState::Initialized);
        assert_eq!(h.engine.level_name(), "Meadow");
        assert_eq!(h.engine.required(), 1);
        assert_eq!(h.engine.scene().len(), 3);
        assert_eq!(h.engine.scene().entities_by_tag(&Tag::Player).len(), 1);
        assert_eq!(h.engine.active_scene(), LEVEL_SCENE);
    }

    #[test]
    fn initialize_twice_fails() {
        let mut h = harness("{}", None);
        let again = h.engine.initialize(Box::new(RecordingSurface::new(800, 600)), EngineOptions::default());
        assert!(matches!(again, Err(EngineError::AlreadyInitialized)));
    }

    #[test]
    fn zero_sized_world_is_fatal() {
        let mut engine = Engine::new(Box::new(RecordingFetcher::new()), Box::new(NullAudio::new()));
        let options = EngineOptions::from_json(r#"{ "world": { "width": 0 } }"#, None).unwrap();
        let result = engine.initialize(Box::new(RecordingSurface::new(1, 1)), options);
        assert!(matches!(result, Err(EngineError::SurfaceUnavailable(_))));
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn lifecycle_needs_initialize() {
        let mut engine = Engine::new(Box::new(RecordingFetcher::new()), Box::new(NullAudio::new()));
        assert!(matches!(engine.start(), Err(EngineError::NotInitialized)));
        assert!(matches!(engine.resize(10, 10), Err(EngineError::NotInitialized)));
        assert!(matches!(engine.load_level(0), Err(EngineError::NotInitialized)));
        engine.step(DT);
        engine.stop();
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn start_and_stop_fire_hooks_once() {
        let mut h = harness("{}", None);
        let starts = Rc::new(Cell::new(0));
        let stops = Rc::new(Cell::new(0));
        let (s, t) = (starts.clone(), stops.clone());
        h.engine.set_hooks(EngineHooks {
            on_start: Some(Box::new(move || s.set(s.get() + 1))),
            on_stop: Some(Box::new(move || t.set(t.get() + 1))),
            ..EngineHooks::default()
        });

        h.engine.start().unwrap();
        h.engine.start().unwrap();
        assert!(h.engine.is_running());
        assert!(h.engine.input().is_listening());
        h.engine.stop();
        h.engine.stop();
        assert_eq!(h.engine.state(), EngineState::Stopped);
        assert!(!h.engine.input().is_listening());
        assert_eq!((starts.get(), stops.get()), (1, 1));
    }

    #[test]
    fn frames_run_only_while_running() {
        let mut h = harness("{}", None);
        let deltas = Rc::new(RefCell::new(Vec::new()));
        let seen = deltas.clone();
        h.engine.hooks_mut().on_update = Some(Box::new(move |dt| seen.borrow_mut().push(dt)));

        h.engine.frame(0.0);
        assert!(deltas.borrow().is_empty());

        h.engine.start().unwrap();
        h.engine.frame(1000.0);
        h.engine.frame(1016.0);
        h.engine.frame(9000.0);
        let deltas = deltas.borrow();
        assert_eq!(deltas.len(), 3);
        assert_eq!(deltas[0], 0.0);
        assert!((deltas[1] - 0.016).abs() < 1e-5);
        assert_eq!(deltas[2], 0.1);
    }

    #[test]
    fn render_order_is_scene_hud_then_hook() {
        let mut h = harness("{}", None);
        let hooked = Rc::new(Cell::new(false));
        let flag = hooked.clone();
        h.engine.hooks_mut().on_render = Some(Box::new(move |r: &mut Renderer| {
            flag.set(true);
            r.fill_rect(Rect::new(1.0, 1.0, 1.0, 1.0), Color::BLACK);
        }));
        h.draws.clear();
        h.engine.step(DT);

        let commands = h.draws.commands();
        assert!(matches!(commands.first(), Some(crate::renderer::DrawCommand::Clear(_))));
        assert_eq!(h.draws.texts()[..2], ["Level 1".to_string(), "Score: 0".to_string()]);
        assert_eq!(h.draws.filled().last(), Some(&(Rect::new(1.0, 1.0, 1.0, 1.0), Color::BLACK)));
        assert!(hooked.get());
    }

    #[test]
    fn collecting_the_target_advances_after_delay() {
        let mut h = harness(TWO_LEVELS, None);
        h.engine.step(DT);
        assert_eq!(h.engine.score(), 10);
        assert_eq!(h.engine.collected(), 1);
        assert!(matches!(h.engine.transition(), Transition::LevelComplete { next: 1, .. }));
        assert!(h.draws.texts().contains(&"Level Complete!".to_string()));

        let player = h.engine.player().unwrap();
        let frozen = h.engine.scene().get(player).unwrap().pos;
        h.engine.step(1.0);
        assert_eq!(h.engine.level_index(), 0);
        assert_eq!(h.engine.scene().get(player).unwrap().pos, frozen);

        h.engine.step(1.0);
        assert_eq!(h.engine.transition(), Transition::None);
        assert_eq!(h.engine.level_index(), 1);
        assert_eq!(h.engine.level_name(), "Caves");
        assert_eq!(h.engine.score(), 10);
        assert_eq!(h.engine.collected(), 0);
        assert_eq!(h.engine.required(), 0);
        assert_eq!(h.engine.renderer().unwrap().background(), Color::rgb(32, 32, 32));
    }

    #[test]
    fn go_to_next_level_is_ignored_mid_transition() {
        let mut h = harness(TWO_LEVELS, None);
        h.engine.go_to_next_level();
        let first = h.engine.transition();
        h.engine.go_to_next_level();
        assert_eq!(h.engine.transition(), first);
    }

    #[test]
    fn reaching_right_edge_advances() {
        let mut h = harness(TWO_LEVELS, None);
        let player = h.engine.player().unwrap();
        h.engine.scene_mut().get_mut(player).unwrap().pos = Vec2::new(790.0, 400.0);
        h.engine.step(DT);
        assert!(matches!(h.engine.transition(), Transition::LevelComplete { next: 1, .. }));
        assert_eq!(h.engine.score(), 0);
    }

    #[test]
    fn game_complete_waits_for_input_then_restarts() {
        let params = r#"{
            "world": { "levels": [ { "requiredCollectibles": 1 } ] },
            "collectibles": [ { "x": 55, "y": 305, "value": 25 } ]
        }"#;
        let mut h = harness(params, None);
        h.engine.start().unwrap();
        h.engine.step(DT);
        assert_eq!(h.engine.transition(), Transition::GameComplete);
        assert!(h.draws.texts().contains(&"Final Score: 25".to_string()));

        h.engine.step(5.0);
        assert_eq!(h.engine.transition(), Transition::GameComplete);

        press(&mut h.engine, Key::Enter);
        h.engine.step(DT);
        assert_eq!(h.engine.transition(), Transition::None);
        assert_eq!(h.engine.score(), 0);
        assert_eq!(h.engine.level_index(), 0);
        assert_eq!(h.engine.collected(), 0);
        assert_eq!(h.audio.log().contexts, 1);
    }

    #[test]
    fn invalid_level_keeps_current_one() {
        let mut h = harness(TWO_LEVELS, None);
        let before: Vec<_> = h.engine.scene().iter().map(|e| (e.id, e.pos)).collect();
        let result = h.engine.load_level(5);
        assert!(matches!(result, Err(EngineError::InvalidLevel { index: 5, count: 2 })));
        let after: Vec<_> = h.engine.scene().iter().map(|e| (e.id, e.pos)).collect();
        assert_eq!(before, after);
        assert_eq!(h.engine.level_name(), "Meadow");
    }

    #[test]
    fn zero_delta_moves_nothing() {
        let params = r#"{ "world": { "levels": [ { "platforms": [
            { "x": 100, "y": 400, "movingPlatform": true }
        ] } ] } }"#;
        let mut h = harness(params, None);
        let before: Vec<_> = h.engine.scene().iter().map(|e| e.pos).collect();
        h.engine.step(0.0);
        h.engine.step(0.0);
        let after: Vec<_> = h.engine.scene().iter().map(|e| e.pos).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn scenes_switch_and_level_load_returns_to_level() {
        let mut h = harness(TWO_LEVELS, None);
        assert!(matches!(h.engine.switch_scene("menu"), Err(EngineError::UnknownScene(_))));

        h.engine.add_scene("menu", Scene::default());
        h.engine.switch_scene("menu").unwrap();
        assert_eq!(h.engine.active_scene(), "menu");
        assert!(h.engine.scene().is_empty());
        h.engine.step(DT);
        assert_eq!(h.engine.score(), 0);

        h.engine.load_level(1).unwrap();
        assert_eq!(h.engine.active_scene(), LEVEL_SCENE);
        assert_eq!(h.engine.level_name(), "Caves");
        h.engine.switch_scene("menu").unwrap();
    }

    #[test]
    fn sheets_become_sprites_when_loaded() {
        let manifest = r#"{
            "sprites": { "player": "hero.png" },
            "sheets": { "player": { "frameWidth": 32, "frameHeight": 32 } }
        }"#;
        let mut h = harness("{}", Some(manifest));
        let request = h
            .fetcher
            .requests()
            .into_iter()
            .find(|r| r.ticket.id == "player")
            .unwrap();
        h.engine.handle_event(HostEvent::AssetLoaded {
            ticket: request.ticket,
            result: Ok(AssetPayload::Image { handle: ImageHandle(7), width: 64, height: 32 }),
        });
        assert!(h.engine.assets().sprite("player").is_some());

        h.draws.clear();
        h.engine.step(DT);
        assert!(h.draws.images().iter().any(|(image, src, _, _)| *image == ImageHandle(7) && src.is_some()));
    }

    #[test]
    fn music_waits_for_gesture_and_decode() {
        let manifest = r#"{ "audio": { "music": { "theme": "theme.mp3" }, "effects": { "jump": "jump.wav" } } }"#;
        let mut h = harness("{}", Some(manifest));
        assert!(h.audio.log().decodes.is_empty());

        h.engine.start().unwrap();
        press(&mut h.engine, Key::Space);
        let log = h.audio.log();
        assert_eq!(log.contexts, 1);
        assert_eq!(log.decodes.len(), 2);

        let (ticket, _) = log.decodes.iter().find(|(t, _)| t.id == "music_theme").unwrap().clone();
        h.engine.handle_event(HostEvent::SoundDecoded { ticket, result: Ok(crate::api::types::BufferHandle(1)) });
        let started = h.audio.log().started;
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].2, 0.5);
        assert!(started[0].3);
    }

    #[test]
    fn dispose_is_final_and_drops_late_loads() {
        let mut h = harness("{}", Some(r#"{ "sprites": { "player": "hero.png" } }"#));
        h.engine.start().unwrap();
        h.engine.dispose();
        h.engine.dispose();
        assert_eq!(h.engine.state(), EngineState::Disposed);
        assert!(h.engine.scene().is_empty());
        assert!(matches!(h.engine.start(), Err(EngineError::NotInitialized)));

        h.engine.handle_event(HostEvent::AssetLoaded {
            ticket: LoadTicket { id: "player".into(), generation: 0 },
            result: Ok(AssetPayload::Image { handle: ImageHandle(1), width: 32, height: 32 }),
        });
        assert!(!h.engine.assets().is_loaded("player"));
    }

    #[test]
    fn touch_controls_fit_the_surface() {
        let mut h = harness("{}", None);
        h.engine.add_touch_controls().unwrap();
        let buttons = h.engine.input().virtual_buttons();
        assert_eq!(buttons.len(), 3);
        assert!(buttons.iter().all(|b| b.rect.right() <= 800.0 && b.rect.bottom() <= 600.0));
    }
}
