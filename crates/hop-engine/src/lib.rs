pub mod api;
pub mod core;
pub mod components;
pub mod renderer;
pub mod input;
pub mod assets;
pub mod audio;
pub mod engine;

// Re-export key types at crate root for convenience
pub use api::error::{EngineError, EngineResult};
pub use api::types::{
    BufferHandle, Color, EntityId, HostEvent, ImageHandle, LoadTicket, Rect, VoiceId,
};
pub use assets::asset::{Asset, AssetKind, AssetPayload};
pub use assets::fetcher::{AssetFetcher, FetchRequest, RecordingFetcher};
pub use assets::manager::{AssetManager, DrawPath, LoadStatus};
pub use assets::manifest::AssetManifest;
pub use assets::sprite::{Sprite, SpriteLayout};
pub use audio::backend::{AudioBackend, AudioLog, NullAudio};
pub use audio::manager::{SoundManager, SoundOptions};
pub use components::behavior::{Behavior, Chase, Hop, Patrol, RenderContext, SceneCommands, SpriteView};
pub use components::entity::{Entity, EntityData, PhysicsBody, Tag};
pub use core::physics::{CollisionResult, CollisionSide, Physics};
pub use core::scene::Scene;
pub use core::time::FrameClock;
pub use engine::level::{GameDocument, GameParams, LevelParams};
pub use engine::rules::{Progress, RuleEvent};
pub use engine::{Engine, EngineConfig, EngineHooks, EngineOptions, EngineState, Transition};
pub use input::manager::{InputManager, VirtualAction, VirtualButton};
pub use input::queue::{InputEvent, InputQueue, Key};
pub use renderer::surface::{Surface, TextAlign, TextStyle};
pub use renderer::{DrawCommand, DrawLog, RecordingSurface, Renderer};
