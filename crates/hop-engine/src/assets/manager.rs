//! Asset cache: async image/JSON/binary loads, sprite frame tables and the
//! sprite draw fallback chain.

use std::collections::HashMap;
use crate::api::error::{EngineError, EngineResult};
use crate::api::types::{Color, LoadTicket, Rect};
use crate::assets::asset::{Asset, AssetKind, AssetPayload};
use crate::assets::fetcher::AssetFetcher;
use crate::assets::sprite::{Sprite, SpriteLayout};
use crate::renderer::Renderer;

/// Outcome of a `load_asset` call.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    /// Already loaded; nothing was fetched.
    Loaded,
    /// A load is in flight for this ticket (possibly started by an earlier call).
    Pending(LoadTicket),
}

/// Which step of the fallback chain `draw_sprite` ended up using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPath {
    Sprite,
    Image,
    Placeholder,
}

/// Placeholder color keyed by substring of the asset id.
pub fn placeholder_color(id: &str) -> Color {
    let id = id.to_ascii_lowercase();
    if id.contains("player") {
        Color::PINK
    } else if id.contains("enemy") {
        Color::RED
    } else if id.contains("collectible") {
        Color::YELLOW
    } else if id.contains("platform") {
        Color::GRAY
    } else {
        Color::FALLBACK
    }
}

pub struct AssetManager {
    assets: HashMap<String, Asset>,
    sprites: HashMap<String, Sprite>,
    fetcher: Box<dyn AssetFetcher>,
    generation: u64,
}

impl AssetManager {
    pub fn new(fetcher: Box<dyn AssetFetcher>) -> Self {
        Self {
            assets: HashMap::new(),
            sprites: HashMap::new(),
            fetcher,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start loading `url` under `id`. Idempotent: a loaded or in-flight id
    /// returns its existing status without fetching again. A failed id is
    /// retried.
    pub fn load_asset(&mut self, id: &str, url: &str, kind: Option<AssetKind>) -> LoadStatus {
        let ticket = LoadTicket { id: id.to_string(), generation: self.generation };
        if let Some(existing) = self.assets.get(id) {
            if existing.loaded {
                return LoadStatus::Loaded;
            }
            if existing.is_in_flight() {
                return LoadStatus::Pending(ticket);
            }
            log::info!("assets: retrying '{}' after earlier failure", id);
        }

        let kind = kind.unwrap_or_else(|| AssetKind::from_url(url));
        self.assets.insert(id.to_string(), Asset::pending(id, url, kind));
        self.fetcher.fetch(ticket.clone(), url, kind);
        LoadStatus::Pending(ticket)
    }

    /// Apply a load completion reported by the host.
    ///
    /// Completions from an earlier generation (issued before `dispose`) or for
    /// ids no longer tracked are dropped. A failure is recorded on the asset
    /// and returned as an error; the asset is never marked loaded.
    pub fn complete_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<AssetPayload, String>,
    ) -> EngineResult<()> {
        if ticket.generation != self.generation {
            log::debug!("assets: dropping late completion for '{}'", ticket.id);
            return Ok(());
        }
        let Some(asset) = self.assets.get_mut(&ticket.id) else {
            log::debug!("assets: completion for untracked '{}'", ticket.id);
            return Ok(());
        };
        if !asset.is_in_flight() {
            return Ok(());
        }

        match result {
            Ok(payload) => {
                asset.payload = Some(payload);
                asset.loaded = true;
                log::debug!("assets: loaded '{}'", asset.id);
                Ok(())
            }
            Err(reason) => {
                log::warn!("assets: '{}' failed to load from {}: {}", asset.id, asset.url, reason);
                asset.error = Some(reason.clone());
                asset.payload = None;
                Err(EngineError::AssetLoad { id: ticket.id.clone(), reason })
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.assets.get(id).is_some_and(|a| a.loaded)
    }

    /// Number of loads still in flight.
    pub fn pending_count(&self) -> usize {
        self.assets.values().filter(|a| a.is_in_flight()).count()
    }

    pub fn sprite(&self, id: &str) -> Option<&Sprite> {
        self.sprites.get(id)
    }

    /// Build a sprite from a loaded image. Returns false if the image is not
    /// loaded (and no explicit frames were given) or no frame can be produced.
    pub fn create_sprite(&mut self, id: &str, image_id: &str, layout: &SpriteLayout) -> bool {
        let (width, height) = match self.assets.get(image_id).and_then(|a| a.image()) {
            Some((_, w, h)) => (w, h),
            None if !layout.frames.is_empty() => (0, 0),
            None => return false,
        };
        let frames = layout.frame_table(width, height);
        if frames.is_empty() {
            log::warn!("assets: sprite '{}' has no frames from '{}'", id, image_id);
            return false;
        }
        self.sprites.insert(
            id.to_string(),
            Sprite::new(image_id, frames, layout.frame_duration, layout.looping),
        );
        true
    }

    /// Advance every sprite's animation clock.
    pub fn update_sprites(&mut self, dt: f32) {
        for sprite in self.sprites.values_mut() {
            sprite.tick(dt);
        }
    }

    /// Draw `id` into `dst`. Never fails: falls back from the sprite's current
    /// frame, to the raw full image, to a solid placeholder.
    pub fn draw_sprite(&self, renderer: &mut Renderer, id: &str, dst: Rect, flip_x: bool) -> DrawPath {
        if let Some(sprite) = self.sprites.get(id) {
            let image = self.assets.get(&sprite.image_id).and_then(|a| a.image());
            if let (Some((handle, _, _)), Some(frame)) = (image, sprite.frame()) {
                match renderer.blit(handle, Some(frame), dst, flip_x) {
                    Ok(()) => return DrawPath::Sprite,
                    Err(e) => log::debug!("assets: sprite '{}' draw failed: {}", id, e),
                }
            }
        }

        let image_id = self.sprites.get(id).map(|s| s.image_id.as_str()).unwrap_or(id);
        if let Some((handle, _, _)) = self.assets.get(image_id).and_then(|a| a.image()) {
            match renderer.blit(handle, None, dst, flip_x) {
                Ok(()) => return DrawPath::Image,
                Err(e) => log::debug!("assets: image '{}' draw failed: {}", image_id, e),
            }
        }

        renderer.fill_rect(dst, placeholder_color(id));
        DrawPath::Placeholder
    }

    /// Forget every asset and sprite. In-flight loads become stale and their
    /// completions are dropped.
    pub fn dispose(&mut self) {
        self.generation += 1;
        self.assets.clear();
        self.sprites.clear();
    }
}
