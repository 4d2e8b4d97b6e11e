use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::assets::asset::AssetKind;
use crate::assets::sprite::SpriteLayout;

/// Asset manifest handed over by the asset-generation service.
/// Every sub-key is optional; a missing block simply loads nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManifest {
    pub sprites: SpriteUrls,
    pub backgrounds: BackgroundUrls,
    pub audio: AudioUrls,
    /// Optional frame layouts keyed by asset id (e.g. "player").
    pub sheets: BTreeMap<String, SpriteLayout>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteUrls {
    pub player: Option<String>,
    pub enemies: Vec<String>,
    pub collectibles: Vec<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundUrls {
    pub main: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioUrls {
    pub effects: BTreeMap<String, String>,
    pub music: BTreeMap<String, String>,
}

/// One image/data load derived from the manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRequest {
    pub id: String,
    pub url: String,
    pub kind: AssetKind,
}

/// One sound load derived from the manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundRequest {
    pub id: String,
    pub url: String,
    pub music: bool,
}

pub const PLAYER_SPRITE: &str = "player";
pub const PLATFORM_SPRITE: &str = "platform";
pub const MAIN_BACKGROUND: &str = "background_main";

impl AssetManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Image loads, one per URL, with stable ids.
    pub fn requests(&self) -> Vec<AssetRequest> {
        let mut out = Vec::new();
        let mut push = |id: String, url: &str| {
            let kind = if self.sheets.contains_key(&id) {
                AssetKind::Spritesheet
            } else {
                AssetKind::from_url(url)
            };
            out.push(AssetRequest { id, url: url.to_string(), kind });
        };
        if let Some(url) = &self.sprites.player {
            push(PLAYER_SPRITE.to_string(), url);
        }
        for (i, url) in self.sprites.enemies.iter().enumerate() {
            push(enemy_sprite_id(i), url);
        }
        for (i, url) in self.sprites.collectibles.iter().enumerate() {
            push(collectible_sprite_id(i), url);
        }
        if let Some(url) = &self.sprites.platform {
            push(PLATFORM_SPRITE.to_string(), url);
        }
        if let Some(url) = &self.backgrounds.main {
            push(MAIN_BACKGROUND.to_string(), url);
        }
        out
    }

    /// Sound loads. Effects keep their manifest key; music is prefixed `music_`.
    pub fn sound_requests(&self) -> Vec<SoundRequest> {
        let effects = self.audio.effects.iter().map(|(id, url)| SoundRequest {
            id: id.clone(),
            url: url.clone(),
            music: false,
        });
        let music = self.audio.music.iter().map(|(id, url)| SoundRequest {
            id: music_id(id),
            url: url.clone(),
            music: true,
        });
        effects.chain(music).collect()
    }

    pub fn player_sprite(&self) -> Option<&'static str> {
        self.sprites.player.as_ref().map(|_| PLAYER_SPRITE)
    }

    /// Sprite id for the `index`-th enemy, cycling through the enemy images.
    pub fn enemy_sprite(&self, index: usize) -> Option<String> {
        let count = self.sprites.enemies.len();
        (count > 0).then(|| enemy_sprite_id(index % count))
    }

    pub fn collectible_sprite(&self, index: usize) -> Option<String> {
        let count = self.sprites.collectibles.len();
        (count > 0).then(|| collectible_sprite_id(index % count))
    }

    pub fn platform_sprite(&self) -> Option<&'static str> {
        self.sprites.platform.as_ref().map(|_| PLATFORM_SPRITE)
    }

    /// Id of the first music track, if any.
    pub fn main_music(&self) -> Option<String> {
        self.audio.music.keys().next().map(|k| music_id(k))
    }
}

pub fn enemy_sprite_id(index: usize) -> String {
    format!("enemy_{index}")
}

pub fn collectible_sprite_id(index: usize) -> String {
    format!("collectible_{index}")
}

pub fn music_id(key: &str) -> String {
    format!("music_{key}")
}
