//! Declarative game parameters and level instantiation.
//!
//! Every numeric field has a fallback; absent blocks yield empty sets.

use std::collections::BTreeMap;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use crate::api::error::{EngineError, EngineResult};
use crate::api::types::{Color, EntityId};
use crate::assets::manifest::AssetManifest;
use crate::components::behavior::{Chase, Hop, Patrol, SpriteView};
use crate::components::entity::{
    Axis, CollectibleData, EnemyAi, EnemyData, Entity, EntityData, PhysicsBody, PlatformData,
    PlatformKind, PlatformMotion, PlayerData, Tag,
};
use crate::core::physics::Physics;
use crate::core::scene::Scene;

fn default_world_width() -> f32 { 800.0 }
fn default_world_height() -> f32 { 600.0 }
fn default_gravity() -> f32 { 0.5 }
fn default_friction() -> f32 { 0.8 }
fn default_start_x() -> f32 { 50.0 }
fn default_start_y() -> f32 { 300.0 }
fn default_player_speed() -> f32 { 5.0 }
fn default_jump_force() -> f32 { 12.0 }
fn default_actor_size() -> f32 { 32.0 }
fn default_enemy_speed() -> f32 { 2.0 }
fn default_direction() -> f32 { 1.0 }
fn default_range() -> f32 { 100.0 }
fn default_enemy_behavior() -> String { "patrol".to_string() }
fn default_value() -> u32 { 10 }
fn default_collectible_size() -> f32 { 24.0 }
fn default_platform_width() -> f32 { 100.0 }
fn default_platform_height() -> f32 { 20.0 }
fn default_platform_type() -> String { "normal".to_string() }
fn default_move_speed() -> f32 { 1.0 }
fn default_move_distance() -> f32 { 100.0 }
fn default_move_direction() -> String { "horizontal".to_string() }

const PLAYER_COLOR: Color = Color::PINK;
const ENEMY_COLOR: Color = Color::RED;
const COLLECTIBLE_COLOR: Color = Color::YELLOW;
const PLATFORM_COLOR: Color = Color::rgb(139, 69, 19);
const GROUND_HEIGHT: f32 = 40.0;

/// Top-level game parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameParams {
    #[serde(default)]
    pub world: WorldParams,
    #[serde(default)]
    pub player: PlayerParams,
    #[serde(default)]
    pub enemies: Vec<EnemyParams>,
    #[serde(default)]
    pub collectibles: Vec<CollectibleParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldParams {
    #[serde(default = "default_world_width")]
    pub width: f32,
    #[serde(default = "default_world_height")]
    pub height: f32,
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_friction")]
    pub friction: f32,
    #[serde(default)]
    pub levels: Vec<LevelParams>,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            width: default_world_width(),
            height: default_world_height(),
            gravity: default_gravity(),
            friction: default_friction(),
            levels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelParams {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub platforms: Vec<PlatformParams>,
    /// CSS color, or an image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default)]
    pub required_collectibles: u32,
    /// Replaces the top-level enemy list for this level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enemies: Option<Vec<EnemyParams>>,
    /// Replaces the top-level collectible list for this level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collectibles: Option<Vec<CollectibleParams>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformParams {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_platform_width")]
    pub width: f32,
    #[serde(default = "default_platform_height")]
    pub height: f32,
    #[serde(rename = "type", default = "default_platform_type")]
    pub kind: String,
    #[serde(default)]
    pub moving_platform: bool,
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "default_move_distance")]
    pub move_distance: f32,
    #[serde(default = "default_move_direction")]
    pub move_direction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl PlatformParams {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            kind: default_platform_type(),
            moving_platform: false,
            move_speed: default_move_speed(),
            move_distance: default_move_distance(),
            move_direction: default_move_direction(),
            color: None,
        }
    }

    pub fn platform_kind(&self) -> PlatformKind {
        match self.kind.to_ascii_lowercase().as_str() {
            "normal" => PlatformKind::Normal,
            "temporary" | "disappearing" => PlatformKind::Temporary,
            other => {
                log::debug!("level: unknown platform type '{}', using normal", other);
                PlatformKind::Normal
            }
        }
    }

    pub fn axis(&self) -> Axis {
        match self.move_direction.to_ascii_lowercase().as_str() {
            "vertical" => Axis::Vertical,
            "horizontal" => Axis::Horizontal,
            other => {
                log::debug!("level: unknown move direction '{}', using horizontal", other);
                Axis::Horizontal
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerParams {
    #[serde(default = "default_start_x")]
    pub start_x: f32,
    #[serde(default = "default_start_y")]
    pub start_y: f32,
    #[serde(default = "default_player_speed")]
    pub speed: f32,
    #[serde(default = "default_jump_force")]
    pub jump_force: f32,
    #[serde(default = "default_actor_size")]
    pub size: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Default for PlayerParams {
    fn default() -> Self {
        Self {
            start_x: default_start_x(),
            start_y: default_start_y(),
            speed: default_player_speed(),
            jump_force: default_jump_force(),
            size: default_actor_size(),
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyParams {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_enemy_speed")]
    pub speed: f32,
    #[serde(default = "default_direction")]
    pub direction: f32,
    #[serde(default = "default_range")]
    pub range: f32,
    #[serde(default = "default_enemy_behavior")]
    pub behavior: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default = "default_actor_size")]
    pub size: f32,
}

impl EnemyParams {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            speed: default_enemy_speed(),
            direction: default_direction(),
            range: default_range(),
            behavior: default_enemy_behavior(),
            color: None,
            size: default_actor_size(),
        }
    }

    pub fn ai(&self) -> EnemyAi {
        EnemyAi::parse(&self.behavior).unwrap_or_else(|| {
            log::debug!("level: unknown enemy behavior '{}', using patrol", self.behavior);
            EnemyAi::Patrol
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectibleParams {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_value")]
    pub value: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(default = "default_collectible_size")]
    pub size: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CollectibleParams {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            value: default_value(),
            sound: None,
            size: default_collectible_size(),
            color: None,
        }
    }
}

impl GameParams {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn world_size(&self) -> Vec2 {
        Vec2::new(self.world.width, self.world.height)
    }

    pub fn physics(&self) -> Physics {
        Physics::new(self.world.gravity, self.world.friction)
    }

    /// A missing level list counts as one default ground level.
    pub fn level_count(&self) -> usize {
        self.world.levels.len().max(1)
    }

    pub fn level(&self, index: usize) -> Option<LevelParams> {
        if self.world.levels.is_empty() {
            return (index == 0).then(|| self.ground_level());
        }
        self.world.levels.get(index).cloned()
    }

    fn ground_level(&self) -> LevelParams {
        LevelParams {
            name: "Level 1".to_string(),
            platforms: vec![PlatformParams::new(
                0.0,
                self.world.height - GROUND_HEIGHT,
                self.world.width,
                GROUND_HEIGHT,
            )],
            ..LevelParams::default()
        }
    }
}

/// Serialized game: parameters, asset manifest and free-form metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameDocument {
    #[serde(default)]
    pub params: GameParams,
    #[serde(default)]
    pub assets: AssetManifest,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl GameDocument {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// How a level's background is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelBackground {
    Color(Color),
    Image(String),
}

/// What `spawn_level` reports back about the level it built.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelInfo {
    pub name: String,
    pub required: u32,
    pub background: Option<LevelBackground>,
    pub player: Option<EntityId>,
}

/// Replace the scene's contents with level `index`.
/// On error the scene is left untouched.
pub fn spawn_level(
    scene: &mut Scene,
    params: &GameParams,
    index: usize,
    manifest: &AssetManifest,
) -> EngineResult<LevelInfo> {
    let level = params.level(index).ok_or(EngineError::InvalidLevel {
        index,
        count: params.level_count(),
    })?;

    let mut next = 1u32;
    let mut id = || {
        let id = EntityId(next);
        next += 1;
        id
    };

    let mut entities = Vec::new();
    for p in &level.platforms {
        entities.push(platform(id(), p, manifest)?);
    }
    let hero = player(id(), &params.player, manifest)?;
    let player_id = hero.id;
    entities.push(hero);
    let enemies = level.enemies.as_ref().unwrap_or(&params.enemies);
    for (i, p) in enemies.iter().enumerate() {
        entities.push(enemy(id(), i, p, manifest)?);
    }
    let collectibles = level.collectibles.as_ref().unwrap_or(&params.collectibles);
    for (i, p) in collectibles.iter().enumerate() {
        entities.push(collectible(id(), i, p, manifest)?);
    }

    scene.clear();
    scene.set_physics(params.physics());
    for entity in entities {
        scene.add_entity(entity);
    }

    let background = level.background.as_deref().map(|bg| match Color::parse(bg) {
        Some(color) => LevelBackground::Color(color),
        None => LevelBackground::Image(bg.to_string()),
    });
    let name = if level.name.is_empty() { format!("Level {}", index + 1) } else { level.name };
    log::info!("level: loaded '{}' with {} entities", name, scene.len());
    Ok(LevelInfo {
        name,
        required: level.required_collectibles,
        background,
        player: Some(player_id),
    })
}

fn platform(id: EntityId, p: &PlatformParams, manifest: &AssetManifest) -> EngineResult<Entity> {
    let origin = Vec2::new(p.x, p.y);
    let motion = p.moving_platform.then(|| PlatformMotion {
        origin,
        speed: p.move_speed,
        distance: p.move_distance,
        axis: p.axis(),
        phase: 0.0,
    });
    let mut entity = Entity::new(id, origin, Vec2::new(p.width, p.height))?
        .with_tag(Tag::Platform)
        .with_color(Color::parse_or(p.color.as_deref(), PLATFORM_COLOR))
        .with_data(EntityData::Platform(PlatformData {
            kind: p.platform_kind(),
            motion,
            disappear_timer: None,
        }));
    if let Some(sprite) = manifest.platform_sprite() {
        entity.add_behavior("sprite", SpriteView::new(sprite));
    }
    Ok(entity)
}

fn player(id: EntityId, p: &PlayerParams, manifest: &AssetManifest) -> EngineResult<Entity> {
    let spawn = Vec2::new(p.start_x, p.start_y);
    let mut entity = Entity::new(id, spawn, Vec2::splat(p.size))?
        .with_tag(Tag::Player)
        .with_color(Color::parse_or(p.color.as_deref(), PLAYER_COLOR))
        .with_body(PhysicsBody { collide_dynamic: false, ..PhysicsBody::default() })
        .with_data(EntityData::Player(PlayerData {
            max_speed: p.speed,
            jump_force: p.jump_force,
            spawn,
        }));
    if let Some(sprite) = manifest.player_sprite() {
        entity.add_behavior("sprite", SpriteView::new(sprite));
    }
    Ok(entity)
}

fn enemy(id: EntityId, index: usize, p: &EnemyParams, manifest: &AssetManifest) -> EngineResult<Entity> {
    let origin = Vec2::new(p.x, p.y);
    let ai = p.ai();
    let mut entity = Entity::new(id, origin, Vec2::splat(p.size))?
        .with_tag(Tag::Enemy)
        .with_color(Color::parse_or(p.color.as_deref(), ENEMY_COLOR))
        .with_body(PhysicsBody { collide_dynamic: false, ..PhysicsBody::default() })
        .with_data(EntityData::Enemy(EnemyData {
            speed: p.speed,
            direction: if p.direction < 0.0 { -1.0 } else { 1.0 },
            range: p.range,
            origin,
            ai,
        }));
    match ai {
        EnemyAi::Patrol => entity.add_behavior("ai", Patrol),
        EnemyAi::Chase => entity.add_behavior("ai", Chase),
        EnemyAi::Hop => entity.add_behavior("ai", Hop::default()),
        EnemyAi::Static => {}
    }
    if let Some(sprite) = manifest.enemy_sprite(index) {
        entity.add_behavior("sprite", SpriteView::new(sprite));
    }
    Ok(entity)
}

fn collectible(
    id: EntityId,
    index: usize,
    p: &CollectibleParams,
    manifest: &AssetManifest,
) -> EngineResult<Entity> {
    let mut entity = Entity::new(id, Vec2::new(p.x, p.y), Vec2::splat(p.size))?
        .with_tag(Tag::Collectible)
        .with_color(Color::parse_or(p.color.as_deref(), COLLECTIBLE_COLOR))
        .with_body(PhysicsBody {
            gravity: Some(0.0),
            solid: false,
            collide_dynamic: false,
            ..PhysicsBody::default()
        })
        .with_data(EntityData::Collectible(CollectibleData {
            value: p.value,
            sound: p.sound.clone(),
        }));
    if let Some(sprite) = manifest.collectible_sprite(index) {
        entity.add_behavior("sprite", SpriteView::new(sprite));
    }
    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "world": {
            "width": 1200, "height": 600, "gravity": 0.6,
            "levels": [
                {
                    "name": "Meadow",
                    "requiredCollectibles": 2,
                    "background": "#87ceeb",
                    "platforms": [
                        { "x": 0, "y": 560, "width": 1200, "height": 40 },
                        { "x": 300, "y": 420, "width": 120, "height": 20,
                          "movingPlatform": true, "moveDistance": 80, "moveDirection": "vertical" },
                        { "x": 500, "y": 380, "type": "temporary" }
                    ]
                },
                {
                    "platforms": [{ "x": 0, "y": 560, "width": 1200, "height": 40, "type": "lava" }],
                    "background": "bg/cave.png",
                    "enemies": []
                }
            ]
        },
        "player": { "startX": 40, "startY": 500 },
        "enemies": [
            { "x": 600, "y": 500 },
            { "x": 800, "y": 500, "behavior": "chase", "direction": -1 },
            { "x": 900, "y": 500, "behavior": "teleport" }
        ],
        "collectibles": [
            { "x": 200, "y": 500 },
            { "x": 250, "y": 500, "value": 25, "sound": "coin" }
        ]
    }"##;

    fn sample() -> GameParams {
        GameParams::from_json(SAMPLE).unwrap()
    }

    #[test]
    fn empty_params_use_documented_defaults() {
        let params = GameParams::from_json("{}").unwrap();
        assert_eq!(params.world_size(), Vec2::new(800.0, 600.0));
        assert_eq!(params.physics(), Physics::new(0.5, 0.8));
        assert_eq!(params.player, PlayerParams::default());
        assert_eq!(params.player.start_x, 50.0);
        assert_eq!(params.player.jump_force, 12.0);
        assert!(params.enemies.is_empty());
        assert_eq!(params.level_count(), 1);

        let ground = params.level(0).unwrap();
        assert_eq!(ground.platforms.len(), 1);
        assert_eq!(ground.platforms[0].y, 560.0);
        assert!(params.level(1).is_none());
    }

    #[test]
    fn field_defaults_fill_partial_records() {
        let params = sample();
        assert_eq!(params.world.friction, 0.8);
        let e = &params.enemies[0];
        assert_eq!((e.speed, e.direction, e.range, e.size), (2.0, 1.0, 100.0, 32.0));
        assert_eq!(e.ai(), EnemyAi::Patrol);
        assert_eq!(params.enemies[2].ai(), EnemyAi::Patrol);
        let c = &params.collectibles[0];
        assert_eq!((c.value, c.size), (10, 24.0));

        let temp = &params.world.levels[0].platforms[2];
        assert_eq!((temp.width, temp.height), (100.0, 20.0));
        assert_eq!(temp.platform_kind(), PlatformKind::Temporary);
        assert_eq!(params.world.levels[1].platforms[0].platform_kind(), PlatformKind::Normal);
    }

    #[test]
    fn spawn_builds_tagged_layout() {
        let params = sample();
        let mut scene = Scene::default();
        let info = spawn_level(&mut scene, &params, 0, &AssetManifest::default()).unwrap();

        assert_eq!(info.name, "Meadow");
        assert_eq!(info.required, 2);
        assert_eq!(info.background, Some(LevelBackground::Color(Color::SKY)));
        assert_eq!(scene.entities_by_tag(&Tag::Platform).len(), 3);
        assert_eq!(scene.entities_by_tag(&Tag::Enemy).len(), 3);
        assert_eq!(scene.entities_by_tag(&Tag::Collectible).len(), 2);
        assert_eq!(scene.physics().gravity, 0.6);

        let player = scene.get(info.player.unwrap()).unwrap();
        assert_eq!(player.pos, Vec2::new(40.0, 500.0));
        assert_eq!(player.color, Color::PINK);
        assert!(!player.body.collide_dynamic);

        let chaser = scene.iter().find(|e| e.pos.x == 800.0).unwrap();
        assert!(chaser.has_behavior("ai"));
        assert!(matches!(&chaser.data, EntityData::Enemy(d) if d.direction == -1.0 && d.ai == EnemyAi::Chase));

        let mover = scene.iter().find(|e| e.pos == Vec2::new(300.0, 420.0)).unwrap();
        let motion = mover.platform().unwrap().motion.clone().unwrap();
        assert_eq!(motion.axis, Axis::Vertical);
        assert_eq!(motion.distance, 80.0);
    }

    #[test]
    fn level_overrides_and_defaults() {
        let params = sample();
        let mut scene = Scene::default();
        let info = spawn_level(&mut scene, &params, 1, &AssetManifest::default()).unwrap();
        assert_eq!(info.name, "Level 2");
        assert_eq!(info.required, 0);
        assert_eq!(info.background, Some(LevelBackground::Image("bg/cave.png".into())));
        assert!(scene.entities_by_tag(&Tag::Enemy).is_empty());
        assert_eq!(scene.entities_by_tag(&Tag::Collectible).len(), 2);
    }

    #[test]
    fn invalid_index_leaves_scene_alone() {
        let params = sample();
        let mut scene = Scene::default();
        spawn_level(&mut scene, &params, 0, &AssetManifest::default()).unwrap();
        let before = scene.len();
        let err = spawn_level(&mut scene, &params, 7, &AssetManifest::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidLevel { index: 7, count: 2 }));
        assert_eq!(scene.len(), before);
    }

    #[test]
    fn bad_geometry_leaves_scene_alone() {
        let mut params = sample();
        params.world.levels[1].platforms[0].width = -5.0;
        let mut scene = Scene::default();
        spawn_level(&mut scene, &params, 0, &AssetManifest::default()).unwrap();
        let before = scene.len();
        assert!(spawn_level(&mut scene, &params, 1, &AssetManifest::default()).is_err());
        assert_eq!(scene.len(), before);
    }

    #[test]
    fn manifest_sprites_attach_views() {
        let manifest = AssetManifest::from_json(
            r#"{ "sprites": { "player": "hero.png", "enemies": ["slime.png"] } }"#,
        )
        .unwrap();
        let mut scene = Scene::default();
        let info = spawn_level(&mut scene, &sample(), 0, &manifest).unwrap();
        assert!(scene.get(info.player.unwrap()).unwrap().has_behavior("sprite"));
        assert!(scene.entities_by_tag(&Tag::Enemy).iter().all(|e| e.has_behavior("sprite")));
        assert!(scene.entities_by_tag(&Tag::Collectible).iter().all(|e| !e.has_behavior("sprite")));
    }

    #[test]
    fn document_round_trip_reproduces_layout() {
        let mut doc = GameDocument {
            params: sample(),
            assets: AssetManifest::default(),
            metadata: BTreeMap::new(),
        };
        doc.metadata.insert("title".into(), serde_json::json!("Hopper"));
        let json = doc.to_json().unwrap();
        let back = GameDocument::from_json(&json).unwrap();
        assert_eq!(back, doc);

        let layout = |params: &GameParams| {
            let mut scene = Scene::default();
            spawn_level(&mut scene, params, 0, &AssetManifest::default()).unwrap();
            scene
                .iter()
                .map(|e| (e.id, e.pos, e.size, e.tags().to_vec()))
                .collect::<Vec<_>>()
        };
        assert_eq!(layout(&doc.params), layout(&back.params));
    }
}
