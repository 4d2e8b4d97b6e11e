//! Player-centric gameplay rules, run after each scene pass.

use glam::Vec2;
use crate::api::types::{EntityId, Rect};
use crate::components::entity::Tag;
use crate::core::scene::Scene;
use crate::engine::platforms;
use crate::engine::EngineConfig;
use crate::input::manager::InputManager;

/// Score and per-level collection state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Progress {
    /// Persists across levels.
    pub score: u32,
    pub collected: u32,
    pub required: u32,
    completion_fired: bool,
}

impl Progress {
    /// New level: collection counters reset, score kept.
    pub fn start_level(&mut self, required: u32) {
        self.collected = 0;
        self.required = required;
        self.completion_fired = false;
    }

    /// New run from scratch.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True exactly once per level, when enough collectibles are in.
    pub fn check_completion(&mut self) -> bool {
        if self.completion_fired || self.required == 0 || self.collected < self.required {
            return false;
        }
        self.completion_fired = true;
        true
    }

    pub fn is_complete(&self) -> bool {
        self.completion_fired
    }
}

/// Something the rules did that the engine reacts to (sound, transitions).
#[derive(Debug, Clone, PartialEq)]
pub enum RuleEvent {
    Jumped,
    Collected { id: EntityId, value: u32, sound: Option<String> },
    EnemyDefeated(EntityId),
    PlayerHit,
    FellOut,
    ReachedExit,
    LevelComplete,
}

/// One rule pass for `player`.
pub fn run(
    scene: &mut Scene,
    player: EntityId,
    input: &InputManager,
    progress: &mut Progress,
    config: &EngineConfig,
    world: Vec2,
) -> Vec<RuleEvent> {
    let mut events = Vec::new();
    if !scene.get(player).is_some_and(|p| p.active) {
        return events;
    }
    apply_input(scene, player, input, config, &mut events);
    collect(scene, player, progress, &mut events);
    combat(scene, player, progress, config, &mut events);
    bounds(scene, player, world, &mut events);
    events
}

/// Horizontal movement, facing and grounded jumps.
pub fn apply_input(
    scene: &mut Scene,
    player: EntityId,
    input: &InputManager,
    config: &EngineConfig,
    events: &mut Vec<RuleEvent>,
) {
    let Some(p) = scene.get_mut(player) else {
        return;
    };
    let Some((max_speed, jump_force)) = p.player().map(|d| (d.max_speed, d.jump_force)) else {
        return;
    };
    let axis = input.horizontal();
    p.body.velocity.x = if axis < 0.0 {
        -max_speed
    } else if axis > 0.0 {
        max_speed
    } else {
        0.0
    };
    if axis != 0.0 {
        p.flip_x = axis < 0.0;
    }
    p.dispatch_input(input);

    if input.jump() && p.body.on_ground {
        p.body.velocity.y = -jump_force;
        p.body.on_ground = false;
        platforms::trigger_temporary(scene, player, config.temporary_platform_delay);
        events.push(RuleEvent::Jumped);
    }
}

fn overlapping(scene: &Scene, rect: Rect, tag: &Tag) -> Vec<(EntityId, Rect)> {
    scene
        .iter()
        .filter(|e| e.active && e.has_tag(tag) && e.rect().intersects(&rect))
        .map(|e| (e.id, e.rect()))
        .collect()
}

/// Pick up every overlapped collectible.
pub fn collect(scene: &mut Scene, player: EntityId, progress: &mut Progress, events: &mut Vec<RuleEvent>) {
    let Some(rect) = scene.get(player).map(|p| p.rect()) else {
        return;
    };
    for (id, _) in overlapping(scene, rect, &Tag::Collectible) {
        let Some(item) = scene.get_mut(id) else {
            continue;
        };
        item.active = false;
        item.visible = false;
        let (value, sound) = item
            .collectible()
            .map(|c| (c.value, c.sound.clone()))
            .unwrap_or((0, None));
        progress.score += value;
        progress.collected += 1;
        events.push(RuleEvent::Collected { id, value, sound });
    }
    if progress.check_completion() {
        events.push(RuleEvent::LevelComplete);
    }
}

/// Stomp or be hit. A falling player whose feet are above an enemy's
/// midline defeats it; any other contact sends the player back to spawn.
pub fn combat(
    scene: &mut Scene,
    player: EntityId,
    progress: &mut Progress,
    config: &EngineConfig,
    events: &mut Vec<RuleEvent>,
) {
    let Some((rect, falling)) = scene.get(player).map(|p| (p.rect(), p.body.velocity.y > 0.0)) else {
        return;
    };
    for (id, enemy) in overlapping(scene, rect, &Tag::Enemy) {
        if falling && rect.bottom() < enemy.y + enemy.h / 2.0 {
            if let Some(e) = scene.get_mut(id) {
                e.active = false;
                e.visible = false;
            }
            if let Some(p) = scene.get_mut(player) {
                p.body.velocity.y = -config.defeat_bounce;
            }
            progress.score += config.defeat_bonus;
            events.push(RuleEvent::EnemyDefeated(id));
        } else {
            respawn(scene, player);
            events.push(RuleEvent::PlayerHit);
            return;
        }
    }
}

/// Fall-out respawn, right-edge exit and left-edge clamp.
pub fn bounds(scene: &mut Scene, player: EntityId, world: Vec2, events: &mut Vec<RuleEvent>) {
    let Some(p) = scene.get_mut(player) else {
        return;
    };
    if p.pos.y > world.y {
        respawn(scene, player);
        events.push(RuleEvent::FellOut);
        return;
    }
    if p.pos.x < 0.0 {
        p.pos.x = 0.0;
        p.body.velocity.x = p.body.velocity.x.max(0.0);
    }
    if p.pos.x + p.size.x >= world.x {
        events.push(RuleEvent::ReachedExit);
    }
}

/// Put the player back at its spawn point at rest.
pub fn respawn(scene: &mut Scene, player: EntityId) {
    let Some(p) = scene.get_mut(player) else {
        return;
    };
    if let Some(spawn) = p.player().map(|d| d.spawn) {
        p.pos = spawn;
    }
    p.body.velocity = Vec2::ZERO;
    p.body.on_ground = false;
    p.contacts.clear();
}
