//! Moving and temporary platform kinematics.

use glam::Vec2;
use crate::api::types::EntityId;
use crate::components::entity::{PlatformKind, Tag};
use crate::core::physics::CollisionSide;
use crate::core::scene::Scene;

/// Advance every moving platform's phase and reposition it.
/// Riders standing on a platform (a top contact from the last step) move
/// with it.
pub fn update_moving(scene: &mut Scene, dt: f32) {
    let mut displaced: Vec<(EntityId, Vec2)> = Vec::new();
    for entity in scene.iter_mut().filter(|e| e.active) {
        let pos = entity.pos;
        let Some(motion) = entity.platform_mut().and_then(|p| p.motion.as_mut()) else {
            continue;
        };
        motion.phase += motion.speed * dt;
        let next = motion.position();
        entity.pos = next;
        if next != pos {
            displaced.push((entity.id, next - pos));
        }
    }
    if displaced.is_empty() {
        return;
    }

    for rider in scene.iter_mut().filter(|e| e.active && !e.is_platform() && e.body.on_ground) {
        let carried = rider
            .contacts
            .iter()
            .filter(|c| c.side == CollisionSide::Top)
            .find_map(|c| displaced.iter().find(|(id, _)| *id == c.other).map(|(_, d)| *d));
        if let Some(delta) = carried {
            rider.pos += delta;
        }
    }
}

/// Start the countdown on every temporary platform `player` is standing on.
pub fn trigger_temporary(scene: &mut Scene, player: EntityId, delay: f32) {
    let standing_on: Vec<EntityId> = match scene.get(player) {
        Some(p) => p
            .contacts
            .iter()
            .filter(|c| c.side == CollisionSide::Top)
            .map(|c| c.other)
            .collect(),
        None => return,
    };
    for id in standing_on {
        let Some(platform) = scene.get_mut(id).and_then(|e| e.platform_mut()) else {
            continue;
        };
        if platform.kind == PlatformKind::Temporary && platform.disappear_timer.is_none() {
            platform.disappear_timer = Some(delay);
        }
    }
}

/// Count down triggered temporary platforms; expired ones are deactivated
/// and hidden.
pub fn decay_temporary(scene: &mut Scene, dt: f32) {
    for entity in scene.iter_mut().filter(|e| e.active && e.has_tag(&Tag::Platform)) {
        let Some(platform) = entity.platform_mut() else {
            continue;
        };
        let Some(timer) = platform.disappear_timer.as_mut() else {
            continue;
        };
        *timer -= dt;
        if *timer <= 0.0 {
            platform.disappear_timer = None;
            entity.active = false;
            entity.visible = false;
            log::debug!("platforms: temporary platform {:?} expired", entity.id);
        }
    }
}
