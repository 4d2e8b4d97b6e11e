//! Attachable entity behaviors and the built-in enemy AI.

use glam::Vec2;
use crate::api::types::EntityId;
use crate::assets::manager::AssetManager;
use crate::components::entity::{Contact, Entity};
use crate::core::physics::CollisionSide;
use crate::input::manager::InputManager;
use crate::renderer::Renderer;

/// What a behavior may draw with.
pub struct RenderContext<'a> {
    pub renderer: &'a mut Renderer,
    pub assets: &'a AssetManager,
}

/// Named bundle of lifecycle hooks attached to an entity.
/// Every hook is optional.
pub trait Behavior {
    /// Called once when attached.
    fn init(&mut self, _entity: &mut Entity) {}

    fn update(&mut self, _entity: &mut Entity, _cmds: &mut SceneCommands, _dt: f32) {}

    /// Whether `render` replaces the entity's rectangle fallback.
    fn has_render(&self) -> bool {
        false
    }

    fn render(&self, _entity: &Entity, _ctx: &mut RenderContext) {}

    fn on_collision(&mut self, _entity: &mut Entity, _contact: &Contact) {}

    fn on_input(&mut self, _entity: &mut Entity, _input: &InputManager) {}

    /// Called once when detached or when the entity is destroyed.
    fn destroy(&mut self, _entity: &mut Entity) {}
}

/// Structural changes requested during a scene pass.
/// The scene applies them after every entity has updated.
pub struct SceneCommands {
    spawned: Vec<Entity>,
    removed: Vec<EntityId>,
    entity_count: usize,
    focus: Option<Vec2>,
    next_id: u32,
}

impl SceneCommands {
    pub fn new(entity_count: usize, focus: Option<Vec2>, next_id: u32) -> Self {
        Self {
            spawned: Vec::new(),
            removed: Vec::new(),
            entity_count,
            focus,
            next_id,
        }
    }

    /// Allocate an id for an entity about to be spawned.
    pub fn reserve_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn spawn(&mut self, entity: Entity) {
        self.spawned.push(entity);
    }

    pub fn remove(&mut self, id: EntityId) {
        if !self.removed.contains(&id) {
            self.removed.push(id);
        }
    }

    /// Entity count when the pass began. Unchanged by `spawn`/`remove`.
    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    /// Center of the first active player when the pass began.
    pub fn focus(&self) -> Option<Vec2> {
        self.focus
    }

    pub(crate) fn into_parts(self) -> (Vec<Entity>, Vec<EntityId>, u32) {
        (self.spawned, self.removed, self.next_id)
    }
}

/// Walk back and forth within `range` of the spawn point, turning at walls.
#[derive(Debug, Default)]
pub struct Patrol;

impl Behavior for Patrol {
    fn update(&mut self, entity: &mut Entity, _cmds: &mut SceneCommands, _dt: f32) {
        let x = entity.pos.x;
        let Some(enemy) = entity.enemy_mut() else {
            return;
        };
        if enemy.direction > 0.0 && x >= enemy.origin.x + enemy.range {
            enemy.direction = -1.0;
        } else if enemy.direction < 0.0 && x <= enemy.origin.x - enemy.range {
            enemy.direction = 1.0;
        }
        let vx = enemy.speed * enemy.direction;
        entity.body.velocity.x = vx;
        entity.flip_x = vx < 0.0;
    }

    fn on_collision(&mut self, entity: &mut Entity, contact: &Contact) {
        let Some(enemy) = entity.enemy_mut() else {
            return;
        };
        match contact.side {
            CollisionSide::Left => enemy.direction = -1.0,
            CollisionSide::Right => enemy.direction = 1.0,
            _ => {}
        }
    }
}

/// Multiple of the enemy's range within which `Chase` notices the player.
pub const CHASE_SIGHT: f32 = 3.0;

/// Walk toward the player while it is in sight, otherwise stand still.
#[derive(Debug, Default)]
pub struct Chase;

impl Behavior for Chase {
    fn update(&mut self, entity: &mut Entity, cmds: &mut SceneCommands, _dt: f32) {
        let center = entity.center();
        let Some(enemy) = entity.enemy_mut() else {
            return;
        };
        let vx = match cmds.focus() {
            Some(target) if (target.x - center.x).abs() <= enemy.range * CHASE_SIGHT => {
                let dx = target.x - center.x;
                if dx.abs() > 1.0 {
                    enemy.direction = dx.signum();
                    enemy.speed * enemy.direction
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };
        entity.body.velocity.x = vx;
        if vx != 0.0 {
            entity.flip_x = vx < 0.0;
        }
    }
}

/// Jump in place at a fixed interval while grounded.
#[derive(Debug)]
pub struct Hop {
    pub interval: f32,
    pub force: f32,
    timer: f32,
}

impl Hop {
    pub fn new(interval: f32, force: f32) -> Self {
        Self { interval, force, timer: 0.0 }
    }
}

impl Default for Hop {
    fn default() -> Self {
        Self::new(1.2, 8.0)
    }
}

impl Behavior for Hop {
    fn update(&mut self, entity: &mut Entity, _cmds: &mut SceneCommands, dt: f32) {
        self.timer += dt;
        entity.body.velocity.x = 0.0;
        if entity.body.on_ground && self.timer >= self.interval {
            entity.body.velocity.y = -self.force;
            entity.body.on_ground = false;
            self.timer = 0.0;
        }
    }
}

/// Draw the entity through the asset manager's sprite fallback chain.
#[derive(Debug, Clone)]
pub struct SpriteView {
    pub sprite: String,
}

impl SpriteView {
    pub fn new(sprite: impl Into<String>) -> Self {
        Self { sprite: sprite.into() }
    }
}

impl Behavior for SpriteView {
    fn has_render(&self) -> bool {
        true
    }

    fn render(&self, entity: &Entity, ctx: &mut RenderContext) {
        ctx.assets.draw_sprite(ctx.renderer, &self.sprite, entity.rect(), entity.flip_x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Color, Rect};
    use crate::assets::fetcher::RecordingFetcher;
    use crate::components::entity::{EnemyAi, EnemyData, EntityData};
    use crate::renderer::RecordingSurface;

    fn enemy(ai: EnemyAi) -> Entity {
        Entity::new(EntityId(7), Vec2::new(100.0, 0.0), Vec2::splat(32.0))
            .unwrap()
            .with_data(EntityData::Enemy(EnemyData {
                speed: 2.0,
                direction: 1.0,
                range: 100.0,
                origin: Vec2::new(100.0, 0.0),
                ai,
            }))
    }

    fn cmds(focus: Option<Vec2>) -> SceneCommands {
        SceneCommands::new(2, focus, 10)
    }

    #[test]
    fn patrol_turns_at_range() {
        let mut e = enemy(EnemyAi::Patrol).with_behavior("ai", Patrol);
        e.update(0.016, &mut cmds(None));
        assert_eq!(e.body.velocity.x, 2.0);

        e.pos.x = 200.0;
        e.update(0.016, &mut cmds(None));
        assert_eq!(e.body.velocity.x, -2.0);
        assert!(e.flip_x);

        e.pos.x = 0.0;
        e.update(0.016, &mut cmds(None));
        assert_eq!(e.body.velocity.x, 2.0);
    }

    #[test]
    fn patrol_turns_at_walls() {
        let mut e = enemy(EnemyAi::Patrol).with_behavior("ai", Patrol);
        e.dispatch_collision(&Contact { other: EntityId(1), side: CollisionSide::Left });
        e.update(0.016, &mut cmds(None));
        assert_eq!(e.body.velocity.x, -2.0);
    }

    #[test]
    fn chase_follows_focus_in_sight() {
        let mut e = enemy(EnemyAi::Chase).with_behavior("ai", Chase);
        e.update(0.016, &mut cmds(Some(Vec2::new(20.0, 0.0))));
        assert_eq!(e.body.velocity.x, -2.0);

        e.update(0.016, &mut cmds(Some(Vec2::new(2000.0, 0.0))));
        assert_eq!(e.body.velocity.x, 0.0);

        e.update(0.016, &mut cmds(None));
        assert_eq!(e.body.velocity.x, 0.0);
    }

    #[test]
    fn hop_waits_for_ground_and_interval() {
        let mut e = enemy(EnemyAi::Hop).with_behavior("ai", Hop::new(1.0, 8.0));
        e.update(1.5, &mut cmds(None));
        assert_eq!(e.body.velocity.y, 0.0);

        e.body.on_ground = true;
        e.update(0.1, &mut cmds(None));
        assert_eq!(e.body.velocity.y, -8.0);
        assert!(!e.body.on_ground);
    }

    #[test]
    fn commands_reserve_ids_and_dedupe_removals() {
        let mut c = cmds(None);
        assert_eq!(c.reserve_id(), EntityId(10));
        assert_eq!(c.reserve_id(), EntityId(11));
        c.remove(EntityId(3));
        c.remove(EntityId(3));
        let (spawned, removed, next) = c.into_parts();
        assert!(spawned.is_empty());
        assert_eq!(removed, vec![EntityId(3)]);
        assert_eq!(next, 12);
    }

    #[test]
    fn sprite_view_degrades_to_placeholder() {
        let surface = RecordingSurface::new(100, 100);
        let draws = surface.log();
        let mut renderer = Renderer::new(Box::new(surface), 100, 100).unwrap();
        let assets = AssetManager::new(Box::new(RecordingFetcher::new()));
        let e = enemy(EnemyAi::Static).with_color(Color::BLACK).with_behavior("sprite", SpriteView::new("enemy_0"));
        e.render(&mut RenderContext { renderer: &mut renderer, assets: &assets });
        assert_eq!(draws.filled(), vec![(Rect::new(100.0, 0.0, 32.0, 32.0), Color::RED)]);
    }
}
