//! Per-call AABB kinematics and collision.
//!
//! Velocities are in world units per reference frame at 60 Hz. Every
//! time-dependent quantity is scaled by `k = dt * 60`, so a zero delta
//! integrates nothing.

use serde::{Deserialize, Serialize};
use crate::api::types::{EntityId, Rect};
use crate::components::entity::{Contact, Entity};

pub const REFERENCE_FPS: f32 = 60.0;

/// Downward-moving entities land on a platform when the top overlap is below
/// this fraction of their height, even if another axis has less penetration.
pub const LANDING_BIAS_RATIO: f32 = 0.5;

/// Horizontal speed under which grounded friction snaps to rest.
const CREEP_SPEED: f32 = 0.1;

/// Distance below the feet searched for support, and the downward travel
/// that demotes a grounded entity.
const GROUND_TOLERANCE: f32 = 1.0;

/// Face of `b` that `a` struck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionSide {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    pub side: CollisionSide,
    pub depth: f32,
}

/// Scene-wide physics tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Physics {
    pub gravity: f32,
    pub friction: f32,
    pub terminal_velocity: f32,
    /// Bounce coefficient for bouncy bodies without their own.
    pub bounce: f32,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            gravity: 0.5,
            friction: 0.8,
            terminal_velocity: 15.0,
            bounce: 0.5,
        }
    }
}

impl Physics {
    pub fn new(gravity: f32, friction: f32) -> Self {
        Self {
            gravity,
            friction,
            ..Self::default()
        }
    }

    /// Advance one entity by `dt` seconds.
    pub fn update(&self, entity: &mut Entity, dt: f32) {
        let k = dt * REFERENCE_FPS;
        entity.contacts.clear();
        let body = &mut entity.body;

        if !body.on_ground {
            body.velocity.y += body.gravity.unwrap_or(self.gravity) * k;
        }
        body.velocity += body.acceleration * k;
        if body.on_ground {
            body.velocity.x *= body.friction.unwrap_or(self.friction).powf(k);
            if body.velocity.x.abs() < CREEP_SPEED {
                body.velocity.x = 0.0;
            }
        }
        body.velocity.y = body.velocity.y.clamp(-self.terminal_velocity, self.terminal_velocity);

        let before = entity.pos.y;
        entity.pos += body.velocity * k;
        if body.on_ground && entity.pos.y - before > GROUND_TOLERANCE {
            body.on_ground = false;
        }
    }

    /// Which face of `b` the entity `a` overlaps, if any.
    pub fn detect_collision(&self, a: &Entity, b: &Entity) -> Option<CollisionResult> {
        if !a.body.solid || !b.body.solid {
            return None;
        }
        let (ra, rb) = (a.rect(), b.rect());
        if !ra.intersects(&rb) {
            return None;
        }

        let top = ra.bottom() - rb.y;
        if b.is_platform() && a.body.velocity.y > 0.0 && top < a.size.y * LANDING_BIAS_RATIO {
            return Some(CollisionResult { side: CollisionSide::Top, depth: top });
        }

        let candidates = [
            (CollisionSide::Top, top),
            (CollisionSide::Bottom, rb.bottom() - ra.y),
            (CollisionSide::Left, ra.right() - rb.x),
            (CollisionSide::Right, rb.right() - ra.x),
        ];
        let (side, depth) = candidates
            .into_iter()
            .fold(candidates[0], |best, c| if c.1 < best.1 { c } else { best });
        Some(CollisionResult { side, depth })
    }

    /// Separate `a` from `b` and record the contact on `a`.
    pub fn resolve_collision(&self, a: &mut Entity, b: &Entity, result: CollisionResult) {
        let coefficient = if a.body.bouncy { a.body.bounce.unwrap_or(self.bounce) } else { 0.0 };
        let rb = b.rect();
        let v = &mut a.body.velocity;
        match result.side {
            CollisionSide::Top => {
                // Bodies rising through a platform from below pass through.
                if v.y >= 0.0 {
                    a.pos.y = rb.y - a.size.y;
                    v.y = 0.0;
                    a.body.on_ground = true;
                }
            }
            CollisionSide::Bottom => {
                a.pos.y = rb.bottom();
                if v.y < 0.0 {
                    v.y = -v.y * coefficient;
                }
            }
            CollisionSide::Left => {
                a.pos.x = rb.x - a.size.x;
                if v.x > 0.0 {
                    v.x = -v.x * coefficient;
                }
            }
            CollisionSide::Right => {
                a.pos.x = rb.right();
                if v.x < 0.0 {
                    v.x = -v.x * coefficient;
                }
            }
        }
        a.contacts.push(Contact { other: b.id, side: result.side });
    }

    /// Test and resolve `entity` against every candidate except itself.
    /// Returns the number of collisions resolved.
    pub fn check_collisions<'a>(
        &self,
        entity: &mut Entity,
        others: impl IntoIterator<Item = &'a Entity>,
    ) -> usize {
        let self_id = entity.id;
        let mut hits = 0;
        for other in others.into_iter().filter(|o| o.id != self_id) {
            if let Some(result) = self.detect_collision(entity, other) {
                self.resolve_collision(entity, other, result);
                hits += 1;
            }
        }
        hits
    }

    /// First solid candidate within the ground tolerance below `entity`'s
    /// feet.
    pub fn find_support<'a>(
        &self,
        entity: &Entity,
        others: impl IntoIterator<Item = &'a Entity>,
    ) -> Option<EntityId> {
        let probe = Rect::new(entity.pos.x, entity.pos.y + entity.size.y, entity.size.x, GROUND_TOLERANCE);
        others
            .into_iter()
            .find(|o| o.id != entity.id && o.body.solid && probe.intersects(&o.rect()))
            .map(|o| o.id)
    }

    /// Keep a grounded entity grounded while something holds it up, and
    /// record that support as a top contact. A body resting flush on a
    /// platform does not overlap it, so collision resolution alone leaves
    /// no contact after the landing step.
    pub fn settle<'a>(&self, entity: &mut Entity, others: impl IntoIterator<Item = &'a Entity>) {
        if !entity.body.on_ground {
            return;
        }
        match self.find_support(entity, others) {
            Some(support) => {
                let recorded = entity
                    .contacts
                    .iter()
                    .any(|c| c.other == support && c.side == CollisionSide::Top);
                if !recorded {
                    entity.contacts.push(Contact { other: support, side: CollisionSide::Top });
                }
            }
            None => entity.body.on_ground = false,
        }
    }

    /// Accumulate `force / mass` into velocity. Zero mass counts as one.
    pub fn apply_force(&self, entity: &mut Entity, force: glam::Vec2) {
        let mass = if entity.body.mass > 0.0 { entity.body.mass } else { 1.0 };
        entity.body.velocity += force / mass;
    }

    /// Overwrite velocity outright.
    pub fn apply_impulse(&self, entity: &mut Entity, velocity: glam::Vec2) {
        entity.body.velocity = velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use crate::api::types::EntityId;
    use crate::components::entity::Tag;

    fn boxed(id: u32, x: f32, y: f32, w: f32, h: f32) -> Entity {
        Entity::new(EntityId(id), Vec2::new(x, y), Vec2::new(w, h)).unwrap()
    }

    fn platform(x: f32, y: f32, w: f32, h: f32) -> Entity {
        boxed(100, x, y, w, h).with_tag(Tag::Platform)
    }

    #[test]
    fn gravity_and_terminal_velocity() {
        let physics = Physics::default();
        let mut e = boxed(1, 0.0, 0.0, 10.0, 10.0);
        physics.update(&mut e, 1.0 / 60.0);
        assert!((e.body.velocity.y - 0.5).abs() < 1e-5);

        e.body.velocity.y = 40.0;
        physics.update(&mut e, 1.0 / 60.0);
        assert_eq!(e.body.velocity.y, 15.0);
    }

    #[test]
    fn zero_dt_moves_nothing() {
        let physics = Physics::default();
        let mut e = boxed(1, 5.0, 5.0, 10.0, 10.0);
        e.body.velocity = Vec2::new(3.0, -4.0);
        physics.update(&mut e, 0.0);
        assert_eq!(e.pos, Vec2::new(5.0, 5.0));
        assert_eq!(e.body.velocity, Vec2::new(3.0, -4.0));
    }

    #[test]
    fn grounded_friction_snaps_creep() {
        let physics = Physics::default();
        let mut e = boxed(1, 0.0, 0.0, 10.0, 10.0);
        e.body.on_ground = true;
        e.body.velocity.x = 5.0;
        physics.update(&mut e, 1.0 / 60.0);
        assert!((e.body.velocity.x - 4.0).abs() < 1e-4);
        assert_eq!(e.body.velocity.y, 0.0);

        e.body.velocity.x = 0.09;
        physics.update(&mut e, 1.0 / 60.0);
        assert_eq!(e.body.velocity.x, 0.0);
    }

    #[test]
    fn grounded_entity_falling_fast_loses_ground() {
        let physics = Physics::default();
        let mut e = boxed(1, 0.0, 0.0, 10.0, 10.0);
        e.body.on_ground = true;
        e.body.velocity.y = 3.0;
        physics.update(&mut e, 1.0 / 60.0);
        assert!(!e.body.on_ground);
    }

    #[test]
    fn falling_onto_platform_lands() {
        let physics = Physics::default();
        let floor = platform(0.0, 100.0, 200.0, 20.0);
        for (y, vy) in [(75.0, 5.0), (80.0, 12.0), (90.0, 15.0), (70.0, 0.0)] {
            let mut a = boxed(1, 50.0, y, 32.0, 32.0);
            a.body.velocity.y = vy;
            assert_eq!(physics.check_collisions(&mut a, [&floor]), 1);
            assert_eq!(a.pos.y, floor.pos.y - a.size.y);
            assert_eq!(a.body.velocity.y, 0.0);
            assert!(a.body.on_ground);
            assert_eq!(a.contacts[0].side, CollisionSide::Top);
        }
    }

    #[test]
    fn landing_bias_beats_shallow_side_overlap() {
        let physics = Physics::default();
        let floor = platform(0.0, 100.0, 200.0, 20.0);
        // Overlaps the platform's left edge by 2 and its top by 10.
        let mut a = boxed(1, -30.0, 78.0, 32.0, 32.0);
        a.body.velocity.y = 6.0;
        let hit = physics.detect_collision(&a, &floor).unwrap();
        assert_eq!(hit.side, CollisionSide::Top);

        a.body.velocity.y = 0.0;
        let hit = physics.detect_collision(&a, &floor).unwrap();
        assert_eq!(hit.side, CollisionSide::Left);
    }

    #[test]
    fn rising_body_is_not_snapped_onto_top() {
        let physics = Physics::default();
        let floor = platform(0.0, 100.0, 200.0, 20.0);
        let mut a = boxed(1, 50.0, 75.0, 32.0, 32.0);
        a.body.velocity.y = -4.0;
        physics.check_collisions(&mut a, [&floor]);
        assert_eq!(a.pos.y, 75.0);
        assert_eq!(a.body.velocity.y, -4.0);
        assert!(!a.body.on_ground);
    }

    #[test]
    fn side_hits_reflect_by_coefficient() {
        let physics = Physics::default();
        let wall = boxed(2, 100.0, 0.0, 20.0, 100.0);

        let mut dull = boxed(1, 70.0, 40.0, 32.0, 20.0);
        dull.body.velocity.x = 6.0;
        physics.check_collisions(&mut dull, [&wall]);
        assert_eq!(dull.pos.x, 68.0);
        assert_eq!(dull.body.velocity.x, 0.0);

        let mut ball = boxed(1, 70.0, 40.0, 32.0, 20.0);
        ball.body.bouncy = true;
        ball.body.velocity.x = 6.0;
        physics.check_collisions(&mut ball, [&wall]);
        assert_eq!(ball.body.velocity.x, -3.0);

        let mut left = boxed(1, 118.0, 40.0, 32.0, 20.0);
        left.body.bouncy = true;
        left.body.bounce = Some(0.25);
        left.body.velocity.x = -8.0;
        physics.check_collisions(&mut left, [&wall]);
        assert_eq!(left.pos.x, 120.0);
        assert_eq!(left.body.velocity.x, 2.0);
    }

    #[test]
    fn bottom_hit_reflects() {
        let physics = Physics::default();
        let ceiling = boxed(2, 0.0, 0.0, 200.0, 20.0);
        let mut a = boxed(1, 50.0, 18.0, 32.0, 32.0);
        a.body.bouncy = true;
        a.body.velocity.y = -10.0;
        physics.check_collisions(&mut a, [&ceiling]);
        assert_eq!(a.pos.y, 20.0);
        assert_eq!(a.body.velocity.y, 5.0);
    }

    #[test]
    fn non_solid_and_touching_do_not_collide() {
        let physics = Physics::default();
        let a = boxed(1, 0.0, 0.0, 10.0, 10.0);
        let mut ghost = boxed(2, 5.0, 5.0, 10.0, 10.0);
        ghost.body.solid = false;
        assert!(physics.detect_collision(&a, &ghost).is_none());
        let touching = boxed(3, 10.0, 0.0, 10.0, 10.0);
        assert!(physics.detect_collision(&a, &touching).is_none());
    }

    #[test]
    fn check_collisions_skips_self() {
        let physics = Physics::default();
        let mut a = boxed(1, 0.0, 0.0, 10.0, 10.0);
        let twin = boxed(1, 0.0, 0.0, 10.0, 10.0);
        assert_eq!(physics.check_collisions(&mut a, [&twin]), 0);
    }

    #[test]
    fn support_probe_finds_floor_under_feet() {
        let physics = Physics::default();
        let floor = platform(0.0, 100.0, 100.0, 20.0);
        let standing = boxed(1, 10.0, 68.0, 32.0, 32.0);
        assert_eq!(physics.find_support(&standing, [&floor]), Some(EntityId(100)));
        let off_ledge = boxed(1, 110.0, 68.0, 32.0, 32.0);
        assert_eq!(physics.find_support(&off_ledge, [&floor]), None);
    }

    #[test]
    fn resting_body_keeps_top_contact() {
        let physics = Physics::default();
        let floor = platform(0.0, 100.0, 100.0, 20.0);
        let mut a = boxed(1, 10.0, 68.0, 32.0, 32.0);
        a.body.on_ground = true;
        for _ in 0..5 {
            physics.update(&mut a, 1.0 / 60.0);
            assert_eq!(physics.check_collisions(&mut a, [&floor]), 0);
            physics.settle(&mut a, [&floor]);
            assert!(a.body.on_ground);
            assert_eq!(a.contacts, vec![Contact { other: EntityId(100), side: CollisionSide::Top }]);
        }

        a.pos.x = 150.0;
        physics.update(&mut a, 1.0 / 60.0);
        physics.settle(&mut a, [&floor]);
        assert!(!a.body.on_ground);
        assert!(a.contacts.is_empty());
    }

    #[test]
    fn force_divides_by_mass_impulse_overwrites() {
        let physics = Physics::default();
        let mut e = boxed(1, 0.0, 0.0, 10.0, 10.0);
        e.body.mass = 2.0;
        e.body.velocity = Vec2::new(1.0, 1.0);
        physics.apply_force(&mut e, Vec2::new(4.0, 0.0));
        assert_eq!(e.body.velocity, Vec2::new(3.0, 1.0));
        e.body.mass = 0.0;
        physics.apply_force(&mut e, Vec2::new(1.0, 0.0));
        assert_eq!(e.body.velocity, Vec2::new(4.0, 1.0));
        physics.apply_impulse(&mut e, Vec2::new(0.0, -7.0));
        assert_eq!(e.body.velocity, Vec2::new(0.0, -7.0));
    }
}
