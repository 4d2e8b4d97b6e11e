use std::cmp::Ordering;
use std::collections::HashMap;
use crate::api::types::{EntityId, Rect};
use crate::assets::manager::AssetManager;
use crate::components::behavior::{RenderContext, SceneCommands};
use crate::components::entity::{Entity, Tag};
use crate::core::physics::Physics;
use crate::renderer::Renderer;

/// Entity arena with an id index.
/// Designed for small entity counts (tens to low hundreds).
///
/// Structural changes requested while `update` runs are buffered and applied
/// once the pass completes, so every entity sees the same set for the whole
/// pass.
pub struct Scene {
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
    physics: Physics,
    pending_add: Vec<Entity>,
    pending_remove: Vec<EntityId>,
    updating: bool,
    next_id: u32,
    /// Image asset drawn behind everything, if loaded.
    background: Option<String>,
}

impl Scene {
    pub fn new(physics: Physics) -> Self {
        Self {
            entities: Vec::with_capacity(64),
            index: HashMap::new(),
            physics,
            pending_add: Vec::new(),
            pending_remove: Vec::new(),
            updating: false,
            next_id: 1,
            background: None,
        }
    }

    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    pub fn set_physics(&mut self, physics: Physics) {
        self.physics = physics;
    }

    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    pub fn set_background(&mut self, asset_id: Option<String>) {
        self.background = asset_id;
    }

    /// Allocate a fresh entity id.
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }

    /// Add an entity. An entity already stored under the same id is destroyed
    /// and replaced.
    pub fn add_entity(&mut self, entity: Entity) {
        if self.updating {
            self.pending_add.push(entity);
            return;
        }
        self.next_id = self.next_id.max(entity.id.0 + 1);
        if let Some(&slot) = self.index.get(&entity.id) {
            log::warn!("scene: duplicate entity id {:?}, replacing", entity.id);
            let mut old = std::mem::replace(&mut self.entities[slot], entity);
            old.destroy();
        } else {
            self.index.insert(entity.id, self.entities.len());
            self.entities.push(entity);
        }
    }

    /// Remove and destroy an entity. Returns whether it existed (or, during a
    /// pass, whether the removal was queued).
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        if self.updating {
            if !self.pending_remove.contains(&id) {
                self.pending_remove.push(id);
            }
            return true;
        }
        let Some(slot) = self.index.remove(&id) else {
            return false;
        };
        let mut removed = self.entities.swap_remove(slot);
        if let Some(moved) = self.entities.get(slot) {
            self.index.insert(moved.id, slot);
        }
        removed.destroy();
        true
    }

    /// Run one pass: behaviors, then physics and collisions for every active
    /// non-platform entity, then buffered structural changes.
    pub fn update(&mut self, dt: f32) {
        self.updating = true;

        let focus = self
            .entities
            .iter()
            .find(|e| e.active && e.has_tag(&Tag::Player))
            .map(|e| e.center());
        let mut cmds = SceneCommands::new(self.entities.len(), focus, self.next_id);
        for entity in self.entities.iter_mut() {
            entity.update(dt, &mut cmds);
        }

        for i in 0..self.entities.len() {
            let (head, rest) = self.entities.split_at_mut(i);
            let Some((current, tail)) = rest.split_first_mut() else {
                continue;
            };
            if !current.active || current.is_platform() {
                continue;
            }
            let (head, tail): (&[Entity], &[Entity]) = (head, tail);
            let others = || head.iter().chain(tail.iter()).filter(|o| o.active);

            self.physics.update(current, dt);
            let dynamic = current.body.collide_dynamic;
            self.physics.check_collisions(
                current,
                others().filter(|o| !o.is_platform() && dynamic && o.body.collide_dynamic),
            );
            self.physics.check_collisions(current, others().filter(|o| o.is_platform()));
            self.physics.settle(
                current,
                others().filter(|o| o.is_platform() || (dynamic && o.body.collide_dynamic)),
            );

            let contacts = current.contacts.clone();
            for contact in &contacts {
                current.dispatch_collision(contact);
            }
        }

        self.updating = false;
        let (spawned, removed, next_id) = cmds.into_parts();
        self.next_id = self.next_id.max(next_id);
        self.pending_remove.extend(removed);
        self.pending_add.extend(spawned);
        self.flush_pending();
    }

    /// Apply buffered removals, then buffered additions.
    fn flush_pending(&mut self) {
        for id in std::mem::take(&mut self.pending_remove) {
            self.remove_entity(id);
        }
        for entity in std::mem::take(&mut self.pending_add) {
            self.add_entity(entity);
        }
    }

    /// Clear to the background, then draw visible entities back to front by y.
    pub fn render(&self, renderer: &mut Renderer, assets: &AssetManager) {
        renderer.clear();
        if let Some(id) = &self.background {
            if let Some((handle, _, _)) = assets.get(id).and_then(|a| a.image()) {
                let full = Rect::new(0.0, 0.0, renderer.width(), renderer.height());
                if let Err(e) = renderer.blit(handle, None, full, false) {
                    log::debug!("scene: background '{}' draw failed: {}", id, e);
                }
            }
        }

        let mut visible: Vec<&Entity> = self.entities.iter().filter(|e| e.visible).collect();
        visible.sort_by(|a, b| a.pos.y.partial_cmp(&b.pos.y).unwrap_or(Ordering::Equal));
        let mut ctx = RenderContext { renderer, assets };
        for entity in visible {
            entity.render(&mut ctx);
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).map(|&slot| &self.entities[slot])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = *self.index.get(&id)?;
        self.entities.get_mut(slot)
    }

    /// Linear scan.
    pub fn entities_by_tag(&self, tag: &Tag) -> Vec<&Entity> {
        self.entities.iter().filter(|e| e.has_tag(tag)).collect()
    }

    pub fn ids_by_tag(&self, tag: &Tag) -> Vec<EntityId> {
        self.entities.iter().filter(|e| e.has_tag(tag)).map(|e| e.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Destroy every entity, pending ones included.
    pub fn clear(&mut self) {
        for entity in self.entities.iter_mut().chain(self.pending_add.iter_mut()) {
            entity.destroy();
        }
        self.entities.clear();
        self.index.clear();
        self.pending_add.clear();
        self.pending_remove.clear();
        self.background = None;
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Physics::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use glam::Vec2;
    use crate::api::types::Color;
    use crate::assets::fetcher::RecordingFetcher;
    use crate::components::behavior::Behavior;
    use crate::renderer::RecordingSurface;

    fn boxed(id: u32, x: f32, y: f32) -> Entity {
        Entity::new(EntityId(id), Vec2::new(x, y), Vec2::splat(32.0)).unwrap()
    }

    /// Removes `target` during update and records the entity count it saw.
    struct Remover {
        target: EntityId,
        seen: Rc<RefCell<Vec<usize>>>,
    }

    impl Behavior for Remover {
        fn update(&mut self, _entity: &mut Entity, cmds: &mut SceneCommands, _dt: f32) {
            cmds.remove(self.target);
            self.seen.borrow_mut().push(cmds.entity_count());
        }
    }

    struct Spawner;

    impl Behavior for Spawner {
        fn update(&mut self, entity: &mut Entity, cmds: &mut SceneCommands, _dt: f32) {
            let id = cmds.reserve_id();
            if let Ok(child) = Entity::new(id, entity.pos, Vec2::splat(4.0)) {
                cmds.spawn(child.with_tag(Tag::Custom("spark".into())));
            }
        }
    }

    #[test]
    fn add_get_remove() {
        let mut scene = Scene::default();
        let id = scene.next_id();
        scene.add_entity(boxed(id.0, 10.0, 20.0));
        let second = scene.next_id();
        scene.add_entity(boxed(second.0, 0.0, 0.0));
        assert_eq!(scene.get(id).unwrap().pos, Vec2::new(10.0, 20.0));
        assert!(scene.remove_entity(id));
        assert!(!scene.remove_entity(id));
        assert_eq!(scene.len(), 1);
        assert!(scene.get(EntityId(2)).is_some());
    }

    #[test]
    fn duplicate_id_replaces() {
        let mut scene = Scene::default();
        scene.add_entity(boxed(5, 0.0, 0.0));
        scene.add_entity(boxed(5, 9.0, 0.0));
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.get(EntityId(5)).unwrap().pos.x, 9.0);
        assert_eq!(scene.next_id(), EntityId(6));
    }

    #[test]
    fn removal_during_update_is_deferred() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut scene = Scene::default();
        let mut remover = boxed(1, 0.0, 0.0).with_behavior(
            "remover",
            Remover { target: EntityId(2), seen: Rc::clone(&seen) },
        );
        remover.body.gravity = Some(0.0);
        let mut observer = boxed(3, 200.0, 0.0).with_behavior(
            "observer",
            Remover { target: EntityId(99), seen: Rc::clone(&seen) },
        );
        observer.body.gravity = Some(0.0);
        scene.add_entity(remover);
        scene.add_entity(boxed(2, 100.0, 0.0));
        scene.add_entity(observer);

        scene.update(1.0 / 60.0);
        assert_eq!(*seen.borrow(), vec![3, 3]);
        assert!(scene.get(EntityId(2)).is_none());
        assert_eq!(scene.len(), 2);
        assert!(!scene.is_updating());
    }

    #[test]
    fn spawns_land_after_the_pass() {
        let mut scene = Scene::default();
        scene.add_entity(boxed(1, 0.0, 0.0).with_behavior("spawner", Spawner));
        scene.update(0.0);
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.ids_by_tag(&Tag::Custom("spark".into())), vec![EntityId(2)]);
        assert_eq!(scene.next_id(), EntityId(3));
    }

    #[test]
    fn zero_dt_update_keeps_positions() {
        let mut scene = Scene::default();
        let mut mover = boxed(1, 10.0, 10.0);
        mover.body.velocity = Vec2::new(4.0, 2.0);
        scene.add_entity(mover);
        scene.add_entity(boxed(2, 300.0, 300.0).with_tag(Tag::Platform));
        scene.update(0.0);
        scene.update(0.0);
        assert_eq!(scene.get(EntityId(1)).unwrap().pos, Vec2::new(10.0, 10.0));
        assert_eq!(scene.get(EntityId(2)).unwrap().pos, Vec2::new(300.0, 300.0));
    }

    #[test]
    fn entity_lands_on_platform_and_stays() {
        let mut scene = Scene::default();
        scene.add_entity(boxed(1, 50.0, 60.0));
        scene.add_entity(
            Entity::new(EntityId(2), Vec2::new(0.0, 100.0), Vec2::new(400.0, 20.0))
                .unwrap()
                .with_tag(Tag::Platform),
        );
        for _ in 0..60 {
            scene.update(1.0 / 60.0);
        }
        let e = scene.get(EntityId(1)).unwrap();
        assert_eq!(e.pos.y, 68.0);
        assert!(e.body.on_ground);
        assert_eq!(scene.get(EntityId(2)).unwrap().pos.y, 100.0);
    }

    #[test]
    fn walking_off_a_ledge_resumes_falling() {
        let mut scene = Scene::default();
        let mut walker = boxed(1, 50.0, 68.0);
        walker.body.on_ground = true;
        scene.add_entity(walker);
        scene.add_entity(
            Entity::new(EntityId(2), Vec2::new(0.0, 100.0), Vec2::new(100.0, 20.0))
                .unwrap()
                .with_tag(Tag::Platform),
        );
        scene.update(1.0 / 60.0);
        assert!(scene.get(EntityId(1)).unwrap().body.on_ground);

        scene.get_mut(EntityId(1)).unwrap().pos.x = 150.0;
        scene.update(1.0 / 60.0);
        assert!(!scene.get(EntityId(1)).unwrap().body.on_ground);
    }

    #[test]
    fn render_sorts_visible_by_y() {
        let surface = RecordingSurface::new(100, 100);
        let draws = surface.log();
        let mut renderer = Renderer::new(Box::new(surface), 100, 100).unwrap();
        let assets = AssetManager::new(Box::new(RecordingFetcher::new()));

        let mut scene = Scene::default();
        scene.add_entity(boxed(1, 0.0, 50.0).with_color(Color::RED));
        scene.add_entity(boxed(2, 0.0, 10.0).with_color(Color::WHITE));
        let mut hidden = boxed(3, 0.0, 0.0).with_color(Color::BLACK);
        hidden.visible = false;
        scene.add_entity(hidden);

        scene.render(&mut renderer, &assets);
        let colors: Vec<Color> = draws.filled().into_iter().map(|(_, c)| c).collect();
        assert_eq!(colors, vec![Color::WHITE, Color::RED]);
    }

    #[test]
    fn clear_destroys_everything() {
        let mut scene = Scene::default();
        scene.add_entity(boxed(1, 0.0, 0.0));
        scene.set_background(Some("bg".into()));
        scene.clear();
        assert!(scene.is_empty());
        assert!(scene.get(EntityId(1)).is_none());
        assert!(scene.background().is_none());
    }
}
