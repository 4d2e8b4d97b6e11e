use std::fmt;
use glam::Vec2;
use crate::api::error::{EngineError, EngineResult};
use crate::api::types::{Color, EntityId, Rect};
use crate::components::behavior::{Behavior, RenderContext, SceneCommands};
use crate::core::physics::CollisionSide;
use crate::input::manager::InputManager;

/// Classification used for rule dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Player,
    Enemy,
    Collectible,
    Platform,
    Custom(String),
}

impl Tag {
    pub fn parse(s: &str) -> Tag {
        match s {
            "player" => Tag::Player,
            "enemy" => Tag::Enemy,
            "collectible" => Tag::Collectible,
            "platform" => Tag::Platform,
            other => Tag::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Tag::Player => "player",
            Tag::Enemy => "enemy",
            Tag::Collectible => "collectible",
            Tag::Platform => "platform",
            Tag::Custom(s) => s,
        }
    }
}

/// Kinematic and material state read and written by `Physics`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsBody {
    /// World units per reference frame.
    pub velocity: Vec2,
    pub acceleration: Vec2,
    /// Per-entity gravity override. `Some(0.0)` makes an entity float.
    pub gravity: Option<f32>,
    pub friction: Option<f32>,
    pub solid: bool,
    pub bouncy: bool,
    /// Bounce coefficient override for bouncy bodies.
    pub bounce: Option<f32>,
    pub mass: f32,
    pub on_ground: bool,
    /// Whether this body is pushed apart from other non-platform bodies.
    /// Gameplay actors turn this off and resolve contact through rules instead.
    pub collide_dynamic: bool,
}

impl Default for PhysicsBody {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            gravity: None,
            friction: None,
            solid: true,
            bouncy: false,
            bounce: None,
            mass: 1.0,
            on_ground: false,
            collide_dynamic: true,
        }
    }
}

/// One collision observed during the last physics step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub other: EntityId,
    /// Face of `other` that this entity struck.
    pub side: CollisionSide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerData {
    pub max_speed: f32,
    pub jump_force: f32,
    pub spawn: Vec2,
}

/// Enemy movement pattern, from the level's `behavior` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyAi {
    Patrol,
    Chase,
    Hop,
    Static,
}

impl EnemyAi {
    pub fn parse(s: &str) -> Option<EnemyAi> {
        match s.to_ascii_lowercase().as_str() {
            "patrol" => Some(EnemyAi::Patrol),
            "chase" | "follow" => Some(EnemyAi::Chase),
            "jump" | "hop" => Some(EnemyAi::Hop),
            "static" | "idle" => Some(EnemyAi::Static),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyData {
    pub speed: f32,
    /// -1 or 1.
    pub direction: f32,
    pub range: f32,
    pub origin: Vec2,
    pub ai: EnemyAi,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectibleData {
    pub value: u32,
    pub sound: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    Normal,
    Temporary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn unit(&self) -> Vec2 {
        match self {
            Axis::Horizontal => Vec2::X,
            Axis::Vertical => Vec2::Y,
        }
    }
}

/// Sine-driven oscillation about `origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformMotion {
    pub origin: Vec2,
    pub speed: f32,
    pub distance: f32,
    pub axis: Axis,
    pub phase: f32,
}

impl PlatformMotion {
    /// Position for the current phase.
    pub fn position(&self) -> Vec2 {
        self.origin + self.axis.unit() * self.phase.sin() * self.distance
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformData {
    pub kind: PlatformKind,
    pub motion: Option<PlatformMotion>,
    /// Seconds left before a triggered temporary platform disappears.
    pub disappear_timer: Option<f32>,
}

/// Typed per-entity game state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EntityData {
    #[default]
    None,
    Player(PlayerData),
    Enemy(EnemyData),
    Collectible(CollectibleData),
    Platform(PlatformData),
}

/// One game object. Owned by exactly one `Scene`.
pub struct Entity {
    pub id: EntityId,
    /// Top-left corner in world space.
    pub pos: Vec2,
    pub size: Vec2,
    pub body: PhysicsBody,
    tags: Vec<Tag>,
    /// Inactive entities skip update, physics and collision.
    pub active: bool,
    /// Invisible entities skip render.
    pub visible: bool,
    /// Fill color for the rectangle fallback.
    pub color: Color,
    pub flip_x: bool,
    pub data: EntityData,
    /// Contacts from the most recent physics step.
    pub contacts: Vec<Contact>,
    behaviors: Vec<(String, Box<dyn Behavior>)>,
}

impl Entity {
    pub fn new(id: EntityId, pos: Vec2, size: Vec2) -> EngineResult<Self> {
        if !size.is_finite() || size.x < 0.0 || size.y < 0.0 {
            return Err(EngineError::InvalidGeometry { width: size.x, height: size.y });
        }
        Ok(Self {
            id,
            pos,
            size,
            body: PhysicsBody::default(),
            tags: Vec::new(),
            active: true,
            visible: true,
            color: Color::FALLBACK,
            flip_x: false,
            data: EntityData::None,
            contacts: Vec::new(),
            behaviors: Vec::new(),
        })
    }

    // -- Builder pattern --

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.add_tag(tag);
        self
    }

    pub fn with_body(mut self, body: PhysicsBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_data(mut self, data: EntityData) -> Self {
        self.data = data;
        self
    }

    pub fn with_behavior(mut self, name: impl Into<String>, behavior: impl Behavior + 'static) -> Self {
        self.add_behavior(name, behavior);
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_platform(&self) -> bool {
        self.has_tag(&Tag::Platform)
    }

    /// Tags form a set; adding one twice is a no-op.
    pub fn add_tag(&mut self, tag: Tag) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    pub fn remove_tag(&mut self, tag: &Tag) {
        self.tags.retain(|t| t != tag);
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Attach a behavior. A behavior already attached under `name` is
    /// destroyed and replaced.
    pub fn add_behavior(&mut self, name: impl Into<String>, behavior: impl Behavior + 'static) {
        let name = name.into();
        self.remove_behavior(&name);
        let mut behavior: Box<dyn Behavior> = Box::new(behavior);
        behavior.init(self);
        self.behaviors.push((name, behavior));
    }

    /// Detach and destroy the behavior named `name`. Returns whether one existed.
    pub fn remove_behavior(&mut self, name: &str) -> bool {
        let Some(index) = self.behaviors.iter().position(|(n, _)| n == name) else {
            return false;
        };
        let (_, mut old) = self.behaviors.remove(index);
        old.destroy(self);
        true
    }

    pub fn has_behavior(&self, name: &str) -> bool {
        self.behaviors.iter().any(|(n, _)| n == name)
    }

    pub fn behavior_names(&self) -> impl Iterator<Item = &str> {
        self.behaviors.iter().map(|(n, _)| n.as_str())
    }

    /// Run every behavior's update hook in attachment order.
    pub fn update(&mut self, dt: f32, cmds: &mut SceneCommands) {
        if !self.active {
            return;
        }
        self.with_behaviors(|entity, behavior| behavior.update(entity, cmds, dt));
    }

    /// Draw through behaviors that render, or as a filled rectangle if none do.
    pub fn render(&self, ctx: &mut RenderContext) {
        if !self.visible {
            return;
        }
        let mut drawn = false;
        for (_, behavior) in self.behaviors.iter().filter(|(_, b)| b.has_render()) {
            behavior.render(self, ctx);
            drawn = true;
        }
        if !drawn {
            ctx.renderer.fill_rect(self.rect(), self.color);
        }
    }

    pub fn dispatch_collision(&mut self, contact: &Contact) {
        self.with_behaviors(|entity, behavior| behavior.on_collision(entity, contact));
    }

    pub fn dispatch_input(&mut self, input: &InputManager) {
        if !self.active {
            return;
        }
        self.with_behaviors(|entity, behavior| behavior.on_input(entity, input));
    }

    /// Tear down every behavior and clear game data. Safe to call again.
    pub fn destroy(&mut self) {
        let mut behaviors = std::mem::take(&mut self.behaviors);
        for (_, behavior) in behaviors.iter_mut() {
            behavior.destroy(self);
        }
        self.behaviors.clear();
        self.contacts.clear();
        self.data = EntityData::None;
    }

    /// Behaviors are detached while they run so each can borrow the entity
    /// mutably. Anything attached during dispatch is kept after the originals.
    fn with_behaviors(&mut self, mut f: impl FnMut(&mut Entity, &mut dyn Behavior)) {
        let mut behaviors = std::mem::take(&mut self.behaviors);
        for (_, behavior) in behaviors.iter_mut() {
            f(self, &mut **behavior);
        }
        behaviors.append(&mut self.behaviors);
        self.behaviors = behaviors;
    }

    pub fn player(&self) -> Option<&PlayerData> {
        match &self.data {
            EntityData::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn enemy_mut(&mut self) -> Option<&mut EnemyData> {
        match &mut self.data {
            EntityData::Enemy(e) => Some(e),
            _ => None,
        }
    }

    pub fn platform(&self) -> Option<&PlatformData> {
        match &self.data {
            EntityData::Platform(p) => Some(p),
            _ => None,
        }
    }

    pub fn platform_mut(&mut self) -> Option<&mut PlatformData> {
        match &mut self.data {
            EntityData::Platform(p) => Some(p),
            _ => None,
        }
    }

    pub fn collectible(&self) -> Option<&CollectibleData> {
        match &self.data {
            EntityData::Collectible(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("pos", &self.pos)
            .field("size", &self.size)
            .field("tags", &self.tags)
            .field("active", &self.active)
            .field("visible", &self.visible)
            .field("data", &self.data)
            .field("behaviors", &self.behavior_names().collect::<Vec<_>>())
            .finish()
    }
}
