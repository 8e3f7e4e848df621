//! Collision world: body registry, configuration and per-entity settings
//!
//! The world owns every body attached to a scene entity. The per-tick
//! pipeline lives in `collision_system`, spatial queries in `query`.

use crate::config::{CollisionConfig, Config};
use crate::error::{CollisionError, CollisionResult};
use crate::foundation::collections::{BodyArena, BodyHandle};
use crate::foundation::logging::{debug, error};
use crate::foundation::math::Vec3;
use crate::physics::body::{Body, BodyKind, Descriptor};
use crate::physics::callbacks::CollisionCallbacks;
use crate::physics::collision::{Collider, Shape};
use crate::physics::collision_layers::CollisionGroups;
use crate::scene::{EntityId, SceneGraph};
use std::collections::HashMap;

/// Height of walls built by [`CollisionWorld::attach_wall`]
pub const WALL_HEIGHT: f32 = 200.0;

/// Wall contact kept during the static pass
#[derive(Debug, Clone, Copy)]
pub(crate) struct WallHit {
    pub(crate) wall: EntityId,
    pub(crate) normal: Vec3,
    pub(crate) delta: Vec3,
}

/// Owner of all collision bodies
///
/// Single writer: `tick` and registration take `&mut self`, queries take
/// `&self`. Wrap in [`SharedCollisionWorld`](crate::physics::SharedCollisionWorld)
/// to share between threads.
pub struct CollisionWorld {
    pub(crate) config: CollisionConfig,
    pub(crate) bodies: BodyArena<Body>,
    pub(crate) lookup: HashMap<EntityId, BodyHandle>,
    pub(crate) frame: u64,
    pub(crate) callbacks: Option<Box<dyn CollisionCallbacks>>,
    group_names: [Option<String>; 32],

    // Scratch lists, rebuilt every tick
    pub(crate) movers: Vec<BodyHandle>,
    pub(crate) collidable: Vec<BodyHandle>,
    pub(crate) characters: Vec<BodyHandle>,
    pub(crate) statics: Vec<BodyHandle>,
    pub(crate) wall_hits: Vec<WallHit>,
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CollisionWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionWorld")
            .field("bodies", &self.bodies.len())
            .field("frame", &self.frame)
            .field("callbacks", &self.callbacks.is_some())
            .finish_non_exhaustive()
    }
}

impl CollisionWorld {
    /// Create an empty world with default configuration
    pub fn new() -> Self {
        Self::with_config(CollisionConfig::default())
    }

    /// Create an empty world with the given configuration
    pub fn with_config(config: CollisionConfig) -> Self {
        Self {
            config,
            bodies: BodyArena::with_key(),
            lookup: HashMap::new(),
            frame: 0,
            callbacks: None,
            group_names: std::array::from_fn(|_| None),
            movers: Vec::new(),
            collidable: Vec::new(),
            characters: Vec::new(),
            statics: Vec::new(),
            wall_hits: Vec::new(),
        }
    }

    /// Create a world from a `.toml` or `.ron` configuration file
    pub fn from_config_file(path: &str) -> CollisionResult<Self> {
        Ok(Self::with_config(CollisionConfig::load_from_file(path)?))
    }

    /// Active configuration
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Ticks run so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Install collision hooks, replacing any previous ones
    pub fn set_callbacks(&mut self, callbacks: Box<dyn CollisionCallbacks>) {
        self.callbacks = Some(callbacks);
    }

    /// Remove and return the installed hooks
    pub fn take_callbacks(&mut self) -> Option<Box<dyn CollisionCallbacks>> {
        self.callbacks.take()
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    /// Attach a static body, or return the existing one
    ///
    /// Position and hierarchy flags are read from `scene` right away, so
    /// queries see the body before the next tick.
    pub fn try_attach_static(
        &mut self,
        scene: &impl SceneGraph,
        entity: EntityId,
        shape: Shape,
    ) -> CollisionResult<BodyHandle> {
        if let Some(handle) = self.existing_of_kind(entity, true)? {
            return Ok(handle);
        }
        let mut body = Body::new(entity, Collider::new(shape), BodyKind::Static, Vec3::zeros());
        body.read_scene(scene);
        Ok(self.insert(body))
    }

    /// Attach a static body; misuse is logged and ignored
    pub fn attach_static(&mut self, scene: &impl SceneGraph, entity: EntityId, shape: Shape) -> Option<BodyHandle> {
        self.try_attach_static(scene, entity, shape).map_err(log_misuse).ok()
    }

    /// Attach a dynamic body, or return the existing one
    ///
    /// The position history starts at the entity's current position.
    pub fn try_attach_dynamic(
        &mut self,
        scene: &impl SceneGraph,
        entity: EntityId,
        shape: Shape,
        velocity: Vec3,
    ) -> CollisionResult<BodyHandle> {
        if let Some(handle) = self.existing_of_kind(entity, false)? {
            return Ok(handle);
        }
        let position = scene.position(entity).unwrap_or_else(Vec3::zeros);
        let desc = Descriptor::new(&self.config.descriptor, velocity, position);
        let mut body = Body::new(entity, Collider::new(shape), BodyKind::Dynamic(Box::new(desc)), position);
        body.read_scene(scene);
        Ok(self.insert(body))
    }

    /// Attach a dynamic body; misuse is logged and ignored
    pub fn attach_dynamic(
        &mut self,
        scene: &impl SceneGraph,
        entity: EntityId,
        shape: Shape,
        velocity: Vec3,
    ) -> Option<BodyHandle> {
        self.try_attach_dynamic(scene, entity, shape, velocity).map_err(log_misuse).ok()
    }

    /// Attach a vertical wall from (x0, z0) to (x1, z1), [`WALL_HEIGHT`] tall
    ///
    /// The entity is moved to the wall midpoint; the wall faces (dz, 0, -dx).
    /// An entity that already has a static body keeps it and is not moved.
    pub fn try_attach_wall(
        &mut self,
        scene: &mut impl SceneGraph,
        entity: EntityId,
        x0: f32,
        z0: f32,
        x1: f32,
        z1: f32,
    ) -> CollisionResult<BodyHandle> {
        if let Some(handle) = self.existing_of_kind(entity, true)? {
            return Ok(handle);
        }
        let center = Vec3::new((x0 + x1) * 0.5, WALL_HEIGHT * 0.5, (z0 + z1) * 0.5);
        let shape = Shape::quad([
            Vec3::new(x0, 0.0, z0) - center,
            Vec3::new(x0, WALL_HEIGHT, z0) - center,
            Vec3::new(x1, WALL_HEIGHT, z1) - center,
            Vec3::new(x1, 0.0, z1) - center,
        ])?;
        scene.set_position(entity, center);
        self.try_attach_static(&*scene, entity, shape)
    }

    /// Attach a wall; misuse is logged and ignored
    pub fn attach_wall(
        &mut self,
        scene: &mut impl SceneGraph,
        entity: EntityId,
        x0: f32,
        z0: f32,
        x1: f32,
        z1: f32,
    ) -> Option<BodyHandle> {
        self.try_attach_wall(scene, entity, x0, z0, x1, z1).map_err(log_misuse).ok()
    }

    /// Detach and drop the body of `entity`
    ///
    /// Returns false when nothing was attached.
    pub fn detach(&mut self, entity: EntityId) -> bool {
        let Some(handle) = self.lookup.remove(&entity) else {
            return false;
        };
        self.bodies.remove(handle);
        for list in [&mut self.movers, &mut self.collidable, &mut self.characters, &mut self.statics] {
            list.retain(|h| *h != handle);
        }
        debug!("Detached collision body from {}", entity);
        true
    }

    /// A body is attached to `entity`
    pub fn is_attached(&self, entity: EntityId) -> bool {
        self.lookup.contains_key(&entity)
    }

    fn existing_of_kind(&self, entity: EntityId, want_static: bool) -> CollisionResult<Option<BodyHandle>> {
        let Some(&handle) = self.lookup.get(&entity) else {
            return Ok(None);
        };
        match self.bodies.get(handle) {
            Some(body) if body.is_static() == want_static => Ok(Some(handle)),
            Some(body) => Err(CollisionError::IncompatibleBody { entity, existing: body.kind_name() }),
            None => Ok(None),
        }
    }

    fn insert(&mut self, body: Body) -> BodyHandle {
        let entity = body.entity;
        debug!("Attached {} {} body to {}", body.kind_name(), body.collider.shape().kind_name(), entity);
        let handle = self.bodies.insert(body);
        self.lookup.insert(entity, handle);
        handle
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    /// Body attached to `entity`
    pub fn body(&self, entity: EntityId) -> Option<&Body> {
        self.lookup.get(&entity).and_then(|h| self.bodies.get(*h))
    }

    pub(crate) fn body_mut(&mut self, entity: EntityId) -> Option<&mut Body> {
        let handle = *self.lookup.get(&entity)?;
        self.bodies.get_mut(handle)
    }

    /// Body behind a handle
    pub fn body_by_handle(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// Every attached body, in no particular order
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    /// Number of attached bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Motion descriptor of a dynamic body
    pub fn descriptor(&self, entity: EntityId) -> Option<&Descriptor> {
        self.body(entity).and_then(Body::descriptor)
    }

    /// Mutable motion descriptor of a dynamic body
    pub fn descriptor_mut(&mut self, entity: EntityId) -> Option<&mut Descriptor> {
        self.body_mut(entity).and_then(Body::descriptor_mut)
    }

    fn with_body(&mut self, entity: EntityId, apply: impl FnOnce(&mut Body)) -> bool {
        let Some(body) = self.body_mut(entity) else {
            return false;
        };
        apply(body);
        true
    }

    /// Set the collider group bits; false when no body is attached
    pub fn set_group_bits(&mut self, entity: EntityId, group: CollisionGroups) -> bool {
        self.with_body(entity, |b| b.collider.set_group(group))
    }

    /// Set the body mask bits; false when no body is attached
    pub fn set_mask_bits(&mut self, entity: EntityId, mask: CollisionGroups) -> bool {
        self.with_body(entity, |b| b.mask = mask)
    }

    /// Enable or disable the collider; false when no body is attached
    pub fn set_body_enabled(&mut self, entity: EntityId, enabled: bool) -> bool {
        self.with_body(entity, |b| b.collider.set_enabled(enabled))
    }

    /// Replace the collider shape; false when no body is attached
    pub fn set_shape(&mut self, entity: EntityId, shape: Shape) -> bool {
        self.with_body(entity, |b| b.collider.set_shape(shape))
    }

    /// Set the collider offset; false when no body is attached
    pub fn set_shape_offset(&mut self, entity: EntityId, offset: Vec3) -> bool {
        self.with_body(entity, |b| b.collider.set_offset(offset))
    }

    /// Set the velocity of a dynamic body; false for static or unknown entities
    pub fn set_velocity(&mut self, entity: EntityId, velocity: Vec3) -> bool {
        let Some(desc) = self.descriptor_mut(entity) else {
            return false;
        };
        desc.velocity = velocity;
        true
    }

    /// Velocity of a dynamic body
    pub fn velocity(&self, entity: EntityId) -> Option<Vec3> {
        self.descriptor(entity).map(|d| d.velocity)
    }

    // ---------------------------------------------------------------------
    // Group names
    // ---------------------------------------------------------------------

    /// Label a single group bit for debugging
    pub fn try_set_group_name(&mut self, bit: CollisionGroups, name: &str) -> CollisionResult<()> {
        let index = bit.single_bit_index().ok_or(CollisionError::InvalidGroupBit(bit.bits()))?;
        self.group_names[index as usize] = Some(name.to_owned());
        Ok(())
    }

    /// Label a single group bit; misuse is logged and ignored
    pub fn set_group_name(&mut self, bit: CollisionGroups, name: &str) {
        let _ = self.try_set_group_name(bit, name).map_err(log_misuse);
    }

    /// Label of a single group bit
    pub fn group_name(&self, bit: CollisionGroups) -> Option<&str> {
        let index = bit.single_bit_index()?;
        self.group_names[index as usize].as_deref()
    }
}

pub(crate) fn log_misuse(err: CollisionError) -> CollisionError {
    error!("{}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneTree;
    use approx::assert_relative_eq;

    #[test]
    fn test_attach_same_kind_is_idempotent() {
        let scene = SceneTree::new();
        let mut world = CollisionWorld::new();
        let e = EntityId(1);
        let a = world.attach_static(&scene, e, Shape::ground()).unwrap();
        let b = world.attach_static(&scene, e, Shape::cuboid(Vec3::repeat(1.0))).unwrap();
        assert_eq!(a, b);
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.body(e).unwrap().collider().shape().kind_name(), "plane");
    }

    #[test]
    fn test_attach_other_kind_is_rejected() {
        let scene = SceneTree::new();
        let mut world = CollisionWorld::new();
        let e = EntityId(1);
        world.attach_static(&scene, e, Shape::ground());
        let err = world.try_attach_dynamic(&scene, e, Shape::character_sphere(8.0), Vec3::zeros()).unwrap_err();
        assert!(matches!(err, CollisionError::IncompatibleBody { existing: "static", .. }));
        assert!(world.attach_dynamic(&scene, e, Shape::character_sphere(8.0), Vec3::zeros()).is_none());
        assert!(world.body(e).unwrap().is_static());
    }

    #[test]
    fn test_detach_unknown_is_false() {
        let mut world = CollisionWorld::new();
        assert!(!world.detach(EntityId(7)));
        assert!(!world.set_mask_bits(EntityId(7), CollisionGroups::PLAYER));
    }

    #[test]
    fn test_wall_moves_entity_to_midpoint() {
        let mut scene = SceneTree::new();
        let mut world = CollisionWorld::new();
        let e = scene.spawn(Vec3::zeros());
        world.attach_wall(&mut scene, e, 0.0, 0.0, 0.0, 100.0).unwrap();
        assert_eq!(scene.position(e), Some(Vec3::new(0.0, 100.0, 50.0)));

        let Shape::Quad(quad) = world.body(e).unwrap().collider().shape() else {
            panic!("wall should be a quad");
        };
        // dz = 100, dx = 0: faces +X
        assert_eq!(quad.normal(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_wall_on_static_entity_keeps_body_and_position() {
        let mut scene = SceneTree::new();
        let mut world = CollisionWorld::new();
        let e = scene.spawn(Vec3::new(0.0, 100.0, 50.0));
        let first = world.attach_wall(&mut scene, e, 0.0, 0.0, 0.0, 100.0).unwrap();
        let second = world.attach_wall(&mut scene, e, 300.0, 0.0, 300.0, 100.0).unwrap();

        assert_eq!(first, second);
        assert_eq!(scene.position(e), Some(Vec3::new(0.0, 100.0, 50.0)));
        let body = world.body(e).unwrap();
        assert_eq!(body.position(), Vec3::new(0.0, 100.0, 50.0));
        let Shape::Quad(quad) = body.collider().shape() else {
            panic!("wall should be a quad");
        };
        assert_eq!(quad.points()[0], Vec3::new(0.0, -100.0, -50.0));
    }

    #[test]
    fn test_attached_bodies_take_scene_position() {
        let mut scene = SceneTree::new();
        let mut world = CollisionWorld::new();
        let block = scene.spawn(Vec3::new(500.0, 15.0, 0.0));
        let ball = scene.spawn(Vec3::new(-40.0, 60.0, 8.0));
        world.attach_static(&scene, block, Shape::cuboid(Vec3::new(10.0, 5.0, 10.0)));
        world.attach_dynamic(&scene, ball, Shape::character_sphere(8.0), Vec3::zeros());

        // No tick in between
        let hit = world.raycast(Vec3::new(500.0, 100.0, 0.0), -Vec3::y(), 0.0).unwrap();
        assert_eq!(hit.entity, block);
        assert_relative_eq!(hit.point.y, 20.0, epsilon = 1e-4);
        assert_eq!(world.raycast(Vec3::new(0.0, 100.0, 0.0), -Vec3::y(), 0.0), None);

        assert_eq!(world.body(ball).unwrap().position(), Vec3::new(-40.0, 60.0, 8.0));
        let desc = world.descriptor(ball).unwrap();
        assert_eq!(desc.prev_position, Vec3::new(-40.0, 60.0, 8.0));
        assert_eq!(desc.actual_speed(Vec3::new(-40.0, 60.0, 8.0)), Vec3::zeros());
    }

    #[test]
    fn test_degenerate_wall_is_rejected() {
        let mut scene = SceneTree::new();
        let mut world = CollisionWorld::new();
        let e = scene.spawn(Vec3::zeros());
        assert!(matches!(
            world.try_attach_wall(&mut scene, e, 5.0, 5.0, 5.0, 5.0),
            Err(CollisionError::DegenerateNormal(_))
        ));
        assert!(!world.is_attached(e));
    }

    #[test]
    fn test_group_names() {
        let mut world = CollisionWorld::new();
        world.set_group_name(CollisionGroups::PLAYER, "player");
        assert_eq!(world.group_name(CollisionGroups::PLAYER), Some("player"));
        assert_eq!(world.group_name(CollisionGroups::ENEMY), None);

        let err = world.try_set_group_name(CollisionGroups::PLAYER | CollisionGroups::ENEMY, "both").unwrap_err();
        assert!(matches!(err, CollisionError::InvalidGroupBit(0b110)));
        assert!(world.try_set_group_name(CollisionGroups::empty(), "none").is_err());
    }

    #[test]
    fn test_setters_reach_the_body() {
        let scene = SceneTree::new();
        let mut world = CollisionWorld::new();
        let e = EntityId(3);
        world.attach_dynamic(&scene, e, Shape::character(8.0, 16.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(world.set_group_bits(e, CollisionGroups::ENEMY));
        assert!(world.set_mask_bits(e, CollisionGroups::PLAYER));
        assert!(world.set_shape_offset(e, Vec3::new(0.0, 16.0, 0.0)));
        assert!(world.set_body_enabled(e, false));

        let body = world.body(e).unwrap();
        assert_eq!(body.collider().group(), CollisionGroups::ENEMY);
        assert_eq!(body.mask(), CollisionGroups::PLAYER);
        assert_eq!(body.collider().offset(), Vec3::new(0.0, 16.0, 0.0));
        assert!(!body.collider().enabled());
        assert_eq!(world.velocity(e), Some(Vec3::new(1.0, 0.0, 0.0)));
    }
}
