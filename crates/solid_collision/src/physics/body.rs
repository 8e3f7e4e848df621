//! Collision bodies and the motion descriptor of dynamic bodies

use crate::config::DescriptorDefaults;
use crate::foundation::math::{horizontal, Vec3, AABB};
use crate::physics::collision::Collider;
use crate::physics::collision_layers::CollisionGroups;
use crate::scene::{EntityId, SceneGraph};

/// Motion state of a dynamic body
///
/// Velocities are in world units per tick; gravity is subtracted from the
/// vertical velocity once per integrated tick.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// Displacement applied on the next integrated tick
    pub velocity: Vec3,
    /// Position before the last integration
    pub prev_position: Vec3,
    /// Position before `prev_position`
    pub prev_prev_position: Vec3,
    /// Downward acceleration (positive pulls down)
    pub gravity: f32,
    /// Vertical restitution on ground impact
    pub bounce: f32,
    /// Horizontal speed factor applied on a bounce
    pub bounce_horizontal: f32,
    /// Impact speed at or above which a bounce triggers
    pub bounce_min_speed: f32,
    /// Bounces since attach
    pub bounce_count: u32,
    /// Horizontal speed lost per grounded tick
    pub sliding_friction: f32,
    /// Share of a body-vs-body penetration this body resolves (0 pushes, 1 yields)
    pub penetration_response: f32,
    /// Horizontal contact tolerance against other dynamic bodies
    pub skin_width: f32,
    /// Tallest step walked over without wall contact
    pub climb_height: f32,
    /// Ground snapping distance
    pub snap_height: f32,
    /// Ticks left asleep; a sleeping body neither moves nor collides
    pub sleep_time: u32,
    /// Distance from the shape bottom to the ground, when ground was found
    pub altitude: Option<f32>,
    /// Static body this body is standing on
    pub ground: Option<EntityId>,
    /// Bodies touched this tick
    pub hits: Vec<EntityId>,
    /// Restrict sliding along walls
    pub slip_control: bool,
    /// With slip control, speeds below this still slide
    pub slip_limit_speed: f32,
    /// With slip control, deflections above this angle still slide
    pub slip_limit_degrees: f32,
}

impl Descriptor {
    /// Fresh descriptor for a body at `position`
    pub fn new(defaults: &DescriptorDefaults, velocity: Vec3, position: Vec3) -> Self {
        Self {
            velocity,
            prev_position: position,
            prev_prev_position: position,
            gravity: defaults.gravity,
            bounce: defaults.bounce,
            bounce_horizontal: defaults.bounce_horizontal,
            bounce_min_speed: defaults.bounce_min_speed,
            bounce_count: 0,
            sliding_friction: defaults.sliding_friction,
            penetration_response: defaults.penetration_response,
            skin_width: defaults.skin_width,
            climb_height: defaults.climb_height,
            snap_height: defaults.snap_height,
            sleep_time: 0,
            altitude: None,
            ground: None,
            hits: Vec::new(),
            slip_control: false,
            slip_limit_speed: 0.0,
            slip_limit_degrees: 0.0,
        }
    }

    /// Displacement actually made since the previous tick
    pub fn actual_speed(&self, current: Vec3) -> Vec3 {
        current - self.prev_position
    }

    /// Change of the actual displacement between the last two ticks
    pub fn actual_accel(&self, current: Vec3) -> Vec3 {
        (current - self.prev_position) - (self.prev_position - self.prev_prev_position)
    }

    /// Asleep this tick
    pub fn is_sleeping(&self) -> bool {
        self.sleep_time > 0
    }

    /// Standing on a static body
    pub fn is_grounded(&self) -> bool {
        self.ground.is_some()
    }

    /// Record the altitude with an optional ground reference
    pub fn set_altitude(&mut self, altitude: f32, ground: Option<EntityId>) {
        self.altitude = Some(altitude);
        self.ground = ground;
    }

    /// Forget altitude and ground
    pub fn clear_altitude(&mut self) {
        self.altitude = None;
        self.ground = None;
    }

    /// Settle velocity after snapping onto the ground
    ///
    /// `impact_speed` is the vertical displacement of the landing tick. A
    /// bounce reflects the vertical velocity, otherwise friction slows the
    /// horizontal velocity down.
    pub(crate) fn land(&mut self, impact_speed: f32) {
        let incoming = self.velocity;
        self.velocity.y = 0.0;
        if self.bounce > 0.0 && impact_speed.abs() >= self.bounce_min_speed {
            self.velocity.y = -incoming.y * self.bounce;
            self.velocity.x *= self.bounce_horizontal;
            self.velocity.z *= self.bounce_horizontal;
            self.bounce_count += 1;
        } else if self.sliding_friction > 0.0 {
            let speed = horizontal(self.velocity).norm();
            let keep = if self.sliding_friction < speed {
                (speed - self.sliding_friction) / speed
            } else {
                0.0
            };
            self.velocity.x *= keep;
            self.velocity.z *= keep;
        }
    }

    /// Shift the position history by one tick
    pub(crate) fn push_history(&mut self, current: Vec3) {
        self.prev_prev_position = self.prev_position;
        self.prev_position = current;
    }
}

/// Static or dynamic behavior of a body
#[derive(Debug, Clone)]
pub enum BodyKind {
    /// Never moved by the collision world
    Static,
    /// Integrated and resolved every tick
    Dynamic(Box<Descriptor>),
}

/// A collider attached to a scene entity
#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) entity: EntityId,
    pub(crate) collider: Collider,
    pub(crate) mask: CollisionGroups,
    pub(crate) kind: BodyKind,
    /// World position cached from the scene at the start of the tick
    pub(crate) position: Vec3,
    pub(crate) enabled_in_tree: bool,
    pub(crate) paused_in_tree: bool,
    pub(crate) visible_in_tree: bool,
}

impl Body {
    pub(crate) fn new(entity: EntityId, collider: Collider, kind: BodyKind, position: Vec3) -> Self {
        Self {
            entity,
            collider,
            mask: CollisionGroups::default(),
            kind,
            position,
            enabled_in_tree: true,
            paused_in_tree: false,
            visible_in_tree: true,
        }
    }

    /// Copy position and hierarchy flags of the owning entity
    pub(crate) fn read_scene(&mut self, scene: &impl SceneGraph) {
        if let Some(position) = scene.position(self.entity) {
            self.position = position;
        }
        self.enabled_in_tree = scene.is_enabled_in_tree(self.entity);
        self.paused_in_tree = scene.is_paused_in_tree(self.entity);
        self.visible_in_tree = scene.is_visible_in_tree(self.entity);
    }

    /// Owning entity
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// The collider
    pub fn collider(&self) -> &Collider {
        &self.collider
    }

    /// Mask bits: groups this body wants to collide with
    pub fn mask(&self) -> CollisionGroups {
        self.mask
    }

    /// Static or dynamic
    pub fn kind(&self) -> &BodyKind {
        &self.kind
    }

    /// Static body
    pub fn is_static(&self) -> bool {
        matches!(self.kind, BodyKind::Static)
    }

    /// Dynamic body
    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, BodyKind::Dynamic(_))
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self.kind {
            BodyKind::Static => "static",
            BodyKind::Dynamic(_) => "dynamic",
        }
    }

    /// Motion descriptor of a dynamic body
    pub fn descriptor(&self) -> Option<&Descriptor> {
        match &self.kind {
            BodyKind::Dynamic(desc) => Some(desc),
            BodyKind::Static => None,
        }
    }

    /// Mutable motion descriptor of a dynamic body
    pub fn descriptor_mut(&mut self) -> Option<&mut Descriptor> {
        match &mut self.kind {
            BodyKind::Dynamic(desc) => Some(desc),
            BodyKind::Static => None,
        }
    }

    /// Entity position as of the last tick
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// World bounds at the cached position
    pub fn aabb_world(&self) -> AABB {
        self.collider.aabb_world(self.position)
    }

    /// World bounds covering this tick and the previous one, grown by `padding`
    pub(crate) fn swept_aabb(&self, padding: f32) -> AABB {
        let current = self.aabb_world();
        let swept = match self.descriptor() {
            Some(desc) => current.union(&self.collider.aabb_world(desc.prev_position)),
            None => current,
        };
        swept.expanded(padding)
    }

    /// Entity and all ancestors enabled at the last sync
    pub fn is_enabled_in_tree(&self) -> bool {
        self.enabled_in_tree
    }

    /// Entity or an ancestor paused at the last sync
    pub fn is_paused_in_tree(&self) -> bool {
        self.paused_in_tree
    }

    /// Entity and all ancestors visible at the last sync
    pub fn is_visible_in_tree(&self) -> bool {
        self.visible_in_tree
    }

    /// Takes part in collision this tick: collider enabled, mask non-empty,
    /// enabled in the tree and awake
    pub fn is_collidable(&self) -> bool {
        self.collider.enabled()
            && !self.mask.is_empty()
            && self.enabled_in_tree
            && !self.descriptor().is_some_and(Descriptor::is_sleeping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::Shape;
    use approx::assert_relative_eq;

    fn dynamic_body() -> Body {
        let desc = Descriptor::new(&DescriptorDefaults::default(), Vec3::zeros(), Vec3::zeros());
        Body::new(
            EntityId(1),
            Collider::new(Shape::character_sphere(16.0)),
            BodyKind::Dynamic(Box::new(desc)),
            Vec3::zeros(),
        )
    }

    #[test]
    fn test_actual_speed_and_accel() {
        let mut desc = Descriptor::new(&DescriptorDefaults::default(), Vec3::zeros(), Vec3::zeros());
        desc.push_history(Vec3::new(0.0, 10.0, 0.0));
        desc.push_history(Vec3::new(0.0, 12.0, 0.0));
        let current = Vec3::new(0.0, 13.0, 0.0);
        assert_relative_eq!(desc.actual_speed(current), Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(desc.actual_accel(current), Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_defaults_follow_config() {
        let desc = Descriptor::new(&DescriptorDefaults::default(), Vec3::zeros(), Vec3::zeros());
        assert_relative_eq!(desc.gravity, 0.4);
        assert_relative_eq!(desc.bounce_min_speed, 0.8);
        assert_eq!(desc.altitude, None);
        assert!(!desc.slip_control);
    }

    #[test]
    fn test_collidable_rules() {
        let mut body = dynamic_body();
        assert!(body.is_collidable());

        body.mask = CollisionGroups::empty();
        assert!(!body.is_collidable());
        body.mask = CollisionGroups::ALL;

        if let Some(desc) = body.descriptor_mut() {
            desc.sleep_time = 3;
        }
        assert!(!body.is_collidable());
    }

    #[test]
    fn test_land_bounce_is_inclusive() {
        let mut desc = Descriptor::new(&DescriptorDefaults::default(), Vec3::new(4.0, -2.0, 0.0), Vec3::zeros());
        desc.bounce_min_speed = 2.0;
        desc.land(-2.0);
        assert_relative_eq!(desc.velocity, Vec3::new(3.2, 1.0, 0.0));
        assert_eq!(desc.bounce_count, 1);
    }

    #[test]
    fn test_land_applies_friction_without_bounce() {
        let mut desc = Descriptor::new(&DescriptorDefaults::default(), Vec3::new(3.0, -1.0, 4.0), Vec3::zeros());
        desc.bounce = 0.0;
        desc.sliding_friction = 1.0;
        desc.land(-1.0);
        assert_relative_eq!(desc.velocity, Vec3::new(2.4, 0.0, 3.2), epsilon = 1e-5);

        desc.sliding_friction = 10.0;
        desc.land(0.0);
        assert_relative_eq!(desc.velocity, Vec3::zeros());
        assert_eq!(desc.bounce_count, 0);
    }

    #[test]
    fn test_swept_aabb_covers_previous_position() {
        let mut body = dynamic_body();
        body.position = Vec3::new(10.0, 0.0, 0.0);
        let swept = body.swept_aabb(4.0);
        assert_relative_eq!(swept.min, Vec3::new(-20.0, -20.0, -20.0));
        assert_relative_eq!(swept.max, Vec3::new(30.0, 20.0, 20.0));
    }

    #[test]
    fn test_static_has_no_descriptor() {
        let mut body = Body::new(EntityId(2), Collider::new(Shape::ground()), BodyKind::Static, Vec3::zeros());
        assert!(body.is_static());
        assert!(body.descriptor().is_none());
        assert!(body.descriptor_mut().is_none());
        assert_eq!(body.kind_name(), "static");
    }
}
