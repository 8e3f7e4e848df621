//! Collider: a shape placed relative to its entity
//!
//! Shapes are stored in local coordinates and moved to world space on demand
//! by adding the entity position. Rotation and scale are never applied.

use super::primitives::{ContactPoint, Ray};
use super::shape::{Shape, SphereContact};
use crate::foundation::math::{Vec3, AABB};
use crate::physics::collision_layers::CollisionGroups;

/// Sphere to push out of a collider
#[derive(Debug, Clone, Copy)]
pub struct SphereProbe {
    /// Current sphere center in world space
    pub position: Vec3,
    /// Sphere radius
    pub radius: f32,
    /// Contact tolerance around the sphere surface
    pub skin: f32,
    /// Step height the sphere may climb over (0 disables)
    pub climb: f32,
    /// Distance the sphere travelled this tick
    pub displacement: Vec3,
}

/// Corrected sphere position after a contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereResolution {
    /// Position that takes the sphere out of the collider
    pub position: Vec3,
    /// Contact point on the collider surface
    pub hit_point: Vec3,
    /// Contact normal, pointing toward the sphere
    pub normal: Vec3,
}

/// A collision shape with its local placement and filtering group
#[derive(Debug, Clone)]
pub struct Collider {
    shape: Shape,
    offset: Vec3,
    enabled: bool,
    group: CollisionGroups,
}

impl Collider {
    /// Collider centered on its entity, enabled, in every group
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            offset: Vec3::zeros(),
            enabled: true,
            group: CollisionGroups::default(),
        }
    }

    /// Builder: set the local offset
    #[must_use]
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    /// The shape
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Replace the shape
    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    /// Offset from the entity position
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Set the offset from the entity position
    pub fn set_offset(&mut self, offset: Vec3) {
        self.offset = offset;
    }

    /// Whether the collider takes part in collision
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the collider
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Group bits advertised to other bodies
    pub fn group(&self) -> CollisionGroups {
        self.group
    }

    /// Set the group bits
    pub fn set_group(&mut self, group: CollisionGroups) {
        self.group = group;
    }

    /// Bounds relative to the collider center
    pub fn aabb_raw(&self) -> AABB {
        self.shape.aabb_raw()
    }

    /// Bounds relative to the entity
    pub fn aabb_local(&self) -> AABB {
        self.aabb_raw().translated(self.offset)
    }

    /// Bounds in world space for an entity at `entity_pos`
    pub fn aabb_world(&self, entity_pos: Vec3) -> AABB {
        self.aabb_raw().translated(self.offset_world(entity_pos))
    }

    /// World-space collider center
    pub fn offset_world(&self, entity_pos: Vec3) -> Vec3 {
        entity_pos + self.offset
    }

    /// Nearest hit of `ray` on this collider
    pub fn ray_test(&self, entity_pos: Vec3, ray: &Ray) -> Option<ContactPoint> {
        self.shape.ray_test(self.offset_world(entity_pos), ray)
    }

    /// Distance and normal from a sphere at `ball` when within `radius`
    pub fn sphere_test(&self, entity_pos: Vec3, ball: Vec3, radius: f32) -> Option<SphereContact> {
        self.shape.sphere_test(self.offset_world(entity_pos), ball, radius)
    }

    /// Push a sphere out of this collider
    ///
    /// Contacts within the skin snap the sphere onto the surface. A contact
    /// whose top is within `climb` of the sphere bottom is stepped over. A
    /// moving sphere that is clear of the collider is also checked along its
    /// path so it cannot tunnel through thin geometry.
    pub fn resolve_sphere(&self, entity_pos: Vec3, probe: &SphereProbe) -> Option<SphereResolution> {
        let ball = probe.position;
        let mut resolved = self
            .sphere_test(entity_pos, ball, probe.radius + probe.skin)
            .and_then(|contact| {
                let depth = probe.radius - contact.distance;
                (depth >= -probe.skin).then(|| SphereResolution {
                    position: ball + contact.normal * depth,
                    hit_point: ball - contact.normal * contact.distance,
                    normal: contact.normal,
                })
            });

        if resolved.is_some() && probe.climb > 0.0 {
            let top = self.aabb_world(entity_pos).max.y;
            if top <= ball.y - probe.radius + probe.climb {
                resolved = None;
            }
        }
        if resolved.is_some() {
            return resolved;
        }

        // Anti-tunnelling: follow the path of the center from the last tick
        let travelled = probe.displacement.magnitude();
        if travelled <= f32::EPSILON {
            return None;
        }
        let mut origin = ball - probe.displacement;
        if probe.climb > probe.radius {
            origin.y += probe.climb - probe.radius;
        }
        let ray = Ray::new(origin, probe.displacement)?;
        let hit = self.ray_test(entity_pos, &ray)?;
        (hit.distance < travelled).then(|| SphereResolution {
            position: hit.point + hit.normal * probe.radius,
            hit_point: hit.point,
            normal: hit.normal,
        })
    }
}
