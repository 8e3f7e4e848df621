//! Spatial queries against active static bodies
//!
//! Queries read the positions cached by the last [`CollisionWorld::sync`] or
//! [`CollisionWorld::tick`]. Static bodies are filtered on the fly with the
//! same rules the tick uses; nothing is allocated.

use crate::foundation::math::{normalize_safe, Vec3, AABB};
use crate::physics::body::Body;
use crate::physics::collision::{ContactPoint, Ray, RayHit};
use crate::physics::world::CollisionWorld;
use crate::scene::{EntityId, SceneGraph};

/// Static surface found straight below a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    /// Static body that owns the surface
    pub entity: EntityId,
    /// Height of the surface
    pub ground_y: f32,
    /// Query point height above the surface (negative when below it)
    pub altitude: f32,
}

/// Surface classification by normal direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceType {
    /// Walkable: the normal points mostly up
    Ground,
    /// Steep: the normal is close to horizontal
    Wall,
    /// Overhead: the normal points mostly down
    Ceiling,
}

impl SurfaceType {
    /// Classify a unit normal; `threshold` is the smallest normal Y of ground
    pub fn classify(normal: Vec3, threshold: f32) -> Self {
        if normal.y >= threshold {
            Self::Ground
        } else if normal.y >= -threshold {
            Self::Wall
        } else {
            Self::Ceiling
        }
    }
}

fn ray_hit(body: &Body, contact: ContactPoint) -> RayHit {
    RayHit {
        entity: body.entity,
        distance: contact.distance,
        point: contact.point,
        normal: contact.normal,
    }
}

/// Highest ray hit among `bodies`, with the body that was hit
pub(crate) fn highest_hit<'a>(bodies: impl Iterator<Item = &'a Body>, ray: &Ray) -> Option<(RayHit, &'a Body)> {
    let mut best: Option<(RayHit, &Body)> = None;
    for body in bodies {
        let Some(contact) = body.collider.ray_test(body.position, ray) else {
            continue;
        };
        if best.as_ref().map_or(true, |(hit, _)| contact.point.y > hit.point.y) {
            best = Some((ray_hit(body, contact), body));
        }
    }
    best
}

impl CollisionWorld {
    fn active_statics(&self) -> impl Iterator<Item = &Body> + '_ {
        self.bodies.values().filter(|body| body.is_static() && body.is_collidable())
    }

    /// Report every static hit of a ray
    ///
    /// A positive `max_distance` limits the ray and enables an AABB
    /// pre-filter; zero or negative means unbounded. Returns false when
    /// `direction` cannot be normalized.
    pub fn raycast_enumerate(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mut on_hit: impl FnMut(&RayHit),
    ) -> bool {
        let Some(ray) = Ray::new(origin, direction) else {
            return false;
        };
        let bounded = max_distance > 0.0;
        let span = AABB::new(origin, ray.point_at(max_distance.max(0.0)));

        for body in self.active_statics() {
            if bounded && !body.aabb_world().intersects(&span) {
                continue;
            }
            let Some(contact) = body.collider.ray_test(body.position, &ray) else {
                continue;
            };
            if !bounded || contact.distance < max_distance {
                on_hit(&ray_hit(body, contact));
            }
        }
        true
    }

    /// Nearest static hit of a ray
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let mut nearest: Option<RayHit> = None;
        self.raycast_enumerate(origin, direction, max_distance, |hit| {
            if nearest.map_or(true, |n| hit.distance < n.distance) {
                nearest = Some(*hit);
            }
        });
        nearest
    }

    /// Move a sphere along a ray in fixed steps until it touches a static body
    ///
    /// The step is the radius, but at least the configured minimum; travel
    /// is capped by the configured maximum. The reported point is the
    /// sphere center at the first touching step and the normal faces back
    /// along the ray. A zero radius casts a plain ray instead.
    pub fn sphere_cast(&self, origin: Vec3, radius: f32, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        if radius <= 0.0 {
            return self.raycast(origin, direction, max_distance);
        }
        let dir = normalize_safe(direction)?;
        let bounds = self
            .active_statics()
            .map(Body::aabb_world)
            .reduce(|a, b| a.union(&b))?
            .expanded(radius);

        let cap = self.config.sphere_cast_max_distance;
        let limit = if max_distance > 0.0 { max_distance.min(cap) } else { cap };
        let step = radius.max(self.config.sphere_cast_min_step);

        let reaches_bounds = bounds.contains_point(origin)
            || bounds.intersect_ray(origin, dir).is_some_and(|(entry, _)| entry <= limit);
        if !reaches_bounds {
            return None;
        }

        let mut entered = false;
        let mut distance = 0.0;
        while distance < limit {
            let center = origin + dir * distance;
            if bounds.contains_point(center) {
                entered = true;
                if let Some(entity) = self.sphere_overlap(center, radius) {
                    return Some(RayHit {
                        entity,
                        distance,
                        point: center,
                        normal: -dir,
                    });
                }
            } else if entered {
                return None; // past every static body
            }
            distance += step;
        }
        None
    }

    /// First static body a sphere touches
    pub fn sphere_overlap(&self, center: Vec3, radius: f32) -> Option<EntityId> {
        self.active_statics()
            .find(|body| body.collider.sphere_test(body.position, center, radius).is_some())
            .map(Body::entity)
    }

    /// Highest static surface below `position`
    ///
    /// The probe starts `max_penetration` above the point, so surfaces
    /// slightly above it still count.
    pub fn ground_point(&self, position: Vec3, max_penetration: f32) -> Option<GroundHit> {
        self.ground_point_excluding(position, max_penetration, None)
    }

    fn ground_point_excluding(
        &self,
        position: Vec3,
        max_penetration: f32,
        exclude: Option<EntityId>,
    ) -> Option<GroundHit> {
        let ray = Ray::down(position + Vec3::new(0.0, max_penetration, 0.0));
        let candidates = self.active_statics().filter(|body| Some(body.entity) != exclude);
        let (hit, _) = highest_hit(candidates, &ray)?;
        Some(GroundHit {
            entity: hit.entity,
            ground_y: hit.point.y,
            altitude: position.y - hit.point.y,
        })
    }

    /// Height of `position` above the ground below it
    pub fn altitude_at_point(&self, position: Vec3, max_penetration: f32) -> Option<f32> {
        self.ground_point(position, max_penetration).map(|ground| ground.altitude)
    }

    /// Altitude of the bottom center of a dynamic body
    pub fn dynamic_body_altitude(&self, entity: EntityId) -> Option<f32> {
        let body = self.body(entity).filter(|body| body.is_dynamic())?;
        let aabb = body.aabb_world();
        let center = aabb.center();
        let foot = Vec3::new(center.x, aabb.min.y, center.z);
        self.altitude_at_point(foot, self.config.dynamic_altitude_penetration)
    }

    /// Put an entity on the ground below it
    ///
    /// Sets the entity Y to the ground height and, for dynamic bodies,
    /// records altitude 0 with the ground reference. Returns false when the
    /// entity has no body or there is no ground.
    pub fn snap_to_ground(&mut self, scene: &mut impl SceneGraph, entity: EntityId) -> bool {
        let Some(body) = self.body(entity) else {
            return false;
        };
        let position = scene.position(entity).unwrap_or(body.position);
        let Some(ground) =
            self.ground_point_excluding(position, self.config.snap_to_ground_penetration, Some(entity))
        else {
            return false;
        };

        let snapped = Vec3::new(position.x, ground.ground_y, position.z);
        scene.set_position(entity, snapped);
        if let Some(body) = self.body_mut(entity) {
            body.position = snapped;
            if let Some(desc) = body.descriptor_mut() {
                desc.set_altitude(0.0, Some(ground.entity));
            }
        }
        true
    }

    /// Classify a surface normal with the configured ground threshold
    ///
    /// Returns `None` for a zero normal.
    pub fn surface_type(&self, normal: Vec3) -> Option<SurfaceType> {
        normalize_safe(normal).map(|n| SurfaceType::classify(n, self.config.ground_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::Shape;
    use crate::scene::SceneTree;
    use approx::assert_relative_eq;

    /// Ground plane at 0 and a box spanning heights [10, 20]
    fn terrain() -> (SceneTree, CollisionWorld, EntityId, EntityId) {
        let mut scene = SceneTree::new();
        let mut world = CollisionWorld::new();
        let ground = scene.spawn(Vec3::zeros());
        let block = scene.spawn(Vec3::new(0.0, 15.0, 0.0));
        world.attach_static(&scene, ground, Shape::ground());
        world.attach_static(&scene, block, Shape::cuboid(Vec3::new(10.0, 5.0, 10.0)));
        world.sync(&scene);
        (scene, world, ground, block)
    }

    #[test]
    fn test_raycast_enumerate_reports_every_hit() {
        let (_scene, world, ground, block) = terrain();
        let mut seen = Vec::new();
        assert!(world.raycast_enumerate(Vec3::new(0.0, 100.0, 0.0), -Vec3::y(), 0.0, |hit| seen.push(hit.entity)));
        seen.sort();
        assert_eq!(seen, vec![ground, block]);
    }

    #[test]
    fn test_raycast_zero_direction() {
        let (_scene, world, _, _) = terrain();
        assert!(!world.raycast_enumerate(Vec3::zeros(), Vec3::zeros(), 0.0, |_| {}));
        assert!(world.raycast(Vec3::zeros(), Vec3::zeros(), 0.0).is_none());
    }

    #[test]
    fn test_raycast_max_distance() {
        let (_scene, world, _, block) = terrain();
        let origin = Vec3::new(0.0, 100.0, 0.0);
        assert!(world.raycast(origin, -Vec3::y(), 50.0).is_none());
        let hit = world.raycast(origin, -Vec3::y(), 90.0).unwrap();
        assert_eq!(hit.entity, block);
        assert_relative_eq!(hit.distance, 80.0, epsilon = 1e-4);
    }

    #[test]
    fn test_raycast_skips_disabled_statics() {
        let (_scene, mut world, ground, block) = terrain();
        world.set_body_enabled(block, false);
        let hit = world.raycast(Vec3::new(0.0, 100.0, 0.0), -Vec3::y(), 0.0).unwrap();
        assert_eq!(hit.entity, ground);
    }

    #[test]
    fn test_sphere_overlap() {
        let (_scene, world, _, block) = terrain();
        assert_eq!(world.sphere_overlap(Vec3::new(0.0, 24.0, 0.0), 5.0), Some(block));
        assert_eq!(world.sphere_overlap(Vec3::new(0.0, 40.0, 50.0), 5.0), None);
    }

    #[test]
    fn test_sphere_cast_stops_before_block() {
        let (_scene, world, _, block) = terrain();
        // Steps of 10 from 60: the sample at 30 is the first within reach of the top
        let hit = world.sphere_cast(Vec3::new(0.0, 60.0, 0.0), 10.0, -Vec3::y(), 0.0).unwrap();
        assert_eq!(hit.entity, block);
        assert_relative_eq!(hit.point, Vec3::new(0.0, 30.0, 0.0), epsilon = 1e-4);
        assert_relative_eq!(hit.normal, Vec3::y());
    }

    #[test]
    fn test_sphere_cast_leaves_static_bounds() {
        let (_scene, world, _, _) = terrain();
        assert!(world.sphere_cast(Vec3::new(0.0, 50.0, 0.0), 4.0, Vec3::y(), 0.0).is_none());
    }

    #[test]
    fn test_ground_point_and_altitude() {
        let (_scene, world, ground, block) = terrain();
        let on_block = world.ground_point(Vec3::new(0.0, 30.0, 0.0), 1.0).unwrap();
        assert_eq!(on_block.entity, block);
        assert_relative_eq!(on_block.ground_y, 20.0, epsilon = 1e-4);
        assert_relative_eq!(on_block.altitude, 10.0, epsilon = 1e-4);

        let beside = world.altitude_at_point(Vec3::new(50.0, 30.0, 0.0), 1.0).unwrap();
        assert_relative_eq!(beside, 30.0, epsilon = 1e-4);
        assert_eq!(world.ground_point(Vec3::new(50.0, 30.0, 0.0), 1.0).unwrap().entity, ground);
    }

    #[test]
    fn test_dynamic_body_altitude() {
        let (mut scene, mut world, _, block) = terrain();
        let ball = scene.spawn(Vec3::new(50.0, 40.0, 0.0));
        world.attach_dynamic(&scene, ball, Shape::character_sphere(8.0), Vec3::zeros());
        world.sync(&scene);
        assert_relative_eq!(world.dynamic_body_altitude(ball).unwrap(), 32.0, epsilon = 1e-4);
        assert_eq!(world.dynamic_body_altitude(block), None);
    }

    #[test]
    fn test_snap_to_ground_moves_entity() {
        let (mut scene, mut world, _, block) = terrain();
        let ball = scene.spawn(Vec3::new(0.0, 25.0, 0.0));
        world.attach_dynamic(&scene, ball, Shape::character_sphere(8.0), Vec3::zeros());
        assert!(world.snap_to_ground(&mut scene, ball));
        assert_relative_eq!(scene.position(ball).unwrap().y, 20.0, epsilon = 1e-4);
        let desc = world.descriptor(ball).unwrap();
        assert_eq!(desc.altitude, Some(0.0));
        assert_eq!(desc.ground, Some(block));
        assert!(!world.snap_to_ground(&mut scene, EntityId(999)));
    }

    #[test]
    fn test_surface_type() {
        let world = CollisionWorld::new();
        assert_eq!(world.surface_type(Vec3::y()), Some(SurfaceType::Ground));
        assert_eq!(world.surface_type(Vec3::new(1.0, 0.5, 0.0)), Some(SurfaceType::Wall));
        assert_eq!(world.surface_type(-Vec3::y()), Some(SurfaceType::Ceiling));
        assert_eq!(world.surface_type(Vec3::zeros()), None);
    }
}
