//! Per-tick collision pipeline
//!
//! Based on Game Engine Architecture 3rd Edition, Chapter 13: motion is
//! integrated first, then a broad phase (swept AABBs) feeds the narrow phase
//! of each pair. Resolution is positional; velocities are only touched when
//! a body lands on the ground.
//!
//! One tick runs these stages in order:
//!
//! 1. Sync positions and hierarchy state from the scene
//! 2. Begin the frame (sleep timers, hit lists)
//! 3. Build the active body lists
//! 4. Integrate velocity and gravity
//! 5. Push overlapping characters apart
//! 6. Push characters out of static walls, then snap onto the ground
//! 7. Write positions back to the scene

use crate::foundation::collections::BodyHandle;
use crate::foundation::logging::trace;
use crate::foundation::math::{horizontal, Vec2, Vec3, AABB, NORMALIZE_EPSILON};
use crate::physics::body::Body;
use crate::physics::callbacks::{CollisionCallbacks, WallContact};
use crate::physics::collision::{Ray, SphereProbe};
use crate::physics::collision_layers::CollisionGroups;
use crate::physics::query::{highest_hit, SurfaceType};
use crate::physics::world::{CollisionWorld, WallHit};
use crate::scene::{EntityId, SceneGraph};

/// Replaces an exactly zero component of the line between two characters
const PAIR_NUDGE: f32 = 0.001;

struct NoCallbacks;

impl CollisionCallbacks for NoCallbacks {}

/// Group, mask and identity of one side of a candidate pair
#[derive(Debug, Clone, Copy)]
pub(crate) struct FilterKey {
    pub(crate) entity: EntityId,
    group: CollisionGroups,
    mask: CollisionGroups,
}

impl FilterKey {
    pub(crate) fn of(body: &Body) -> Self {
        Self {
            entity: body.entity,
            group: body.collider.group(),
            mask: body.mask,
        }
    }

    /// Groups agree both ways and neither entity is an ancestor of the other
    pub(crate) fn allows(self, other: Self, scene: &impl SceneGraph) -> bool {
        CollisionGroups::should_collide(self.group, self.mask, other.group, other.mask)
            && !scene.is_ancestor_of(self.entity, other.entity)
            && !scene.is_ancestor_of(other.entity, self.entity)
    }
}

/// State of a character read before a pair test
struct CharacterSnapshot {
    key: FilterKey,
    center: Vec3,
    swept: AABB,
    radius: f32,
    skin: f32,
    response: f32,
}

impl CollisionWorld {
    /// Refresh cached positions and hierarchy flags from the scene
    pub fn sync(&mut self, scene: &impl SceneGraph) {
        for body in self.bodies.values_mut() {
            body.read_scene(scene);
        }
    }

    /// Run one simulation step against `scene`
    pub fn tick(&mut self, scene: &mut impl SceneGraph) {
        let mut callbacks = self.callbacks.take();
        let mut fallback = NoCallbacks;
        let hooks: &mut dyn CollisionCallbacks = match callbacks.as_deref_mut() {
            Some(hooks) => hooks,
            None => &mut fallback,
        };

        self.sync(&*scene);
        hooks.on_update_start();

        self.begin_frame();
        self.build_active_lists();
        self.integrate();
        self.collide_dynamic_pairs(&*scene, hooks);
        self.collide_statics(&*scene, hooks);
        self.write_back(scene);

        hooks.on_update_end();
        self.callbacks = callbacks;
    }

    fn begin_frame(&mut self) {
        self.frame += 1;
        for body in self.bodies.values_mut() {
            let enabled = body.enabled_in_tree;
            if let Some(desc) = body.descriptor_mut() {
                if enabled && desc.sleep_time > 0 {
                    desc.sleep_time -= 1;
                }
                desc.hits.clear();
            }
        }
    }

    fn build_active_lists(&mut self) {
        self.movers.clear();
        self.collidable.clear();
        self.characters.clear();
        self.statics.clear();

        for (handle, body) in &self.bodies {
            if !body.enabled_in_tree {
                continue;
            }
            let collides = body.collider.enabled() && !body.mask.is_empty();
            match body.descriptor() {
                None if collides => self.statics.push(handle),
                None => {}
                Some(desc) if desc.is_sleeping() => {}
                Some(_) if collides => {
                    self.collidable.push(handle);
                    if body.collider.shape().character_dimensions().is_some() {
                        self.characters.push(handle);
                    }
                }
                Some(_) => self.movers.push(handle),
            }
        }
    }

    /// Move by velocity, then apply gravity for the next tick
    fn integrate(&mut self) {
        for &handle in self.movers.iter().chain(&self.collidable) {
            let Some(body) = self.bodies.get_mut(handle) else {
                continue;
            };
            if body.paused_in_tree {
                continue;
            }
            let position = body.position;
            let Some(desc) = body.descriptor_mut() else {
                continue;
            };
            desc.push_history(position);
            let moved = position + desc.velocity;
            desc.velocity.y -= desc.gravity;
            body.position = moved;
        }
    }

    // ---------------------------------------------------------------------
    // Character vs character
    // ---------------------------------------------------------------------

    fn character_snapshot(&self, handle: BodyHandle) -> Option<CharacterSnapshot> {
        let body = self.bodies.get(handle)?;
        let desc = body.descriptor()?;
        let (radius, _) = body.collider.shape().character_dimensions()?;
        Some(CharacterSnapshot {
            key: FilterKey::of(body),
            center: body.collider.offset_world(body.position),
            swept: body.swept_aabb(self.config.aabb_padding),
            radius,
            skin: desc.skin_width,
            response: desc.penetration_response,
        })
    }

    fn collide_dynamic_pairs(&mut self, scene: &impl SceneGraph, hooks: &mut dyn CollisionCallbacks) {
        let count = self.characters.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let (handle_a, handle_b) = (self.characters[i], self.characters[j]);
                // Re-read both sides: earlier pairs may have moved them
                let (Some(a), Some(b)) = (self.character_snapshot(handle_a), self.character_snapshot(handle_b)) else {
                    continue;
                };
                if !a.key.allows(b.key, scene) || !a.swept.intersects(&b.swept) {
                    continue;
                }

                let delta = horizontal(b.center - a.center);
                let distance = delta.norm();
                let depth = a.radius + b.radius - distance;
                if depth < -a.skin.max(b.skin) {
                    continue;
                }
                if hooks.on_dynamic_pair_filter(a.key.entity, b.key.entity).is_denied() || depth <= 0.0 {
                    continue;
                }

                let dir = if distance > NORMALIZE_EPSILON {
                    nudge(delta) / distance
                } else {
                    Vec2::x()
                };
                let (mut response_a, mut response_b) = (a.response, b.response);
                hooks.on_dynamic_pair_response(a.key.entity, b.key.entity, &mut response_a, &mut response_b);

                let push = Vec3::new(dir.x, 0.0, dir.y) * depth;
                trace!("Characters {} and {} overlap by {:.3}", a.key.entity, b.key.entity, depth);
                self.displace(handle_a, -push * response_a, b.key.entity);
                self.displace(handle_b, push * response_b, a.key.entity);
            }
        }
    }

    fn displace(&mut self, handle: BodyHandle, offset: Vec3, other: EntityId) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        body.position += offset;
        if let Some(desc) = body.descriptor_mut() {
            desc.hits.push(other);
        }
    }

    // ---------------------------------------------------------------------
    // Dynamic vs static
    // ---------------------------------------------------------------------

    fn collide_statics(&mut self, scene: &impl SceneGraph, hooks: &mut dyn CollisionCallbacks) {
        for index in 0..self.collidable.len() {
            let handle = self.collidable[index];
            if let Some(desc) = self.bodies.get_mut(handle).and_then(Body::descriptor_mut) {
                desc.clear_altitude();
            }
            self.collide_walls(handle, scene, hooks);
            self.collide_ground(handle, scene, hooks);
        }
    }

    /// Push a character out of walls with the lower sphere of its capsule
    fn collide_walls(&mut self, handle: BodyHandle, scene: &impl SceneGraph, hooks: &mut dyn CollisionCallbacks) {
        let Some(body) = self.bodies.get(handle) else {
            return;
        };
        let Some(desc) = body.descriptor() else {
            return;
        };
        let Some((radius, half_height)) = body.collider.shape().character_dimensions() else {
            return;
        };

        let key = FilterKey::of(body);
        let position = body.position;
        let prev = desc.prev_position;
        let velocity = desc.velocity;
        let slip_limits = desc.slip_control.then_some((desc.slip_limit_speed, desc.slip_limit_degrees));
        let probe = SphereProbe {
            position: body.collider.offset_world(position) - Vec3::new(0.0, half_height - radius, 0.0),
            radius,
            skin: self.config.wall_probe_skin,
            climb: desc.climb_height,
            displacement: position - prev,
        };
        let padding = self.config.aabb_padding;
        let swept = body.swept_aabb(padding);
        let threshold = self.config.ground_threshold;

        self.wall_hits.clear();
        for &static_handle in &self.statics {
            if self.wall_hits.len() >= self.config.max_wall_hits {
                break;
            }
            let Some(wall) = self.bodies.get(static_handle) else {
                continue;
            };
            if !swept.intersects(&wall.swept_aabb(padding)) || !key.allows(FilterKey::of(wall), scene) {
                continue;
            }
            let Some(resolved) = wall.collider.resolve_sphere(wall.position, &probe) else {
                continue;
            };
            // Ground is handled by the snap below, ceilings are ignored
            if SurfaceType::classify(resolved.normal, threshold) != SurfaceType::Wall {
                continue;
            }

            let mut new_pos = position + (resolved.position - probe.position);
            let contact = WallContact {
                hit_point: resolved.hit_point,
                normal: resolved.normal,
            };
            if hooks.on_wall_contact(wall.entity, key.entity, &contact, position, &mut new_pos).is_denied() {
                continue;
            }
            trace!("{} hits wall {} at {:?}", key.entity, wall.entity, resolved.hit_point);
            self.wall_hits.push(WallHit {
                wall: wall.entity,
                normal: resolved.normal,
                delta: new_pos - position,
            });
        }
        if self.wall_hits.is_empty() {
            return;
        }

        let moving_away = matches!(self.wall_hits.as_slice(), [single] if velocity.dot(&single.normal) > 0.0);
        let mut resolved = position;
        if !moving_away {
            resolved = self.wall_hits.iter().fold(position, |acc, hit| acc + hit.delta);
            if let Some((limit_speed, limit_degrees)) = slip_limits {
                if !slide_allowed(velocity, resolved - prev, limit_speed, limit_degrees) {
                    resolved.x = prev.x;
                    resolved.z = prev.z;
                }
            }
        }

        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        body.position = resolved;
        if let Some(desc) = body.descriptor_mut() {
            desc.hits.extend(self.wall_hits.iter().map(|hit| hit.wall));
        }
    }

    /// Snap a body onto the highest static surface below it
    fn collide_ground(&mut self, handle: BodyHandle, scene: &impl SceneGraph, hooks: &mut dyn CollisionCallbacks) {
        let Some(body) = self.bodies.get(handle) else {
            return;
        };
        let Some(desc) = body.descriptor() else {
            return;
        };

        let key = FilterKey::of(body);
        let center = body.collider.offset_world(body.position);
        let bottom = body.collider.aabb_raw().min.y;
        let snap_height = desc.snap_height;
        let vertical_speed = desc.velocity.y;

        let ray = Ray::down(center + Vec3::new(0.0, snap_height, 0.0));
        let statics = self.statics.iter().filter_map(|h| self.bodies.get(*h));
        let Some((hit, ground)) = highest_hit(statics, &ray) else {
            return;
        };
        let altitude = center.y + bottom - hit.point.y;
        // Falling bodies touch down only once they reach the surface; resting
        // ones stick to it within the snap height
        let lands = key.allows(FilterKey::of(ground), scene)
            && !hooks.on_ground_contact(hit.entity, key.entity).is_denied()
            && vertical_speed <= 0.0
            && (vertical_speed == 0.0 || altitude <= 0.0)
            && altitude < snap_height;

        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        if !lands {
            if let Some(desc) = body.descriptor_mut() {
                desc.set_altitude(altitude, None);
            }
            return;
        }

        let before = body.position;
        body.position.y = hit.point.y - body.collider.offset().y - bottom;
        if let Some(desc) = body.descriptor_mut() {
            let impact_speed = desc.actual_speed(before).y;
            desc.set_altitude(0.0, Some(hit.entity));
            desc.land(impact_speed);
            trace!("{} lands on {} (impact {:.3})", key.entity, hit.entity, impact_speed);
        }
    }

    fn write_back(&self, scene: &mut impl SceneGraph) {
        for &handle in self.movers.iter().chain(&self.collidable) {
            if let Some(body) = self.bodies.get(handle) {
                scene.set_position(body.entity, body.position);
            }
        }
    }
}

fn nudge(mut v: Vec2) -> Vec2 {
    if v.x == 0.0 {
        v.x = PAIR_NUDGE;
    }
    if v.y == 0.0 {
        v.y = PAIR_NUDGE;
    }
    v
}

/// Slip control: slow bodies and sharp deflections keep sliding along walls
fn slide_allowed(velocity: Vec3, displacement: Vec3, limit_speed: f32, limit_degrees: f32) -> bool {
    if velocity.norm() < limit_speed {
        return true;
    }
    let before = horizontal(velocity).try_normalize(NORMALIZE_EPSILON);
    let after = horizontal(displacement).try_normalize(NORMALIZE_EPSILON);
    match (before, after) {
        (Some(before), Some(after)) => before.dot(&after).clamp(-1.0, 1.0).acos().to_degrees() > limit_degrees,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nudge_only_touches_zero_components() {
        assert_eq!(nudge(Vec2::new(3.0, 0.0)), Vec2::new(3.0, PAIR_NUDGE));
        assert_eq!(nudge(Vec2::new(-1.0, 2.0)), Vec2::new(-1.0, 2.0));
    }

    #[test]
    fn test_slide_allowed() {
        let velocity = Vec3::new(10.0, 0.0, 0.0);
        // Slow enough to slide
        assert!(slide_allowed(velocity, Vec3::zeros(), 20.0, 45.0));
        // Straight on, no deflection
        assert!(!slide_allowed(velocity, Vec3::new(5.0, -1.0, 0.0), 1.0, 45.0));
        // Deflected by 90 degrees
        assert!(slide_allowed(velocity, Vec3::new(0.0, 0.0, 5.0), 1.0, 45.0));
        // No horizontal displacement at all
        assert!(slide_allowed(velocity, Vec3::new(0.0, -3.0, 0.0), 1.0, 45.0));
    }
}
