//! Collider shape variants
//!
//! A closed set of shapes, each defined relative to its collider center.
//! Rotation and scale are never applied: every shape stays axis-aligned.

use super::primitives::{
    closest_point_on_segment, ContactPoint, Quad, Ray, Sphere, VerticalCylinder,
};
use crate::error::{CollisionError, CollisionResult};
use crate::foundation::math::{normalize_safe, Vec3, AABB};
use bitflags::bitflags;

/// Half extent of the trim box of an untrimmed plane
pub const PLANE_LIMIT: f32 = 10_000.0;

bitflags! {
    /// Faces of a sheared box that take part in collision
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BoxFaces: u8 {
        /// -X side
        const LEFT = 1 << 0;
        /// +X side
        const RIGHT = 1 << 1;
        /// +Y side
        const TOP = 1 << 2;
        /// -Y side
        const BOTTOM = 1 << 3;
        /// -Z side
        const FRONT = 1 << 4;
        /// +Z side
        const BACK = 1 << 5;
    }
}

impl Default for BoxFaces {
    fn default() -> Self {
        Self::all()
    }
}

/// Result of a sphere-vs-shape test
///
/// `distance` is measured from the sphere center to the shape surface along
/// `normal`; it is negative when the center is inside the shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereContact {
    /// Signed distance from the sphere center to the surface
    pub distance: f32,
    /// Unit normal pointing from the surface toward the sphere
    pub normal: Vec3,
}

/// Half-space bounded by a trim box
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneShape {
    normal: Vec3,
    trim: AABB,
    bounds: AABB,
}

impl PlaneShape {
    /// Plane through the collider center, trimmed to a local box
    pub fn new(normal: Vec3, trim: AABB) -> CollisionResult<Self> {
        let normal = normalize_safe(normal).ok_or(CollisionError::DegenerateNormal(normal))?;
        let bounds = Self::clip_trim(normal, &trim);
        Ok(Self { normal, trim, bounds })
    }

    /// Unit plane normal
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Local trim box
    pub fn trim(&self) -> AABB {
        self.trim
    }

    /// Replace the trim box
    pub fn set_trim(&mut self, trim: AABB) {
        self.trim = trim;
        self.bounds = Self::clip_trim(self.normal, &trim);
    }

    /// Replace the normal
    pub fn set_normal(&mut self, normal: Vec3) -> CollisionResult<()> {
        self.normal = normalize_safe(normal).ok_or(CollisionError::DegenerateNormal(normal))?;
        self.bounds = Self::clip_trim(self.normal, &self.trim);
        Ok(())
    }

    /// Shrink the trim box along the axis the plane varies least in
    fn clip_trim(normal: Vec3, trim: &AABB) -> AABB {
        let axis = normal.iamax();
        let (i, j) = ((axis + 1) % 3, (axis + 2) % 3);
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for a in [trim.min[i], trim.max[i]] {
            for b in [trim.min[j], trim.max[j]] {
                let k = -(normal[i] * a + normal[j] * b) / normal[axis];
                lo = lo.min(k);
                hi = hi.max(k);
            }
        }
        let mut bounds = *trim;
        bounds.min[axis] = lo.max(trim.min[axis]);
        bounds.max[axis] = hi.min(trim.max[axis]).max(bounds.min[axis]);
        bounds
    }
}

/// One-sided quad with cached normal and bounds
#[derive(Debug, Clone)]
pub struct QuadShape {
    quad: Quad,
    normal: Vec3,
    bounds: AABB,
}

impl QuadShape {
    /// Quad from four local points; the normal follows the first three
    pub fn new(points: [Vec3; 4]) -> CollisionResult<Self> {
        let quad = Quad::new(points);
        let [p0, p1, p2, _] = points;
        let raw = (p1 - p0).cross(&(p2 - p0));
        let normal = quad.normal().ok_or(CollisionError::DegenerateNormal(raw))?;
        let bounds = points[1..]
            .iter()
            .fold(AABB::new(p0, p0), |acc, p| acc.union(&AABB::new(*p, *p)));
        Ok(Self { quad, normal, bounds })
    }

    /// Corner points in local space
    pub fn points(&self) -> [Vec3; 4] {
        self.quad.points
    }

    /// Unit normal
    pub fn normal(&self) -> Vec3 {
        self.normal
    }
}

/// Collision shape variants, local to the collider center
#[derive(Debug, Clone)]
pub enum Shape {
    /// Sphere
    Sphere {
        /// Sphere radius
        radius: f32,
    },
    /// Upright capsule, or flat-capped cylinder when `cylinder` is set
    Capsule {
        /// Radius
        radius: f32,
        /// Half of the total height (caps included)
        half_height: f32,
        /// Treat the shape as a cylinder
        cylinder: bool,
    },
    /// Axis-aligned box
    Box {
        /// Half extents
        half_size: Vec3,
    },
    /// Box whose top and bottom faces are sheared along X with Z
    ShearedBox {
        /// Half extents before shearing
        half_size: Vec3,
        /// X shift of the +Z edge (the -Z edge moves the other way)
        shear_x: f32,
        /// Enabled faces
        faces: BoxFaces,
    },
    /// Floor patch with a height per corner
    Floor {
        /// Half extents on X and Z (Y is unused)
        half_size: Vec3,
        /// X shift of the +Z edge
        shear_x: f32,
        /// Corner heights: (-x,-z), (-x,+z), (+x,+z), (+x,-z)
        heights: [f32; 4],
    },
    /// One-sided quad
    Quad(QuadShape),
    /// Trimmed half-space
    Plane(PlaneShape),
    /// Character capsule used by dynamic bodies
    Character {
        /// Radius
        radius: f32,
        /// Half of the total height
        half_height: f32,
    },
}

impl Shape {
    /// Sphere shape
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius: radius.max(0.0) }
    }

    /// Upward-facing plane through the collider center
    pub fn ground() -> Self {
        Self::Plane(PlaneShape {
            normal: Vec3::y(),
            trim: Self::untrimmed(),
            bounds: AABB::new(Vec3::new(-PLANE_LIMIT, 0.0, -PLANE_LIMIT), Vec3::new(PLANE_LIMIT, 0.0, PLANE_LIMIT)),
        })
    }

    /// Plane with an arbitrary normal, trimmed to ±[`PLANE_LIMIT`]
    pub fn plane(normal: Vec3) -> CollisionResult<Self> {
        PlaneShape::new(normal, Self::untrimmed()).map(Self::Plane)
    }

    /// Plane trimmed to a local box; swapped corners are normalized
    pub fn plane_trimmed(normal: Vec3, trim_min: Vec3, trim_max: Vec3) -> CollisionResult<Self> {
        PlaneShape::new(normal, AABB::new(trim_min, trim_max)).map(Self::Plane)
    }

    /// Axis-aligned box
    pub fn cuboid(half_size: Vec3) -> Self {
        Self::Box { half_size: half_size.abs() }
    }

    /// Sheared box with a face mask
    pub fn sheared_box(half_size: Vec3, shear_x: f32, faces: BoxFaces) -> Self {
        Self::ShearedBox { half_size: half_size.abs(), shear_x, faces }
    }

    /// Capsule; the half height never drops below the radius
    pub fn capsule(radius: f32, half_height: f32) -> Self {
        let radius = radius.max(0.0);
        Self::Capsule { radius, half_height: half_height.max(radius), cylinder: false }
    }

    /// Flat-capped cylinder
    pub fn cylinder(radius: f32, half_height: f32) -> Self {
        Self::Capsule { radius: radius.max(0.0), half_height: half_height.max(0.0), cylinder: true }
    }

    /// Floor patch
    pub fn floor(half_size: Vec3, shear_x: f32, heights: [f32; 4]) -> Self {
        Self::Floor { half_size: half_size.abs(), shear_x, heights }
    }

    /// One-sided quad from four local points
    pub fn quad(points: [Vec3; 4]) -> CollisionResult<Self> {
        QuadShape::new(points).map(Self::Quad)
    }

    /// Character capsule; the half height never drops below the radius
    pub fn character(radius: f32, half_height: f32) -> Self {
        let radius = radius.max(0.0);
        Self::Character { radius, half_height: half_height.max(radius) }
    }

    /// Spherical character (capsule with half height equal to radius)
    pub fn character_sphere(radius: f32) -> Self {
        Self::character(radius, radius)
    }

    fn untrimmed() -> AABB {
        AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(PLANE_LIMIT))
    }

    /// Short name for logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Sphere { .. } => "sphere",
            Self::Capsule { cylinder: false, .. } => "capsule",
            Self::Capsule { cylinder: true, .. } => "cylinder",
            Self::Box { .. } => "box",
            Self::ShearedBox { .. } => "sheared box",
            Self::Floor { .. } => "floor",
            Self::Quad(_) => "quad",
            Self::Plane(_) => "plane",
            Self::Character { .. } => "character",
        }
    }

    /// Radius and half height of a character capsule
    pub fn character_dimensions(&self) -> Option<(f32, f32)> {
        match *self {
            Self::Character { radius, half_height } => Some((radius, half_height)),
            _ => None,
        }
    }

    /// Bounds relative to the collider center
    pub fn aabb_raw(&self) -> AABB {
        match self {
            Self::Sphere { radius } => AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(*radius)),
            Self::Capsule { radius, half_height, .. } | Self::Character { radius, half_height } => {
                AABB::from_center_extents(Vec3::zeros(), Vec3::new(*radius, *half_height, *radius))
            }
            Self::Box { half_size } => AABB::from_center_extents(Vec3::zeros(), *half_size),
            Self::ShearedBox { half_size, shear_x, .. } => {
                let e = Vec3::new(half_size.x + shear_x.abs(), half_size.y, half_size.z);
                AABB::from_center_extents(Vec3::zeros(), e)
            }
            Self::Floor { half_size, shear_x, heights } => {
                let lo = heights.iter().copied().fold(f32::INFINITY, f32::min);
                let hi = heights.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let hx = half_size.x + shear_x.abs();
                AABB::new(Vec3::new(-hx, lo, -half_size.z), Vec3::new(hx, hi, half_size.z))
            }
            Self::Quad(quad) => quad.bounds,
            Self::Plane(plane) => plane.bounds,
        }
    }

    /// Nearest ray hit against the shape centered at `center`
    pub fn ray_test(&self, center: Vec3, ray: &Ray) -> Option<ContactPoint> {
        match self {
            Self::Sphere { radius } => Sphere::new(center, *radius).intersect_ray(ray),
            Self::Capsule { radius, half_height, cylinder: true } => {
                VerticalCylinder { center, radius: *radius, half_height: *half_height }.intersect_ray_cylinder(ray)
            }
            Self::Capsule { radius, half_height, .. } | Self::Character { radius, half_height } => {
                VerticalCylinder { center, radius: *radius, half_height: half_height - radius }
                    .intersect_ray_capsule(ray)
            }
            Self::Box { half_size } => {
                let aabb = AABB::from_center_extents(center, *half_size);
                let (distance, normal) = aabb.intersect_ray(ray.origin, ray.direction)?;
                Some(ContactPoint { distance, point: ray.point_at(distance), normal })
            }
            Self::ShearedBox { half_size, shear_x, faces } => {
                sheared_faces(*half_size, *shear_x, *faces)
                    .map(|quad| Quad::new(quad.points.map(|p| p + center)).intersect_ray(ray))
                    .fold(None, ContactPoint::nearest)
            }
            Self::Floor { half_size, shear_x, heights } => {
                let quad = floor_quad(*half_size, *shear_x, heights);
                Quad::new(quad.points.map(|p| p + center)).intersect_ray(ray)
            }
            Self::Quad(shape) => {
                if shape.normal.dot(&ray.direction) >= 0.0 {
                    return None; // back side or parallel
                }
                let hit = plane_ray(center, shape.normal, ray)?;
                shape
                    .quad
                    .contains_coplanar_point(hit.point - center)
                    .then_some(hit)
            }
            Self::Plane(shape) => {
                if shape.normal.dot(&ray.direction) >= 0.0 {
                    return None;
                }
                let hit = plane_ray(center, shape.normal, ray)?;
                shape.trim.contains_point(hit.point - center).then_some(hit)
            }
        }
    }

    /// Sphere test against the shape centered at `center`
    ///
    /// Returns a contact when the ball surface reaches the shape, i.e. when the
    /// distance from `ball` to the shape surface is within `radius`.
    pub fn sphere_test(&self, center: Vec3, ball: Vec3, radius: f32) -> Option<SphereContact> {
        let local = ball - center;
        match self {
            Self::Sphere { radius: own } => {
                let len = local.magnitude();
                let distance = len - own;
                (distance < radius).then(|| SphereContact {
                    distance,
                    normal: normalize_safe(local).unwrap_or_else(Vec3::y),
                })
            }
            Self::Capsule { radius: own, half_height, cylinder: false }
            | Self::Character { radius: own, half_height } => {
                let axis = Vec3::new(0.0, half_height - own, 0.0);
                let (closest, _) = closest_point_on_segment(local, -axis, axis);
                let delta = local - closest;
                let distance = delta.magnitude() - own;
                (distance < radius).then(|| SphereContact {
                    distance,
                    normal: normalize_safe(delta).unwrap_or_else(Vec3::y),
                })
            }
            Self::Capsule { radius: own, half_height, cylinder: true } => {
                cylinder_contact(local, *own, *half_height).filter(|c| c.distance < radius)
            }
            Self::Box { half_size } => box_contact(local, *half_size, radius),
            Self::ShearedBox { half_size, shear_x, faces } => {
                sheared_box_contact(local, *half_size, *shear_x, *faces, radius)
            }
            Self::Floor { half_size, shear_x, heights } => {
                let quad = floor_quad(*half_size, *shear_x, heights);
                quad.triangles().iter().find_map(|tri| {
                    let normal = tri.normal()?;
                    tri.perpendicular_foot(local)?;
                    let distance = normal.dot(&(local - tri.v0));
                    (distance.abs() <= radius).then_some(SphereContact { distance, normal })
                })
            }
            Self::Quad(shape) => {
                let distance = shape.normal.dot(&(local - shape.quad.points[0]));
                let foot = local - shape.normal * distance;
                (distance.abs() <= radius && shape.quad.contains_coplanar_point(foot))
                    .then_some(SphereContact { distance, normal: shape.normal })
            }
            Self::Plane(shape) => {
                let distance = shape.normal.dot(&local);
                let foot = local - shape.normal * distance;
                // Trim box edges are not collided with
                (distance <= radius && shape.trim.contains_point(foot))
                    .then_some(SphereContact { distance, normal: shape.normal })
            }
        }
    }
}

fn plane_ray(point_on_plane: Vec3, normal: Vec3, ray: &Ray) -> Option<ContactPoint> {
    let denom = normal.dot(&ray.direction);
    if denom.abs() < f32::EPSILON {
        return None;
    }
    let t = normal.dot(&(point_on_plane - ray.origin)) / denom;
    if t < 0.0 {
        return None;
    }
    Some(ContactPoint { distance: t, point: ray.point_at(t), normal })
}

/// Eight corners of a sheared box: top 0..4 then bottom 4..8
///
/// ```text
///    1------------2
///   /|           /|
///  0------------3 |
///  | 5----------|-6
///  |/           |/
///  4------------7
/// ```
fn sheared_corners(h: Vec3, s: f32) -> [Vec3; 8] {
    let top = [
        Vec3::new(-h.x - s, h.y, -h.z),
        Vec3::new(-h.x + s, h.y, h.z),
        Vec3::new(h.x + s, h.y, h.z),
        Vec3::new(h.x - s, h.y, -h.z),
    ];
    let down = Vec3::new(0.0, 2.0 * h.y, 0.0);
    [top[0], top[1], top[2], top[3], top[0] - down, top[1] - down, top[2] - down, top[3] - down]
}

/// Enabled faces of a sheared box, wound so each normal points outward
fn sheared_faces(h: Vec3, s: f32, faces: BoxFaces) -> impl Iterator<Item = Quad> {
    let p = sheared_corners(h, s);
    [
        (BoxFaces::LEFT, [p[1], p[0], p[4], p[5]]),
        (BoxFaces::RIGHT, [p[3], p[2], p[6], p[7]]),
        (BoxFaces::FRONT, [p[0], p[3], p[7], p[4]]),
        (BoxFaces::BACK, [p[2], p[1], p[5], p[6]]),
        (BoxFaces::TOP, [p[0], p[1], p[2], p[3]]),
        (BoxFaces::BOTTOM, [p[7], p[6], p[5], p[4]]),
    ]
    .into_iter()
    .filter(move |(flag, _)| faces.contains(*flag))
    .map(|(_, points)| Quad::new(points))
}

fn floor_quad(h: Vec3, s: f32, heights: &[f32; 4]) -> Quad {
    Quad::new([
        Vec3::new(-h.x - s, heights[0], -h.z),
        Vec3::new(-h.x + s, heights[1], h.z),
        Vec3::new(h.x + s, heights[2], h.z),
        Vec3::new(h.x - s, heights[3], -h.z),
    ])
}

/// Face-region test: only the axis on which the ball is outside the box
/// while inside the other two slabs counts. Edge and corner regions miss.
fn box_contact(local: Vec3, half: Vec3, radius: f32) -> Option<SphereContact> {
    let d = local.abs();
    if (0..3).any(|i| d[i] > half[i] + radius) {
        return None;
    }
    (0..3).find_map(|axis| {
        let (i, j) = ((axis + 1) % 3, (axis + 2) % 3);
        if d[i] > half[i] || d[j] > half[j] {
            return None;
        }
        let mut normal = Vec3::zeros();
        normal[axis] = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
        Some(SphereContact { distance: d[axis] - half[axis], normal })
    })
}

fn sheared_box_contact(local: Vec3, h: Vec3, s: f32, faces: BoxFaces, radius: f32) -> Option<SphereContact> {
    let reach = Vec3::new(h.x + s.abs() + radius, h.y + radius, h.z + radius);
    let d = local.abs();
    if d.x > reach.x || d.y > reach.y || d.z > reach.z {
        return None;
    }

    // The face the ball is least inside of, among those whose interior
    // contains the perpendicular foot
    let face = sheared_faces(h, s, faces)
        .filter_map(|quad| {
            let normal = quad.normal()?;
            let distance = normal.dot(&(local - quad.points[0]));
            let foot = local - normal * distance;
            quad.contains_coplanar_point(foot).then_some(SphereContact { distance, normal })
        })
        .max_by(|a, b| a.distance.total_cmp(&b.distance));
    if let Some(contact) = face {
        return (contact.distance <= radius).then_some(contact);
    }

    // Vertical edges shared by two enabled side faces
    if d.y > h.y {
        return None;
    }
    let p = sheared_corners(h, s);
    let edges = [
        (BoxFaces::LEFT | BoxFaces::FRONT, p[0]),
        (BoxFaces::LEFT | BoxFaces::BACK, p[1]),
        (BoxFaces::RIGHT | BoxFaces::BACK, p[2]),
        (BoxFaces::RIGHT | BoxFaces::FRONT, p[3]),
    ];
    edges
        .iter()
        .filter(|(needed, _)| faces.contains(*needed))
        .filter_map(|(_, corner)| {
            let delta = Vec3::new(local.x - corner.x, 0.0, local.z - corner.z);
            let distance = delta.magnitude();
            let normal = normalize_safe(delta)?;
            (distance <= radius).then_some(SphereContact { distance, normal })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Signed distance from a point to a solid upright cylinder
fn cylinder_contact(local: Vec3, radius: f32, half_height: f32) -> Option<SphereContact> {
    let radial = local.x.hypot(local.z);
    let side = radial - radius;
    let cap = local.y.abs() - half_height;
    let up = Vec3::new(0.0, local.y.signum(), 0.0);
    let outward = if radial > f32::EPSILON {
        Vec3::new(local.x / radial, 0.0, local.z / radial)
    } else {
        up
    };

    if side <= 0.0 && cap <= 0.0 {
        // Inside: leave through the nearest surface
        return Some(if side > cap {
            SphereContact { distance: side, normal: outward }
        } else {
            SphereContact { distance: cap, normal: up }
        });
    }
    if side <= 0.0 {
        return Some(SphereContact { distance: cap, normal: up });
    }
    if cap <= 0.0 {
        return Some(SphereContact { distance: side, normal: outward });
    }
    // Rim region
    let rim = outward * radius + Vec3::new(0.0, local.y.signum() * half_height, 0.0);
    let delta = local - rim;
    normalize_safe(delta).map(|normal| SphereContact { distance: delta.magnitude(), normal })
}
