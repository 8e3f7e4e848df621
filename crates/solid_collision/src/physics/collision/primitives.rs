//! Primitive geometry and intersection algorithms
//!
//! Rays, spheres, triangles, quads and vertical capsules/cylinders. Every
//! collider shape is assembled from these.

use crate::foundation::math::{normalize_safe, Vec3, NORMALIZE_EPSILON};
use crate::scene::EntityId;

/// A ray for ray casting and ground probes
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray, or `None` if `direction` has no usable length
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        normalize_safe(direction).map(|direction| Self { origin, direction })
    }

    /// Straight-down ray used by ground probes
    pub fn down(origin: Vec3) -> Self {
        Self {
            origin,
            direction: Vec3::new(0.0, -1.0, 0.0),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a ray query against the world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The entity whose collider was hit
    pub entity: EntityId,
    /// The distance from the ray origin to the hit point
    pub distance: f32,
    /// The point of intersection in world space
    pub point: Vec3,
    /// The surface normal at the intersection point
    pub normal: Vec3,
}

/// Hit point on a single shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// Distance along the ray
    pub distance: f32,
    /// World-space hit point
    pub point: Vec3,
    /// Surface normal at the hit point
    pub normal: Vec3,
}

impl ContactPoint {
    fn on_ray(ray: &Ray, distance: f32, normal: Vec3) -> Self {
        Self {
            distance,
            point: ray.point_at(distance),
            normal,
        }
    }

    /// Keep whichever of two optional hits is nearer
    pub fn nearest(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if b.distance < a.distance { b } else { a }),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

/// A sphere primitive
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Test ray intersection with this sphere (entry point only)
    pub fn intersect_ray(&self, ray: &Ray) -> Option<ContactPoint> {
        // Solve: |origin + t*direction - center|^2 = radius^2 with |direction| = 1
        let oc = ray.origin - self.center;
        let b = oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let t = -b - discriminant.sqrt();
        if t < 0.0 {
            return None; // behind the origin, or the origin is inside
        }
        let point = ray.point_at(t);
        let normal = normalize_safe(point - self.center).unwrap_or_else(|| -ray.direction);
        Some(ContactPoint { distance: t, point, normal })
    }
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Unit normal by the right-hand rule, `None` for a degenerate triangle
    pub fn normal(&self) -> Option<Vec3> {
        normalize_safe((self.v1 - self.v0).cross(&(self.v2 - self.v0)))
    }

    /// Möller-Trumbore ray-triangle intersection
    ///
    /// Two-sided; the reported normal is the wound normal of the triangle.
    /// See: "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore
    pub fn intersect_ray(&self, ray: &Ray) -> Option<ContactPoint> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);
        if a.abs() < NORMALIZE_EPSILON {
            return None; // parallel
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        if t < 0.0 {
            return None;
        }
        let normal = self.normal()?;
        Some(ContactPoint::on_ray(ray, t, normal))
    }

    /// Foot of the perpendicular from `point` onto the triangle plane,
    /// if that foot lies inside the triangle
    pub fn perpendicular_foot(&self, point: Vec3) -> Option<Vec3> {
        let normal = self.normal()?;
        let foot = point - normal * normal.dot(&(point - self.v0));
        self.contains_coplanar_point(foot).then_some(foot)
    }

    /// Barycentric inside test for a point already on the triangle plane
    pub fn contains_coplanar_point(&self, p: Vec3) -> bool {
        let e0 = self.v1 - self.v0;
        let e1 = self.v2 - self.v0;
        let ep = p - self.v0;
        let d00 = e0.dot(&e0);
        let d01 = e0.dot(&e1);
        let d11 = e1.dot(&e1);
        let dp0 = ep.dot(&e0);
        let dp1 = ep.dot(&e1);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() < f32::EPSILON {
            return false;
        }
        let v = (d11 * dp0 - d01 * dp1) / denom;
        let w = (d00 * dp1 - d01 * dp0) / denom;
        const TOLERANCE: f32 = 1.0e-5;
        v >= -TOLERANCE && w >= -TOLERANCE && v + w <= 1.0 + TOLERANCE
    }
}

/// Quad made of two triangles (q0,q1,q2) and (q2,q3,q0)
#[derive(Debug, Clone, Copy)]
pub struct Quad {
    /// Corner points, wound so the first triangle's normal faces outward
    pub points: [Vec3; 4],
}

impl Quad {
    /// Creates a quad from four corner points
    pub fn new(points: [Vec3; 4]) -> Self {
        Self { points }
    }

    /// The two triangles of the quad
    pub fn triangles(&self) -> [Triangle; 2] {
        let [q0, q1, q2, q3] = self.points;
        [Triangle::new(q0, q1, q2), Triangle::new(q2, q3, q0)]
    }

    /// Unit normal of the first triangle
    pub fn normal(&self) -> Option<Vec3> {
        self.triangles()[0].normal()
    }

    /// Nearest ray hit on either triangle
    pub fn intersect_ray(&self, ray: &Ray) -> Option<ContactPoint> {
        let [a, b] = self.triangles();
        ContactPoint::nearest(a.intersect_ray(ray), b.intersect_ray(ray))
    }

    /// Perpendicular distance from `point` to the quad, if its foot lands inside
    pub fn perpendicular_distance(&self, point: Vec3) -> Option<f32> {
        self.triangles()
            .iter()
            .find_map(|tri| tri.perpendicular_foot(point))
            .map(|foot| (foot - point).magnitude())
    }

    /// Inside test for a point on the quad plane
    pub fn contains_coplanar_point(&self, p: Vec3) -> bool {
        self.triangles().iter().any(|tri| tri.contains_coplanar_point(p))
    }
}

/// Where the closest point of a segment fell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentZone {
    /// Before the start point
    Start,
    /// Strictly between the end points
    Inner,
    /// Past the end point
    End,
}

/// Closest point on segment `a`-`b` to `p`, and which zone it lies in
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, SegmentZone) {
    let ab = b - a;
    let len_sq = ab.magnitude_squared();
    if len_sq < f32::EPSILON {
        return (a, SegmentZone::Start);
    }
    let t = (p - a).dot(&ab) / len_sq;
    if t <= 0.0 {
        (a, SegmentZone::Start)
    } else if t >= 1.0 {
        (b, SegmentZone::End)
    } else {
        (a + ab * t, SegmentZone::Inner)
    }
}

/// Upright cylinder or capsule around the vertical axis through `center`
#[derive(Debug, Clone, Copy)]
pub struct VerticalCylinder {
    /// Center of the shape
    pub center: Vec3,
    /// Radius of the side wall
    pub radius: f32,
    /// Half of the side wall height
    pub half_height: f32,
}

impl VerticalCylinder {
    /// Entry hit on the side wall, limited to the wall's height band
    fn intersect_side(&self, ray: &Ray) -> Option<ContactPoint> {
        let o = ray.origin - self.center;
        let d = ray.direction;
        let a = d.x * d.x + d.z * d.z;
        if a < NORMALIZE_EPSILON {
            return None; // vertical ray never enters the side wall
        }
        let b = o.x * d.x + o.z * d.z;
        let c = o.x * o.x + o.z * o.z - self.radius * self.radius;
        let discriminant = b * b - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let t = (-b - discriminant.sqrt()) / a;
        if t < 0.0 {
            return None;
        }
        let point = ray.point_at(t);
        let local_y = point.y - self.center.y;
        if local_y.abs() > self.half_height {
            return None;
        }
        let normal = Vec3::new(point.x - self.center.x, 0.0, point.z - self.center.z) / self.radius;
        Some(ContactPoint { distance: t, point, normal })
    }

    /// Ray against a capsule whose cap spheres sit at ±`half_height`
    pub fn intersect_ray_capsule(&self, ray: &Ray) -> Option<ContactPoint> {
        let up = Vec3::new(0.0, self.half_height, 0.0);
        let mut hit = self.intersect_side(ray);
        let caps = [
            (Sphere::new(self.center + up, self.radius), 1.0_f32),
            (Sphere::new(self.center - up, self.radius), -1.0_f32),
        ];
        for (sphere, side) in caps {
            if let Some(cap) = sphere.intersect_ray(ray) {
                // Cap hits only count on the outer hemisphere
                if (cap.point.y - sphere.center.y) * side >= 0.0 {
                    hit = ContactPoint::nearest(hit, Some(cap));
                }
            }
        }
        hit
    }

    /// Ray against a flat-capped cylinder
    pub fn intersect_ray_cylinder(&self, ray: &Ray) -> Option<ContactPoint> {
        let mut hit = self.intersect_side(ray);
        let d = ray.direction;
        if d.y.abs() >= NORMALIZE_EPSILON {
            // Entering through the top when moving down, the bottom when moving up
            let side = if d.y < 0.0 { 1.0 } else { -1.0 };
            let cap_y = self.center.y + side * self.half_height;
            let t = (cap_y - ray.origin.y) / d.y;
            if t >= 0.0 {
                let point = ray.point_at(t);
                let dx = point.x - self.center.x;
                let dz = point.z - self.center.z;
                if dx * dx + dz * dz <= self.radius * self.radius {
                    let cap = ContactPoint { distance: t, point, normal: Vec3::new(0.0, side, 0.0) };
                    hit = ContactPoint::nearest(hit, Some(cap));
                }
            }
        }
        hit
    }
}
