//! Collider shapes and narrow-phase tests
//!
//! Shapes are stored in local coordinates relative to the collider center and
//! moved to world space only during tests, by adding the entity position.
//!
//! # Module Organization
//!
//! - [`primitives`] - Rays, spheres, triangles, quads and upright cylinders
//! - [`shape`] - The closed set of collider shapes
//! - [`collider`] - A shape with offset, enable flag and group bits

pub mod collider;
pub mod primitives;
pub mod shape;

pub use collider::{Collider, SphereProbe, SphereResolution};
pub use primitives::{ContactPoint, Ray, RayHit};
pub use shape::{BoxFaces, PlaneShape, QuadShape, Shape, SphereContact, PLANE_LIMIT};
