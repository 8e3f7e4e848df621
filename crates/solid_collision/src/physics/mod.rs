//! Solid-body collision and character movement
//!
//! A [`CollisionWorld`] owns every collision body attached to a scene
//! entity. Each [`tick`](CollisionWorld::tick) integrates dynamic bodies,
//! pushes overlapping characters apart, resolves walls and ground against
//! static bodies and writes positions back to the scene. Between ticks the
//! world answers ray, sphere and ground queries.
//!
//! # Module Organization
//!
//! - [`collision`] - Shapes, colliders and narrow-phase tests
//! - [`collision_layers`] - Group and mask filtering
//! - [`body`] - Static and dynamic bodies with their motion descriptor
//! - [`callbacks`] - Hooks for vetoing or adjusting contacts
//! - [`world`] - Registration and per-entity settings
//! - [`collision_system`] - The per-tick pipeline
//! - [`query`] - Spatial queries
//! - [`shared`] - Lock-protected world for multi-threaded use

pub mod body;
pub mod callbacks;
pub mod collision;
pub mod collision_layers;
pub mod collision_system;
pub mod query;
pub mod shared;
pub mod world;

#[cfg(test)]
mod tests;

pub use body::{Body, BodyKind, Descriptor};
pub use callbacks::{CollisionCallbacks, Veto, WallContact};
pub use collision::{Collider, Ray, RayHit, Shape};
pub use collision_layers::CollisionGroups;
pub use query::{GroundHit, SurfaceType};
pub use shared::SharedCollisionWorld;
pub use world::{CollisionWorld, WALL_HEIGHT};
