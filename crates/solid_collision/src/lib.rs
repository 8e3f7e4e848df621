//! # Solid Collision
//!
//! Solid-body collision and character movement for scene-graph games.
//!
//! ## Features
//!
//! - **Collider Shapes**: Spheres, capsules, cylinders, boxes, sheared boxes,
//!   floor patches, quads and trimmed planes
//! - **Character Controller**: Gravity, ground snapping, bouncing, sliding
//!   friction, step climbing and wall sliding with slip control
//! - **Body Filtering**: Group/mask bits, hierarchy exclusion and veto callbacks
//! - **Spatial Queries**: Ray casts, sphere casts, overlap and ground lookups
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use solid_collision::prelude::*;
//!
//! let mut scene = SceneTree::new();
//! let mut world = CollisionWorld::new();
//!
//! let ground = scene.spawn(Vec3::zeros());
//! world.attach_static(&scene, ground, Shape::ground());
//!
//! let player = scene.spawn(Vec3::new(0.0, 100.0, 0.0));
//! world.attach_dynamic(&scene, player, Shape::character(16.0, 32.0), Vec3::zeros());
//!
//! for _ in 0..60 {
//!     world.tick(&mut scene);
//! }
//! let grounded = world.descriptor(player).is_some_and(|d| d.is_grounded());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod error;
pub mod foundation;
pub mod physics;
pub mod scene;

pub use error::{CollisionError, CollisionResult};

/// Common imports for collision users
pub mod prelude {
    pub use crate::{
        config::{CollisionConfig, Config, DescriptorDefaults},
        error::{CollisionError, CollisionResult},
        foundation::math::{Vec3, AABB},
        physics::{
            BodyKind, CollisionCallbacks, CollisionGroups, CollisionWorld, Descriptor, GroundHit, RayHit,
            SharedCollisionWorld, Shape, SurfaceType, Veto, WallContact,
        },
        scene::{EntityId, SceneGraph, SceneTree},
    };
}
