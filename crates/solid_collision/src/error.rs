//! Error types for the collision world
//!
//! Misuse errors are returned from the `try_*` entry points. The convenience
//! wrappers log them with `log::error!` and leave the world unchanged.

use crate::config::ConfigError;
use crate::foundation::math::Vec3;
use crate::scene::EntityId;
use thiserror::Error;

/// Collision-level errors
#[derive(Error, Debug)]
pub enum CollisionError {
    /// The entity already carries a body of the other kind
    #[error("entity {entity} already has an incompatible {existing} body attached")]
    IncompatibleBody {
        /// Entity the attach was requested for
        entity: EntityId,
        /// Kind of the body that is already attached
        existing: &'static str,
    },

    /// A plane, quad or wall normal could not be normalized
    #[error("degenerate normal vector ({}, {}, {})", .0.x, .0.y, .0.z)]
    DegenerateNormal(Vec3),

    /// Group bits used as a group name key must contain exactly one set bit
    #[error("invalid group bit 0x{0:08X}: expected a single non-zero bit")]
    InvalidGroupBit(u32),

    /// No body is attached to the entity
    #[error("no collision body attached to entity {0}")]
    UnknownEntity(EntityId),

    /// A thread panicked while holding the shared world lock
    #[error("collision world lock poisoned")]
    LockPoisoned,

    /// Configuration failed to load
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias for collision operations
pub type CollisionResult<T> = Result<T, CollisionError>;
