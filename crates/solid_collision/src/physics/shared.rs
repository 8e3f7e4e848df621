//! Thread-shareable collision world
//!
//! Writers (`tick`, registration, setters) take the write lock, queries take
//! the read lock. A completed tick happens-before every query that acquires
//! the lock after it.

use crate::error::{CollisionError, CollisionResult};
use crate::foundation::math::Vec3;
use crate::physics::body::Descriptor;
use crate::physics::collision::RayHit;
use crate::physics::world::CollisionWorld;
use crate::scene::{EntityId, SceneGraph};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cloneable handle to a [`CollisionWorld`] behind a read-write lock
#[derive(Debug, Clone, Default)]
pub struct SharedCollisionWorld {
    inner: Arc<RwLock<CollisionWorld>>,
}

impl SharedCollisionWorld {
    /// Wrap a world for sharing
    pub fn new(world: CollisionWorld) -> Self {
        Self {
            inner: Arc::new(RwLock::new(world)),
        }
    }

    /// Acquire the read lock
    pub fn read(&self) -> CollisionResult<RwLockReadGuard<'_, CollisionWorld>> {
        self.inner.read().map_err(|_| CollisionError::LockPoisoned)
    }

    /// Acquire the write lock
    pub fn write(&self) -> CollisionResult<RwLockWriteGuard<'_, CollisionWorld>> {
        self.inner.write().map_err(|_| CollisionError::LockPoisoned)
    }

    /// Run one tick under the write lock
    pub fn tick(&self, scene: &mut impl SceneGraph) -> CollisionResult<()> {
        self.write()?.tick(scene);
        Ok(())
    }

    /// Nearest static hit of a ray, under the read lock
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> CollisionResult<Option<RayHit>> {
        Ok(self.read()?.raycast(origin, direction, max_distance))
    }

    /// Copy of the motion descriptor of a dynamic body
    pub fn descriptor(&self, entity: EntityId) -> CollisionResult<Descriptor> {
        self.read()?
            .descriptor(entity)
            .cloned()
            .ok_or(CollisionError::UnknownEntity(entity))
    }
}
