//! Specialized collection types

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Generation-checked handle to a body owned by a collision world
    ///
    /// A handle held after its body was detached simply fails to resolve.
    pub struct BodyHandle;
}

/// Arena of bodies addressed by [`BodyHandle`]
pub type BodyArena<T> = SlotMap<BodyHandle, T>;
