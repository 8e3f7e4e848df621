//! Collision group and mask filtering
//!
//! Based on Game Engine Architecture 3rd Edition, Section 13.3.8:
//! "Most games need to filter collisions... This is typically done via
//! collision layers or groups."
//!
//! Every collider advertises a group (what it is) and every body advertises a
//! mask (what it wants to hit). Both sides have to agree before a pair is tested.

use bitflags::bitflags;

bitflags! {
    /// 32-bit collision group or mask bitfield
    ///
    /// Any bit pattern is valid; the named constants are conveniences.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollisionGroups: u32 {
        /// Default group for terrain and props
        const DEFAULT = 1 << 0;
        /// Player-controlled characters
        const PLAYER = 1 << 1;
        /// Non-player characters
        const ENEMY = 1 << 2;
        /// Static level geometry
        const TERRAIN = 1 << 3;
        /// Every group
        const ALL = u32::MAX;
    }
}

impl Default for CollisionGroups {
    fn default() -> Self {
        Self::ALL
    }
}

impl CollisionGroups {
    /// Build from raw bits, keeping bits without a named constant
    pub const fn from_raw(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }

    /// Check if two bodies should collide based on their groups and masks
    ///
    /// A's group must be in B's mask AND B's group must be in A's mask.
    pub fn should_collide(
        group_a: CollisionGroups,
        mask_a: CollisionGroups,
        group_b: CollisionGroups,
        mask_b: CollisionGroups,
    ) -> bool {
        group_a.intersects(mask_b) && group_b.intersects(mask_a)
    }

    /// Bit index of a single-bit group, or `None` if zero or several bits are set
    pub fn single_bit_index(self) -> Option<u32> {
        let bits = self.bits();
        if bits.count_ones() == 1 {
            Some(bits.trailing_zeros())
        } else {
            None
        }
    }
}
