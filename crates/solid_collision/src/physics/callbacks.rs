//! Hooks that let game logic observe and veto collision responses

use crate::foundation::math::Vec3;
use crate::scene::EntityId;

/// Whether a contact may go ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Veto {
    /// Resolve the contact normally
    #[default]
    Allow,
    /// Skip the contact
    Deny,
}

impl Veto {
    /// The contact was rejected
    pub fn is_denied(self) -> bool {
        self == Self::Deny
    }
}

/// Wall contact passed to [`CollisionCallbacks::on_wall_contact`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallContact {
    /// Point on the wall surface
    pub hit_point: Vec3,
    /// Wall normal, pointing toward the body
    pub normal: Vec3,
}

/// Collision event hooks
///
/// Every method has a no-op default. Hooks run synchronously inside
/// [`CollisionWorld::tick`](crate::physics::CollisionWorld::tick) and cannot
/// reach the world itself.
pub trait CollisionCallbacks: Send + Sync {
    /// Start of a tick, before any body moves
    fn on_update_start(&mut self) {}

    /// End of a tick, after positions have been written back
    fn on_update_end(&mut self) {}

    /// A dynamic body is about to land on a static one
    fn on_ground_contact(&mut self, _ground: EntityId, _body: EntityId) -> Veto {
        Veto::Allow
    }

    /// A dynamic body is pushed out of a wall; `new_pos` may be rewritten
    fn on_wall_contact(
        &mut self,
        _wall: EntityId,
        _body: EntityId,
        _contact: &WallContact,
        _old_pos: Vec3,
        _new_pos: &mut Vec3,
    ) -> Veto {
        Veto::Allow
    }

    /// Two dynamic bodies are within reach of each other
    fn on_dynamic_pair_filter(&mut self, _a: EntityId, _b: EntityId) -> Veto {
        Veto::Allow
    }

    /// Two dynamic bodies overlap; the response factors may be rewritten
    fn on_dynamic_pair_response(
        &mut self,
        _a: EntityId,
        _b: EntityId,
        _response_a: &mut f32,
        _response_b: &mut f32,
    ) {
    }
}
