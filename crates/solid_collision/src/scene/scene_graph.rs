//! Scene graph interface consumed by the collision world
//!
//! The collision world never owns entities. It reads positions and hierarchy
//! state through [`SceneGraph`] and writes resolved positions back through it.

use crate::foundation::math::Vec3;
use std::collections::HashMap;
use std::fmt;

/// Stable entity identifier used as the registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Get the raw id
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Trait for the entity hierarchy the collision world runs against
///
/// Positions are world-space. Unknown entities report `None` and `false`.
pub trait SceneGraph {
    /// World position of an entity
    fn position(&self, entity: EntityId) -> Option<Vec3>;

    /// Move an entity to a world position
    fn set_position(&mut self, entity: EntityId, position: Vec3);

    /// Entity and all of its ancestors are enabled
    fn is_enabled_in_tree(&self, entity: EntityId) -> bool;

    /// Entity or any of its ancestors is paused
    fn is_paused_in_tree(&self, entity: EntityId) -> bool;

    /// Entity and all of its ancestors are visible
    fn is_visible_in_tree(&self, entity: EntityId) -> bool;

    /// `ancestor` is a (transitive) parent of `descendant`
    fn is_ancestor_of(&self, ancestor: EntityId, descendant: EntityId) -> bool;
}

#[derive(Debug, Clone)]
struct SceneNode {
    position: Vec3,
    parent: Option<EntityId>,
    enabled: bool,
    paused: bool,
    visible: bool,
}

/// Simple map-based scene tree
///
/// Sufficient for tests, tools and small games. Positions are stored in world
/// space; moving a parent does not move its children.
#[derive(Debug, Default)]
pub struct SceneTree {
    nodes: HashMap<EntityId, SceneNode>,
    next_id: u32,
}

impl SceneTree {
    /// Create a new empty scene tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a root entity at a world position
    pub fn spawn(&mut self, position: Vec3) -> EntityId {
        self.spawn_node(position, None)
    }

    /// Spawn an entity under `parent`
    pub fn spawn_child(&mut self, parent: EntityId, position: Vec3) -> EntityId {
        self.spawn_node(position, Some(parent))
    }

    fn spawn_node(&mut self, position: Vec3, parent: Option<EntityId>) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, SceneNode {
            position,
            parent,
            enabled: true,
            paused: false,
            visible: true,
        });
        id
    }

    /// Remove an entity; its children become roots
    pub fn despawn(&mut self, entity: EntityId) {
        let parent = self.nodes.remove(&entity).and_then(|node| node.parent);
        for node in self.nodes.values_mut() {
            if node.parent == Some(entity) {
                node.parent = parent;
            }
        }
    }

    /// Enable or disable an entity (and implicitly its subtree)
    pub fn set_enabled(&mut self, entity: EntityId, enabled: bool) {
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.enabled = enabled;
        }
    }

    /// Pause or resume an entity (and implicitly its subtree)
    pub fn set_paused(&mut self, entity: EntityId, paused: bool) {
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.paused = paused;
        }
    }

    /// Show or hide an entity (and implicitly its subtree)
    pub fn set_visible(&mut self, entity: EntityId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.visible = visible;
        }
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// No entities spawned
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk from `entity` to the root; true if every node satisfies `pred`
    fn all_in_chain(&self, entity: EntityId, pred: impl Fn(&SceneNode) -> bool) -> bool {
        let mut current = Some(entity);
        let mut found = false;
        while let Some(id) = current {
            let Some(node) = self.nodes.get(&id) else { break };
            if !pred(node) {
                return false;
            }
            found = true;
            current = node.parent;
        }
        found
    }
}

impl SceneGraph for SceneTree {
    fn position(&self, entity: EntityId) -> Option<Vec3> {
        self.nodes.get(&entity).map(|node| node.position)
    }

    fn set_position(&mut self, entity: EntityId, position: Vec3) {
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.position = position;
        }
    }

    fn is_enabled_in_tree(&self, entity: EntityId) -> bool {
        self.all_in_chain(entity, |node| node.enabled)
    }

    fn is_paused_in_tree(&self, entity: EntityId) -> bool {
        self.nodes.contains_key(&entity) && !self.all_in_chain(entity, |node| !node.paused)
    }

    fn is_visible_in_tree(&self, entity: EntityId) -> bool {
        self.all_in_chain(entity, |node| node.visible)
    }

    fn is_ancestor_of(&self, ancestor: EntityId, descendant: EntityId) -> bool {
        let mut current = self.nodes.get(&descendant).and_then(|node| node.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|node| node.parent);
        }
        false
    }
}
