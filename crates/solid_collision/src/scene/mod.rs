//! Scene graph collaborator
//!
//! The collision world consumes the entity hierarchy through the
//! [`SceneGraph`] trait: positions, enable/pause/visibility state and
//! ancestry. [`SceneTree`] is a minimal implementation for tools and tests.

mod scene_graph;

pub use scene_graph::{EntityId, SceneGraph, SceneTree};
