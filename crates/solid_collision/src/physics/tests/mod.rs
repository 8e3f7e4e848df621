//! End-to-end tests of the collision pipeline against a [`SceneTree`](crate::scene::SceneTree)

mod tick_scenarios;
