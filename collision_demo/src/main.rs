//! Collision World Demo
//!
//! Runs a small scene headless and logs what the characters do:
//! - A ground plane with a low step and a tall crate on it
//! - A wall closing off the right side
//! - Two characters walking into each other, one of them toward the wall
//!
//! Usage: `collision_demo [config.toml|config.ron]`

use log::{info, warn};
use solid_collision::foundation::logging;
use solid_collision::prelude::*;

const TICKS: u32 = 120;
const REPORT_EVERY: u32 = 20;

/// Logs wall contacts as they happen
struct ContactLogger;

impl CollisionCallbacks for ContactLogger {
    fn on_wall_contact(
        &mut self,
        wall: EntityId,
        body: EntityId,
        contact: &WallContact,
        _old_pos: Vec3,
        _new_pos: &mut Vec3,
    ) -> Veto {
        info!(
            "{} touches wall {} at ({:.1}, {:.1}, {:.1})",
            body, wall, contact.hit_point.x, contact.hit_point.y, contact.hit_point.z
        );
        Veto::Allow
    }
}

fn build_world() -> Result<CollisionWorld, CollisionError> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading collision config from {}", path);
            CollisionWorld::from_config_file(&path)
        }
        None => Ok(CollisionWorld::new()),
    }
}

fn report(world: &CollisionWorld, scene: &SceneTree, name: &str, entity: EntityId) {
    let Some(position) = scene.position(entity) else {
        warn!("{} has no position", name);
        return;
    };
    let Some(desc) = world.descriptor(entity) else {
        return;
    };
    let altitude = desc.altitude.map_or_else(|| "-".to_owned(), |a| format!("{a:.2}"));
    let ground = desc.ground.map_or_else(|| "none".to_owned(), |g| g.to_string());
    info!(
        "  {:<6} pos ({:7.2}, {:7.2}, {:7.2})  vel.y {:6.2}  altitude {:>6}  ground {}  hits {}",
        name,
        position.x,
        position.y,
        position.z,
        desc.velocity.y,
        altitude,
        ground,
        desc.hits.len()
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let mut world = build_world()?;
    let mut scene = SceneTree::new();

    // Terrain
    let ground = scene.spawn(Vec3::zeros());
    world.attach_static(&scene, ground, Shape::ground());
    let step = scene.spawn(Vec3::new(-60.0, 4.0, 0.0));
    world.attach_static(&scene, step, Shape::cuboid(Vec3::new(20.0, 4.0, 40.0)));
    let crate_box = scene.spawn(Vec3::new(0.0, 15.0, 120.0));
    world.attach_static(&scene, crate_box, Shape::cuboid(Vec3::new(10.0, 15.0, 10.0)));
    let wall = scene.spawn(Vec3::zeros());
    world.attach_wall(&mut scene, wall, 150.0, 200.0, 150.0, -200.0);

    world.set_group_name(CollisionGroups::PLAYER, "player");
    world.set_group_name(CollisionGroups::ENEMY, "enemy");

    // Characters
    let hero = scene.spawn(Vec3::new(-100.0, 60.0, 0.0));
    world.attach_dynamic(&scene, hero, Shape::character(16.0, 24.0), Vec3::new(2.5, 0.0, 0.0));
    world.set_group_bits(hero, CollisionGroups::PLAYER);

    let rival = scene.spawn(Vec3::new(60.0, 40.0, 0.0));
    world.attach_dynamic(&scene, rival, Shape::character(16.0, 24.0), Vec3::new(-1.0, 0.0, 0.0));
    world.set_group_bits(rival, CollisionGroups::ENEMY);

    world.set_callbacks(Box::new(ContactLogger));
    info!("Simulating {} ticks with {} bodies", TICKS, world.body_count());

    for tick in 1..=TICKS {
        world.tick(&mut scene);

        // Once both have landed, send the rival toward the wall
        if tick == 60 {
            world.set_velocity(rival, Vec3::new(3.0, 0.0, 0.0));
        }

        if tick % REPORT_EVERY == 0 {
            info!("Tick {}", tick);
            report(&world, &scene, "hero", hero);
            report(&world, &scene, "rival", rival);
        }
    }

    let probe = Vec3::new(0.0, 100.0, 120.0);
    match world.raycast(probe, -Vec3::y(), 0.0) {
        Some(hit) => info!("Ray down from the crate column hits {} at y = {:.2}", hit.entity, hit.point.y),
        None => info!("Ray down from the crate column hits nothing"),
    }
    if let Some(hit) = world.sphere_cast(Vec3::new(-100.0, 20.0, 0.0), 8.0, Vec3::x(), 0.0) {
        info!("Sphere cast toward the wall stops at x = {:.2} ({})", hit.point.x, hit.entity);
    }
    if let Some(altitude) = world.dynamic_body_altitude(hero) {
        info!("Hero altitude: {:.2}", altitude);
    }
    info!(
        "Groups: {} / {}",
        world.group_name(CollisionGroups::PLAYER).unwrap_or("?"),
        world.group_name(CollisionGroups::ENEMY).unwrap_or("?")
    );
    Ok(())
}
