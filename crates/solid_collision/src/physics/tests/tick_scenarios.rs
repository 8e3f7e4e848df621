//! Whole-tick behavior: falling, landing, bouncing, walls and character pairs

use crate::foundation::logging;
use crate::foundation::math::Vec3;
use crate::physics::collision::Shape;
use crate::physics::collision_layers::CollisionGroups;
use crate::physics::world::CollisionWorld;
use crate::scene::{EntityId, SceneGraph, SceneTree};
use approx::assert_relative_eq;

fn scene_with_ground() -> (SceneTree, CollisionWorld, EntityId) {
    logging::init_for_tests();
    let mut scene = SceneTree::new();
    let mut world = CollisionWorld::new();
    let ground = scene.spawn(Vec3::zeros());
    world.attach_static(&scene, ground, Shape::ground());
    (scene, world, ground)
}

fn spawn_character(
    scene: &mut SceneTree,
    world: &mut CollisionWorld,
    position: Vec3,
    radius: f32,
    velocity: Vec3,
) -> EntityId {
    let entity = scene.spawn(position);
    world.attach_dynamic(&*scene, entity, Shape::character_sphere(radius), velocity);
    entity
}

fn y_of(scene: &SceneTree, entity: EntityId) -> f32 {
    scene.position(entity).map_or(f32::NAN, |p| p.y)
}

#[test]
fn test_falling_capsule_lands_on_plane() {
    let (mut scene, mut world, ground) = scene_with_ground();
    // Bottom 100 above the plane
    let body = spawn_character(&mut scene, &mut world, Vec3::new(0.0, 116.0, 0.0), 16.0, Vec3::zeros());
    world.descriptor_mut(body).unwrap().bounce = 0.0;

    let mut previous_altitude = None;
    let mut landed_at = None;
    for tick in 1..=200 {
        world.tick(&mut scene);
        let desc = world.descriptor(body).unwrap();
        if desc.ground.is_some() {
            landed_at = Some(tick);
            break;
        }
        previous_altitude = desc.altitude;
    }
    // Fallen 0.2 * n * (n - 1) after n ticks: 92.4 after 22, 101.2 after 23
    assert_eq!(landed_at, Some(23));
    // Airborne right up to the tick that crossed the surface
    assert_relative_eq!(previous_altitude.unwrap(), 7.6, epsilon = 1e-3);

    let desc = world.descriptor(body).unwrap();
    assert_eq!(desc.ground, Some(ground));
    assert_eq!(desc.altitude, Some(0.0));
    assert_relative_eq!(desc.velocity.y, 0.0);
    assert_relative_eq!(y_of(&scene, body) - 16.0, 0.0, epsilon = 1e-4);

    // Resting stays put
    for _ in 0..5 {
        world.tick(&mut scene);
    }
    assert_relative_eq!(y_of(&scene, body), 16.0, epsilon = 1e-4);
    assert_relative_eq!(world.velocity(body).unwrap().y, 0.0);
}

#[test]
fn test_descending_body_waits_for_contact() {
    let (mut scene, mut world, ground) = scene_with_ground();
    // Bottom 4.5 above the plane, sinking one unit per tick
    let body = spawn_character(&mut scene, &mut world, Vec3::new(0.0, 20.5, 0.0), 16.0, Vec3::new(0.0, -1.0, 0.0));
    {
        let desc = world.descriptor_mut(body).unwrap();
        desc.gravity = 0.0;
        desc.bounce = 0.0;
    }

    // Within snap height but still moving down: no snap yet
    world.tick(&mut scene);
    let desc = world.descriptor(body).unwrap();
    assert_eq!(desc.ground, None);
    assert_relative_eq!(desc.altitude.unwrap(), 3.5, epsilon = 1e-4);
    assert_relative_eq!(y_of(&scene, body), 19.5, epsilon = 1e-4);

    for _ in 0..3 {
        world.tick(&mut scene);
    }
    let desc = world.descriptor(body).unwrap();
    assert_eq!(desc.ground, None);
    assert_relative_eq!(desc.altitude.unwrap(), 0.5, epsilon = 1e-4);

    // The next tick crosses the surface and snaps back onto it
    world.tick(&mut scene);
    let desc = world.descriptor(body).unwrap();
    assert_eq!(desc.ground, Some(ground));
    assert_eq!(desc.altitude, Some(0.0));
    assert_relative_eq!(desc.velocity.y, 0.0);
    assert_relative_eq!(y_of(&scene, body), 16.0, epsilon = 1e-4);
}

#[test]
fn test_resting_body_snaps_within_snap_height() {
    let (mut scene, mut world, ground) = scene_with_ground();
    // Bottom 3 above the plane, not moving
    let body = spawn_character(&mut scene, &mut world, Vec3::new(0.0, 19.0, 0.0), 16.0, Vec3::zeros());
    world.descriptor_mut(body).unwrap().gravity = 0.0;

    world.tick(&mut scene);
    let desc = world.descriptor(body).unwrap();
    assert_eq!(desc.ground, Some(ground));
    assert_relative_eq!(y_of(&scene, body), 16.0, epsilon = 1e-4);
}

#[test]
fn test_exact_snap_height_is_not_snapped() {
    let (mut scene, mut world, _) = scene_with_ground();
    // Bottom exactly 4 above the plane
    let body = spawn_character(&mut scene, &mut world, Vec3::new(0.0, 20.0, 0.0), 16.0, Vec3::zeros());
    world.descriptor_mut(body).unwrap().gravity = 0.0;

    world.tick(&mut scene);
    let desc = world.descriptor(body).unwrap();
    assert_eq!(desc.ground, None);
    assert_relative_eq!(desc.altitude.unwrap(), 4.0, epsilon = 1e-4);
    assert_relative_eq!(y_of(&scene, body), 20.0);
}

#[test]
fn test_bounce_threshold_is_inclusive() {
    let (mut scene, mut world, _) = scene_with_ground();
    let body = spawn_character(&mut scene, &mut world, Vec3::new(0.0, 18.0, 0.0), 16.0, Vec3::new(0.0, -2.0, 0.0));
    {
        let desc = world.descriptor_mut(body).unwrap();
        desc.gravity = 0.0;
        desc.bounce = 0.5;
        desc.bounce_min_speed = 2.0;
    }

    world.tick(&mut scene);
    let desc = world.descriptor(body).unwrap();
    assert_relative_eq!(y_of(&scene, body), 16.0, epsilon = 1e-4);
    assert_relative_eq!(desc.velocity.y, 1.0, epsilon = 1e-5);
    assert_eq!(desc.bounce_count, 1);
}

#[test]
fn test_overlapping_characters_split_penetration() {
    logging::init_for_tests();
    let mut scene = SceneTree::new();
    let mut world = CollisionWorld::new();
    let a = scene.spawn(Vec3::zeros());
    let b = scene.spawn(Vec3::new(30.0, 0.0, 0.0));
    for entity in [a, b] {
        world.attach_dynamic(&scene, entity, Shape::character(20.0, 20.0), Vec3::zeros());
        world.descriptor_mut(entity).unwrap().gravity = 0.0;
    }

    world.tick(&mut scene);
    let pa = scene.position(a).unwrap();
    let pb = scene.position(b).unwrap();
    assert_relative_eq!(pa.x, -5.0, epsilon = 1e-3);
    assert_relative_eq!(pb.x, 35.0, epsilon = 1e-3);
    assert_relative_eq!(pa.z, 0.0, epsilon = 1e-3);
    assert_relative_eq!(pb.z, 0.0, epsilon = 1e-3);
    assert_eq!(world.descriptor(a).unwrap().hits, vec![b]);
    assert_eq!(world.descriptor(b).unwrap().hits, vec![a]);
}

#[test]
fn test_group_filter_keeps_pairs_apart() {
    let mut scene = SceneTree::new();
    let mut world = CollisionWorld::new();
    let a = scene.spawn(Vec3::zeros());
    let b = scene.spawn(Vec3::new(30.0, 0.0, 0.0));
    for entity in [a, b] {
        world.attach_dynamic(&scene, entity, Shape::character(20.0, 20.0), Vec3::zeros());
        world.descriptor_mut(entity).unwrap().gravity = 0.0;
    }
    world.set_group_bits(a, CollisionGroups::PLAYER);
    world.set_mask_bits(a, CollisionGroups::TERRAIN);
    world.set_group_bits(b, CollisionGroups::ENEMY);

    world.tick(&mut scene);
    assert_eq!(scene.position(a), Some(Vec3::zeros()));
    assert_eq!(scene.position(b), Some(Vec3::new(30.0, 0.0, 0.0)));
    assert!(world.descriptor(a).unwrap().hits.is_empty());
}

#[test]
fn test_parent_and_child_do_not_collide() {
    let mut scene = SceneTree::new();
    let mut world = CollisionWorld::new();
    let parent = scene.spawn(Vec3::zeros());
    let child = scene.spawn_child(parent, Vec3::new(10.0, 0.0, 0.0));
    for entity in [parent, child] {
        world.attach_dynamic(&scene, entity, Shape::character_sphere(16.0), Vec3::zeros());
        world.descriptor_mut(entity).unwrap().gravity = 0.0;
    }

    world.tick(&mut scene);
    assert_eq!(scene.position(parent), Some(Vec3::zeros()));
    assert_eq!(scene.position(child), Some(Vec3::new(10.0, 0.0, 0.0)));
}

#[test]
fn test_wall_rolls_back_horizontal_motion() {
    let mut scene = SceneTree::new();
    let mut world = CollisionWorld::new();
    let wall = scene.spawn(Vec3::new(100.0, 0.0, 0.0));
    world.attach_static(&scene, wall, Shape::plane(Vec3::new(-1.0, 0.0, 0.0)).unwrap());
    let body = spawn_character(&mut scene, &mut world, Vec3::new(84.0, 50.0, 0.0), 16.0, Vec3::new(10.0, 0.0, 0.0));

    let mut last_y = y_of(&scene, body);
    for tick in 0..3 {
        world.tick(&mut scene);
        let position = scene.position(body).unwrap();
        assert_relative_eq!(position.x, 84.0, epsilon = 1e-3);
        if tick > 0 {
            // Gravity keeps pulling while the wall holds
            assert!(position.y < last_y);
        }
        last_y = position.y;
        assert_eq!(world.descriptor(body).unwrap().hits, vec![wall]);
    }
    assert_relative_eq!(world.velocity(body).unwrap().y, -1.2, epsilon = 1e-5);
}

#[test]
fn test_slip_control_stops_glancing_slide() {
    let run = |slip_control: bool| {
        let mut scene = SceneTree::new();
        let mut world = CollisionWorld::new();
        let wall = scene.spawn(Vec3::new(100.0, 0.0, 0.0));
        world.attach_static(&scene, wall, Shape::plane(Vec3::new(-1.0, 0.0, 0.0)).unwrap());
        let body =
            spawn_character(&mut scene, &mut world, Vec3::new(84.0, 50.0, 0.0), 16.0, Vec3::new(10.0, 0.0, 5.0));
        let desc = world.descriptor_mut(body).unwrap();
        desc.gravity = 0.0;
        desc.slip_control = slip_control;
        desc.slip_limit_speed = 1.0;
        desc.slip_limit_degrees = 80.0;
        world.tick(&mut scene);
        scene.position(body).unwrap()
    };

    let free = run(false);
    assert_relative_eq!(free, Vec3::new(84.0, 50.0, 5.0), epsilon = 1e-3);
    // Deflection of about 63 degrees is below the limit: stop dead
    let held = run(true);
    assert_relative_eq!(held, Vec3::new(84.0, 50.0, 0.0), epsilon = 1e-3);
}

/// Vertical plane through `position` facing `normal`
fn spawn_wall(scene: &mut SceneTree, world: &mut CollisionWorld, position: Vec3, normal: Vec3) -> EntityId {
    let wall = scene.spawn(position);
    world.attach_static(&*scene, wall, Shape::plane(normal).unwrap());
    wall
}

/// A weightless ball inside a corner: walls at x = 100 and z = 100
fn corner_run(slip_control: bool) -> (Vec3, Vec<EntityId>, [EntityId; 2]) {
    let mut scene = SceneTree::new();
    let mut world = CollisionWorld::new();
    let east = spawn_wall(&mut scene, &mut world, Vec3::new(100.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
    let north = spawn_wall(&mut scene, &mut world, Vec3::new(0.0, 0.0, 100.0), Vec3::new(0.0, 0.0, -1.0));
    let body = spawn_character(&mut scene, &mut world, Vec3::new(84.0, 50.0, 80.0), 16.0, Vec3::new(10.0, 0.0, 10.0));
    {
        let desc = world.descriptor_mut(body).unwrap();
        desc.gravity = 0.0;
        desc.slip_control = slip_control;
        desc.slip_limit_speed = 1.0;
        desc.slip_limit_degrees = 80.0;
    }
    world.tick(&mut scene);
    let hits = world.descriptor(body).unwrap().hits.clone();
    (scene.position(body).unwrap(), hits, [east, north])
}

#[test]
fn test_corner_contacts_add_up() {
    // Moved to (94, 50, 90): the east wall pushes back 10, the north wall 6
    let (position, hits, [east, north]) = corner_run(false);
    assert_relative_eq!(position, Vec3::new(84.0, 50.0, 84.0), epsilon = 1e-3);
    assert_eq!(hits.len(), 2);
    assert!(hits.contains(&east) && hits.contains(&north));
}

#[test]
fn test_slip_control_with_several_walls() {
    // Net motion (0, 0, 4) is 45 degrees off the velocity: stop dead
    let (position, hits, _) = corner_run(true);
    assert_relative_eq!(position, Vec3::new(84.0, 50.0, 80.0), epsilon = 1e-3);
    assert_eq!(hits.len(), 2);
}

#[test]
fn test_wall_contacts_are_capped_per_tick() {
    let mut scene = SceneTree::new();
    let mut world = CollisionWorld::new();
    let walls: Vec<EntityId> = (0..6)
        .map(|_| spawn_wall(&mut scene, &mut world, Vec3::new(100.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)))
        .collect();
    let body = spawn_character(&mut scene, &mut world, Vec3::new(84.0, 50.0, 0.0), 16.0, Vec3::new(10.0, 0.0, 0.0));
    world.descriptor_mut(body).unwrap().gravity = 0.0;

    world.tick(&mut scene);
    let hits = &world.descriptor(body).unwrap().hits;
    assert_eq!(hits.len(), world.config().max_wall_hits);
    assert!(hits.iter().all(|hit| walls.contains(hit)));
    // Four identical pushes of 10 each, applied on top of each other
    assert_relative_eq!(scene.position(body).unwrap().x, 54.0, epsilon = 1e-3);
}

#[test]
fn test_single_wall_ignored_when_moving_away() {
    let mut scene = SceneTree::new();
    let mut world = CollisionWorld::new();
    let wall = spawn_wall(&mut scene, &mut world, Vec3::new(100.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
    // Already 6 inside the wall, backing out
    let body = spawn_character(&mut scene, &mut world, Vec3::new(90.0, 50.0, 0.0), 16.0, Vec3::new(-1.0, 0.0, 0.0));
    world.descriptor_mut(body).unwrap().gravity = 0.0;

    world.tick(&mut scene);
    assert_relative_eq!(scene.position(body).unwrap(), Vec3::new(89.0, 50.0, 0.0), epsilon = 1e-4);
    assert_eq!(world.descriptor(body).unwrap().hits, vec![wall]);

    // The same overlap while pushing in is resolved
    world.set_velocity(body, Vec3::new(1.0, 0.0, 0.0));
    world.tick(&mut scene);
    assert_relative_eq!(scene.position(body).unwrap().x, 84.0, epsilon = 1e-4);
}

#[test]
fn test_downward_ray_hits_box_before_plane() {
    let (mut scene, mut world, _) = scene_with_ground();
    let block = scene.spawn(Vec3::new(0.0, 15.0, 0.0));
    world.attach_static(&scene, block, Shape::cuboid(Vec3::new(10.0, 5.0, 10.0)));
    world.tick(&mut scene);

    let hit = world.raycast(Vec3::new(0.0, 100.0, 0.0), -Vec3::y(), 0.0).unwrap();
    assert_eq!(hit.entity, block);
    assert_relative_eq!(hit.point.y, 20.0, epsilon = 1e-4);
    assert_relative_eq!(hit.normal, Vec3::y());
}

#[test]
fn test_sleeping_body_does_not_move() {
    let (mut scene, mut world, _) = scene_with_ground();
    let start = Vec3::new(0.0, 50.0, 0.0);
    let body = spawn_character(&mut scene, &mut world, start, 8.0, Vec3::new(1.0, 0.0, 0.0));
    world.descriptor_mut(body).unwrap().sleep_time = 3;

    world.tick(&mut scene);
    assert_eq!(scene.position(body), Some(start));
    assert_eq!(world.descriptor(body).unwrap().sleep_time, 2);

    world.tick(&mut scene);
    world.tick(&mut scene);
    // Timer ran out at the start of the third tick
    assert_relative_eq!(scene.position(body).unwrap().x, 1.0);
}

#[test]
fn test_paused_body_keeps_position() {
    let (mut scene, mut world, _) = scene_with_ground();
    let start = Vec3::new(0.0, 50.0, 0.0);
    let body = spawn_character(&mut scene, &mut world, start, 8.0, Vec3::new(1.0, 0.0, 0.0));
    scene.set_paused(body, true);
    world.tick(&mut scene);
    assert_eq!(scene.position(body), Some(start));
    assert!(world.body(body).unwrap().is_paused_in_tree());
}

#[test]
fn test_attach_detach_round_trip() {
    let (mut scene, mut world, _) = scene_with_ground();
    spawn_character(&mut scene, &mut world, Vec3::new(0.0, 50.0, 0.0), 8.0, Vec3::zeros());
    world.tick(&mut scene);
    let before = (world.body_count(), world.collidable.len(), world.characters.len(), world.statics.len());

    let extra = spawn_character(&mut scene, &mut world, Vec3::new(100.0, 50.0, 0.0), 8.0, Vec3::zeros());
    world.tick(&mut scene);
    assert_eq!(world.collidable.len(), before.1 + 1);
    assert!(world.detach(extra));

    let after = (world.body_count(), world.collidable.len(), world.characters.len(), world.statics.len());
    assert_eq!(before, after);
    assert!(!world.is_attached(extra));
    world.tick(&mut scene);
}

#[test]
fn test_snap_to_ground_is_idempotent() {
    let (mut scene, mut world, ground) = scene_with_ground();
    let body = spawn_character(&mut scene, &mut world, Vec3::new(0.0, 6.0, 0.0), 8.0, Vec3::zeros());
    world.sync(&scene);

    assert!(world.snap_to_ground(&mut scene, body));
    let first = scene.position(body).unwrap();
    assert!(world.snap_to_ground(&mut scene, body));
    assert_eq!(scene.position(body).unwrap(), first);
    assert_relative_eq!(first.y, 0.0, epsilon = 1e-4);
    assert_eq!(world.descriptor(body).unwrap().ground, Some(ground));
}

#[test]
fn test_zero_radius_sphere_cast_is_a_ray_cast() {
    let (mut scene, mut world, _) = scene_with_ground();
    let block = scene.spawn(Vec3::new(0.0, 15.0, 0.0));
    world.attach_static(&scene, block, Shape::cuboid(Vec3::new(10.0, 5.0, 10.0)));
    world.sync(&scene);

    let origin = Vec3::new(2.0, 80.0, 1.0);
    let cast = world.sphere_cast(origin, 0.0, -Vec3::y(), 0.0);
    assert_eq!(cast, world.raycast(origin, -Vec3::y(), 0.0));
    assert_eq!(cast.map(|hit| hit.entity), Some(block));
}

#[test]
fn test_disabled_entity_is_inactive() {
    let (mut scene, mut world, _) = scene_with_ground();
    let start = Vec3::new(0.0, 50.0, 0.0);
    let body = spawn_character(&mut scene, &mut world, start, 8.0, Vec3::new(1.0, 0.0, 0.0));
    scene.set_enabled(body, false);
    world.tick(&mut scene);
    assert_eq!(scene.position(body), Some(start));
    assert!(!world.body(body).unwrap().is_collidable());
}
