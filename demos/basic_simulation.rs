//! Basic physics simulation example
//!
//! A ball falls past a floor while a character walks across it and a
//! pendulum swings from a world anchor. Run with `RUST_LOG=rigidphys=debug`
//! to see world events.

use rigidphys::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> PhysicsResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("rigidphys - Basic Simulation Example");
    println!("====================================\n");

    let mut world = PhysicsWorld::new(WorldConfig::default())?;

    // Static floor, top surface at Y=0
    let floor = CollisionShape::cuboid(Vec3::new(10.0, 0.5, 10.0))?;
    let floor = world.add_rigid_body(
        RigidBody::fixed(Some(floor.into_shared())).with_position(Vec3::new(0.0, -0.5, 0.0)),
    )?;
    println!("Created floor {floor}");

    let ball = CollisionShape::sphere(0.5)?;
    let ball = world.add_rigid_body(
        RigidBody::new(Some(ball.into_shared()), 1.0)?.with_position(Vec3::new(0.0, 5.0, 0.0)),
    )?;
    world.on_collision(move |contact| {
        if contact.involves(ball) {
            println!(
                "  contact {} <-> {} depth {:.3}",
                contact.object_a, contact.object_b, -contact.info.distance
            );
        }
    });

    let bob = CollisionShape::sphere(0.2)?;
    let bob = world.add_rigid_body(
        RigidBody::new(Some(bob.into_shared()), 1.0)?.with_position(Vec3::new(3.0, 4.0, 0.0)),
    )?;
    if let Some(body) = world.rigid_body(bob) {
        let joint = PointToPointConstraint::new(body, None, Vec3::new(-1.0, 0.0, 0.0), Vec3::new(2.0, 4.0, 0.0))?;
        world.add_constraint(joint)?;
    }

    let mut character = CharacterController::default_humanoid(Vec3::new(-4.0, 0.5, 0.0))?;
    character.set_walk_direction(Vec3::new(2.0, 0.0, 0.0));
    let character = world.add_character(character)?;

    let dt = 1.0 / 60.0;
    let total_time = 3.0;
    let steps = (total_time / dt) as usize;
    println!("Simulating {total_time} seconds ({steps} steps at {}Hz)...\n", 1.0 / dt);

    for i in 0..steps {
        world.step(dt)?;

        // Every half second
        if i % 30 == 0 {
            let t = world.simulation_time();
            if let Some(body) = world.rigid_body(ball) {
                let p = body.position();
                println!("t={t:.2}s: ball=({:.3}, {:.3}, {:.3})", p.x, p.y, p.z);
            }
            if let Some(body) = world.rigid_body(bob) {
                let p = body.position();
                println!("          bob=({:.3}, {:.3}, {:.3})", p.x, p.y, p.z);
            }
            if let Some(c) = world.character(character) {
                let p = c.position();
                println!(
                    "          character=({:.3}, {:.3}, {:.3}) grounded={}",
                    p.x,
                    p.y,
                    p.z,
                    c.on_ground()
                );
            }
        }
    }

    let hit = world.raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -10.0, 0.0), -1)?;
    if hit.has_hit {
        println!(
            "\nRay down the Y axis hit {:?} at ({:.3}, {:.3}, {:.3})",
            hit.hit_object, hit.hit_point.x, hit.hit_point.y, hit.hit_point.z
        );
    }

    world.dispose();
    Ok(())
}
