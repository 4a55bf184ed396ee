//! Benchmarks for world stepping and queries.
//!
//! Run with: cargo bench --bench world_step

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rigidphys::prelude::*;

// =============================================================================
// Scene Generation
// =============================================================================

/// Column of boxes above a static floor.
fn stacked_world(count: usize) -> PhysicsWorld {
    let mut world = PhysicsWorld::default();
    let floor = CollisionShape::cuboid(Vec3::new(20.0, 0.5, 20.0)).unwrap();
    world
        .add_rigid_body(RigidBody::fixed(Some(floor.into_shared())).with_position(Vec3::new(0.0, -0.5, 0.0)))
        .unwrap();

    let cube = CollisionShape::cuboid(Vec3::splat(0.5)).unwrap().into_shared();
    for i in 0..count {
        let body = RigidBody::new(Some(cube.clone()), 1.0)
            .unwrap()
            .with_position(Vec3::new((i % 4) as f32 * 1.5, 1.0 + (i / 4) as f32 * 1.1, 0.0));
        world.add_rigid_body(body).unwrap();
    }
    world
}

/// Flat grid mesh of `n * n` quads centered on the origin.
fn grid_mesh(n: u32) -> CollisionShape {
    let mut vertices = Vec::new();
    for z in 0..=n {
        for x in 0..=n {
            vertices.push(Vec3::new(x as f32 - n as f32 * 0.5, 0.0, z as f32 - n as f32 * 0.5));
        }
    }
    let mut indices = Vec::new();
    for z in 0..n {
        for x in 0..n {
            let i = z * (n + 1) + x;
            indices.extend_from_slice(&[i, i + n + 1, i + 1, i + 1, i + n + 1, i + n + 2]);
        }
    }
    CollisionShape::triangle_mesh(vertices, indices).unwrap()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("Step");
    for count in [8usize, 32, 128] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut world = stacked_world(count);
            b.iter(|| world.step(black_box(1.0 / 60.0)).unwrap());
        });
    }
    group.finish();
}

fn bench_mesh_raycast(c: &mut Criterion) {
    let mut world = PhysicsWorld::default();
    let mesh = grid_mesh(64).into_shared();
    world
        .add_rigid_body(RigidBody::fixed(Some(mesh)))
        .unwrap();

    c.bench_function("raycast_mesh_64x64", |b| {
        let mut i = 0u32;
        b.iter(|| {
            i = i.wrapping_add(1);
            let x = (i % 60) as f32 - 30.0;
            let hit = world
                .raycast(Vec3::new(x, 10.0, 0.3), Vec3::new(x, -10.0, 0.3), -1)
                .unwrap();
            black_box(hit)
        });
    });
}

criterion_group!(benches, bench_step, bench_mesh_raycast);
criterion_main!(benches);
