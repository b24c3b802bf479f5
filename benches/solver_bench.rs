//! Benchmarks for the world step.
//!
//! Run with: cargo bench
//!
//! The batched variants force the colored contact path regardless of size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use phys2d_solver::collision::{
    time_of_impact, Contact, DistanceProxy, Manifold, ManifoldPoint, ManifoldType, ToiInput,
};
use phys2d_solver::math::{Sweep, Transform, Vector2};
use phys2d_solver::{Material, PhysicsWorld, RigidBody, SolverConfig};

const DT: f32 = 1.0 / 60.0;
const RADIUS: f32 = 0.5;

/// Circles against circles, and circles against the top of the ground box
fn collide(contact: &Contact, xf_a: &Transform, xf_b: &Transform) -> Manifold {
    let proxy_a = contact.get_proxy_a();
    let proxy_b = contact.get_proxy_b();
    let total_radius = proxy_a.radius() + proxy_b.radius();
    let center_b = xf_b.transform_point(proxy_b.vertex(0));

    if proxy_a.vertex_count() == 1 {
        let center_a = xf_a.transform_point(proxy_a.vertex(0));
        if center_a.distance_squared(&center_b) > total_radius * total_radius {
            return Manifold::default();
        }
        return Manifold::circles(proxy_a.vertex(0), proxy_b.vertex(0));
    }

    let top = 0.5;
    if xf_a.inverse_transform_point(center_b).y - top > total_radius {
        return Manifold::default();
    }
    let mut manifold = Manifold::new(ManifoldType::FaceA, Vector2::unit_y(), Vector2::new(0.0, top));
    manifold.points[0] = ManifoldPoint::new(proxy_b.vertex(0), 0);
    manifold.point_count = 1;
    manifold
}

/// A pyramid of circles on a static ground with every neighboring pair in contact
fn pyramid(rows: usize, config: SolverConfig) -> PhysicsWorld {
    let mut world = PhysicsWorld::with_config(config);
    let ground = world.add_body(RigidBody::new_static(Vector2::new(0.0, -0.5)));
    let ground_proxy = DistanceProxy::boxed(100.0, 0.5);
    let circle = DistanceProxy::circle(Vector2::zero(), RADIUS);
    let material = Material::new(0.4, 0.0);

    let mut handles = Vec::new();
    for row in 0..rows {
        let count = rows - row;
        for i in 0..count {
            let x = (i as f32 - 0.5 * count as f32) * 2.0 * RADIUS + row as f32 * RADIUS;
            let y = RADIUS + row as f32 * 1.7 * RADIUS;
            let mut body = RigidBody::new_dynamic(Vector2::new(x, y));
            body.set_mass_data(1.0, Vector2::zero(), 0.5 * RADIUS * RADIUS);
            handles.push((world.add_body(body), Vector2::new(x, y)));
        }
    }

    for (i, &(a, pa)) in handles.iter().enumerate() {
        if pa.y < 1.5 * RADIUS {
            let contact = Contact::new(ground, a, ground_proxy.clone(), circle.clone())
                .with_materials(&material, &material);
            let _ = world.add_contact(contact);
        }
        for &(b, pb) in &handles[i + 1..] {
            if pa.distance(&pb) < 2.5 * RADIUS {
                let contact =
                    Contact::new(a, b, circle.clone(), circle.clone()).with_materials(&material, &material);
                let _ = world.add_contact(contact);
            }
        }
    }

    world
}

// ============================================================================
// World step
// ============================================================================

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    for &rows in &[10usize, 30] {
        let sequential = SolverConfig::default();
        let batched = SolverConfig {
            velocity_constraints_multithread_threshold: 0,
            position_constraints_multithread_threshold: 0,
            ..SolverConfig::default()
        };

        for (name, config) in [("sequential", sequential), ("batched", batched)] {
            group.bench_with_input(BenchmarkId::new(name, rows), &rows, |b, &rows| {
                let mut world = pyramid(rows, config.clone());
                let mut narrowphase = collide;
                b.iter(|| {
                    world.step(black_box(DT), &mut narrowphase).ok();
                });
            });
        }
    }

    group.finish();
}

// ============================================================================
// Time of impact
// ============================================================================

fn bench_time_of_impact(c: &mut Criterion) {
    let mut group = c.benchmark_group("time_of_impact");

    let circle = DistanceProxy::circle(Vector2::zero(), RADIUS);
    let square = DistanceProxy::boxed(RADIUS, RADIUS);
    let cases = [("circle_circle", &circle, &circle), ("box_box", &square, &square)];

    for (name, proxy_a, proxy_b) in cases {
        let mut sweep_b = Sweep::new(Vector2::zero(), Vector2::new(5.0, 0.3), 0.0);
        sweep_b.c = Vector2::new(-5.0, -0.3);
        sweep_b.a = 1.5;

        group.bench_function(name, |b| {
            b.iter(|| {
                time_of_impact(black_box(&ToiInput {
                    proxy_a,
                    proxy_b,
                    sweep_a: Sweep::new(Vector2::zero(), Vector2::zero(), 0.0),
                    sweep_b,
                    t_max: 1.0,
                }))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_step, bench_time_of_impact);
criterion_main!(benches);
