mod common;

use approx::assert_relative_eq;
use common::{add_circle, collide_shapes, connect, weightless_world};
use phys2d_solver::collision::{
    compute_distance, time_of_impact, DistanceInput, DistanceProxy, SimplexCache, ToiInput, ToiState,
};
use phys2d_solver::core::settings::LINEAR_SLOP;
use phys2d_solver::math::{Sweep, Vector2};
use phys2d_solver::{Material, PhysicsWorld, RigidBody, SolverConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DT: f32 = 1.0 / 60.0;

fn moving_sweep(from: Vector2, to: Vector2) -> Sweep {
    let mut sweep = Sweep::new(Vector2::zero(), from, 0.0);
    sweep.c = to;
    sweep
}

#[test]
fn test_time_of_impact_grows_with_distance() {
    let a = DistanceProxy::circle(Vector2::zero(), 0.5);
    let b = DistanceProxy::circle(Vector2::zero(), 0.5);
    let target = a.radius() + b.radius() - 3.0 * LINEAR_SLOP;

    let mut previous = 0.0;
    for start in [2.0, 3.0, 4.5, 6.0, 8.0] {
        let output = time_of_impact(&ToiInput {
            proxy_a: &a,
            proxy_b: &b,
            sweep_a: Sweep::new(Vector2::zero(), Vector2::zero(), 0.0),
            sweep_b: moving_sweep(Vector2::new(start, 0.0), Vector2::new(start - 10.0, 0.0)),
            t_max: 1.0,
        });

        assert_eq!(output.state, ToiState::Touching);
        assert!(output.t > previous);
        assert_relative_eq!(10.0 * output.t, start - target, epsilon = 1e-2);
        previous = output.t;
    }
}

#[test]
fn test_time_of_impact_respects_t_max() {
    let a = DistanceProxy::circle(Vector2::zero(), 0.5);
    let b = DistanceProxy::circle(Vector2::zero(), 0.5);

    let output = time_of_impact(&ToiInput {
        proxy_a: &a,
        proxy_b: &b,
        sweep_a: Sweep::new(Vector2::zero(), Vector2::zero(), 0.0),
        sweep_b: moving_sweep(Vector2::new(8.0, 0.0), Vector2::new(-2.0, 0.0)),
        t_max: 0.5,
    });

    assert_eq!(output.state, ToiState::Separated);
    assert_eq!(output.t, 0.5);
}

#[test]
fn test_time_of_impact_never_passes_target() {
    let mut rng = StdRng::seed_from_u64(11);
    let proxy = DistanceProxy::boxed(0.5, 0.25);
    let target = LINEAR_SLOP.max(2.0 * proxy.radius() - 3.0 * LINEAR_SLOP);
    let tolerance = 0.25 * LINEAR_SLOP;

    for _ in 0..100 {
        let mut sweep_a = Sweep::new(Vector2::zero(), Vector2::zero(), rng.gen_range(-0.3..0.3));
        sweep_a.a = sweep_a.a0 + rng.gen_range(-0.3..0.3);

        let mut sweep_b = Sweep::new(
            Vector2::zero(),
            Vector2::new(rng.gen_range(2.0..4.0), rng.gen_range(-1.0..1.0)),
            rng.gen_range(-0.3..0.3),
        );
        sweep_b.c = Vector2::new(rng.gen_range(-4.0..-2.0), rng.gen_range(-1.0..1.0));
        sweep_b.a = sweep_b.a0 + rng.gen_range(-0.3..0.3);

        sweep_a.normalize();
        sweep_b.normalize();

        let output = time_of_impact(&ToiInput {
            proxy_a: &proxy,
            proxy_b: &proxy,
            sweep_a,
            sweep_b,
            t_max: 1.0,
        });
        assert!(
            matches!(output.state, ToiState::Touching | ToiState::Separated),
            "unexpected {:?}",
            output.state
        );

        let distance_at = |t: f32| {
            let input = DistanceInput {
                proxy_a: &proxy,
                proxy_b: &proxy,
                transform_a: sweep_a.get_transform(t),
                transform_b: sweep_b.get_transform(t),
                use_radii: false,
            };
            compute_distance(&input, &mut SimplexCache::default()).distance
        };

        for k in 0..=50 {
            let t = output.t * k as f32 / 50.0;
            let distance = distance_at(t);
            assert!(distance >= target - tolerance - 1e-5, "distance {} at t = {}", distance, t);
        }

        if output.state == ToiState::Touching {
            assert!(distance_at(output.t) <= target + tolerance + 1e-5);
        }
    }
}

/// A fast small circle aimed at a static post at the origin
fn shooting_range(config: SolverConfig) -> (PhysicsWorld, phys2d_solver::BodyHandle) {
    let mut world = PhysicsWorld::with_config(SolverConfig {
        gravity: Vector2::zero(),
        ..config
    });

    let post = world.add_body(RigidBody::new_static(Vector2::zero()));
    let post = (post, DistanceProxy::circle(Vector2::zero(), 0.5));
    let bullet = add_circle(&mut world, Vector2::new(-5.0, 0.0), 0.1);
    world
        .get_body_mut(bullet.0)
        .unwrap()
        .set_linear_velocity(Vector2::new(600.0, 0.0));
    connect(&mut world, &post, &bullet, Material::new(0.0, 0.0));

    (world, bullet.0)
}

#[test]
fn test_continuous_collision_prevents_tunneling() {
    let (mut world, bullet) = shooting_range(SolverConfig::default());

    for _ in 0..10 {
        world.step(DT, &mut collide_shapes).unwrap();
        let x = world.get_body(bullet).unwrap().get_position().x;
        assert!(x < -0.55, "bullet passed the post: x = {}", x);
    }

    assert!(world.is_step_complete());
    assert!(world.get_body(bullet).unwrap().get_linear_velocity().x.abs() < 1e-2);
}

#[test]
fn test_discrete_step_tunnels() {
    let (mut world, bullet) = shooting_range(SolverConfig {
        continuous_physics: false,
        ..SolverConfig::default()
    });

    for _ in 0..3 {
        world.step(DT, &mut collide_shapes).unwrap();
    }

    // Without continuous collision the bullet jumps over the post.
    assert!(world.get_body(bullet).unwrap().get_position().x > 0.5);
}

#[test]
fn test_bullet_hits_dynamic_body() {
    let mut world = weightless_world();
    let target = add_circle(&mut world, Vector2::zero(), 0.5);
    let bullet = add_circle(&mut world, Vector2::new(-5.0, 0.0), 0.1);
    {
        let body = world.get_body_mut(bullet.0).unwrap();
        body.set_bullet(true);
        body.set_linear_velocity(Vector2::new(600.0, 0.0));
    }
    connect(&mut world, &target, &bullet, Material::new(0.0, 0.0));

    for _ in 0..10 {
        world.step(DT, &mut collide_shapes).unwrap();
        let bullet_x = world.get_body(bullet.0).unwrap().get_position().x;
        let target_x = world.get_body(target.0).unwrap().get_position().x;
        assert!(bullet_x < target_x, "bullet passed through the target");
    }

    // The hit pushed the target forward.
    assert!(world.get_body(target.0).unwrap().get_linear_velocity().x > 0.0);
}

#[test]
fn test_sub_stepping_stops_after_first_event() {
    let (mut world, bullet) = shooting_range(SolverConfig {
        sub_stepping: true,
        ..SolverConfig::default()
    });

    world.step(DT, &mut collide_shapes).unwrap();
    world.step(DT, &mut collide_shapes).unwrap();
    assert!(world.is_step_complete());

    world.step(DT, &mut collide_shapes).unwrap();
    assert!(!world.is_step_complete());
    assert!(world.get_body(bullet).unwrap().get_position().x < -0.55);

    // The next call finishes the interrupted step before solving again.
    world.step(DT, &mut collide_shapes).unwrap();
    assert!(world.is_step_complete());
}
