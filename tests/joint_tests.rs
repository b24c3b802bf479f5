mod common;

use approx::assert_relative_eq;
use common::{add_circle, collide_shapes, connect, weightless_world};
use phys2d_solver::constraints::LimitState;
use phys2d_solver::core::settings::{ANGULAR_SLOP, LINEAR_SLOP};
use phys2d_solver::error::PhysicsError;
use phys2d_solver::math::Vector2;
use phys2d_solver::{BodyHandle, Joint, JointHandle, Material, PhysicsWorld, RevoluteJoint, RigidBody};

const DT: f32 = 1.0 / 60.0;

/// A unit-mass bob hanging one meter below a static pivot at the origin
fn pendulum(world: &mut PhysicsWorld, breakpoint: Option<f32>) -> (BodyHandle, BodyHandle, JointHandle) {
    let pivot = world.add_body(RigidBody::new_static(Vector2::zero()));
    let (bob, _) = add_circle(world, Vector2::new(0.0, -1.0), 0.1);

    let revolute = RevoluteJoint::new(Vector2::zero(), Vector2::new(0.0, 1.0), 0.0);
    let mut joint = Joint::new(pivot, bob, revolute);
    if let Some(breakpoint) = breakpoint {
        joint = joint.with_breakpoint(breakpoint);
    }
    let joint = world.add_joint(joint).unwrap();

    (pivot, bob, joint)
}

/// A wheel pinned at its center to a static frame, without gravity
fn wheel(world: &mut PhysicsWorld) -> (BodyHandle, JointHandle) {
    let frame = world.add_body(RigidBody::new_static(Vector2::zero()));
    let (wheel, _) = add_circle(world, Vector2::zero(), 0.5);
    let joint = world.add_revolute_joint(frame, wheel, Vector2::zero()).unwrap();
    (wheel, joint)
}

#[test]
fn test_pendulum_keeps_its_pivot() {
    let mut world = PhysicsWorld::new();
    let (_, bob, _) = pendulum(&mut world, None);
    world
        .get_body_mut(bob)
        .unwrap()
        .set_linear_velocity(Vector2::new(3.0, 0.0));

    let mut highest = f32::MIN;
    for _ in 0..120 {
        world.step(DT, &mut collide_shapes).unwrap();

        let body = world.get_body(bob).unwrap();
        let anchor = body.get_world_point(Vector2::new(0.0, 1.0));
        assert!(anchor.length() < 4.0 * LINEAR_SLOP, "anchor drifted to {}", anchor);
        highest = highest.max(body.get_position().y);
    }

    // 3 m/s lifts the bob by about v^2 / 2g.
    assert!(highest > -1.0 + 0.4 && highest < -1.0 + 0.5);
}

#[test]
fn test_joint_breaks_above_breakpoint() {
    let mut world = PhysicsWorld::new();
    let (_, bob, joint) = pendulum(&mut world, Some(1.0));

    world.step(DT, &mut collide_shapes).unwrap();

    assert!(!world.get_joint(joint).unwrap().is_enabled());
    let events: Vec<_> = world.events().get_joint_events().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].joint, joint);
    assert!(events[0].force > 1.0);

    // Once broken, the bob falls freely and no further events are raised.
    for _ in 0..30 {
        world.step(DT, &mut collide_shapes).unwrap();
    }
    assert_eq!(world.events().get_joint_events().count(), 1);
    let body = world.get_body(bob).unwrap();
    assert_relative_eq!(body.get_position().x, 0.0, epsilon = 1e-4);
    assert!(body.get_linear_velocity().y < -4.0);
}

#[test]
fn test_strong_joint_holds() {
    let mut world = PhysicsWorld::new();
    let (_, _, joint) = pendulum(&mut world, Some(1000.0));

    for _ in 0..60 {
        world.step(DT, &mut collide_shapes).unwrap();
    }

    assert!(world.get_joint(joint).unwrap().is_enabled());
    assert!(world.events().get_joint_events().next().is_none());
}

#[test]
fn test_breakpoint_near_hanging_weight() {
    // A bob hanging at rest pulls on its pivot with its weight.
    let weight = 9.81;

    let mut world = PhysicsWorld::new();
    let (_, _, joint) = pendulum(&mut world, Some(1.05 * weight));
    for _ in 0..60 {
        world.step(DT, &mut collide_shapes).unwrap();
    }
    assert!(world.get_joint(joint).unwrap().is_enabled());
    assert_relative_eq!(
        world.get_joint(joint).unwrap().get_reaction_force(1.0 / DT).length(),
        weight,
        epsilon = 1e-2
    );

    let mut world = PhysicsWorld::new();
    let (_, _, joint) = pendulum(&mut world, Some(0.95 * weight));
    world.step(DT, &mut collide_shapes).unwrap();
    assert!(!world.get_joint(joint).unwrap().is_enabled());
}

#[test]
fn test_revolute_motor_reaches_speed() {
    let mut world = weightless_world();
    let (wheel, joint) = wheel(&mut world);
    world.enable_revolute_motor(joint, true).unwrap();
    world.set_revolute_max_motor_torque(joint, 100.0).unwrap();
    world.set_revolute_motor_speed(joint, 2.0).unwrap();

    for _ in 0..30 {
        world.step(DT, &mut collide_shapes).unwrap();
    }

    assert_relative_eq!(world.get_body(wheel).unwrap().get_angular_velocity(), 2.0, epsilon = 1e-3);
    assert_relative_eq!(world.get_body(wheel).unwrap().get_position().length(), 0.0, epsilon = 1e-4);
}

#[test]
fn test_revolute_motor_torque_is_limited() {
    let mut world = weightless_world();
    let (wheel, joint) = wheel(&mut world);
    world.enable_revolute_motor(joint, true).unwrap();
    world.set_revolute_max_motor_torque(joint, 0.1).unwrap();
    world.set_revolute_motor_speed(joint, 10.0).unwrap();

    for _ in 0..60 {
        world.step(DT, &mut collide_shapes).unwrap();
    }

    // Inertia of the wheel is 0.125, so 0.1 N m accelerates it at 0.8 rad/s^2.
    assert_relative_eq!(world.get_body(wheel).unwrap().get_angular_velocity(), 0.8, epsilon = 1e-2);

    let revolute = world.get_joint(joint).unwrap().as_revolute().unwrap();
    assert_relative_eq!(revolute.get_motor_torque(1.0 / DT), 0.1, epsilon = 1e-4);
}

#[test]
fn test_revolute_limit_stops_motor() {
    let mut world = weightless_world();
    let (wheel, joint) = wheel(&mut world);
    world.set_revolute_limits(joint, -0.25, 0.25).unwrap();
    world.enable_revolute_limit(joint, true).unwrap();
    world.enable_revolute_motor(joint, true).unwrap();
    world.set_revolute_max_motor_torque(joint, 100.0).unwrap();
    world.set_revolute_motor_speed(joint, 4.0).unwrap();

    for _ in 0..60 {
        world.step(DT, &mut collide_shapes).unwrap();
        assert!(world.get_body(wheel).unwrap().get_angle() < 0.25 + ANGULAR_SLOP);
    }

    let revolute = world.get_joint(joint).unwrap().as_revolute().unwrap();
    assert_eq!(revolute.get_limit_state(), LimitState::AtUpper);
    assert_relative_eq!(world.get_body(wheel).unwrap().get_angle(), 0.25, epsilon = ANGULAR_SLOP);
}

#[test]
fn test_joint_setters_wake_bodies() {
    let mut world = weightless_world();
    let (wheel, joint) = wheel(&mut world);

    for _ in 0..60 {
        world.step(DT, &mut collide_shapes).unwrap();
    }
    assert!(world.get_body(wheel).unwrap().is_sleeping());

    // Setting an unchanged value leaves the island asleep.
    world.set_revolute_motor_speed(joint, 0.0).unwrap();
    assert!(world.get_body(wheel).unwrap().is_sleeping());

    world.set_revolute_motor_speed(joint, 1.0).unwrap();
    assert!(world.get_body(wheel).unwrap().is_awake());
}

#[test]
fn test_rope_limits_distance() {
    let mut world = PhysicsWorld::new();
    let anchor = world.add_body(RigidBody::new_static(Vector2::zero()));
    let (bob, _) = add_circle(&mut world, Vector2::new(0.5, 0.0), 0.1);
    world
        .get_body_mut(bob)
        .unwrap()
        .set_linear_velocity(Vector2::new(3.0, 0.0));
    let rope = world
        .add_rope_joint(anchor, bob, Vector2::zero(), Vector2::new(0.5, 0.0), 1.0)
        .unwrap();

    let mut max_distance: f32 = 0.0;
    for _ in 0..180 {
        world.step(DT, &mut collide_shapes).unwrap();
        max_distance = max_distance.max(world.get_body(bob).unwrap().get_position().length());
    }

    assert!(max_distance < 1.0 + 4.0 * LINEAR_SLOP, "rope stretched to {}", max_distance);
    assert!(max_distance > 0.99);

    let rope = world.get_joint(rope).unwrap().as_rope().unwrap();
    assert_eq!(rope.get_max_length(), 1.0);
}

#[test]
fn test_slack_rope_does_not_push() {
    let mut world = weightless_world();
    let anchor = world.add_body(RigidBody::new_static(Vector2::zero()));
    let (bob, _) = add_circle(&mut world, Vector2::new(0.9, 0.0), 0.1);
    world
        .get_body_mut(bob)
        .unwrap()
        .set_linear_velocity(Vector2::new(-3.0, 0.0));
    world
        .add_rope_joint(anchor, bob, Vector2::zero(), Vector2::new(0.9, 0.0), 1.0)
        .unwrap();

    for _ in 0..10 {
        world.step(DT, &mut collide_shapes).unwrap();
    }

    assert_relative_eq!(world.get_body(bob).unwrap().get_position().x, 0.4, epsilon = 1e-4);
}

#[test]
fn test_connected_bodies_do_not_collide_by_default() {
    let mut world = weightless_world();
    let a = add_circle(&mut world, Vector2::new(-0.45, 0.0), 0.5);
    let b = add_circle(&mut world, Vector2::new(0.45, 0.0), 0.5);
    let contact = connect(&mut world, &a, &b, Material::default());
    let joint = world.add_revolute_joint(a.0, b.0, Vector2::zero()).unwrap();

    world.step(DT, &mut collide_shapes).unwrap();
    assert!(!world.get_contact(contact).unwrap().is_enabled());

    world.remove_joint(joint).unwrap();
    let joint = Joint::new(a.0, b.0, RevoluteJoint::new(Vector2::new(0.45, 0.0), Vector2::new(-0.45, 0.0), 0.0))
        .with_collide_connected(true);
    world.add_joint(joint).unwrap();

    world.step(DT, &mut collide_shapes).unwrap();
    assert!(world.get_contact(contact).unwrap().is_enabled());
}

#[test]
fn test_invalid_joints() {
    let mut world = PhysicsWorld::new();
    let a = world.add_body(RigidBody::new_dynamic(Vector2::zero()));
    let b = world.add_body(RigidBody::new_dynamic(Vector2::new(1.0, 0.0)));

    let self_joint = Joint::new(a, a, RevoluteJoint::new(Vector2::zero(), Vector2::zero(), 0.0));
    assert!(matches!(world.add_joint(self_joint), Err(PhysicsError::InvalidJoint(_))));

    assert!(matches!(
        world.add_rope_joint(a, b, Vector2::zero(), Vector2::new(1.0, 0.0), 0.0),
        Err(PhysicsError::InvalidParameter(_))
    ));

    let rope = world
        .add_rope_joint(a, b, Vector2::zero(), Vector2::new(1.0, 0.0), 2.0)
        .unwrap();
    assert!(matches!(
        world.set_revolute_motor_speed(rope, 1.0),
        Err(PhysicsError::InvalidJoint(_))
    ));

    let revolute = world.add_revolute_joint(a, b, Vector2::new(0.5, 0.0)).unwrap();
    assert!(matches!(
        world.set_revolute_limits(revolute, 1.0, -1.0),
        Err(PhysicsError::InvalidParameter(_))
    ));
}
