//! Shared scenes for the integration tests.
#![allow(dead_code)]

use phys2d_solver::collision::{Contact, DistanceProxy, Manifold, ManifoldPoint, ManifoldType};
use phys2d_solver::math::{Transform, Vector2};
use phys2d_solver::{BodyHandle, Material, PhysicsWorld, RigidBody, SolverConfig};

/// Narrow phase for circles and for bodies resting on an axis-aligned ground box
///
/// Body A of a ground contact must be the box. Circles collide with circles,
/// and circles or boxes collide with the top face of the ground.
pub fn collide_shapes(contact: &Contact, xf_a: &Transform, xf_b: &Transform) -> Manifold {
    let proxy_a = contact.get_proxy_a();
    let proxy_b = contact.get_proxy_b();
    let total_radius = proxy_a.radius() + proxy_b.radius();

    if proxy_a.vertex_count() == 1 {
        let center_a = xf_a.transform_point(proxy_a.vertex(0));
        let center_b = xf_b.transform_point(proxy_b.vertex(0));
        if center_a.distance_squared(&center_b) > total_radius * total_radius {
            return Manifold::default();
        }
        return Manifold::circles(proxy_a.vertex(0), proxy_b.vertex(0));
    }

    let top = proxy_a
        .vertices()
        .iter()
        .fold(f32::MIN, |top, v| top.max(v.y));
    let mut manifold = Manifold::new(ManifoldType::FaceA, Vector2::unit_y(), Vector2::new(0.0, top));

    for (i, &vertex) in proxy_b.vertices().iter().enumerate() {
        let in_ground = xf_a.inverse_transform_point(xf_b.transform_point(vertex));
        if in_ground.y - top > total_radius || manifold.point_count == 2 {
            continue;
        }
        let point = ManifoldPoint::new(vertex, i as u32);
        if manifold.add_point(point).is_err() {
            break;
        }
    }

    manifold
}

/// A world without gravity
pub fn weightless_world() -> PhysicsWorld {
    let mut world = PhysicsWorld::new();
    world.set_gravity(Vector2::zero());
    world
}

/// Adds a wide static ground box whose top face is at `y = 0`
pub fn add_ground(world: &mut PhysicsWorld) -> (BodyHandle, DistanceProxy) {
    let ground = world.add_body(RigidBody::new_static(Vector2::new(0.0, -0.5)));
    (ground, DistanceProxy::boxed(50.0, 0.5))
}

/// Adds a dynamic circle with unit mass and the inertia of a disk
pub fn add_circle(world: &mut PhysicsWorld, position: Vector2, radius: f32) -> (BodyHandle, DistanceProxy) {
    let mut body = RigidBody::new_dynamic(position);
    body.set_mass_data(1.0, Vector2::zero(), 0.5 * radius * radius);
    (world.add_body(body), DistanceProxy::circle(Vector2::zero(), radius))
}

/// Adds a dynamic square box with unit mass
pub fn add_box(world: &mut PhysicsWorld, position: Vector2, half_extent: f32) -> (BodyHandle, DistanceProxy) {
    let mut body = RigidBody::new_dynamic(position);
    let side = 2.0 * half_extent;
    body.set_mass_data(1.0, Vector2::zero(), side * side / 6.0);
    (world.add_body(body), DistanceProxy::boxed(half_extent, half_extent))
}

/// Registers a contact between two shaped bodies
pub fn connect(
    world: &mut PhysicsWorld,
    (a, proxy_a): &(BodyHandle, DistanceProxy),
    (b, proxy_b): &(BodyHandle, DistanceProxy),
    material: Material,
) -> phys2d_solver::ContactHandle {
    let contact = Contact::new(*a, *b, proxy_a.clone(), proxy_b.clone()).with_materials(&material, &material);
    world.add_contact(contact).expect("bodies exist")
}

/// A configuration without continuous collision
pub fn discrete_config() -> SolverConfig {
    SolverConfig {
        continuous_physics: false,
        ..SolverConfig::default()
    }
}
