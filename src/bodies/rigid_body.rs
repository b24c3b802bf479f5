use crate::bodies::{body_flags::BodyFlags, Material, RigidBodyType};
use crate::core::BodyHandle;
use crate::math::{Rotation, Sweep, Transform, Vector2};

/// Type alias for a handle to a rigid body
pub type RigidBodyHandle = BodyHandle;

/// A rigid body for 2D physics simulation
///
/// Bodies carry no geometry. Contacts between bodies are produced by an
/// external collision layer and handed to the world.
#[derive(Debug, Clone)]
pub struct RigidBody {
    /// The body's transform in world space (origin, not center of mass)
    transform: Transform,

    /// Motion of the center of mass over the current step
    sweep: Sweep,

    /// Linear velocity of the center of mass
    linear_velocity: Vector2,

    /// Angular velocity in radians per second
    angular_velocity: f32,

    /// Force accumulated for the next step
    force: Vector2,

    /// Torque accumulated for the next step
    torque: f32,

    /// The body's surface material
    material: Material,

    /// The body's type (dynamic, kinematic, or static)
    body_type: RigidBodyType,

    /// The body's mass
    mass: f32,

    /// Inverse of the body's mass
    inv_mass: f32,

    /// Rotational inertia about the center of mass
    inertia: f32,

    /// Inverse rotational inertia about the center of mass
    inv_inertia: f32,

    /// The body's linear damping
    linear_damping: f32,

    /// The body's angular damping
    angular_damping: f32,

    /// The body's flags
    flags: BodyFlags,

    /// How long the body has been still (for sleeping)
    sleep_time: f32,

    /// Position of the body inside the island being solved
    pub(crate) island_index: usize,
}

impl RigidBody {
    /// Creates a new rigid body at the given position and angle
    pub fn new(body_type: RigidBodyType, position: Vector2, angle: f32) -> Self {
        let mut body = Self {
            transform: Transform::from_position_angle(position, angle),
            sweep: Sweep::new(Vector2::zero(), position, angle),
            linear_velocity: Vector2::zero(),
            angular_velocity: 0.0,
            force: Vector2::zero(),
            torque: 0.0,
            material: Material::default(),
            body_type,
            mass: 0.0,
            inv_mass: 0.0,
            inertia: 0.0,
            inv_inertia: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            flags: BodyFlags::CAN_SLEEP | BodyFlags::AFFECTED_BY_GRAVITY,
            sleep_time: 0.0,
            island_index: 0,
        };

        if body_type.is_dynamic() {
            body.mass = 1.0;
            body.inv_mass = 1.0;
        }

        body
    }

    /// Creates a new dynamic rigid body with unit mass at the given position
    pub fn new_dynamic(position: Vector2) -> Self {
        Self::new(RigidBodyType::Dynamic, position, 0.0)
    }

    /// Creates a new kinematic rigid body at the given position
    pub fn new_kinematic(position: Vector2) -> Self {
        Self::new(RigidBodyType::Kinematic, position, 0.0)
    }

    /// Creates a new static rigid body at the given position
    pub fn new_static(position: Vector2) -> Self {
        Self::new(RigidBodyType::Static, position, 0.0)
    }

    /// Returns the body's transform
    pub fn get_transform(&self) -> Transform {
        self.transform
    }

    /// Moves the body to a new origin position and angle
    ///
    /// This teleports the body: the sweep is reset so no motion is interpolated.
    pub fn set_transform(&mut self, position: Vector2, angle: f32) {
        self.transform.set(position, angle);
        self.sweep.c = self.transform.transform_point(self.sweep.local_center);
        self.sweep.a = angle;
        self.sweep.c0 = self.sweep.c;
        self.sweep.a0 = angle;
    }

    /// Returns the body origin's position
    pub fn get_position(&self) -> Vector2 {
        self.transform.position
    }

    /// Returns the body's angle in radians
    pub fn get_angle(&self) -> f32 {
        self.sweep.a
    }

    /// Returns the rotation of the body
    pub fn get_rotation(&self) -> Rotation {
        self.transform.rotation
    }

    /// Returns the world position of the center of mass
    pub fn get_world_center(&self) -> Vector2 {
        self.sweep.c
    }

    /// Returns the local position of the center of mass
    pub fn get_local_center(&self) -> Vector2 {
        self.sweep.local_center
    }

    /// Returns the body's sweep
    pub fn get_sweep(&self) -> &Sweep {
        &self.sweep
    }

    pub(crate) fn sweep_mut(&mut self) -> &mut Sweep {
        &mut self.sweep
    }

    /// Returns the body's linear velocity
    pub fn get_linear_velocity(&self) -> Vector2 {
        self.linear_velocity
    }

    /// Sets the body's linear velocity; static bodies ignore this
    pub fn set_linear_velocity(&mut self, velocity: Vector2) {
        if self.body_type.is_static() {
            return;
        }
        if velocity.length_squared() > 0.0 {
            self.wake_up();
        }
        self.linear_velocity = velocity;
    }

    /// Returns the body's angular velocity
    pub fn get_angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Sets the body's angular velocity; static bodies ignore this
    pub fn set_angular_velocity(&mut self, omega: f32) {
        if self.body_type.is_static() {
            return;
        }
        if omega * omega > 0.0 {
            self.wake_up();
        }
        self.angular_velocity = omega;
    }

    /// Returns the accumulated force
    pub fn get_force(&self) -> Vector2 {
        self.force
    }

    /// Returns the accumulated torque
    pub fn get_torque(&self) -> f32 {
        self.torque
    }

    /// Returns the body's material
    pub fn get_material(&self) -> &Material {
        &self.material
    }

    /// Sets the body's material
    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    /// Returns the body's type
    pub fn get_body_type(&self) -> RigidBodyType {
        self.body_type
    }

    /// Changes the body's type, resetting its mass properties accordingly
    pub fn set_body_type(&mut self, body_type: RigidBodyType) {
        if self.body_type == body_type {
            return;
        }
        self.body_type = body_type;

        let (mass, center, inertia) = (self.mass, self.sweep.local_center, self.get_inertia());
        self.set_mass_data(mass.max(1.0), center, inertia);

        if body_type.is_static() {
            self.linear_velocity = Vector2::zero();
            self.angular_velocity = 0.0;
            self.sweep.a0 = self.sweep.a;
            self.sweep.c0 = self.sweep.c;
        }

        self.force = Vector2::zero();
        self.torque = 0.0;
        self.wake_up();
    }

    /// Returns the body's mass
    pub fn get_mass(&self) -> f32 {
        self.mass
    }

    /// Returns the inverse of the body's mass (0 for static and kinematic bodies)
    pub fn get_inverse_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Returns the rotational inertia about the body origin
    pub fn get_inertia(&self) -> f32 {
        self.inertia + self.mass * self.sweep.local_center.length_squared()
    }

    /// Returns the inverse rotational inertia about the center of mass
    pub fn get_inverse_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// Sets mass, local center of mass and rotational inertia about the body origin
    ///
    /// Non-dynamic bodies keep zero mass. A non-positive mass on a dynamic body
    /// is replaced by 1.
    pub fn set_mass_data(&mut self, mass: f32, local_center: Vector2, inertia: f32) {
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_inertia = 0.0;

        if !self.body_type.is_dynamic() {
            self.mass = 0.0;
            let center = self.transform.position;
            self.sweep.local_center = Vector2::zero();
            self.sweep.c0 = center;
            self.sweep.c = center;
            return;
        }

        self.mass = if mass > 0.0 { mass } else { 1.0 };
        self.inv_mass = 1.0 / self.mass;

        if inertia > 0.0 && !self.flags.contains(BodyFlags::FIXED_ROTATION) {
            self.inertia = inertia - self.mass * local_center.length_squared();
            if self.inertia > 0.0 {
                self.inv_inertia = 1.0 / self.inertia;
            } else {
                self.inertia = 0.0;
            }
        }

        // Move the center of mass, keeping the velocity of the new center.
        let old_center = self.sweep.c;
        self.sweep.local_center = local_center;
        self.sweep.c = self.transform.transform_point(local_center);
        self.sweep.c0 = self.sweep.c;

        self.linear_velocity += Vector2::scalar_cross(self.angular_velocity, &(self.sweep.c - old_center));
    }

    /// Sets the body's linear damping
    pub fn set_linear_damping(&mut self, damping: f32) {
        self.linear_damping = damping;
    }

    /// Returns the body's linear damping
    pub fn get_linear_damping(&self) -> f32 {
        self.linear_damping
    }

    /// Sets the body's angular damping
    pub fn set_angular_damping(&mut self, damping: f32) {
        self.angular_damping = damping;
    }

    /// Returns the body's angular damping
    pub fn get_angular_damping(&self) -> f32 {
        self.angular_damping
    }

    /// Returns the body's flags
    pub fn get_flags(&self) -> BodyFlags {
        self.flags
    }

    /// Returns whether the body is sleeping
    pub fn is_sleeping(&self) -> bool {
        self.flags.contains(BodyFlags::SLEEPING)
    }

    /// Returns whether the body is awake
    pub fn is_awake(&self) -> bool {
        !self.is_sleeping()
    }

    /// Puts the body to sleep, clearing its velocities and forces
    pub fn put_to_sleep(&mut self) {
        self.flags.insert(BodyFlags::SLEEPING);
        self.sleep_time = 0.0;
        self.linear_velocity = Vector2::zero();
        self.angular_velocity = 0.0;
        self.force = Vector2::zero();
        self.torque = 0.0;
    }

    /// Wakes the body up
    pub fn wake_up(&mut self) {
        if self.flags.contains(BodyFlags::SLEEPING) {
            self.flags.remove(BodyFlags::SLEEPING);
            self.sleep_time = 0.0;
        }
    }

    /// Returns whether the body can go to sleep
    pub fn can_sleep(&self) -> bool {
        self.flags.contains(BodyFlags::CAN_SLEEP)
    }

    /// Sets whether the body can go to sleep
    pub fn set_can_sleep(&mut self, can_sleep: bool) {
        self.flags.set(BodyFlags::CAN_SLEEP, can_sleep);
        if !can_sleep {
            self.wake_up();
        }
    }

    /// Returns whether the body is affected by gravity
    pub fn is_affected_by_gravity(&self) -> bool {
        self.flags.contains(BodyFlags::AFFECTED_BY_GRAVITY)
    }

    /// Sets whether the body is affected by gravity
    pub fn set_affected_by_gravity(&mut self, affected: bool) {
        self.flags.set(BodyFlags::AFFECTED_BY_GRAVITY, affected);
    }

    /// Returns whether the body is a bullet (continuous collision with dynamic bodies)
    pub fn is_bullet(&self) -> bool {
        self.flags.contains(BodyFlags::CCD_ENABLED)
    }

    /// Sets whether the body is a bullet
    pub fn set_bullet(&mut self, bullet: bool) {
        self.flags.set(BodyFlags::CCD_ENABLED, bullet);
    }

    /// Returns whether the body receives after-collision reports
    pub fn generates_collision_events(&self) -> bool {
        self.flags.contains(BodyFlags::GENERATE_COLLISION_EVENTS)
    }

    /// Sets whether the body receives after-collision reports
    pub fn set_generates_collision_events(&mut self, generates: bool) {
        self.flags.set(BodyFlags::GENERATE_COLLISION_EVENTS, generates);
    }

    /// Returns whether the body's rotation is locked
    pub fn is_fixed_rotation(&self) -> bool {
        self.flags.contains(BodyFlags::FIXED_ROTATION)
    }

    /// Locks or unlocks the body's rotation
    pub fn set_fixed_rotation(&mut self, fixed: bool) {
        if self.is_fixed_rotation() == fixed {
            return;
        }
        self.flags.set(BodyFlags::FIXED_ROTATION, fixed);
        self.angular_velocity = 0.0;

        if fixed {
            self.inertia = 0.0;
            self.inv_inertia = 0.0;
        }
    }

    /// Returns how long the body has been still
    pub fn get_sleep_time(&self) -> f32 {
        self.sleep_time
    }

    pub(crate) fn set_sleep_time(&mut self, time: f32) {
        self.sleep_time = time;
    }

    /// Applies a force at a world point
    pub fn apply_force(&mut self, force: Vector2, point: Vector2) {
        if !self.body_type.is_dynamic() {
            return;
        }
        self.wake_up();
        self.force += force;
        self.torque += (point - self.sweep.c).cross(&force);
    }

    /// Applies a force at the center of mass
    pub fn apply_force_to_center(&mut self, force: Vector2) {
        if !self.body_type.is_dynamic() {
            return;
        }
        self.wake_up();
        self.force += force;
    }

    /// Applies a torque
    pub fn apply_torque(&mut self, torque: f32) {
        if !self.body_type.is_dynamic() {
            return;
        }
        self.wake_up();
        self.torque += torque;
    }

    /// Applies an impulse at a world point
    pub fn apply_linear_impulse(&mut self, impulse: Vector2, point: Vector2) {
        if !self.body_type.is_dynamic() {
            return;
        }
        self.wake_up();
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia * (point - self.sweep.c).cross(&impulse);
    }

    /// Applies an angular impulse
    pub fn apply_angular_impulse(&mut self, impulse: f32) {
        if !self.body_type.is_dynamic() {
            return;
        }
        self.wake_up();
        self.angular_velocity += self.inv_inertia * impulse;
    }

    /// Clears accumulated forces and torques
    pub fn clear_forces(&mut self) {
        self.force = Vector2::zero();
        self.torque = 0.0;
    }

    /// Converts a body-local point to world space
    pub fn get_world_point(&self, local_point: Vector2) -> Vector2 {
        self.transform.transform_point(local_point)
    }

    /// Converts a body-local direction to world space
    pub fn get_world_vector(&self, local_vector: Vector2) -> Vector2 {
        self.transform.transform_vector(local_vector)
    }

    /// Converts a world point to body-local space
    pub fn get_local_point(&self, world_point: Vector2) -> Vector2 {
        self.transform.inverse_transform_point(world_point)
    }

    /// Converts a world direction to body-local space
    pub fn get_local_vector(&self, world_vector: Vector2) -> Vector2 {
        self.transform.inverse_transform_vector(world_vector)
    }

    /// Velocity of a world point attached to this body
    pub fn get_linear_velocity_from_world_point(&self, world_point: Vector2) -> Vector2 {
        self.linear_velocity
            + Vector2::scalar_cross(self.angular_velocity, &(world_point - self.sweep.c))
    }

    pub(crate) fn set_velocities(&mut self, v: Vector2, w: f32) {
        self.linear_velocity = v;
        self.angular_velocity = w;
    }

    /// Recomputes the transform from the end of the sweep
    pub(crate) fn synchronize_transform(&mut self) {
        self.transform.rotation.set(self.sweep.a);
        self.transform.position =
            self.sweep.c - self.transform.rotation.rotate(self.sweep.local_center);
    }

    /// Rewinds the body to the sweep state at `alpha`, collapsing the sweep there
    pub(crate) fn advance(&mut self, alpha: f32) {
        self.sweep.advance(alpha);
        self.sweep.c = self.sweep.c0;
        self.sweep.a = self.sweep.a0;
        self.synchronize_transform();
    }
}
