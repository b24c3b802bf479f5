//! Per-island solving.
//!
//! An island is a set of bodies connected through touching contacts and
//! joints. The world discovers islands every step and hands each one to an
//! `Island`, which integrates velocities, runs the joint and contact solvers
//! and writes the results back to the bodies.

use crate::bodies::RigidBody;
use crate::collision::contact::Contact;
use crate::collision::contact_solver::ContactSolver;
use crate::constraints::{BodyPair, Joint, JointConstraint};
use crate::core::config::SolverConfig;
use crate::core::events::{ContactImpulse, ContactListener};
use crate::core::storage::{BodyStorage, ContactStorage, JointStorage};
use crate::core::time_step::{SolverData, SolverMass, SolverPosition, SolverVelocity, TimeStep};
use crate::core::{BodyHandle, ContactHandle, JointHandle};
use crate::error::PhysicsError;
use crate::math::{clamp, Vector2};
use crate::Result;
use tracing::{debug, warn};

/// Outcome of solving one island
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IslandReport {
    /// Every position constraint converged within tolerance
    pub position_solved: bool,

    /// The island was put to sleep
    pub slept: bool,
}

/// Working set of one island
#[derive(Debug, Clone, Default)]
pub struct Island {
    bodies: Vec<BodyHandle>,
    contacts: Vec<ContactHandle>,
    joints: Vec<JointHandle>,

    body_capacity: usize,
    contact_capacity: usize,
    joint_capacity: usize,

    /// Island indices of the bodies of each joint, filled at solve time
    joint_pairs: Vec<BodyPair>,

    positions: Vec<SolverPosition>,
    velocities: Vec<SolverVelocity>,
    masses: Vec<SolverMass>,

    contact_solver: ContactSolver,
}

impl Island {
    /// Creates an island with the given capacities
    pub fn new(body_capacity: usize, contact_capacity: usize, joint_capacity: usize) -> Self {
        let mut island = Self::default();
        island.reset(body_capacity, contact_capacity, joint_capacity);
        island
    }

    /// Applies contact solver settings from `config`
    pub fn configure(&mut self, config: &SolverConfig) {
        self.contact_solver.configure(config);
    }

    /// Empties the island and sets new capacities, keeping allocations
    pub fn reset(&mut self, body_capacity: usize, contact_capacity: usize, joint_capacity: usize) {
        self.clear();
        self.body_capacity = body_capacity;
        self.contact_capacity = contact_capacity;
        self.joint_capacity = joint_capacity;

        self.bodies.reserve(body_capacity);
        self.contacts.reserve(contact_capacity);
        self.joints.reserve(joint_capacity);
    }

    /// Removes all bodies, contacts and joints
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.joints.clear();
    }

    /// Adds a body and records its island index on it
    pub fn add_body(&mut self, handle: BodyHandle, body: &mut RigidBody) -> Result<()> {
        if self.bodies.len() >= self.body_capacity {
            return Err(PhysicsError::CapacityExceeded(format!(
                "island body capacity {} reached",
                self.body_capacity
            )));
        }
        body.island_index = self.bodies.len();
        self.bodies.push(handle);
        Ok(())
    }

    /// Adds a touching, enabled contact
    pub fn add_contact(&mut self, handle: ContactHandle) -> Result<()> {
        if self.contacts.len() >= self.contact_capacity {
            return Err(PhysicsError::CapacityExceeded(format!(
                "island contact capacity {} reached",
                self.contact_capacity
            )));
        }
        self.contacts.push(handle);
        Ok(())
    }

    /// Adds an enabled joint
    pub fn add_joint(&mut self, handle: JointHandle) -> Result<()> {
        if self.joints.len() >= self.joint_capacity {
            return Err(PhysicsError::CapacityExceeded(format!(
                "island joint capacity {} reached",
                self.joint_capacity
            )));
        }
        self.joints.push(handle);
        Ok(())
    }

    /// Bodies in island order
    pub fn bodies(&self) -> &[BodyHandle] {
        &self.bodies
    }

    /// Contacts in the island
    pub fn contacts(&self) -> &[ContactHandle] {
        &self.contacts
    }

    /// Joints in the island
    pub fn joints(&self) -> &[JointHandle] {
        &self.joints
    }

    /// Number of bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Returns whether the island holds no bodies
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Copies body state into the solver buffers
    fn load_bodies(&mut self, bodies: &BodyStorage<RigidBody>) -> Result<()> {
        self.positions.clear();
        self.velocities.clear();
        self.masses.clear();

        for &handle in &self.bodies {
            let body = bodies.get_checked(handle)?;
            self.positions.push(SolverPosition {
                c: body.get_world_center(),
                a: body.get_angle(),
            });
            self.velocities.push(SolverVelocity {
                v: body.get_linear_velocity(),
                w: body.get_angular_velocity(),
            });
            self.masses.push(SolverMass {
                inv_mass: body.get_inverse_mass(),
                inv_i: body.get_inverse_inertia(),
                local_center: body.get_local_center(),
            });
        }

        Ok(())
    }

    fn load_joint_pairs(&mut self, bodies: &BodyStorage<RigidBody>, joints: &JointStorage<Joint>) -> Result<()> {
        self.joint_pairs.clear();
        for &handle in &self.joints {
            let joint = joints.get_checked(handle)?;
            self.joint_pairs.push(BodyPair {
                index_a: bodies.get_checked(joint.get_body_a())?.island_index,
                index_b: bodies.get_checked(joint.get_body_b())?.island_index,
            });
        }
        Ok(())
    }

    /// Advances the island by one step
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &mut self,
        step: &TimeStep,
        config: &SolverConfig,
        bodies: &mut BodyStorage<RigidBody>,
        contacts: &mut ContactStorage<Contact>,
        joints: &mut JointStorage<Joint>,
        listener: &mut dyn ContactListener,
    ) -> Result<IslandReport> {
        let h = step.dt;

        self.load_bodies(bodies)?;
        self.load_joint_pairs(bodies, joints)?;

        // Integrate velocities and start the sweeps.
        for (i, &handle) in self.bodies.iter().enumerate() {
            let body = bodies.get_checked_mut(handle)?;
            let SolverPosition { c, a } = self.positions[i];
            let sweep = body.sweep_mut();
            sweep.c0 = c;
            sweep.a0 = a;

            if !body.get_body_type().is_dynamic() {
                continue;
            }

            let SolverVelocity { mut v, mut w } = self.velocities[i];
            let SolverMass { inv_mass, inv_i, .. } = self.masses[i];

            if body.is_affected_by_gravity() {
                v += config.gravity * h;
            }
            v += body.get_force() * (h * inv_mass);
            w += h * inv_i * body.get_torque();

            // First-order approximation of exp(-h * damping), kept within [0, 1].
            v *= clamp(1.0 - h * body.get_linear_damping(), 0.0, 1.0);
            w *= clamp(1.0 - h * body.get_angular_damping(), 0.0, 1.0);

            self.velocities[i] = SolverVelocity { v, w };
        }

        self.contact_solver.reset(step, contacts, &self.contacts, bodies)?;
        self.contact_solver
            .initialize_velocity_constraints(&self.positions, &self.velocities);

        if step.warm_starting {
            self.contact_solver.warm_start(&mut self.velocities);
        }

        for (&handle, &pair) in self.joints.iter().zip(&self.joint_pairs) {
            let joint = joints.get_checked_mut(handle)?;
            if !joint.is_enabled() {
                continue;
            }
            let mut data = SolverData {
                step: *step,
                positions: &mut self.positions,
                velocities: &mut self.velocities,
                masses: &self.masses,
            };
            joint.kind_mut().init_velocity_constraints(pair, &mut data);
        }

        for _ in 0..step.velocity_iterations {
            for &handle in &self.joints {
                let joint = joints.get_checked_mut(handle)?;
                if !joint.is_enabled() {
                    continue;
                }
                let mut data = SolverData {
                    step: *step,
                    positions: &mut self.positions,
                    velocities: &mut self.velocities,
                    masses: &self.masses,
                };
                joint.kind_mut().solve_velocity_constraints(&mut data);

                if let Some(force) = joint.validate(step.inv_dt) {
                    warn!(joint = ?handle, force, breakpoint = joint.get_breakpoint(), "joint broke");
                    listener.joint_broke(handle, force);
                }
            }

            self.contact_solver.solve_velocity_constraints(&mut self.velocities);
        }

        self.contact_solver.store_impulses(contacts);

        self.integrate_positions(h, config);

        let mut position_solved = false;
        for _ in 0..step.position_iterations {
            let contacts_okay = self.contact_solver.solve_position_constraints(&mut self.positions);

            let mut joints_okay = true;
            for &handle in &self.joints {
                let joint = joints.get_checked_mut(handle)?;
                if !joint.is_enabled() {
                    continue;
                }
                let mut data = SolverData {
                    step: *step,
                    positions: &mut self.positions,
                    velocities: &mut self.velocities,
                    masses: &self.masses,
                };
                let joint_okay = joint.kind_mut().solve_position_constraints(&mut data);
                joints_okay = joints_okay && joint_okay;
            }

            if contacts_okay && joints_okay {
                // Exit early if the position errors are small.
                position_solved = true;
                break;
            }
        }

        self.store_bodies(bodies)?;
        self.report(bodies, contacts, listener)?;

        let slept = config.allow_sleeping && self.update_sleep(h, config, position_solved, bodies, listener)?;

        debug!(
            bodies = self.bodies.len(),
            contacts = self.contacts.len(),
            joints = self.joints.len(),
            batches = self.contact_solver.batch_count(),
            position_solved,
            slept,
            "island solved"
        );

        Ok(IslandReport { position_solved, slept })
    }

    /// Resolves a time-of-impact event between two bodies of the island
    ///
    /// Only the two TOI bodies move during the position pass. The velocity
    /// pass starts from zero impulses and its impulses are not kept.
    #[allow(clippy::too_many_arguments)]
    pub fn solve_toi(
        &mut self,
        sub_step: &TimeStep,
        config: &SolverConfig,
        toi_index_a: usize,
        toi_index_b: usize,
        bodies: &mut BodyStorage<RigidBody>,
        contacts: &mut ContactStorage<Contact>,
        listener: &mut dyn ContactListener,
    ) -> Result<()> {
        let count = self.bodies.len();
        for index in [toi_index_a, toi_index_b] {
            if index >= count {
                return Err(PhysicsError::InvalidIslandIndex(index));
            }
        }

        self.load_bodies(bodies)?;

        self.contact_solver.reset(sub_step, contacts, &self.contacts, bodies)?;

        for _ in 0..sub_step.position_iterations {
            if self
                .contact_solver
                .solve_toi_position_constraints(&mut self.positions, toi_index_a, toi_index_b)
            {
                break;
            }
        }

        // Leap of faith to the new safe state.
        for index in [toi_index_a, toi_index_b] {
            let body = bodies.get_checked_mut(self.bodies[index])?;
            let sweep = body.sweep_mut();
            sweep.c0 = self.positions[index].c;
            sweep.a0 = self.positions[index].a;
        }

        // No warm starting is needed for TOI events: the impulses start at zero.
        self.contact_solver
            .initialize_velocity_constraints(&self.positions, &self.velocities);

        for _ in 0..sub_step.velocity_iterations {
            self.contact_solver.solve_velocity_constraints(&mut self.velocities);
        }

        // Impulses are not stored: they are relative to the sub-step.
        self.integrate_positions(sub_step.dt, config);
        self.store_bodies(bodies)?;
        self.report(bodies, contacts, listener)?;

        debug!(
            bodies = count,
            contacts = self.contacts.len(),
            toi_index_a,
            toi_index_b,
            "TOI island solved"
        );

        Ok(())
    }

    /// Integrates the solver positions, clamping large motions
    fn integrate_positions(&mut self, h: f32, config: &SolverConfig) {
        let max_translation_squared = config.max_translation * config.max_translation;
        let max_rotation_squared = config.max_rotation * config.max_rotation;

        for (position, velocity) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            let translation = velocity.v * h;
            if translation.length_squared() > max_translation_squared {
                let ratio = config.max_translation / translation.length();
                velocity.v *= ratio;
            }

            let rotation = h * velocity.w;
            if rotation * rotation > max_rotation_squared {
                let ratio = config.max_rotation / rotation.abs();
                velocity.w *= ratio;
            }

            position.c += velocity.v * h;
            position.a += h * velocity.w;
        }
    }

    /// Writes the solver state back to the bodies
    fn store_bodies(&self, bodies: &mut BodyStorage<RigidBody>) -> Result<()> {
        for (i, &handle) in self.bodies.iter().enumerate() {
            let body = bodies.get_checked_mut(handle)?;
            let sweep = body.sweep_mut();
            sweep.c = self.positions[i].c;
            sweep.a = self.positions[i].a;
            body.set_velocities(self.velocities[i].v, self.velocities[i].w);
            body.synchronize_transform();
        }
        Ok(())
    }

    /// Sends the solved impulses of every contact to the listener
    fn report(
        &self,
        bodies: &BodyStorage<RigidBody>,
        contacts: &ContactStorage<Contact>,
        listener: &mut dyn ContactListener,
    ) -> Result<()> {
        for vc in self.contact_solver.velocity_constraints() {
            let contact = contacts.get_checked(vc.contact)?;
            let impulse = ContactImpulse::from_constraint(vc);
            let body_a = contact.get_body_a();
            let body_b = contact.get_body_b();

            if bodies.get_checked(body_a)?.generates_collision_events() {
                listener.after_collision(body_a, body_b, vc.contact, &impulse);
            }
            if bodies.get_checked(body_b)?.generates_collision_events() {
                listener.after_collision(body_b, body_a, vc.contact, &impulse);
            }

            listener.post_solve(vc.contact, contact, &impulse);
        }
        Ok(())
    }

    /// Advances sleep timers; puts the island to sleep when every body rested long enough
    fn update_sleep(
        &self,
        h: f32,
        config: &SolverConfig,
        position_solved: bool,
        bodies: &mut BodyStorage<RigidBody>,
        listener: &mut dyn ContactListener,
    ) -> Result<bool> {
        let linear_tolerance_squared = config.linear_sleep_tolerance * config.linear_sleep_tolerance;
        let angular_tolerance_squared = config.angular_sleep_tolerance * config.angular_sleep_tolerance;

        let mut min_sleep_time = f32::MAX;
        for &handle in &self.bodies {
            let body = bodies.get_checked_mut(handle)?;
            if body.get_body_type().is_static() {
                continue;
            }

            let w = body.get_angular_velocity();
            let v: Vector2 = body.get_linear_velocity();
            if !body.can_sleep()
                || w * w > angular_tolerance_squared
                || v.length_squared() > linear_tolerance_squared
            {
                body.set_sleep_time(0.0);
                min_sleep_time = 0.0;
            } else {
                let sleep_time = body.get_sleep_time() + h;
                body.set_sleep_time(sleep_time);
                min_sleep_time = min_sleep_time.min(sleep_time);
            }
        }

        if min_sleep_time < config.time_to_sleep || !position_solved {
            return Ok(false);
        }

        for &handle in &self.bodies {
            let body = bodies.get_checked_mut(handle)?;
            if body.get_body_type().is_static() {
                continue;
            }
            body.put_to_sleep();
            listener.body_slept(handle);
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Storage;
    use approx::assert_relative_eq;

    #[test]
    fn test_capacity_is_enforced() {
        let mut bodies: BodyStorage<RigidBody> = BodyStorage::new();
        let handle = bodies.add(RigidBody::new_dynamic(Vector2::zero()));

        let mut island = Island::new(0, 0, 0);
        let body = bodies.get_mut(handle).unwrap();
        assert!(matches!(
            island.add_body(handle, body),
            Err(PhysicsError::CapacityExceeded(_))
        ));
    }

    #[test]
    fn test_free_fall_with_damping() {
        let config = SolverConfig::default();
        let mut bodies: BodyStorage<RigidBody> = BodyStorage::new();
        let mut contacts: ContactStorage<Contact> = ContactStorage::new();
        let mut joints: JointStorage<Joint> = JointStorage::new();

        let mut body = RigidBody::new_dynamic(Vector2::zero());
        body.set_linear_damping(6.0);
        let handle = bodies.add(body);

        let mut island = Island::new(1, 0, 0);
        island.add_body(handle, bodies.get_mut(handle).unwrap()).unwrap();

        let step = TimeStep::new(0.1, 8, 3);
        let report = island
            .solve(&step, &config, &mut bodies, &mut contacts, &mut joints, &mut ())
            .unwrap();
        assert!(report.position_solved);

        // v = g * h * clamp(1 - 0.6, 0, 1)
        let body = bodies.get(handle).unwrap();
        assert_relative_eq!(body.get_linear_velocity().y, config.gravity.y * 0.1 * 0.4, epsilon = 1e-5);
        assert_relative_eq!(body.get_position().y, body.get_linear_velocity().y * 0.1, epsilon = 1e-5);
    }

    #[test]
    fn test_solve_toi_rejects_bad_index() {
        let config = SolverConfig::default();
        let mut bodies: BodyStorage<RigidBody> = BodyStorage::new();
        let mut contacts: ContactStorage<Contact> = ContactStorage::new();
        let handle = bodies.add(RigidBody::new_dynamic(Vector2::zero()));

        let mut island = Island::new(1, 0, 0);
        island.add_body(handle, bodies.get_mut(handle).unwrap()).unwrap();

        let step = TimeStep::new(0.1, 8, 20);
        let result = island.solve_toi(&step, &config, 0, 3, &mut bodies, &mut contacts, &mut ());
        assert!(matches!(result, Err(PhysicsError::InvalidIslandIndex(3))));
    }
}
