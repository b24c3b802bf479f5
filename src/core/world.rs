use crate::bodies::RigidBody;
use crate::collision::contact::contact_flags::ContactFlags;
use crate::collision::contact::Contact;
use crate::collision::narrow_phase::Narrowphase;
use crate::collision::time_of_impact::{time_of_impact, ToiInput, ToiState};
use crate::constraints::{Joint, RevoluteJoint, RopeJoint};
use crate::core::config::SolverConfig;
use crate::core::events::{ContactListener, EventQueue};
use crate::core::island::Island;
use crate::core::settings::MAX_TOI_CONTACTS;
use crate::core::storage::{BodyStorage, ContactStorage, JointStorage, SlotHandle, Storage};
use crate::core::time_step::TimeStep;
use crate::core::{BodyHandle, ContactHandle, JointHandle};
use crate::error::PhysicsError;
use crate::math::Vector2;
use crate::Result;
use tracing::{debug, trace, warn};

/// The physics world: owns bodies, joints and contacts and advances them in time
///
/// Contacts are supplied by the caller (typically from a broad phase) and
/// their manifolds are refreshed every step through a `Narrowphase`.
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    /// All rigid bodies in the world
    bodies: BodyStorage<RigidBody>,

    /// All joints in the world
    joints: JointStorage<Joint>,

    /// All contacts in the world
    contacts: ContactStorage<Contact>,

    /// Configuration for the simulation
    config: SolverConfig,

    /// Queue of events produced by `step`
    events: EventQueue,

    /// Reused island working set
    island: Island,

    /// Contacts of each body, indexed by body slot
    body_contacts: Vec<Vec<ContactHandle>>,

    /// Joints of each body, indexed by body slot
    body_joints: Vec<Vec<JointHandle>>,

    /// Whether each body slot is already part of the island being built
    island_flags: Vec<bool>,

    /// Depth-first search stack of the island builder
    stack: Vec<BodyHandle>,

    /// Inverse of the previous time step, 0 before the first step
    inv_dt0: f32,

    /// False while a sub-stepped TOI phase has events left
    step_complete: bool,

    /// The total elapsed simulation time
    time: f32,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Creates a new physics world with default settings
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    /// Creates a new physics world with the given configuration
    pub fn with_config(config: SolverConfig) -> Self {
        let mut island = Island::default();
        island.configure(&config);

        Self {
            bodies: BodyStorage::new(),
            joints: JointStorage::new(),
            contacts: ContactStorage::new(),
            config,
            events: EventQueue::new(),
            island,
            body_contacts: Vec::new(),
            body_joints: Vec::new(),
            island_flags: Vec::new(),
            stack: Vec::new(),
            inv_dt0: 0.0,
            step_complete: true,
            time: 0.0,
        }
    }

    /// Returns the current simulation time
    pub fn get_time(&self) -> f32 {
        self.time
    }

    /// Sets the gravity for the simulation
    pub fn set_gravity(&mut self, gravity: Vector2) {
        self.config.gravity = gravity;
    }

    /// Gets the current gravity
    pub fn get_gravity(&self) -> Vector2 {
        self.config.gravity
    }

    /// Returns a reference to the simulation configuration
    pub fn get_config(&self) -> &SolverConfig {
        &self.config
    }

    /// Returns a mutable reference to the simulation configuration
    pub fn get_config_mut(&mut self) -> &mut SolverConfig {
        &mut self.config
    }

    /// Returns whether the last step ran its TOI phase to completion
    pub fn is_step_complete(&self) -> bool {
        self.step_complete
    }

    /// Adds a rigid body to the world and returns its handle
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        self.bodies.add(body)
    }

    /// Removes a rigid body together with its joints and contacts
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        self.bodies.get_checked(handle)?;

        let joints: Vec<JointHandle> = self
            .joints
            .iter()
            .filter(|(_, joint)| joint.get_other(handle).is_some())
            .map(|(h, _)| h)
            .collect();
        for joint in joints {
            self.remove_joint(joint)?;
        }

        let contacts: Vec<ContactHandle> = self
            .contacts
            .iter()
            .filter(|(_, contact)| contact.get_other(handle).is_some())
            .map(|(h, _)| h)
            .collect();
        for contact in contacts {
            self.contacts.remove(contact);
        }

        self.bodies
            .remove(handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("{:?} not found", handle)))
    }

    /// Gets a reference to a rigid body by its handle
    pub fn get_body(&self, handle: BodyHandle) -> Result<&RigidBody> {
        self.bodies.get_checked(handle)
    }

    /// Gets a mutable reference to a rigid body by its handle
    pub fn get_body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody> {
        self.bodies.get_checked_mut(handle)
    }

    /// Iterates over all bodies
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> + '_ {
        self.bodies.iter()
    }

    /// Number of bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Adds a contact between two existing, distinct bodies
    pub fn add_contact(&mut self, contact: Contact) -> Result<ContactHandle> {
        let (a, b) = (contact.get_body_a(), contact.get_body_b());
        self.bodies.get_checked(a)?;
        self.bodies.get_checked(b)?;
        if a == b {
            return Err(PhysicsError::InvalidParameter(format!(
                "contact connects {:?} to itself",
                a
            )));
        }
        Ok(self.contacts.add(contact))
    }

    /// Removes a contact
    pub fn remove_contact(&mut self, handle: ContactHandle) -> Result<Contact> {
        self.contacts
            .remove(handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("{:?} not found", handle)))
    }

    /// Gets a contact by its handle
    pub fn get_contact(&self, handle: ContactHandle) -> Result<&Contact> {
        self.contacts.get_checked(handle)
    }

    /// Gets a contact mutably by its handle
    pub fn get_contact_mut(&mut self, handle: ContactHandle) -> Result<&mut Contact> {
        self.contacts.get_checked_mut(handle)
    }

    /// Iterates over all contacts
    pub fn contacts(&self) -> impl Iterator<Item = (ContactHandle, &Contact)> + '_ {
        self.contacts.iter()
    }

    /// Number of contacts
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Adds a joint between two existing, distinct bodies
    pub fn add_joint(&mut self, joint: Joint) -> Result<JointHandle> {
        let (a, b) = (joint.get_body_a(), joint.get_body_b());
        if a == b {
            return Err(PhysicsError::InvalidJoint(format!(
                "{} joint connects {:?} to itself",
                joint.kind().name(),
                a
            )));
        }
        for body in [a, b] {
            if self.bodies.get(body).is_none() {
                return Err(PhysicsError::InvalidJoint(format!(
                    "{} joint refers to missing {:?}",
                    joint.kind().name(),
                    body
                )));
            }
        }
        Ok(self.joints.add(joint))
    }

    /// Pins two bodies together at a world anchor
    pub fn add_revolute_joint(&mut self, a: BodyHandle, b: BodyHandle, anchor: Vector2) -> Result<JointHandle> {
        let body_a = self.bodies.get_checked(a)?;
        let body_b = self.bodies.get_checked(b)?;
        let revolute = RevoluteJoint::new(
            body_a.get_local_point(anchor),
            body_b.get_local_point(anchor),
            body_b.get_angle() - body_a.get_angle(),
        );
        self.add_joint(Joint::new(a, b, revolute))
    }

    /// Limits the distance between two world anchors
    pub fn add_rope_joint(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
        anchor_a: Vector2,
        anchor_b: Vector2,
        max_length: f32,
    ) -> Result<JointHandle> {
        if !(max_length > 0.0) {
            return Err(PhysicsError::InvalidParameter(format!(
                "rope length must be positive, got {}",
                max_length
            )));
        }
        let body_a = self.bodies.get_checked(a)?;
        let body_b = self.bodies.get_checked(b)?;
        let rope = RopeJoint::new(
            body_a.get_local_point(anchor_a),
            body_b.get_local_point(anchor_b),
            max_length,
        );
        self.add_joint(Joint::new(a, b, rope))
    }

    /// Removes a joint and wakes its bodies
    pub fn remove_joint(&mut self, handle: JointHandle) -> Result<Joint> {
        let joint = self
            .joints
            .remove(handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("{:?} not found", handle)))?;
        self.wake_bodies(joint.get_body_a(), joint.get_body_b());
        Ok(joint)
    }

    /// Gets a joint by its handle
    pub fn get_joint(&self, handle: JointHandle) -> Result<&Joint> {
        self.joints.get_checked(handle)
    }

    /// Gets a joint mutably by its handle
    ///
    /// Changes made through this reference do not wake the bodies.
    pub fn get_joint_mut(&mut self, handle: JointHandle) -> Result<&mut Joint> {
        self.joints.get_checked_mut(handle)
    }

    /// Iterates over all joints
    pub fn joints(&self) -> impl Iterator<Item = (JointHandle, &Joint)> + '_ {
        self.joints.iter()
    }

    /// Number of joints
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Enables or disables the angle limit of a revolute joint
    pub fn enable_revolute_limit(&mut self, handle: JointHandle, flag: bool) -> Result<()> {
        self.update_revolute(handle, |joint| joint.enable_limit(flag))
    }

    /// Sets the angle limits of a revolute joint
    pub fn set_revolute_limits(&mut self, handle: JointHandle, lower: f32, upper: f32) -> Result<()> {
        if lower > upper {
            return Err(PhysicsError::InvalidParameter(format!(
                "lower limit {} exceeds upper limit {}",
                lower, upper
            )));
        }
        self.update_revolute(handle, |joint| joint.set_limits(lower, upper))
    }

    /// Enables or disables the motor of a revolute joint
    pub fn enable_revolute_motor(&mut self, handle: JointHandle, flag: bool) -> Result<()> {
        self.update_revolute(handle, |joint| joint.enable_motor(flag))
    }

    /// Sets the motor speed of a revolute joint
    pub fn set_revolute_motor_speed(&mut self, handle: JointHandle, speed: f32) -> Result<()> {
        self.update_revolute(handle, |joint| joint.set_motor_speed(speed))
    }

    /// Sets the maximum motor torque of a revolute joint
    pub fn set_revolute_max_motor_torque(&mut self, handle: JointHandle, torque: f32) -> Result<()> {
        self.update_revolute(handle, |joint| joint.set_max_motor_torque(torque))
    }

    /// Applies a change to a revolute joint, waking its bodies if anything changed
    fn update_revolute<F>(&mut self, handle: JointHandle, change: F) -> Result<()>
    where
        F: FnOnce(&mut RevoluteJoint) -> bool,
    {
        let joint = self.joints.get_checked_mut(handle)?;
        let (a, b) = (joint.get_body_a(), joint.get_body_b());
        let revolute = joint
            .as_revolute_mut()
            .ok_or_else(|| PhysicsError::InvalidJoint(format!("{:?} is not a revolute joint", handle)))?;

        if change(revolute) {
            self.wake_bodies(a, b);
        }
        Ok(())
    }

    fn wake_bodies(&mut self, a: BodyHandle, b: BodyHandle) {
        for handle in [a, b] {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.wake_up();
            }
        }
    }

    /// Events recorded by `step`
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Mutable access to the recorded events
    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Takes the recorded events, leaving an empty queue with the same settings
    pub fn drain_events(&mut self) -> EventQueue {
        let mut drained = EventQueue::new();
        drained.append(&mut self.events);
        drained
    }

    /// Advances the world by the configured fixed time step
    pub fn step_fixed(&mut self, narrowphase: &mut dyn Narrowphase) -> Result<()> {
        self.step(self.config.time_step, narrowphase)
    }

    /// Advances the world by `dt`, recording events in the world's queue
    pub fn step(&mut self, dt: f32, narrowphase: &mut dyn Narrowphase) -> Result<()> {
        let mut events = std::mem::take(&mut self.events);
        let result = self.step_with_listener(dt, narrowphase, &mut events);
        self.events = events;
        result
    }

    /// Advances the world by `dt`, reporting to `listener`
    ///
    /// Collides the awake contacts, solves every island, then resolves the
    /// time of impact of fast bodies. Forces are cleared afterwards.
    pub fn step_with_listener(
        &mut self,
        dt: f32,
        narrowphase: &mut dyn Narrowphase,
        listener: &mut dyn ContactListener,
    ) -> Result<()> {
        if !(dt >= 0.0) {
            return Err(PhysicsError::InvalidParameter(format!(
                "time step must not be negative, got {}",
                dt
            )));
        }
        self.config.validate()?;

        let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };
        let step = TimeStep {
            dt,
            inv_dt,
            dt_ratio: self.inv_dt0 * dt,
            velocity_iterations: self.config.velocity_iterations,
            position_iterations: self.config.position_iterations,
            warm_starting: self.config.warm_starting,
        };

        self.rebuild_adjacency();
        self.island.configure(&self.config);

        self.collide(narrowphase)?;

        if self.step_complete && step.dt > 0.0 {
            self.solve(&step, listener)?;
        }

        if self.config.continuous_physics && step.dt > 0.0 {
            self.solve_toi(&step, narrowphase, listener)?;
        }

        if step.dt > 0.0 {
            self.inv_dt0 = step.inv_dt;
        }

        self.clear_forces();
        self.time += dt;

        trace!(dt, time = self.time, step_complete = self.step_complete, "world step");
        Ok(())
    }

    /// Clears the force and torque accumulators of every body
    pub fn clear_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            body.clear_forces();
        }
    }

    fn rebuild_adjacency(&mut self) {
        let slots = self.bodies.slot_count();

        for list in self.body_contacts.iter_mut() {
            list.clear();
        }
        self.body_contacts.resize_with(slots, Vec::new);

        for list in self.body_joints.iter_mut() {
            list.clear();
        }
        self.body_joints.resize_with(slots, Vec::new);

        for (handle, contact) in self.contacts.iter() {
            self.body_contacts[contact.get_body_a().slot()].push(handle);
            self.body_contacts[contact.get_body_b().slot()].push(handle);
        }
        for (handle, joint) in self.joints.iter() {
            self.body_joints[joint.get_body_a().slot()].push(handle);
            self.body_joints[joint.get_body_b().slot()].push(handle);
        }

        self.island_flags.clear();
        self.island_flags.resize(slots, false);
    }

    /// Whether a contact between `a` and `b` may be solved
    ///
    /// At least one body must be dynamic, and no joint between them may
    /// forbid collision.
    fn should_collide(
        bodies: &BodyStorage<RigidBody>,
        joints: &JointStorage<Joint>,
        body_joints: &[Vec<JointHandle>],
        a: BodyHandle,
        b: BodyHandle,
    ) -> bool {
        let is_dynamic = |handle| {
            bodies
                .get(handle)
                .map_or(false, |body: &RigidBody| body.get_body_type().is_dynamic())
        };
        if !is_dynamic(a) && !is_dynamic(b) {
            return false;
        }

        body_joints.get(a.slot()).map_or(true, |list| {
            list.iter().all(|&handle| {
                joints
                    .get(handle)
                    .map_or(true, |joint| joint.get_collide_connected() || !joint.connects(a, b))
            })
        })
    }

    /// Refreshes the manifold of every contact with an awake, movable body
    fn collide(&mut self, narrowphase: &mut dyn Narrowphase) -> Result<()> {
        for (_, contact) in self.contacts.iter_mut() {
            let (a, b) = (contact.get_body_a(), contact.get_body_b());
            let body_a = self.bodies.get_checked(a)?;
            let body_b = self.bodies.get_checked(b)?;

            let active_a = body_a.is_awake() && !body_a.get_body_type().is_static();
            let active_b = body_b.is_awake() && !body_b.get_body_type().is_static();
            if !active_a && !active_b {
                continue;
            }

            if !Self::should_collide(&self.bodies, &self.joints, &self.body_joints, a, b) {
                contact.set_enabled(false);
                continue;
            }

            let (xf_a, xf_b) = (body_a.get_transform(), body_b.get_transform());
            let was_touching = contact.is_touching();
            let touching = contact.update(narrowphase, &xf_a, &xf_b);

            if touching != was_touching {
                let (body_a, body_b) = self.bodies.get_pair_mut(a, b)?;
                body_a.wake_up();
                body_b.wake_up();
            }
        }
        Ok(())
    }

    /// Finds islands of awake bodies and solves each one
    fn solve(&mut self, step: &TimeStep, listener: &mut dyn ContactListener) -> Result<()> {
        self.island
            .reset(self.bodies.len(), self.contacts.len(), self.joints.len());

        for flag in self.island_flags.iter_mut() {
            *flag = false;
        }
        for (_, contact) in self.contacts.iter_mut() {
            contact.set_flag(ContactFlags::ISLAND, false);
        }
        for (_, joint) in self.joints.iter_mut() {
            joint.island_flag = false;
        }

        let mut island_count = 0;
        for slot in 0..self.bodies.slot_count() {
            let seed = BodyHandle::from_slot(slot as u32);
            let Some(body) = self.bodies.get(seed) else {
                continue;
            };

            if self.island_flags[slot] || !body.is_awake() || body.get_body_type().is_static() {
                continue;
            }

            // Depth-first search over the constraint graph.
            self.island.clear();
            self.stack.clear();
            self.stack.push(seed);
            self.island_flags[slot] = true;

            while let Some(handle) = self.stack.pop() {
                let body = self.bodies.get_checked_mut(handle)?;
                self.island.add_body(handle, body)?;
                body.wake_up();

                // Static bodies do not propagate islands.
                if body.get_body_type().is_static() {
                    continue;
                }

                for &contact_handle in &self.body_contacts[handle.slot()] {
                    let contact = self.contacts.get_checked_mut(contact_handle)?;
                    if contact.flags().contains(ContactFlags::ISLAND)
                        || !contact.is_enabled()
                        || !contact.is_touching()
                    {
                        continue;
                    }

                    contact.set_flag(ContactFlags::ISLAND, true);
                    self.island.add_contact(contact_handle)?;

                    let Some(other) = contact.get_other(handle) else {
                        continue;
                    };
                    if self.island_flags[other.slot()] {
                        continue;
                    }
                    self.island_flags[other.slot()] = true;
                    self.stack.push(other);
                }

                for &joint_handle in &self.body_joints[handle.slot()] {
                    let joint = self.joints.get_checked_mut(joint_handle)?;
                    if joint.island_flag || !joint.is_enabled() {
                        continue;
                    }

                    joint.island_flag = true;
                    self.island.add_joint(joint_handle)?;

                    let Some(other) = joint.get_other(handle) else {
                        continue;
                    };
                    if self.island_flags[other.slot()] {
                        continue;
                    }
                    self.island_flags[other.slot()] = true;
                    self.stack.push(other);
                }
            }

            self.island.solve(
                step,
                &self.config,
                &mut self.bodies,
                &mut self.contacts,
                &mut self.joints,
                listener,
            )?;
            island_count += 1;

            // Allow static bodies to take part in other islands.
            for &handle in self.island.bodies() {
                if self.bodies.get_checked(handle)?.get_body_type().is_static() {
                    self.island_flags[handle.slot()] = false;
                }
            }
        }

        debug!(islands = island_count, bodies = self.bodies.len(), "solved islands");
        Ok(())
    }

    /// Computes the time of impact of every candidate contact and returns the earliest
    fn find_min_toi(&mut self) -> Result<(Option<ContactHandle>, f32)> {
        let mut min_contact = None;
        let mut min_alpha = 1.0;

        for (handle, contact) in self.contacts.iter_mut() {
            if !contact.is_enabled() {
                continue;
            }

            // Prevent excessive sub-stepping.
            if contact.toi_count > self.config.max_sub_steps {
                continue;
            }

            let alpha = if contact.flags().contains(ContactFlags::TOI) {
                // This contact has a valid cached TOI.
                contact.toi
            } else {
                let (body_a, body_b) = self.bodies.get_pair_mut(contact.get_body_a(), contact.get_body_b())?;

                let active_a = body_a.is_awake() && !body_a.get_body_type().is_static();
                let active_b = body_b.is_awake() && !body_b.get_body_type().is_static();
                if !active_a && !active_b {
                    continue;
                }

                // Two non-bullet dynamic bodies are left to the discrete solver.
                let collide_a = body_a.is_bullet() || !body_a.get_body_type().is_dynamic();
                let collide_b = body_b.is_bullet() || !body_b.get_body_type().is_dynamic();
                if !collide_a && !collide_b {
                    continue;
                }

                // Put the sweeps onto the same time interval.
                let alpha0_a = body_a.get_sweep().alpha0;
                let alpha0_b = body_b.get_sweep().alpha0;
                let alpha0 = alpha0_a.max(alpha0_b);
                if alpha0_a < alpha0_b {
                    body_a.sweep_mut().advance(alpha0);
                } else if alpha0_b < alpha0_a {
                    body_b.sweep_mut().advance(alpha0);
                }

                let output = time_of_impact(&ToiInput {
                    proxy_a: contact.get_proxy_a(),
                    proxy_b: contact.get_proxy_b(),
                    sweep_a: *body_a.get_sweep(),
                    sweep_b: *body_b.get_sweep(),
                    t_max: 1.0,
                });

                if output.state == ToiState::Failed {
                    warn!(
                        contact = ?handle,
                        t = output.t,
                        iterations = output.stats.iterations,
                        "time of impact did not converge"
                    );
                }

                // Beta is the fraction of the remaining portion of the sweep.
                let alpha = if output.state == ToiState::Touching {
                    (alpha0 + (1.0 - alpha0) * output.t).min(1.0)
                } else {
                    1.0
                };

                contact.toi = alpha;
                contact.set_flag(ContactFlags::TOI, true);
                alpha
            };

            if alpha < min_alpha {
                min_contact = Some(handle);
                min_alpha = alpha;
            }
        }

        Ok((min_contact, min_alpha))
    }

    /// Adds the contacts of `body` that need continuous handling to the TOI island
    fn gather_toi_contacts(
        &mut self,
        body: BodyHandle,
        min_alpha: f32,
        narrowphase: &mut dyn Narrowphase,
    ) -> Result<()> {
        let is_bullet = self.bodies.get_checked(body)?.is_bullet();

        for &contact_handle in &self.body_contacts[body.slot()] {
            if self.island.body_count() >= 2 * MAX_TOI_CONTACTS
                || self.island.contacts().len() >= MAX_TOI_CONTACTS
            {
                break;
            }

            let contact = self.contacts.get_checked(contact_handle)?;
            if contact.flags().contains(ContactFlags::ISLAND) {
                continue;
            }
            let (a, b) = (contact.get_body_a(), contact.get_body_b());
            let Some(other) = contact.get_other(body) else {
                continue;
            };

            // Only add static, kinematic, or bullet bodies.
            let other_body = self.bodies.get_checked(other)?;
            if other_body.get_body_type().is_dynamic() && !is_bullet && !other_body.is_bullet() {
                continue;
            }
            if !Self::should_collide(&self.bodies, &self.joints, &self.body_joints, a, b) {
                continue;
            }

            // Tentatively advance the body to the TOI.
            let backup = *other_body.get_sweep();
            if !self.island_flags[other.slot()] {
                self.bodies.get_checked_mut(other)?.advance(min_alpha);
            }

            let xf_a = self.bodies.get_checked(a)?.get_transform();
            let xf_b = self.bodies.get_checked(b)?.get_transform();
            let contact = self.contacts.get_checked_mut(contact_handle)?;
            let touching = contact.update(narrowphase, &xf_a, &xf_b);

            if !contact.is_enabled() || !touching {
                let other_body = self.bodies.get_checked_mut(other)?;
                *other_body.sweep_mut() = backup;
                other_body.synchronize_transform();
                continue;
            }

            contact.set_flag(ContactFlags::ISLAND, true);
            self.island.add_contact(contact_handle)?;

            if self.island_flags[other.slot()] {
                continue;
            }
            self.island_flags[other.slot()] = true;

            let other_body = self.bodies.get_checked_mut(other)?;
            if !other_body.get_body_type().is_static() {
                other_body.wake_up();
            }
            self.island.add_body(other, other_body)?;
        }

        Ok(())
    }

    /// Resolves the earliest times of impact one sub-step at a time
    fn solve_toi(
        &mut self,
        step: &TimeStep,
        narrowphase: &mut dyn Narrowphase,
        listener: &mut dyn ContactListener,
    ) -> Result<()> {
        self.island.reset(2 * MAX_TOI_CONTACTS, MAX_TOI_CONTACTS, 0);

        if self.step_complete {
            for flag in self.island_flags.iter_mut() {
                *flag = false;
            }
            for (_, body) in self.bodies.iter_mut() {
                body.sweep_mut().alpha0 = 0.0;
            }
            for (_, contact) in self.contacts.iter_mut() {
                contact.set_flag(ContactFlags::TOI | ContactFlags::ISLAND, false);
                contact.toi_count = 0;
                contact.toi = 1.0;
            }
        }

        loop {
            let (min_contact, min_alpha) = self.find_min_toi()?;
            let min_contact = match min_contact {
                Some(handle) if min_alpha < 1.0 - 10.0 * f32::EPSILON => handle,
                _ => {
                    // No more TOI events.
                    self.step_complete = true;
                    break;
                }
            };

            // Advance the bodies to the TOI.
            let contact = self.contacts.get_checked(min_contact)?;
            let (a, b) = (contact.get_body_a(), contact.get_body_b());
            let (body_a, body_b) = self.bodies.get_pair_mut(a, b)?;
            let backup_a = *body_a.get_sweep();
            let backup_b = *body_b.get_sweep();
            body_a.advance(min_alpha);
            body_b.advance(min_alpha);
            let (xf_a, xf_b) = (body_a.get_transform(), body_b.get_transform());

            // The TOI contact likely has some new contact points.
            let contact = self.contacts.get_checked_mut(min_contact)?;
            contact.update(narrowphase, &xf_a, &xf_b);
            contact.set_flag(ContactFlags::TOI, false);
            contact.toi_count += 1;

            if !contact.is_enabled() || !contact.is_touching() {
                // Restore the sweeps.
                contact.set_enabled(false);
                let (body_a, body_b) = self.bodies.get_pair_mut(a, b)?;
                *body_a.sweep_mut() = backup_a;
                *body_b.sweep_mut() = backup_b;
                body_a.synchronize_transform();
                body_b.synchronize_transform();
                continue;
            }

            // Build the island around the TOI contact.
            self.island.clear();
            for handle in [a, b] {
                let body = self.bodies.get_checked_mut(handle)?;
                body.wake_up();
                self.island.add_body(handle, body)?;
                self.island_flags[handle.slot()] = true;
            }
            self.island.add_contact(min_contact)?;
            contact.set_flag(ContactFlags::ISLAND, true);

            for handle in [a, b] {
                if self.bodies.get_checked(handle)?.get_body_type().is_dynamic() {
                    self.gather_toi_contacts(handle, min_alpha, narrowphase)?;
                }
            }

            let dt = (1.0 - min_alpha) * step.dt;
            let sub_step = TimeStep {
                dt,
                inv_dt: 1.0 / dt,
                dt_ratio: 1.0,
                velocity_iterations: self.config.toi_velocity_iterations,
                position_iterations: self.config.toi_position_iterations,
                warm_starting: false,
            };

            let index_a = self.bodies.get_checked(a)?.island_index;
            let index_b = self.bodies.get_checked(b)?.island_index;

            debug!(
                contact = ?min_contact,
                alpha = min_alpha,
                bodies = self.island.body_count(),
                contacts = self.island.contacts().len(),
                "TOI sub-step"
            );

            self.island.solve_toi(
                &sub_step,
                &self.config,
                index_a,
                index_b,
                &mut self.bodies,
                &mut self.contacts,
                listener,
            )?;

            // Reset island flags and invalidate the TOIs of contacts on moved bodies.
            for &handle in self.island.bodies() {
                self.island_flags[handle.slot()] = false;

                if !self.bodies.get_checked(handle)?.get_body_type().is_dynamic() {
                    continue;
                }

                for &contact_handle in &self.body_contacts[handle.slot()] {
                    if let Some(contact) = self.contacts.get_mut(contact_handle) {
                        contact.set_flag(ContactFlags::TOI | ContactFlags::ISLAND, false);
                    }
                }
            }

            if self.config.sub_stepping {
                self.step_complete = false;
                break;
            }
        }

        Ok(())
    }
}
