use crate::collision::contact::Contact;
use crate::collision::contact_solver::ContactVelocityConstraint;
use crate::core::settings::MAX_MANIFOLD_POINTS;
use crate::core::{BodyHandle, ContactHandle, JointHandle};
use std::collections::VecDeque;

/// Impulses the solver applied at each manifold point of a contact
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactImpulse {
    pub normal_impulses: [f32; MAX_MANIFOLD_POINTS],
    pub tangent_impulses: [f32; MAX_MANIFOLD_POINTS],

    /// Number of valid entries
    pub count: usize,
}

impl ContactImpulse {
    /// Collects the accumulated impulses of a solved constraint
    pub fn from_constraint(vc: &ContactVelocityConstraint) -> Self {
        let mut impulse = Self {
            count: vc.point_count,
            ..Self::default()
        };
        for (j, point) in vc.points[..vc.point_count].iter().enumerate() {
            impulse.normal_impulses[j] = point.normal_impulse;
            impulse.tangent_impulses[j] = point.tangent_impulse;
        }
        impulse
    }

    /// Sum of the normal impulses
    pub fn total_normal_impulse(&self) -> f32 {
        self.normal_impulses[..self.count].iter().sum()
    }
}

/// Receives solver reports
///
/// Every method defaults to doing nothing.
pub trait ContactListener {
    /// A contact was solved
    fn post_solve(&mut self, _handle: ContactHandle, _contact: &Contact, _impulse: &ContactImpulse) {}

    /// A body that asked for collision reports was pushed by a contact
    fn after_collision(
        &mut self,
        _body: BodyHandle,
        _other: BodyHandle,
        _contact: ContactHandle,
        _impulse: &ContactImpulse,
    ) {
    }

    /// A joint exceeded its breakpoint and was disabled
    fn joint_broke(&mut self, _joint: JointHandle, _force: f32) {}

    /// A body went to sleep with its island
    fn body_slept(&mut self, _body: BodyHandle) {}
}

/// A listener that ignores every report
impl ContactListener for () {}

/// Types of collision events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEventType {
    /// A contact was solved
    PostSolve,

    /// A contact pushed a body that generates collision events
    AfterCollision,
}

/// A collision event between two bodies
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    /// The type of collision event
    pub event_type: CollisionEventType,

    /// The contact that was solved
    pub contact: ContactHandle,

    /// The first body; for `AfterCollision`, the body being reported
    pub body_a: BodyHandle,

    /// The second body
    pub body_b: BodyHandle,

    /// Impulses applied by the solver
    pub impulse: ContactImpulse,
}

/// Types of joint events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointEventType {
    /// The reaction force exceeded the breakpoint
    Broke,
}

/// An event related to a joint
#[derive(Debug, Clone, PartialEq)]
pub struct JointEvent {
    /// The type of joint event
    pub event_type: JointEventType,

    /// The joint
    pub joint: JointHandle,

    /// Reaction force magnitude at the time of the event
    pub force: f32,
}

/// Types of body events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEventType {
    /// A body has gone to sleep
    Sleep,
}

/// An event related to a single body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyEvent {
    /// The type of body event
    pub event_type: BodyEventType,

    /// The body that the event refers to
    pub body: BodyHandle,
}

/// A queue of physics events
#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    /// Collision events
    collision_events: VecDeque<CollisionEvent>,

    /// Joint events
    joint_events: VecDeque<JointEvent>,

    /// Body events
    body_events: VecDeque<BodyEvent>,

    /// Whether `PostSolve` events are recorded
    record_post_solve: bool,
}

impl EventQueue {
    /// Creates a new empty event queue that skips `PostSolve` events
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether every solved contact is recorded
    pub fn set_record_post_solve(&mut self, record: bool) {
        self.record_post_solve = record;
    }

    /// Adds a collision event to the queue
    pub fn add_collision_event(&mut self, event: CollisionEvent) {
        self.collision_events.push_back(event);
    }

    /// Adds a joint event to the queue
    pub fn add_joint_event(&mut self, event: JointEvent) {
        self.joint_events.push_back(event);
    }

    /// Adds a body event to the queue
    pub fn add_body_event(&mut self, event: BodyEvent) {
        self.body_events.push_back(event);
    }

    /// Gets the next collision event from the queue
    pub fn next_collision_event(&mut self) -> Option<CollisionEvent> {
        self.collision_events.pop_front()
    }

    /// Gets the next joint event from the queue
    pub fn next_joint_event(&mut self) -> Option<JointEvent> {
        self.joint_events.pop_front()
    }

    /// Gets the next body event from the queue
    pub fn next_body_event(&mut self) -> Option<BodyEvent> {
        self.body_events.pop_front()
    }

    /// Returns whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.collision_events.is_empty() && self.joint_events.is_empty() && self.body_events.is_empty()
    }

    /// Clears all events from the queue
    pub fn clear(&mut self) {
        self.collision_events.clear();
        self.joint_events.clear();
        self.body_events.clear();
    }

    /// Moves every event of `other` to the back of this queue
    pub fn append(&mut self, other: &mut EventQueue) {
        self.collision_events.append(&mut other.collision_events);
        self.joint_events.append(&mut other.joint_events);
        self.body_events.append(&mut other.body_events);
    }

    /// Gets all collision events of a specific type
    pub fn get_collision_events_of_type(&self, event_type: CollisionEventType) -> Vec<&CollisionEvent> {
        self.collision_events
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Gets all joint events
    pub fn get_joint_events(&self) -> impl Iterator<Item = &JointEvent> {
        self.joint_events.iter()
    }

    /// Gets all body events of a specific type
    pub fn get_body_events_of_type(&self, event_type: BodyEventType) -> Vec<&BodyEvent> {
        self.body_events
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Gets all collision events involving a specific body
    pub fn get_collision_events_for_body(&self, body: BodyHandle) -> Vec<&CollisionEvent> {
        self.collision_events
            .iter()
            .filter(|e| e.body_a == body || e.body_b == body)
            .collect()
    }
}

impl ContactListener for EventQueue {
    fn post_solve(&mut self, handle: ContactHandle, contact: &Contact, impulse: &ContactImpulse) {
        if !self.record_post_solve {
            return;
        }
        self.add_collision_event(CollisionEvent {
            event_type: CollisionEventType::PostSolve,
            contact: handle,
            body_a: contact.get_body_a(),
            body_b: contact.get_body_b(),
            impulse: *impulse,
        });
    }

    fn after_collision(
        &mut self,
        body: BodyHandle,
        other: BodyHandle,
        contact: ContactHandle,
        impulse: &ContactImpulse,
    ) {
        self.add_collision_event(CollisionEvent {
            event_type: CollisionEventType::AfterCollision,
            contact,
            body_a: body,
            body_b: other,
            impulse: *impulse,
        });
    }

    fn joint_broke(&mut self, joint: JointHandle, force: f32) {
        self.add_joint_event(JointEvent {
            event_type: JointEventType::Broke,
            joint,
            force,
        });
    }

    fn body_slept(&mut self, body: BodyHandle) {
        self.add_body_event(BodyEvent {
            event_type: BodyEventType::Sleep,
            body,
        });
    }
}
