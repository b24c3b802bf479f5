use crate::constraints::revolute::RevoluteJoint;
use crate::constraints::rope::RopeJoint;
use crate::core::time_step::SolverData;
use crate::core::BodyHandle;
use crate::math::Vector2;

/// Island indices and mass data of the two bodies of a joint
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyPair {
    pub index_a: usize,
    pub index_b: usize,
}

/// State of a one- or two-sided joint limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitState {
    /// The limit is not active
    #[default]
    Inactive,

    /// At the lower bound, only positive limit impulses are allowed
    AtLower,

    /// At the upper bound, only negative limit impulses are allowed
    AtUpper,

    /// Bounds coincide, the limit acts as a lock
    Equal,
}

/// The solver contract every joint kind implements
///
/// Joints are solved with the same sequential-impulse scheme as contacts.
/// Accumulated impulses live in the joint and seed the next step.
pub trait JointConstraint {
    /// Caches anchors and effective masses, and applies the warm-start impulse
    fn init_velocity_constraints(&mut self, bodies: BodyPair, data: &mut SolverData);

    /// Applies one velocity iteration
    fn solve_velocity_constraints(&mut self, data: &mut SolverData);

    /// Applies one position iteration; returns whether the error is within tolerance
    fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool;

    /// Reaction force on body B at the anchor, in newtons
    fn reaction_force(&self, inv_dt: f32) -> Vector2;

    /// Reaction torque on body B, in newton-meters
    fn reaction_torque(&self, inv_dt: f32) -> f32;
}

/// The supported joint kinds
#[derive(Debug, Clone, PartialEq)]
pub enum JointKind {
    Revolute(RevoluteJoint),
    Rope(RopeJoint),
}

impl JointKind {
    /// Name of the joint kind
    pub fn name(&self) -> &'static str {
        match self {
            JointKind::Revolute(_) => "Revolute",
            JointKind::Rope(_) => "Rope",
        }
    }
}

impl JointConstraint for JointKind {
    fn init_velocity_constraints(&mut self, bodies: BodyPair, data: &mut SolverData) {
        match self {
            JointKind::Revolute(joint) => joint.init_velocity_constraints(bodies, data),
            JointKind::Rope(joint) => joint.init_velocity_constraints(bodies, data),
        }
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        match self {
            JointKind::Revolute(joint) => joint.solve_velocity_constraints(data),
            JointKind::Rope(joint) => joint.solve_velocity_constraints(data),
        }
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        match self {
            JointKind::Revolute(joint) => joint.solve_position_constraints(data),
            JointKind::Rope(joint) => joint.solve_position_constraints(data),
        }
    }

    fn reaction_force(&self, inv_dt: f32) -> Vector2 {
        match self {
            JointKind::Revolute(joint) => joint.reaction_force(inv_dt),
            JointKind::Rope(joint) => joint.reaction_force(inv_dt),
        }
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        match self {
            JointKind::Revolute(joint) => joint.reaction_torque(inv_dt),
            JointKind::Rope(joint) => joint.reaction_torque(inv_dt),
        }
    }
}

impl From<RevoluteJoint> for JointKind {
    fn from(joint: RevoluteJoint) -> Self {
        JointKind::Revolute(joint)
    }
}

impl From<RopeJoint> for JointKind {
    fn from(joint: RopeJoint) -> Self {
        JointKind::Rope(joint)
    }
}

/// A joint between two bodies
///
/// A joint that must hold a body in place is attached to a static body.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    /// The first body
    body_a: BodyHandle,

    /// The second body
    body_b: BodyHandle,

    /// Kind-specific state
    kind: JointKind,

    /// Whether the joint takes part in the solver
    enabled: bool,

    /// Reaction force above which the joint breaks
    breakpoint: f32,

    /// Whether contacts between the two bodies are solved
    collide_connected: bool,

    /// Set while the joint is being added to an island
    pub(crate) island_flag: bool,
}

impl Joint {
    /// Creates an enabled, unbreakable joint
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, kind: impl Into<JointKind>) -> Self {
        Self {
            body_a,
            body_b,
            kind: kind.into(),
            enabled: true,
            breakpoint: f32::MAX,
            collide_connected: false,
            island_flag: false,
        }
    }

    /// Sets the breaking force
    pub fn with_breakpoint(mut self, breakpoint: f32) -> Self {
        self.breakpoint = breakpoint;
        self
    }

    /// Sets whether the connected bodies still collide
    pub fn with_collide_connected(mut self, collide_connected: bool) -> Self {
        self.collide_connected = collide_connected;
        self
    }

    /// The first body
    pub fn get_body_a(&self) -> BodyHandle {
        self.body_a
    }

    /// The second body
    pub fn get_body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// The body on the other side of the joint, if `body` is attached to it
    pub fn get_other(&self, body: BodyHandle) -> Option<BodyHandle> {
        if body == self.body_a {
            Some(self.body_b)
        } else if body == self.body_b {
            Some(self.body_a)
        } else {
            None
        }
    }

    /// Returns whether the joint connects `a` and `b`, in either order
    pub fn connects(&self, a: BodyHandle, b: BodyHandle) -> bool {
        (self.body_a == a && self.body_b == b) || (self.body_a == b && self.body_b == a)
    }

    /// Kind-specific state
    pub fn kind(&self) -> &JointKind {
        &self.kind
    }

    /// Mutable kind-specific state
    pub fn kind_mut(&mut self) -> &mut JointKind {
        &mut self.kind
    }

    /// The revolute joint, if this is one
    pub fn as_revolute(&self) -> Option<&RevoluteJoint> {
        match &self.kind {
            JointKind::Revolute(joint) => Some(joint),
            _ => None,
        }
    }

    /// The revolute joint, if this is one
    pub fn as_revolute_mut(&mut self) -> Option<&mut RevoluteJoint> {
        match &mut self.kind {
            JointKind::Revolute(joint) => Some(joint),
            _ => None,
        }
    }

    /// The rope joint, if this is one
    pub fn as_rope(&self) -> Option<&RopeJoint> {
        match &self.kind {
            JointKind::Rope(joint) => Some(joint),
            _ => None,
        }
    }

    /// The rope joint, if this is one
    pub fn as_rope_mut(&mut self) -> Option<&mut RopeJoint> {
        match &mut self.kind {
            JointKind::Rope(joint) => Some(joint),
            _ => None,
        }
    }

    /// Returns whether the joint is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the joint
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The breaking force
    pub fn get_breakpoint(&self) -> f32 {
        self.breakpoint
    }

    /// Sets the breaking force; `f32::MAX` makes the joint unbreakable
    pub fn set_breakpoint(&mut self, breakpoint: f32) {
        self.breakpoint = breakpoint;
    }

    /// Returns whether contacts between the connected bodies are solved
    pub fn get_collide_connected(&self) -> bool {
        self.collide_connected
    }

    /// Reaction force on body B
    pub fn get_reaction_force(&self, inv_dt: f32) -> Vector2 {
        self.kind.reaction_force(inv_dt)
    }

    /// Reaction torque on body B
    pub fn get_reaction_torque(&self, inv_dt: f32) -> f32 {
        self.kind.reaction_torque(inv_dt)
    }

    /// Breaks the joint when its reaction force exceeds the breakpoint
    ///
    /// Returns the reaction force magnitude if the joint broke during this
    /// call. A broken joint stays disabled.
    pub fn validate(&mut self, inv_dt: f32) -> Option<f32> {
        if !self.enabled || self.breakpoint == f32::MAX {
            return None;
        }

        let force = self.kind.reaction_force(inv_dt).length();
        if force > self.breakpoint {
            self.enabled = false;
            return Some(force);
        }

        None
    }
}
