use crate::constraints::joint::{BodyPair, JointConstraint, LimitState};
use crate::core::settings::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};
use crate::core::time_step::{SolverData, SolverPosition, SolverVelocity};
use crate::math::{clamp, Rotation, Vector2};

/// A rope joint bounds the distance between two anchors from above
///
/// The rope pulls only when taut and never pushes.
#[derive(Debug, Clone, PartialEq)]
pub struct RopeJoint {
    /// Anchor in body A's local frame
    local_anchor_a: Vector2,

    /// Anchor in body B's local frame
    local_anchor_b: Vector2,

    /// Maximum anchor distance
    max_length: f32,

    /// Accumulated impulse along `u`, never positive
    impulse: f32,

    state: LimitState,

    // Solver temporaries
    index_a: usize,
    index_b: usize,
    u: Vector2,
    r_a: Vector2,
    r_b: Vector2,
    local_center_a: Vector2,
    local_center_b: Vector2,
    length: f32,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    mass: f32,
}

impl RopeJoint {
    /// Creates a rope joint from local anchors and the maximum length
    pub fn new(local_anchor_a: Vector2, local_anchor_b: Vector2, max_length: f32) -> Self {
        Self {
            local_anchor_a,
            local_anchor_b,
            max_length,
            impulse: 0.0,
            state: LimitState::Inactive,
            index_a: 0,
            index_b: 0,
            u: Vector2::zero(),
            r_a: Vector2::zero(),
            r_b: Vector2::zero(),
            local_center_a: Vector2::zero(),
            local_center_b: Vector2::zero(),
            length: 0.0,
            inv_mass_a: 0.0,
            inv_mass_b: 0.0,
            inv_i_a: 0.0,
            inv_i_b: 0.0,
            mass: 0.0,
        }
    }

    /// Anchor in body A's frame
    pub fn get_local_anchor_a(&self) -> Vector2 {
        self.local_anchor_a
    }

    /// Anchor in body B's frame
    pub fn get_local_anchor_b(&self) -> Vector2 {
        self.local_anchor_b
    }

    /// Maximum anchor distance
    pub fn get_max_length(&self) -> f32 {
        self.max_length
    }

    /// Sets the maximum anchor distance
    pub fn set_max_length(&mut self, length: f32) {
        self.max_length = length;
    }

    /// `AtUpper` while the rope is taut
    pub fn get_limit_state(&self) -> LimitState {
        self.state
    }
}

impl JointConstraint for RopeJoint {
    fn init_velocity_constraints(&mut self, bodies: BodyPair, data: &mut SolverData) {
        self.index_a = bodies.index_a;
        self.index_b = bodies.index_b;

        let mass_a = data.masses[self.index_a];
        let mass_b = data.masses[self.index_b];
        self.local_center_a = mass_a.local_center;
        self.local_center_b = mass_b.local_center;
        self.inv_mass_a = mass_a.inv_mass;
        self.inv_mass_b = mass_b.inv_mass;
        self.inv_i_a = mass_a.inv_i;
        self.inv_i_b = mass_b.inv_i;

        let SolverPosition { c: c_a, a: a_a } = data.positions[self.index_a];
        let SolverPosition { c: c_b, a: a_b } = data.positions[self.index_b];
        let SolverVelocity { v: mut v_a, w: mut w_a } = data.velocities[self.index_a];
        let SolverVelocity { v: mut v_b, w: mut w_b } = data.velocities[self.index_b];

        self.r_a = Rotation::new(a_a).rotate(self.local_anchor_a - self.local_center_a);
        self.r_b = Rotation::new(a_b).rotate(self.local_anchor_b - self.local_center_b);
        self.u = c_b + self.r_b - c_a - self.r_a;

        self.length = self.u.length();

        let c = self.length - self.max_length;
        self.state = if c > 0.0 { LimitState::AtUpper } else { LimitState::Inactive };

        if self.length > LINEAR_SLOP {
            self.u = self.u * (1.0 / self.length);
        } else {
            self.u = Vector2::zero();
            self.mass = 0.0;
            self.impulse = 0.0;
            return;
        }

        let cr_a = self.r_a.cross(&self.u);
        let cr_b = self.r_b.cross(&self.u);
        let inv_mass = self.inv_mass_a
            + self.inv_i_a * cr_a * cr_a
            + self.inv_mass_b
            + self.inv_i_b * cr_b * cr_b;

        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;

            let p = self.u * self.impulse;
            v_a -= p * self.inv_mass_a;
            w_a -= self.inv_i_a * self.r_a.cross(&p);
            v_b += p * self.inv_mass_b;
            w_b += self.inv_i_b * self.r_b.cross(&p);
        } else {
            self.impulse = 0.0;
        }

        data.velocities[self.index_a] = SolverVelocity { v: v_a, w: w_a };
        data.velocities[self.index_b] = SolverVelocity { v: v_b, w: w_b };
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let SolverVelocity { v: mut v_a, w: mut w_a } = data.velocities[self.index_a];
        let SolverVelocity { v: mut v_b, w: mut w_b } = data.velocities[self.index_b];

        // Cdot = dot(u, v + cross(w, r))
        let vp_a = v_a + Vector2::scalar_cross(w_a, &self.r_a);
        let vp_b = v_b + Vector2::scalar_cross(w_b, &self.r_b);
        let c = self.length - self.max_length;
        let mut c_dot = self.u.dot(&(vp_b - vp_a));

        // Predictive constraint.
        if c < 0.0 {
            c_dot += data.step.inv_dt * c;
        }

        let mut impulse = -self.mass * c_dot;
        let old_impulse = self.impulse;
        self.impulse = (self.impulse + impulse).min(0.0);
        impulse = self.impulse - old_impulse;

        let p = self.u * impulse;
        v_a -= p * self.inv_mass_a;
        w_a -= self.inv_i_a * self.r_a.cross(&p);
        v_b += p * self.inv_mass_b;
        w_b += self.inv_i_b * self.r_b.cross(&p);

        data.velocities[self.index_a] = SolverVelocity { v: v_a, w: w_a };
        data.velocities[self.index_b] = SolverVelocity { v: v_b, w: w_b };
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let SolverPosition { c: mut c_a, a: mut a_a } = data.positions[self.index_a];
        let SolverPosition { c: mut c_b, a: mut a_b } = data.positions[self.index_b];

        let r_a = Rotation::new(a_a).rotate(self.local_anchor_a - self.local_center_a);
        let r_b = Rotation::new(a_b).rotate(self.local_anchor_b - self.local_center_b);
        let mut u = c_b + r_b - c_a - r_a;

        let length = u.normalize_mut();
        let c = clamp(length - self.max_length, 0.0, MAX_LINEAR_CORRECTION);

        let impulse = -self.mass * c;
        let p = u * impulse;

        c_a -= p * self.inv_mass_a;
        a_a -= self.inv_i_a * r_a.cross(&p);
        c_b += p * self.inv_mass_b;
        a_b += self.inv_i_b * r_b.cross(&p);

        data.positions[self.index_a] = SolverPosition { c: c_a, a: a_a };
        data.positions[self.index_b] = SolverPosition { c: c_b, a: a_b };

        length - self.max_length < LINEAR_SLOP
    }

    fn reaction_force(&self, inv_dt: f32) -> Vector2 {
        self.u * (inv_dt * self.impulse)
    }

    fn reaction_torque(&self, _inv_dt: f32) -> f32 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time_step::{SolverMass, TimeStep};
    use approx::assert_relative_eq;

    fn masses() -> [SolverMass; 2] {
        [
            SolverMass::default(),
            SolverMass { inv_mass: 1.0, inv_i: 0.0, local_center: Vector2::zero() },
        ]
    }

    #[test]
    fn test_slack_rope_allows_approach() {
        let mut rope = RopeJoint::new(Vector2::zero(), Vector2::zero(), 2.0);
        let masses = masses();
        let mut positions = [
            SolverPosition::default(),
            SolverPosition { c: Vector2::new(1.0, 0.0), a: 0.0 },
        ];
        let mut velocities = [
            SolverVelocity::default(),
            SolverVelocity { v: Vector2::new(-5.0, 0.0), w: 0.0 },
        ];
        let mut data = SolverData {
            step: TimeStep::new(1.0 / 60.0, 8, 3),
            positions: &mut positions,
            velocities: &mut velocities,
            masses: &masses,
        };

        rope.init_velocity_constraints(BodyPair { index_a: 0, index_b: 1 }, &mut data);
        rope.solve_velocity_constraints(&mut data);

        assert_eq!(rope.get_limit_state(), LimitState::Inactive);
        assert_relative_eq!(velocities[1].v.x, -5.0);
    }

    #[test]
    fn test_slack_rope_limits_speed_to_remaining_length() {
        let mut rope = RopeJoint::new(Vector2::zero(), Vector2::zero(), 2.0);
        let masses = masses();
        let mut positions = [
            SolverPosition::default(),
            SolverPosition { c: Vector2::new(1.9, 0.0), a: 0.0 },
        ];
        let mut velocities = [
            SolverVelocity::default(),
            SolverVelocity { v: Vector2::new(60.0, 0.0), w: 0.0 },
        ];
        let mut data = SolverData {
            step: TimeStep::new(1.0 / 60.0, 8, 3),
            positions: &mut positions,
            velocities: &mut velocities,
            masses: &masses,
        };

        rope.init_velocity_constraints(BodyPair { index_a: 0, index_b: 1 }, &mut data);
        rope.solve_velocity_constraints(&mut data);

        // Only the remaining 0.1 m may be covered during this step.
        assert_relative_eq!(velocities[1].v.x, 6.0, epsilon = 1e-3);
    }

    #[test]
    fn test_taut_rope_pulls_back() {
        let mut rope = RopeJoint::new(Vector2::zero(), Vector2::zero(), 1.0);
        let masses = masses();
        let mut positions = [
            SolverPosition::default(),
            SolverPosition { c: Vector2::new(1.1, 0.0), a: 0.0 },
        ];
        let mut velocities = [SolverVelocity::default(); 2];
        let mut data = SolverData {
            step: TimeStep::new(1.0 / 60.0, 8, 3),
            positions: &mut positions,
            velocities: &mut velocities,
            masses: &masses,
        };

        rope.init_velocity_constraints(BodyPair { index_a: 0, index_b: 1 }, &mut data);
        assert_eq!(rope.get_limit_state(), LimitState::AtUpper);

        assert!(!rope.solve_position_constraints(&mut data));
        assert!(rope.solve_position_constraints(&mut data));

        assert_relative_eq!(positions[1].c.x, 1.0, epsilon = 1e-5);
        assert_eq!(rope.reaction_torque(60.0), 0.0);
    }
}
