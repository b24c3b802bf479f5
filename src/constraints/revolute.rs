use crate::constraints::joint::{BodyPair, JointConstraint, LimitState};
use crate::core::settings::{ANGULAR_SLOP, LINEAR_SLOP, MAX_ANGULAR_CORRECTION};
use crate::core::time_step::{SolverData, SolverPosition, SolverVelocity};
use crate::math::{clamp, Matrix2, Matrix3, Rotation, Vector2, Vector3};

/// A revolute joint pins two bodies together at a common anchor
///
/// The bodies rotate freely about the anchor unless a limit or a motor is
/// enabled. The point constraint and the angular limit share a 3x3 mass
/// matrix so that they are solved together when the limit is active.
#[derive(Debug, Clone, PartialEq)]
pub struct RevoluteJoint {
    /// Anchor in body A's local frame
    local_anchor_a: Vector2,

    /// Anchor in body B's local frame
    local_anchor_b: Vector2,

    /// Body B angle minus body A angle in the reference pose
    reference_angle: f32,

    /// Accumulated point (x, y) and limit (z) impulse
    impulse: Vector3,

    /// Accumulated motor impulse
    motor_impulse: f32,

    enable_limit: bool,
    lower_angle: f32,
    upper_angle: f32,

    enable_motor: bool,
    motor_speed: f32,
    max_motor_torque: f32,

    limit_state: LimitState,

    // Solver temporaries
    index_a: usize,
    index_b: usize,
    r_a: Vector2,
    r_b: Vector2,
    local_center_a: Vector2,
    local_center_b: Vector2,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    mass: Matrix3,
    motor_mass: f32,
}

impl RevoluteJoint {
    /// Creates a revolute joint from local anchors and the reference angle
    pub fn new(local_anchor_a: Vector2, local_anchor_b: Vector2, reference_angle: f32) -> Self {
        Self {
            local_anchor_a,
            local_anchor_b,
            reference_angle,
            impulse: Vector3::zero(),
            motor_impulse: 0.0,
            enable_limit: false,
            lower_angle: 0.0,
            upper_angle: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
            limit_state: LimitState::Inactive,
            index_a: 0,
            index_b: 0,
            r_a: Vector2::zero(),
            r_b: Vector2::zero(),
            local_center_a: Vector2::zero(),
            local_center_b: Vector2::zero(),
            inv_mass_a: 0.0,
            inv_mass_b: 0.0,
            inv_i_a: 0.0,
            inv_i_b: 0.0,
            mass: Matrix3::zero(),
            motor_mass: 0.0,
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

    /// The reference angle
    pub fn get_reference_angle(&self) -> f32 {
        self.reference_angle
    }

    /// Returns whether the limit is enabled
    pub fn is_limit_enabled(&self) -> bool {
        self.enable_limit
    }

    /// Enables or disables the limit
    ///
    /// Returns whether the setting changed, in which case the bodies must be woken.
    pub fn enable_limit(&mut self, flag: bool) -> bool {
        if flag == self.enable_limit {
            return false;
        }
        self.enable_limit = flag;
        self.impulse.z = 0.0;
        true
    }

    /// Lower joint angle in radians
    pub fn get_lower_limit(&self) -> f32 {
        self.lower_angle
    }

    /// Upper joint angle in radians
    pub fn get_upper_limit(&self) -> f32 {
        self.upper_angle
    }

    /// Sets the joint angle limits; returns whether they changed
    pub fn set_limits(&mut self, lower: f32, upper: f32) -> bool {
        debug_assert!(lower <= upper);
        if lower == self.lower_angle && upper == self.upper_angle {
            return false;
        }
        self.impulse.z = 0.0;
        self.lower_angle = lower;
        self.upper_angle = upper;
        true
    }

    /// Current state of the angular limit
    pub fn get_limit_state(&self) -> LimitState {
        self.limit_state
    }

    /// Returns whether the motor is enabled
    pub fn is_motor_enabled(&self) -> bool {
        self.enable_motor
    }

    /// Enables or disables the motor; returns whether the setting changed
    pub fn enable_motor(&mut self, flag: bool) -> bool {
        if flag == self.enable_motor {
            return false;
        }
        self.enable_motor = flag;
        true
    }

    /// Target relative angular speed in radians per second
    pub fn get_motor_speed(&self) -> f32 {
        self.motor_speed
    }

    /// Sets the motor speed; returns whether it changed
    pub fn set_motor_speed(&mut self, speed: f32) -> bool {
        if speed == self.motor_speed {
            return false;
        }
        self.motor_speed = speed;
        true
    }

    /// Maximum motor torque in newton-meters
    pub fn get_max_motor_torque(&self) -> f32 {
        self.max_motor_torque
    }

    /// Sets the maximum motor torque; returns whether it changed
    pub fn set_max_motor_torque(&mut self, torque: f32) -> bool {
        if torque == self.max_motor_torque {
            return false;
        }
        self.max_motor_torque = torque;
        true
    }

    /// Motor torque applied during the last step
    pub fn get_motor_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }

    /// Joint angle of the given body angles
    pub fn joint_angle(&self, angle_a: f32, angle_b: f32) -> f32 {
        angle_b - angle_a - self.reference_angle
    }

    /// Accumulated point and limit impulse
    pub fn get_impulse(&self) -> Vector3 {
        self.impulse
    }

    fn fixed_rotation(&self) -> bool {
        self.inv_i_a + self.inv_i_b == 0.0
    }
}

impl JointConstraint for RevoluteJoint {
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

        let a_a = data.positions[self.index_a].a;
        let a_b = data.positions[self.index_b].a;
        let SolverVelocity { v: mut v_a, w: mut w_a } = data.velocities[self.index_a];
        let SolverVelocity { v: mut v_b, w: mut w_b } = data.velocities[self.index_b];

        let q_a = Rotation::new(a_a);
        let q_b = Rotation::new(a_b);

        self.r_a = q_a.rotate(self.local_anchor_a - self.local_center_a);
        self.r_b = q_b.rotate(self.local_anchor_b - self.local_center_b);

        // J = [-I -r1_skew I r2_skew]
        //     [ 0       -1 0       1]
        // r_skew = [-ry; rx]
        let (m_a, m_b) = (self.inv_mass_a, self.inv_mass_b);
        let (i_a, i_b) = (self.inv_i_a, self.inv_i_b);
        let (r_a, r_b) = (self.r_a, self.r_b);
        let fixed_rotation = self.fixed_rotation();

        let k11 = m_a + m_b + r_a.y * r_a.y * i_a + r_b.y * r_b.y * i_b;
        let k12 = -r_a.y * r_a.x * i_a - r_b.y * r_b.x * i_b;
        let k13 = -r_a.y * i_a - r_b.y * i_b;
        let k22 = m_a + m_b + r_a.x * r_a.x * i_a + r_b.x * r_b.x * i_b;
        let k23 = r_a.x * i_a + r_b.x * i_b;
        let k33 = i_a + i_b;
        self.mass = Matrix3::new([[k11, k12, k13], [k12, k22, k23], [k13, k23, k33]]);

        self.motor_mass = i_a + i_b;
        if self.motor_mass > 0.0 {
            self.motor_mass = 1.0 / self.motor_mass;
        }

        if !self.enable_motor || fixed_rotation {
            self.motor_impulse = 0.0;
        }

        if self.enable_limit && !fixed_rotation {
            let joint_angle = self.joint_angle(a_a, a_b);
            if (self.upper_angle - self.lower_angle).abs() < 2.0 * ANGULAR_SLOP {
                self.limit_state = LimitState::Equal;
            } else if joint_angle <= self.lower_angle {
                if self.limit_state != LimitState::AtLower {
                    self.impulse.z = 0.0;
                }
                self.limit_state = LimitState::AtLower;
            } else if joint_angle >= self.upper_angle {
                if self.limit_state != LimitState::AtUpper {
                    self.impulse.z = 0.0;
                }
                self.limit_state = LimitState::AtUpper;
            } else {
                self.limit_state = LimitState::Inactive;
                self.impulse.z = 0.0;
            }
        } else {
            self.limit_state = LimitState::Inactive;
        }

        if data.step.warm_starting {
            // Scale impulses to support a variable time step.
            self.impulse *= data.step.dt_ratio;
            self.motor_impulse *= data.step.dt_ratio;

            let p = Vector2::new(self.impulse.x, self.impulse.y);

            v_a -= p * m_a;
            w_a -= i_a * (r_a.cross(&p) + self.motor_impulse + self.impulse.z);

            v_b += p * m_b;
            w_b += i_b * (r_b.cross(&p) + self.motor_impulse + self.impulse.z);
        } else {
            self.impulse = Vector3::zero();
            self.motor_impulse = 0.0;
        }

        data.velocities[self.index_a] = SolverVelocity { v: v_a, w: w_a };
        data.velocities[self.index_b] = SolverVelocity { v: v_b, w: w_b };
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let SolverVelocity { v: mut v_a, w: mut w_a } = data.velocities[self.index_a];
        let SolverVelocity { v: mut v_b, w: mut w_b } = data.velocities[self.index_b];

        let (m_a, m_b) = (self.inv_mass_a, self.inv_mass_b);
        let (i_a, i_b) = (self.inv_i_a, self.inv_i_b);
        let (r_a, r_b) = (self.r_a, self.r_b);
        let fixed_rotation = self.fixed_rotation();

        // Motor
        if self.enable_motor && self.limit_state != LimitState::Equal && !fixed_rotation {
            let c_dot = w_b - w_a - self.motor_speed;
            let mut impulse = -self.motor_mass * c_dot;
            let old_impulse = self.motor_impulse;
            let max_impulse = data.step.dt * self.max_motor_torque;
            self.motor_impulse = clamp(old_impulse + impulse, -max_impulse, max_impulse);
            impulse = self.motor_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        if self.enable_limit && self.limit_state != LimitState::Inactive && !fixed_rotation {
            let c_dot1 = v_b + Vector2::scalar_cross(w_b, &r_b) - v_a - Vector2::scalar_cross(w_a, &r_a);
            let c_dot2 = w_b - w_a;
            let c_dot = Vector3::new(c_dot1.x, c_dot1.y, c_dot2);

            let mut impulse = -self.mass.solve33(c_dot);

            match self.limit_state {
                LimitState::Equal => {
                    self.impulse += impulse;
                }
                LimitState::AtLower | LimitState::AtUpper => {
                    let new_impulse = self.impulse.z + impulse.z;
                    let clamped = match self.limit_state {
                        LimitState::AtLower => new_impulse < 0.0,
                        _ => new_impulse > 0.0,
                    };

                    if clamped {
                        // Solve the point rows with the limit impulse pinned at zero.
                        let rhs = -c_dot1
                            + Vector2::new(self.mass.data[0][2], self.mass.data[1][2]) * self.impulse.z;
                        let reduced = self.mass.solve22(rhs);
                        impulse.x = reduced.x;
                        impulse.y = reduced.y;
                        impulse.z = -self.impulse.z;
                        self.impulse.x += reduced.x;
                        self.impulse.y += reduced.y;
                        self.impulse.z = 0.0;
                    } else {
                        self.impulse += impulse;
                    }
                }
                LimitState::Inactive => {}
            }

            let p = Vector2::new(impulse.x, impulse.y);

            v_a -= p * m_a;
            w_a -= i_a * (r_a.cross(&p) + impulse.z);

            v_b += p * m_b;
            w_b += i_b * (r_b.cross(&p) + impulse.z);
        } else {
            // Point constraint only
            let c_dot = v_b + Vector2::scalar_cross(w_b, &r_b) - v_a - Vector2::scalar_cross(w_a, &r_a);
            let impulse = self.mass.solve22(-c_dot);

            self.impulse.x += impulse.x;
            self.impulse.y += impulse.y;

            v_a -= impulse * m_a;
            w_a -= i_a * r_a.cross(&impulse);

            v_b += impulse * m_b;
            w_b += i_b * r_b.cross(&impulse);
        }

        data.velocities[self.index_a] = SolverVelocity { v: v_a, w: w_a };
        data.velocities[self.index_b] = SolverVelocity { v: v_b, w: w_b };
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let SolverPosition { c: mut c_a, a: mut a_a } = data.positions[self.index_a];
        let SolverPosition { c: mut c_b, a: mut a_b } = data.positions[self.index_b];

        let (m_a, m_b) = (self.inv_mass_a, self.inv_mass_b);
        let (i_a, i_b) = (self.inv_i_a, self.inv_i_b);
        let fixed_rotation = self.fixed_rotation();

        let mut angular_error = 0.0;

        // Angular limit
        if self.enable_limit && self.limit_state != LimitState::Inactive && !fixed_rotation {
            let angle = self.joint_angle(a_a, a_b);
            let mut limit_impulse = 0.0;

            match self.limit_state {
                LimitState::Equal => {
                    // Prevent large angular corrections.
                    let c = clamp(
                        angle - self.lower_angle,
                        -MAX_ANGULAR_CORRECTION,
                        MAX_ANGULAR_CORRECTION,
                    );
                    limit_impulse = -self.motor_mass * c;
                    angular_error = c.abs();
                }
                LimitState::AtLower => {
                    let c = angle - self.lower_angle;
                    angular_error = -c;
                    let c = clamp(c + ANGULAR_SLOP, -MAX_ANGULAR_CORRECTION, 0.0);
                    limit_impulse = -self.motor_mass * c;
                }
                LimitState::AtUpper => {
                    let c = angle - self.upper_angle;
                    angular_error = c;
                    let c = clamp(c - ANGULAR_SLOP, 0.0, MAX_ANGULAR_CORRECTION);
                    limit_impulse = -self.motor_mass * c;
                }
                LimitState::Inactive => {}
            }

            a_a -= i_a * limit_impulse;
            a_b += i_b * limit_impulse;
        }

        // Point-to-point
        let q_a = Rotation::new(a_a);
        let q_b = Rotation::new(a_b);
        let r_a = q_a.rotate(self.local_anchor_a - self.local_center_a);
        let r_b = q_b.rotate(self.local_anchor_b - self.local_center_b);

        let c = c_b + r_b - c_a - r_a;
        let position_error = c.length();

        let k11 = m_a + m_b + i_a * r_a.y * r_a.y + i_b * r_b.y * r_b.y;
        let k12 = -i_a * r_a.x * r_a.y - i_b * r_b.x * r_b.y;
        let k22 = m_a + m_b + i_a * r_a.x * r_a.x + i_b * r_b.x * r_b.x;
        let k = Matrix2::new([[k11, k12], [k12, k22]]);

        let impulse = -k.solve(c);

        c_a -= impulse * m_a;
        a_a -= i_a * r_a.cross(&impulse);

        c_b += impulse * m_b;
        a_b += i_b * r_b.cross(&impulse);

        data.positions[self.index_a] = SolverPosition { c: c_a, a: a_a };
        data.positions[self.index_b] = SolverPosition { c: c_b, a: a_b };

        position_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }

    fn reaction_force(&self, inv_dt: f32) -> Vector2 {
        Vector2::new(self.impulse.x, self.impulse.y) * inv_dt
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time_step::{SolverMass, TimeStep};
    use approx::assert_relative_eq;

    fn solve(
        joint: &mut RevoluteJoint,
        positions: &mut [SolverPosition],
        velocities: &mut [SolverVelocity],
        masses: &[SolverMass],
        iterations: usize,
    ) {
        let mut data = SolverData {
            step: TimeStep::new(1.0 / 60.0, 8, 3),
            positions,
            velocities,
            masses,
        };
        joint.init_velocity_constraints(BodyPair { index_a: 0, index_b: 1 }, &mut data);
        for _ in 0..iterations {
            joint.solve_velocity_constraints(&mut data);
        }
    }

    fn wheel_masses() -> [SolverMass; 2] {
        [
            SolverMass::default(),
            SolverMass { inv_mass: 1.0, inv_i: 2.0, local_center: Vector2::zero() },
        ]
    }

    #[test]
    fn test_motor_drives_relative_speed() {
        // A wheel pinned at its center to a static body.
        let mut joint = RevoluteJoint::new(Vector2::zero(), Vector2::zero(), 0.0);
        joint.enable_motor(true);
        joint.set_motor_speed(3.0);
        joint.set_max_motor_torque(1000.0);

        let mut positions = [SolverPosition::default(); 2];
        let mut velocities = [SolverVelocity::default(); 2];
        solve(&mut joint, &mut positions, &mut velocities, &wheel_masses(), 8);

        assert_relative_eq!(velocities[1].w, 3.0, epsilon = 1e-5);
        assert_relative_eq!(velocities[1].v.length(), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_motor_torque_is_clamped() {
        let mut joint = RevoluteJoint::new(Vector2::zero(), Vector2::zero(), 0.0);
        joint.enable_motor(true);
        joint.set_motor_speed(100.0);
        joint.set_max_motor_torque(6.0);

        let mut positions = [SolverPosition::default(); 2];
        let mut velocities = [SolverVelocity::default(); 2];
        solve(&mut joint, &mut positions, &mut velocities, &wheel_masses(), 8);

        // impulse <= dt * max torque = 0.1, times inv_i = 2.
        assert_relative_eq!(velocities[1].w, 0.2, epsilon = 1e-5);
        assert_relative_eq!(joint.get_motor_torque(60.0), 6.0, epsilon = 1e-3);
    }

    #[test]
    fn test_limit_states() {
        let masses = wheel_masses();
        let mut joint = RevoluteJoint::new(Vector2::zero(), Vector2::zero(), 0.0);
        joint.enable_limit(true);
        joint.set_limits(-0.5, 0.5);

        let mut velocities = [SolverVelocity::default(); 2];

        let mut positions = [SolverPosition::default(); 2];
        solve(&mut joint, &mut positions, &mut velocities, &masses, 1);
        assert_eq!(joint.get_limit_state(), LimitState::Inactive);

        positions[1].a = 0.6;
        solve(&mut joint, &mut positions, &mut velocities, &masses, 1);
        assert_eq!(joint.get_limit_state(), LimitState::AtUpper);

        positions[1].a = -0.6;
        solve(&mut joint, &mut positions, &mut velocities, &masses, 1);
        assert_eq!(joint.get_limit_state(), LimitState::AtLower);

        joint.set_limits(0.1, 0.1);
        solve(&mut joint, &mut positions, &mut velocities, &masses, 1);
        assert_eq!(joint.get_limit_state(), LimitState::Equal);
    }

    #[test]
    fn test_upper_limit_stops_spin() {
        let mut joint = RevoluteJoint::new(Vector2::zero(), Vector2::zero(), 0.0);
        joint.enable_limit(true);
        joint.set_limits(-0.5, 0.5);

        let mut positions = [SolverPosition::default(), SolverPosition { c: Vector2::zero(), a: 0.5 }];
        let mut velocities = [SolverVelocity::default(), SolverVelocity { v: Vector2::zero(), w: 4.0 }];
        solve(&mut joint, &mut positions, &mut velocities, &wheel_masses(), 8);

        assert_eq!(joint.get_limit_state(), LimitState::AtUpper);
        assert!(velocities[1].w <= 1e-5);
        assert!(joint.get_impulse().z <= 0.0);
    }

    #[test]
    fn test_position_solve_closes_gap() {
        // Anchors 0.1 apart; two free bodies with rotation disabled.
        let mut joint = RevoluteJoint::new(Vector2::new(0.5, 0.0), Vector2::new(-0.5, 0.0), 0.0);
        let masses = [
            SolverMass { inv_mass: 1.0, inv_i: 0.0, local_center: Vector2::zero() },
            SolverMass { inv_mass: 1.0, inv_i: 0.0, local_center: Vector2::zero() },
        ];
        let mut positions = [
            SolverPosition { c: Vector2::zero(), a: 0.0 },
            SolverPosition { c: Vector2::new(1.1, 0.0), a: 0.0 },
        ];
        let mut velocities = [SolverVelocity::default(); 2];
        solve(&mut joint, &mut positions, &mut velocities, &masses, 1);

        let mut data = SolverData {
            step: TimeStep::new(1.0 / 60.0, 8, 3),
            positions: &mut positions,
            velocities: &mut velocities,
            masses: &masses,
        };
        assert!(!joint.solve_position_constraints(&mut data));
        assert!(joint.solve_position_constraints(&mut data));

        assert_relative_eq!(positions[0].c.x, 0.05, epsilon = 1e-5);
        assert_relative_eq!(positions[1].c.x, 1.05, epsilon = 1e-5);
    }

    #[test]
    fn test_only_limit_setters_reset_limit_impulse() {
        let mut joint = RevoluteJoint::new(Vector2::zero(), Vector2::zero(), 0.0);
        joint.impulse = Vector3::new(1.0, 2.0, 3.0);

        // Motor settings leave the accumulated limit impulse alone.
        assert!(joint.enable_motor(true));
        assert!(joint.set_motor_speed(1.0));
        assert!(joint.set_max_motor_torque(5.0));
        assert_eq!(joint.get_impulse(), Vector3::new(1.0, 2.0, 3.0));

        assert!(joint.set_limits(-0.5, 0.5));
        assert_eq!(joint.get_impulse(), Vector3::new(1.0, 2.0, 0.0));

        joint.impulse.z = 3.0;
        assert!(!joint.set_limits(-0.5, 0.5));
        assert_eq!(joint.get_impulse().z, 3.0);

        assert!(joint.enable_limit(true));
        assert_eq!(joint.get_impulse().z, 0.0);
    }
}
