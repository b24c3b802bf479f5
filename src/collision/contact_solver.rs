//! Sequential-impulse contact solver with a 2-point block solver.
//!
//! Velocity constraints enforce non-penetration and Coulomb friction on
//! every manifold point; position constraints remove residual overlap with
//! a Baumgarte-style pseudo-velocity. Two-point manifolds solve their normal
//! impulses together as a 2x2 linear complementarity problem.

use crate::bodies::RigidBody;
use crate::collision::contact::Contact;
use crate::collision::manifold::{Manifold, ManifoldType, WorldManifold};
use crate::core::config::SolverConfig;
use crate::core::scheduler::ConstraintColoring;
use crate::core::settings::{
    BAUMGARTE, LINEAR_SLOP, MAX_CONDITION_NUMBER, MAX_LINEAR_CORRECTION, MAX_MANIFOLD_POINTS,
    POSITION_SOLVED_SLOP_FACTOR, TOI_BAUMGARTE, TOI_POSITION_SOLVED_SLOP_FACTOR,
    VELOCITY_THRESHOLD,
};
use crate::core::storage::{BodyStorage, ContactStorage};
use crate::core::time_step::{SolverPosition, SolverVelocity, TimeStep};
use crate::core::{ContactHandle, Storage};
use crate::error::PhysicsError;
use crate::math::{clamp, Matrix2, Rotation, Transform, Vector2};
use crate::Result;
use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Per-point data of a velocity constraint
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VelocityConstraintPoint {
    /// Anchor relative to the center of mass of A
    pub r_a: Vector2,

    /// Anchor relative to the center of mass of B
    pub r_b: Vector2,

    /// Accumulated normal impulse, never negative
    pub normal_impulse: f32,

    /// Accumulated friction impulse
    pub tangent_impulse: f32,

    /// Effective mass along the normal
    pub normal_mass: f32,

    /// Effective mass along the tangent
    pub tangent_mass: f32,

    /// Target separating velocity from restitution
    pub velocity_bias: f32,
}

/// Velocity-level constraint of one contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactVelocityConstraint {
    pub points: [VelocityConstraintPoint; MAX_MANIFOLD_POINTS],

    /// World normal from A to B
    pub normal: Vector2,

    /// Inverse of `k`, used by the block solver
    pub normal_mass: Matrix2,

    /// Coupled normal mass matrix of a 2-point manifold
    pub k: Matrix2,

    pub index_a: usize,
    pub index_b: usize,
    pub inv_mass_a: f32,
    pub inv_mass_b: f32,
    pub inv_i_a: f32,
    pub inv_i_b: f32,
    pub friction: f32,
    pub restitution: f32,
    pub tangent_speed: f32,

    /// Points solved; may be one less than the manifold's when `k` is ill-conditioned
    pub point_count: usize,

    /// The contact this constraint was built from
    pub contact: ContactHandle,
}

/// Position-level constraint of one contact
#[derive(Debug, Clone, Copy, PartialEq)]
struct ContactPositionConstraint {
    manifold: Manifold,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    local_center_a: Vector2,
    local_center_b: Vector2,
    inv_i_a: f32,
    inv_i_b: f32,
    radius_a: f32,
    radius_b: f32,
}

/// Velocities of both bodies after solving one constraint
#[derive(Debug, Clone, Copy, Default)]
struct VelocityUpdate {
    index_a: usize,
    index_b: usize,
    a: SolverVelocity,
    b: SolverVelocity,
    write_a: bool,
    write_b: bool,
}

/// Positions of both bodies after solving one constraint
#[derive(Debug, Clone, Copy, Default)]
struct PositionUpdate {
    index_a: usize,
    index_b: usize,
    a: SolverPosition,
    b: SolverPosition,
    write_a: bool,
    write_b: bool,
    min_separation: f32,
}

/// Effective inverse masses used by a position solve
#[derive(Debug, Clone, Copy)]
struct PositionMasses {
    m_a: f32,
    i_a: f32,
    m_b: f32,
    i_b: f32,
}

/// Contact separation recomputed at the current positions
struct PositionSolverManifold {
    normal: Vector2,
    point: Vector2,
    separation: f32,
}

impl PositionSolverManifold {
    fn new(pc: &ContactPositionConstraint, xf_a: &Transform, xf_b: &Transform, index: usize) -> Self {
        let manifold = &pc.manifold;
        debug_assert!(manifold.point_count > 0);

        match manifold.manifold_type {
            ManifoldType::Circles => {
                let point_a = xf_a.transform_point(manifold.local_point);
                let point_b = xf_b.transform_point(manifold.points[0].local_point);
                let normal = (point_b - point_a).normalize();
                Self {
                    normal,
                    point: (point_a + point_b) * 0.5,
                    separation: (point_b - point_a).dot(&normal) - pc.radius_a - pc.radius_b,
                }
            }
            ManifoldType::FaceA => {
                let normal = xf_a.transform_vector(manifold.local_normal);
                let plane_point = xf_a.transform_point(manifold.local_point);
                let clip_point = xf_b.transform_point(manifold.points[index].local_point);
                Self {
                    normal,
                    point: clip_point,
                    separation: (clip_point - plane_point).dot(&normal) - pc.radius_a - pc.radius_b,
                }
            }
            ManifoldType::FaceB => {
                let normal = xf_b.transform_vector(manifold.local_normal);
                let plane_point = xf_b.transform_point(manifold.local_point);
                let clip_point = xf_a.transform_point(manifold.points[index].local_point);
                Self {
                    // Ensure the normal points from A to B.
                    normal: -normal,
                    point: clip_point,
                    separation: (clip_point - plane_point).dot(&normal) - pc.radius_a - pc.radius_b,
                }
            }
        }
    }
}

/// Body transform recovered from a solver position
#[inline]
fn solver_transform(position: &SolverPosition, local_center: Vector2) -> Transform {
    let rotation = Rotation::new(position.a);
    Transform::new(position.c - rotation.rotate(local_center), rotation)
}

/// Solves the contacts of one island
#[derive(Debug, Clone)]
pub struct ContactSolver {
    step: TimeStep,
    velocity_constraints: Vec<ContactVelocityConstraint>,
    position_constraints: Vec<ContactPositionConstraint>,

    /// Approach speed above which restitution applies
    velocity_threshold: f32,

    /// Constraint count from which velocity passes use colored batches
    velocity_batch_threshold: usize,

    /// Constraint count from which position passes use colored batches
    position_batch_threshold: usize,

    /// Colors of the current constraints, valid when `colored` is set
    coloring: ConstraintColoring,
    colored: bool,

    velocity_updates: Vec<VelocityUpdate>,
    position_updates: Vec<PositionUpdate>,
}

impl Default for ContactSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactSolver {
    /// Creates a solver with default thresholds
    pub fn new() -> Self {
        Self {
            step: TimeStep::new(0.0, 0, 0),
            velocity_constraints: Vec::new(),
            position_constraints: Vec::new(),
            velocity_threshold: VELOCITY_THRESHOLD,
            velocity_batch_threshold: usize::MAX,
            position_batch_threshold: usize::MAX,
            coloring: ConstraintColoring::new(),
            colored: false,
            velocity_updates: Vec::new(),
            position_updates: Vec::new(),
        }
    }

    /// Creates a solver configured from `config`
    pub fn with_config(config: &SolverConfig) -> Self {
        let mut solver = Self::new();
        solver.configure(config);
        solver
    }

    /// Applies the restitution threshold and batching thresholds of `config`
    pub fn configure(&mut self, config: &SolverConfig) {
        self.velocity_threshold = config.velocity_threshold;
        self.velocity_batch_threshold = config.velocity_constraints_multithread_threshold;
        self.position_batch_threshold = config.position_constraints_multithread_threshold;
    }

    /// Number of contact constraints
    pub fn len(&self) -> usize {
        self.velocity_constraints.len()
    }

    /// Returns whether there are no constraints
    pub fn is_empty(&self) -> bool {
        self.velocity_constraints.is_empty()
    }

    /// The velocity constraints, in solve order
    pub fn velocity_constraints(&self) -> &[ContactVelocityConstraint] {
        &self.velocity_constraints
    }

    /// Number of colors of the current batching, 0 when solving serially
    pub fn batch_count(&self) -> usize {
        if self.colored {
            self.coloring.color_count()
        } else {
            0
        }
    }

    /// Copies the position-independent contact data for a new solve
    ///
    /// Accumulated impulses are scaled by `dt_ratio` when warm starting and
    /// cleared otherwise. Bodies must already carry their island index.
    pub fn reset(
        &mut self,
        step: &TimeStep,
        contacts: &ContactStorage<Contact>,
        island_contacts: &[ContactHandle],
        bodies: &BodyStorage<RigidBody>,
    ) -> Result<()> {
        self.step = *step;
        self.velocity_constraints.clear();
        self.position_constraints.clear();
        self.colored = false;

        for &handle in island_contacts {
            let contact = contacts.get_checked(handle)?;
            let body_a = bodies.get_checked(contact.get_body_a())?;
            let body_b = bodies.get_checked(contact.get_body_b())?;
            let manifold = contact.get_manifold();

            if manifold.point_count == 0 {
                return Err(PhysicsError::InvalidParameter(format!(
                    "{:?} has no manifold points",
                    handle
                )));
            }

            let mut vc = ContactVelocityConstraint {
                points: [VelocityConstraintPoint::default(); MAX_MANIFOLD_POINTS],
                normal: Vector2::zero(),
                normal_mass: Matrix2::zero(),
                k: Matrix2::zero(),
                index_a: body_a.island_index,
                index_b: body_b.island_index,
                inv_mass_a: body_a.get_inverse_mass(),
                inv_mass_b: body_b.get_inverse_mass(),
                inv_i_a: body_a.get_inverse_inertia(),
                inv_i_b: body_b.get_inverse_inertia(),
                friction: contact.get_friction(),
                restitution: contact.get_restitution(),
                tangent_speed: contact.get_tangent_speed(),
                point_count: manifold.point_count,
                contact: handle,
            };

            for (vcp, mp) in vc.points.iter_mut().zip(manifold.points()) {
                if step.warm_starting {
                    vcp.normal_impulse = step.dt_ratio * mp.normal_impulse;
                    vcp.tangent_impulse = step.dt_ratio * mp.tangent_impulse;
                }
            }

            self.velocity_constraints.push(vc);
            self.position_constraints.push(ContactPositionConstraint {
                manifold: *manifold,
                index_a: body_a.island_index,
                index_b: body_b.island_index,
                inv_mass_a: body_a.get_inverse_mass(),
                inv_mass_b: body_b.get_inverse_mass(),
                local_center_a: body_a.get_local_center(),
                local_center_b: body_b.get_local_center(),
                inv_i_a: body_a.get_inverse_inertia(),
                inv_i_b: body_b.get_inverse_inertia(),
                radius_a: contact.get_proxy_a().radius(),
                radius_b: contact.get_proxy_b().radius(),
            });
        }

        let count = self.velocity_constraints.len();
        if count > 0 && count >= self.velocity_batch_threshold.min(self.position_batch_threshold) {
            self.build_batches();
        }

        Ok(())
    }

    /// Colors the constraints and reorders them so each color is contiguous
    fn build_batches(&mut self) {
        let movable = |m: f32, i: f32, index: usize| (m != 0.0 || i != 0.0).then_some(index);
        let body_count = self
            .position_constraints
            .iter()
            .map(|pc| pc.index_a.max(pc.index_b) + 1)
            .max()
            .unwrap_or(0);

        self.coloring.rebuild(
            body_count,
            self.position_constraints.iter().map(|pc| {
                (
                    movable(pc.inv_mass_a, pc.inv_i_a, pc.index_a),
                    movable(pc.inv_mass_b, pc.inv_i_b, pc.index_b),
                )
            }),
        );

        let order = self.coloring.order();
        let velocity: Vec<_> = order.iter().map(|&i| self.velocity_constraints[i]).collect();
        let position: Vec<_> = order.iter().map(|&i| self.position_constraints[i]).collect();
        self.velocity_constraints = velocity;
        self.position_constraints = position;
        self.colored = true;

        debug!(
            constraints = self.velocity_constraints.len(),
            colors = self.coloring.color_count(),
            "colored contact constraints"
        );
    }

    /// Evaluates world manifolds, effective masses and restitution bias
    pub fn initialize_velocity_constraints(
        &mut self,
        positions: &[SolverPosition],
        velocities: &[SolverVelocity],
    ) {
        let velocity_threshold = self.velocity_threshold;
        let init = |(vc, pc): (&mut ContactVelocityConstraint, &ContactPositionConstraint)| {
            Self::initialize_constraint(vc, pc, positions, velocities, velocity_threshold);
        };

        #[cfg(feature = "parallel")]
        {
            if self.colored {
                self.velocity_constraints
                    .par_iter_mut()
                    .zip(self.position_constraints.par_iter())
                    .for_each(init);
                return;
            }
        }

        self.velocity_constraints
            .iter_mut()
            .zip(self.position_constraints.iter())
            .for_each(init);
    }

    fn initialize_constraint(
        vc: &mut ContactVelocityConstraint,
        pc: &ContactPositionConstraint,
        positions: &[SolverPosition],
        velocities: &[SolverVelocity],
        velocity_threshold: f32,
    ) {
        let m_a = vc.inv_mass_a;
        let m_b = vc.inv_mass_b;
        let i_a = vc.inv_i_a;
        let i_b = vc.inv_i_b;

        let position_a = positions[vc.index_a];
        let position_b = positions[vc.index_b];
        let SolverVelocity { v: v_a, w: w_a } = velocities[vc.index_a];
        let SolverVelocity { v: v_b, w: w_b } = velocities[vc.index_b];

        let xf_a = solver_transform(&position_a, pc.local_center_a);
        let xf_b = solver_transform(&position_b, pc.local_center_b);

        let world_manifold = WorldManifold::new(&pc.manifold, &xf_a, pc.radius_a, &xf_b, pc.radius_b);

        vc.normal = world_manifold.normal;
        let normal = vc.normal;
        let tangent = normal.cross_scalar(1.0);

        for (j, vcp) in vc.points[..vc.point_count].iter_mut().enumerate() {
            vcp.r_a = world_manifold.points[j] - position_a.c;
            vcp.r_b = world_manifold.points[j] - position_b.c;

            let rn_a = vcp.r_a.cross(&normal);
            let rn_b = vcp.r_b.cross(&normal);
            let k_normal = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
            vcp.normal_mass = if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 };

            let rt_a = vcp.r_a.cross(&tangent);
            let rt_b = vcp.r_b.cross(&tangent);
            let k_tangent = m_a + m_b + i_a * rt_a * rt_a + i_b * rt_b * rt_b;
            vcp.tangent_mass = if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 };

            // Restitution only for approach speeds above the threshold.
            vcp.velocity_bias = 0.0;
            let v_rel = normal.dot(
                &(v_b + Vector2::scalar_cross(w_b, &vcp.r_b) - v_a - Vector2::scalar_cross(w_a, &vcp.r_a)),
            );
            if v_rel < -velocity_threshold {
                vcp.velocity_bias = -vc.restitution * v_rel;
            }
        }

        if vc.point_count == 2 {
            let vcp1 = vc.points[0];
            let vcp2 = vc.points[1];

            let rn1_a = vcp1.r_a.cross(&normal);
            let rn1_b = vcp1.r_b.cross(&normal);
            let rn2_a = vcp2.r_a.cross(&normal);
            let rn2_b = vcp2.r_b.cross(&normal);

            let k11 = m_a + m_b + i_a * rn1_a * rn1_a + i_b * rn1_b * rn1_b;
            let k22 = m_a + m_b + i_a * rn2_a * rn2_a + i_b * rn2_b * rn2_b;
            let k12 = m_a + m_b + i_a * rn1_a * rn2_a + i_b * rn1_b * rn2_b;

            if k11 * k11 < MAX_CONDITION_NUMBER * (k11 * k22 - k12 * k12) {
                vc.k = Matrix2::new([[k11, k12], [k12, k22]]);
                vc.normal_mass = vc.k.inverse();
            } else {
                // The points are nearly redundant; keep only the first.
                trace!(contact = ?vc.contact, "ill-conditioned block, solving one point");
                vc.point_count = 1;
            }
        }
    }

    /// Applies the accumulated impulses to the velocities
    pub fn warm_start(&self, velocities: &mut [SolverVelocity]) {
        for vc in &self.velocity_constraints {
            let normal = vc.normal;
            let tangent = normal.cross_scalar(1.0);

            let mut velocity_a = velocities[vc.index_a];
            let mut velocity_b = velocities[vc.index_b];

            for vcp in &vc.points[..vc.point_count] {
                let p = normal * vcp.normal_impulse + tangent * vcp.tangent_impulse;
                velocity_a.w -= vc.inv_i_a * vcp.r_a.cross(&p);
                velocity_a.v -= p * vc.inv_mass_a;
                velocity_b.w += vc.inv_i_b * vcp.r_b.cross(&p);
                velocity_b.v += p * vc.inv_mass_b;
            }

            velocities[vc.index_a] = velocity_a;
            velocities[vc.index_b] = velocity_b;
        }
    }

    /// Runs one velocity pass over all contacts
    pub fn solve_velocity_constraints(&mut self, velocities: &mut [SolverVelocity]) {
        if self.colored && self.velocity_constraints.len() >= self.velocity_batch_threshold {
            self.solve_velocity_batched(velocities);
            return;
        }

        for vc in self.velocity_constraints.iter_mut() {
            let (a, b) = Self::solve_velocity_constraint(vc, velocities[vc.index_a], velocities[vc.index_b]);
            velocities[vc.index_a] = a;
            velocities[vc.index_b] = b;
        }
    }

    fn solve_velocity_batched(&mut self, velocities: &mut [SolverVelocity]) {
        let saturated = self.coloring.is_saturated();
        let color_count = self.coloring.color_count();

        for (color, range) in self.coloring.ranges().iter().enumerate() {
            let batch = &mut self.velocity_constraints[range.clone()];

            if saturated && color + 1 == color_count {
                for vc in batch.iter_mut() {
                    let (a, b) = Self::solve_velocity_constraint(vc, velocities[vc.index_a], velocities[vc.index_b]);
                    velocities[vc.index_a] = a;
                    velocities[vc.index_b] = b;
                }
                continue;
            }

            let snapshot: &[SolverVelocity] = velocities;
            let solve = |vc: &mut ContactVelocityConstraint| {
                let (a, b) = Self::solve_velocity_constraint(vc, snapshot[vc.index_a], snapshot[vc.index_b]);
                VelocityUpdate {
                    index_a: vc.index_a,
                    index_b: vc.index_b,
                    a,
                    b,
                    write_a: vc.inv_mass_a != 0.0 || vc.inv_i_a != 0.0,
                    write_b: vc.inv_mass_b != 0.0 || vc.inv_i_b != 0.0,
                }
            };

            #[cfg(feature = "parallel")]
            batch.par_iter_mut().map(solve).collect_into_vec(&mut self.velocity_updates);

            #[cfg(not(feature = "parallel"))]
            {
                self.velocity_updates.clear();
                self.velocity_updates.extend(batch.iter_mut().map(solve));
            }

            for update in &self.velocity_updates {
                if update.write_a {
                    velocities[update.index_a] = update.a;
                }
                if update.write_b {
                    velocities[update.index_b] = update.b;
                }
            }
        }
    }

    /// Solves friction and then non-penetration for one contact
    fn solve_velocity_constraint(
        vc: &mut ContactVelocityConstraint,
        velocity_a: SolverVelocity,
        velocity_b: SolverVelocity,
    ) -> (SolverVelocity, SolverVelocity) {
        let m_a = vc.inv_mass_a;
        let i_a = vc.inv_i_a;
        let m_b = vc.inv_mass_b;
        let i_b = vc.inv_i_b;

        let SolverVelocity { v: mut v_a, w: mut w_a } = velocity_a;
        let SolverVelocity { v: mut v_b, w: mut w_b } = velocity_b;

        let normal = vc.normal;
        let tangent = normal.cross_scalar(1.0);
        let friction = vc.friction;

        // Friction first: non-penetration matters more.
        for vcp in vc.points[..vc.point_count].iter_mut() {
            let dv = v_b + Vector2::scalar_cross(w_b, &vcp.r_b) - v_a - Vector2::scalar_cross(w_a, &vcp.r_a);

            let vt = dv.dot(&tangent) - vc.tangent_speed;
            let mut lambda = vcp.tangent_mass * (-vt);

            let max_friction = friction * vcp.normal_impulse;
            let new_impulse = clamp(vcp.tangent_impulse + lambda, -max_friction, max_friction);
            lambda = new_impulse - vcp.tangent_impulse;
            vcp.tangent_impulse = new_impulse;

            let p = tangent * lambda;
            v_a -= p * m_a;
            w_a -= i_a * vcp.r_a.cross(&p);
            v_b += p * m_b;
            w_b += i_b * vcp.r_b.cross(&p);
        }

        if vc.point_count == 1 {
            let vcp = &mut vc.points[0];

            let dv = v_b + Vector2::scalar_cross(w_b, &vcp.r_b) - v_a - Vector2::scalar_cross(w_a, &vcp.r_a);
            let vn = dv.dot(&normal);
            let mut lambda = -vcp.normal_mass * (vn - vcp.velocity_bias);

            let new_impulse = (vcp.normal_impulse + lambda).max(0.0);
            lambda = new_impulse - vcp.normal_impulse;
            vcp.normal_impulse = new_impulse;

            let p = normal * lambda;
            v_a -= p * m_a;
            w_a -= i_a * vcp.r_a.cross(&p);
            v_b += p * m_b;
            w_b += i_b * vcp.r_b.cross(&p);
        } else {
            // Block solver for the 2x2 LCP
            //   vn = K * x + b',  vn >= 0,  x >= 0,  vn_i * x_i = 0
            // with b' = vn0 - velocity_bias - K * a, where `a` is the
            // accumulated impulse. Enumerate the four complementarity cases and
            // take the first that satisfies every condition.
            let cp1 = vc.points[0];
            let cp2 = vc.points[1];

            let a = Vector2::new(cp1.normal_impulse, cp2.normal_impulse);
            debug_assert!(a.x >= 0.0 && a.y >= 0.0);

            let dv1 = v_b + Vector2::scalar_cross(w_b, &cp1.r_b) - v_a - Vector2::scalar_cross(w_a, &cp1.r_a);
            let dv2 = v_b + Vector2::scalar_cross(w_b, &cp2.r_b) - v_a - Vector2::scalar_cross(w_a, &cp2.r_a);

            let vn1 = dv1.dot(&normal);
            let vn2 = dv2.dot(&normal);

            let mut b = Vector2::new(vn1 - cp1.velocity_bias, vn2 - cp2.velocity_bias);
            b -= vc.k.mul_vector(a);

            let candidates = [
                // Both points active: x = -K^-1 * b'
                {
                    let x = -(vc.normal_mass.mul_vector(b));
                    (x, x.x >= 0.0 && x.y >= 0.0)
                },
                // Only the first point active.
                {
                    let x = Vector2::new(-cp1.normal_mass * b.x, 0.0);
                    let vn2 = vc.k.data[1][0] * x.x + b.y;
                    (x, x.x >= 0.0 && vn2 >= 0.0)
                },
                // Only the second point active.
                {
                    let x = Vector2::new(0.0, -cp2.normal_mass * b.y);
                    let vn1 = vc.k.data[0][1] * x.y + b.x;
                    (x, x.y >= 0.0 && vn1 >= 0.0)
                },
                // Neither active.
                (Vector2::zero(), b.x >= 0.0 && b.y >= 0.0),
            ];

            // No valid case can happen with inconsistent input; keep the velocities then.
            if let Some(&(x, _)) = candidates.iter().find(|(_, valid)| *valid) {
                let d = x - a;

                let p1 = normal * d.x;
                let p2 = normal * d.y;
                v_a -= (p1 + p2) * m_a;
                w_a -= i_a * (cp1.r_a.cross(&p1) + cp2.r_a.cross(&p2));
                v_b += (p1 + p2) * m_b;
                w_b += i_b * (cp1.r_b.cross(&p1) + cp2.r_b.cross(&p2));

                vc.points[0].normal_impulse = x.x;
                vc.points[1].normal_impulse = x.y;
            }
        }

        (
            SolverVelocity { v: v_a, w: w_a },
            SolverVelocity { v: v_b, w: w_b },
        )
    }

    /// Writes the accumulated impulses back to the contact manifolds
    pub fn store_impulses(&self, contacts: &mut ContactStorage<Contact>) {
        for vc in &self.velocity_constraints {
            if let Some(contact) = contacts.get_mut(vc.contact) {
                let manifold = contact.manifold_mut();
                for (mp, vcp) in manifold.points.iter_mut().zip(&vc.points[..vc.point_count]) {
                    mp.normal_impulse = vcp.normal_impulse;
                    mp.tangent_impulse = vcp.tangent_impulse;
                }
            }
        }
    }

    /// Runs one position pass; returns whether all overlap is within tolerance
    pub fn solve_position_constraints(&mut self, positions: &mut [SolverPosition]) -> bool {
        let min_separation = self.solve_positions(positions, BAUMGARTE, |pc| PositionMasses {
            m_a: pc.inv_mass_a,
            i_a: pc.inv_i_a,
            m_b: pc.inv_mass_b,
            i_b: pc.inv_i_b,
        });

        // The solver cannot push the separation above -LINEAR_SLOP.
        min_separation >= -POSITION_SOLVED_SLOP_FACTOR * LINEAR_SLOP
    }

    /// Position pass of a TOI sub-step: only the two TOI bodies move
    pub fn solve_toi_position_constraints(
        &mut self,
        positions: &mut [SolverPosition],
        toi_index_a: usize,
        toi_index_b: usize,
    ) -> bool {
        let is_toi = move |index: usize| index == toi_index_a || index == toi_index_b;
        let min_separation = self.solve_positions(positions, TOI_BAUMGARTE, move |pc| PositionMasses {
            m_a: if is_toi(pc.index_a) { pc.inv_mass_a } else { 0.0 },
            i_a: if is_toi(pc.index_a) { pc.inv_i_a } else { 0.0 },
            m_b: if is_toi(pc.index_b) { pc.inv_mass_b } else { 0.0 },
            i_b: if is_toi(pc.index_b) { pc.inv_i_b } else { 0.0 },
        });

        min_separation >= -TOI_POSITION_SOLVED_SLOP_FACTOR * LINEAR_SLOP
    }

    fn solve_positions<F>(&mut self, positions: &mut [SolverPosition], baumgarte: f32, masses: F) -> f32
    where
        F: Fn(&ContactPositionConstraint) -> PositionMasses + Sync,
    {
        let batched = self.colored && self.position_constraints.len() >= self.position_batch_threshold;
        if !batched {
            let mut min_separation = 0.0f32;
            for pc in &self.position_constraints {
                let update = Self::solve_position_constraint(pc, positions, baumgarte, masses(pc));
                positions[update.index_a] = update.a;
                positions[update.index_b] = update.b;
                min_separation = min_separation.min(update.min_separation);
            }
            return min_separation;
        }

        let saturated = self.coloring.is_saturated();
        let color_count = self.coloring.color_count();
        let mut min_separation = 0.0f32;

        for (color, range) in self.coloring.ranges().iter().enumerate() {
            let batch = &self.position_constraints[range.clone()];

            if saturated && color + 1 == color_count {
                for pc in batch {
                    let update = Self::solve_position_constraint(pc, positions, baumgarte, masses(pc));
                    positions[update.index_a] = update.a;
                    positions[update.index_b] = update.b;
                    min_separation = min_separation.min(update.min_separation);
                }
                continue;
            }

            let snapshot: &[SolverPosition] = positions;
            let solve = |pc: &ContactPositionConstraint| {
                Self::solve_position_constraint(pc, snapshot, baumgarte, masses(pc))
            };

            #[cfg(feature = "parallel")]
            batch.par_iter().map(solve).collect_into_vec(&mut self.position_updates);

            #[cfg(not(feature = "parallel"))]
            {
                self.position_updates.clear();
                self.position_updates.extend(batch.iter().map(solve));
            }

            for update in &self.position_updates {
                if update.write_a {
                    positions[update.index_a] = update.a;
                }
                if update.write_b {
                    positions[update.index_b] = update.b;
                }
                min_separation = min_separation.min(update.min_separation);
            }
        }

        min_separation
    }

    /// Pushes the bodies of one contact apart along each manifold point
    fn solve_position_constraint(
        pc: &ContactPositionConstraint,
        positions: &[SolverPosition],
        baumgarte: f32,
        masses: PositionMasses,
    ) -> PositionUpdate {
        let PositionMasses { m_a, i_a, m_b, i_b } = masses;

        let mut position_a = positions[pc.index_a];
        let mut position_b = positions[pc.index_b];
        let mut min_separation = 0.0f32;

        for j in 0..pc.manifold.point_count {
            let xf_a = solver_transform(&position_a, pc.local_center_a);
            let xf_b = solver_transform(&position_b, pc.local_center_b);

            let psm = PositionSolverManifold::new(pc, &xf_a, &xf_b, j);
            let normal = psm.normal;

            let r_a = psm.point - position_a.c;
            let r_b = psm.point - position_b.c;

            min_separation = min_separation.min(psm.separation);

            // Prevent large corrections and allow slop.
            let c = clamp(
                baumgarte * (psm.separation + LINEAR_SLOP),
                -MAX_LINEAR_CORRECTION,
                0.0,
            );

            let rn_a = r_a.cross(&normal);
            let rn_b = r_b.cross(&normal);
            let k = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;

            let impulse = if k > 0.0 { -c / k } else { 0.0 };
            let p = normal * impulse;

            position_a.c -= p * m_a;
            position_a.a -= i_a * r_a.cross(&p);
            position_b.c += p * m_b;
            position_b.a += i_b * r_b.cross(&p);
        }

        PositionUpdate {
            index_a: pc.index_a,
            index_b: pc.index_b,
            a: position_a,
            b: position_b,
            write_a: m_a != 0.0 || i_a != 0.0,
            write_b: m_b != 0.0 || i_b != 0.0,
            min_separation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::distance::DistanceProxy;
    use crate::collision::manifold::ManifoldPoint;
    use crate::core::BodyHandle;

    const DT: f32 = 1.0 / 60.0;

    /// A face manifold on the top of a unit box A touching B at the given local points
    fn resting_on_top(points: &[Vector2]) -> Manifold {
        let mut manifold = Manifold::new(ManifoldType::FaceA, Vector2::unit_y(), Vector2::new(0.0, 0.5));
        for (id, &point) in points.iter().enumerate() {
            manifold.add_point(ManifoldPoint::new(point, id as u32)).unwrap();
        }
        manifold
    }

    fn unit_box(position: Vector2, island_index: usize) -> RigidBody {
        let mut body = RigidBody::new_dynamic(position);
        body.set_mass_data(1.0, Vector2::zero(), 1.0 / 6.0);
        body.island_index = island_index;
        body
    }

    fn boxed_contact(a: BodyHandle, b: BodyHandle, manifold: Manifold) -> Contact {
        Contact::new(a, b, DistanceProxy::boxed(0.5, 0.5), DistanceProxy::boxed(0.5, 0.5)).with_manifold(manifold)
    }

    #[test]
    fn test_nearly_coincident_points_solve_as_one() {
        let mut bodies: BodyStorage<RigidBody> = BodyStorage::new();
        let mut contacts: ContactStorage<Contact> = ContactStorage::new();

        let mut ground = RigidBody::new_static(Vector2::zero());
        ground.island_index = 0;
        let ground = bodies.add(ground);
        let falling = bodies.add(unit_box(Vector2::new(0.0, 1.0), 1));

        let manifold = resting_on_top(&[Vector2::new(0.1, -0.5), Vector2::new(0.1 + 1e-6, -0.5)]);
        let contact = contacts.add(boxed_contact(ground, falling, manifold));

        let positions = [
            SolverPosition { c: Vector2::zero(), a: 0.0 },
            SolverPosition { c: Vector2::new(0.0, 1.0), a: 0.0 },
        ];
        let mut velocities = [
            SolverVelocity::default(),
            SolverVelocity { v: Vector2::new(0.0, -1.5), w: 0.0 },
        ];

        let mut solver = ContactSolver::new();
        solver
            .reset(&TimeStep::new(DT, 8, 3), &contacts, &[contact], &bodies)
            .unwrap();
        solver.initialize_velocity_constraints(&positions, &velocities);
        assert_eq!(solver.velocity_constraints()[0].point_count, 1);

        solver.warm_start(&mut velocities);
        for _ in 0..8 {
            solver.solve_velocity_constraints(&mut velocities);
        }

        let SolverVelocity { v, w } = velocities[1];
        assert!(v.is_valid() && w.is_finite());

        // The remaining point no longer approaches the ground.
        let vc = &solver.velocity_constraints()[0];
        let point_velocity = v + Vector2::scalar_cross(w, &vc.points[0].r_b);
        assert!(point_velocity.dot(&vc.normal) > -1e-3);
        assert!(vc.points[0].normal_impulse > 0.0);
        assert_eq!(vc.points[1].normal_impulse, 0.0);
    }

    #[test]
    fn test_toi_position_pass_moves_only_toi_bodies() {
        let mut bodies: BodyStorage<RigidBody> = BodyStorage::new();
        let mut contacts: ContactStorage<Contact> = ContactStorage::new();

        let heights = [0.0, 0.9, 1.8];
        let handles: Vec<_> = heights
            .iter()
            .enumerate()
            .map(|(i, &y)| bodies.add(unit_box(Vector2::new(0.0, y), i)))
            .collect();

        let bottom_face = [Vector2::new(-0.5, -0.5), Vector2::new(0.5, -0.5)];
        let island_contacts = [
            contacts.add(boxed_contact(handles[0], handles[1], resting_on_top(&bottom_face))),
            contacts.add(boxed_contact(handles[1], handles[2], resting_on_top(&bottom_face))),
        ];

        let mut positions: Vec<_> = heights
            .iter()
            .map(|&y| SolverPosition { c: Vector2::new(0.0, y), a: 0.0 })
            .collect();
        let untouched = positions[2];

        let mut solver = ContactSolver::new();
        solver
            .reset(&TimeStep::new(DT, 8, 20), &contacts, &island_contacts, &bodies)
            .unwrap();
        for _ in 0..20 {
            solver.solve_toi_position_constraints(&mut positions, 0, 1);
        }

        assert_eq!(positions[2], untouched);
        assert!(positions[1].c.y - positions[0].c.y > 1.0, "pair still overlaps");
    }
}
