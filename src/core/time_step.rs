use crate::math::Vector2;

/// Timing and iteration parameters of one solver invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStep {
    /// Time step length
    pub dt: f32,

    /// Inverse time step (0 if `dt == 0`)
    pub inv_dt: f32,

    /// `dt * inv_dt` of the previous step, used to rescale warm-start impulses
    pub dt_ratio: f32,

    /// Number of velocity iterations
    pub velocity_iterations: u32,

    /// Number of position iterations
    pub position_iterations: u32,

    /// Whether accumulated impulses seed this step
    pub warm_starting: bool,
}

impl TimeStep {
    /// Creates a step of length `dt` with a unit `dt_ratio`
    pub fn new(dt: f32, velocity_iterations: u32, position_iterations: u32) -> Self {
        Self {
            dt,
            inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            dt_ratio: 1.0,
            velocity_iterations,
            position_iterations,
            warm_starting: true,
        }
    }
}

/// Position of a body's center of mass within an island
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolverPosition {
    /// World center of mass
    pub c: Vector2,

    /// World angle
    pub a: f32,
}

/// Velocity of a body within an island
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolverVelocity {
    /// Linear velocity of the center of mass
    pub v: Vector2,

    /// Angular velocity
    pub w: f32,
}

/// Mass properties of a body within an island
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolverMass {
    pub inv_mass: f32,
    pub inv_i: f32,
    pub local_center: Vector2,
}

/// Solver state handed to joints
///
/// Arrays are indexed by island index.
pub struct SolverData<'a> {
    pub step: TimeStep,
    pub positions: &'a mut [SolverPosition],
    pub velocities: &'a mut [SolverVelocity],
    pub masses: &'a [SolverMass],
}
