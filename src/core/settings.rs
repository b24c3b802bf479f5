//! Global tuning constants shared by the solver, the joints and the
//! time-of-impact routine. Lengths are in meters, angles in radians.

use std::f32::consts::PI;

/// Maximum number of contact points between two convex shapes
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// Maximum number of vertices on a convex polygon
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Collision and constraint tolerance
pub const LINEAR_SLOP: f32 = 0.005;

/// Collision and constraint angular tolerance
pub const ANGULAR_SLOP: f32 = 2.0 / 180.0 * PI;

/// Skin radius around polygons
pub const POLYGON_RADIUS: f32 = 2.0 * LINEAR_SLOP;

/// Maximum number of sub-steps per contact in continuous physics
pub const MAX_SUB_STEPS: u32 = 8;

/// Maximum number of contacts handled by one TOI island
pub const MAX_TOI_CONTACTS: usize = 32;

/// Largest linear position correction applied in one position iteration
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;

/// Largest angular position correction applied in one position iteration
pub const MAX_ANGULAR_CORRECTION: f32 = 8.0 / 180.0 * PI;

/// Default largest translation of a body per step
pub const MAX_TRANSLATION: f32 = 2.0;

/// Default largest rotation of a body per step
pub const MAX_ROTATION: f32 = 0.5 * PI;

/// Fraction of the overlap removed per position iteration
pub const BAUMGARTE: f32 = 0.2;

/// Baumgarte factor used by the TOI position solve
pub const TOI_BAUMGARTE: f32 = 0.75;

/// Relative velocity below which collisions are treated as inelastic
pub const VELOCITY_THRESHOLD: f32 = 1.0;

/// Time a body must be still before it sleeps
pub const TIME_TO_SLEEP: f32 = 0.5;

/// Linear speed below which a body may sleep
pub const LINEAR_SLEEP_TOLERANCE: f32 = 0.01;

/// Angular speed below which a body may sleep
pub const ANGULAR_SLEEP_TOLERANCE: f32 = 2.0 / 180.0 * PI;

/// Bound on the condition number of the 2-point block solver's K matrix
pub const MAX_CONDITION_NUMBER: f32 = 1000.0;

/// Multiple of the linear slop accepted as "solved" by the position pass
pub const POSITION_SOLVED_SLOP_FACTOR: f32 = 3.0;

/// Multiple of the linear slop accepted as "solved" by the TOI position pass
pub const TOI_POSITION_SOLVED_SLOP_FACTOR: f32 = 1.5;
