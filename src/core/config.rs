use crate::core::settings;
use crate::error::PhysicsError;
use crate::math::Vector2;
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Configuration parameters for the solver and the world step
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// World gravity
    pub gravity: Vector2,

    /// The fixed time step used by `PhysicsWorld::step_fixed`
    pub time_step: f32,

    /// The number of iterations to run for solving velocity constraints
    pub velocity_iterations: u32,

    /// The number of iterations to run for solving position constraints
    pub position_iterations: u32,

    /// Velocity iterations of the time-of-impact sub-step
    pub toi_velocity_iterations: u32,

    /// Position iterations of the time-of-impact sub-step
    pub toi_position_iterations: u32,

    /// Whether accumulated impulses seed the next step
    pub warm_starting: bool,

    /// Whether to use continuous collision for fast bodies
    pub continuous_physics: bool,

    /// Stop after the first TOI sub-step of each step (debugging aid)
    pub sub_stepping: bool,

    /// Maximum TOI sub-steps for a single contact per step
    pub max_sub_steps: u32,

    /// Whether to allow sleeping bodies
    pub allow_sleeping: bool,

    /// Linear speed below which a body accumulates sleep time
    pub linear_sleep_tolerance: f32,

    /// Angular speed below which a body accumulates sleep time
    pub angular_sleep_tolerance: f32,

    /// The time an island must be still before it sleeps
    pub time_to_sleep: f32,

    /// Approach speed above which restitution is applied
    pub velocity_threshold: f32,

    /// Largest translation of a body per step
    pub max_translation: f32,

    /// Largest rotation of a body per step
    pub max_rotation: f32,

    /// Contact count from which velocity passes run as colored batches
    pub velocity_constraints_multithread_threshold: usize,

    /// Contact count from which position passes run as colored batches
    pub position_constraints_multithread_threshold: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gravity: Vector2::new(0.0, -9.81),
            time_step: 1.0 / 60.0,
            velocity_iterations: 8,
            position_iterations: 3,
            toi_velocity_iterations: 8,
            toi_position_iterations: 20,
            warm_starting: true,
            continuous_physics: true,
            sub_stepping: false,
            max_sub_steps: settings::MAX_SUB_STEPS,
            allow_sleeping: true,
            linear_sleep_tolerance: settings::LINEAR_SLEEP_TOLERANCE,
            angular_sleep_tolerance: settings::ANGULAR_SLEEP_TOLERANCE,
            time_to_sleep: settings::TIME_TO_SLEEP,
            velocity_threshold: settings::VELOCITY_THRESHOLD,
            max_translation: settings::MAX_TRANSLATION,
            max_rotation: settings::MAX_ROTATION,
            velocity_constraints_multithread_threshold: 256,
            position_constraints_multithread_threshold: 256,
        }
    }
}

impl SolverConfig {
    /// Checks that the configuration describes a runnable solver
    pub fn validate(&self) -> Result<()> {
        if !(self.time_step > 0.0) {
            return Err(PhysicsError::InvalidParameter(format!(
                "time_step must be positive, got {}",
                self.time_step
            )));
        }
        if self.velocity_iterations == 0 {
            return Err(PhysicsError::InvalidParameter(
                "velocity_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_translation <= 0.0 || self.max_rotation <= 0.0 {
            return Err(PhysicsError::InvalidParameter(
                "max_translation and max_rotation must be positive".to_string(),
            ));
        }
        if self.time_to_sleep < 0.0 {
            return Err(PhysicsError::InvalidParameter(format!(
                "time_to_sleep must not be negative, got {}",
                self.time_to_sleep
            )));
        }
        if !self.gravity.is_valid() {
            return Err(PhysicsError::InvalidParameter(
                "gravity must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
