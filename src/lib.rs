//! Constraint solver and continuous collision core for 2D rigid-body physics.
//!
//! The world groups bodies into islands over touching contacts and joints,
//! solves each island with sequential impulses (a block solver for two-point
//! manifolds) and finally sub-steps fast bodies to their time of impact.

pub mod math;
pub mod core;
pub mod bodies;
pub mod collision;
pub mod constraints;

/// Re-export common types for easier usage
pub use crate::core::{BodyHandle, ContactHandle, JointHandle, PhysicsWorld, SolverConfig};
pub use crate::bodies::{Material, RigidBody, RigidBodyHandle, RigidBodyType};
pub use crate::collision::{Contact, DistanceProxy, Manifold, ManifoldPoint, ManifoldType, Narrowphase};
pub use crate::constraints::{Joint, JointKind, RevoluteJoint, RopeJoint};
pub use crate::math::Vector2;

/// Error types for the physics engine
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum PhysicsError {
        #[error("Invalid parameter: {0}")]
        InvalidParameter(String),

        #[error("Resource not found: {0}")]
        ResourceNotFound(String),

        #[error("Capacity exceeded: {0}")]
        CapacityExceeded(String),

        #[error("Island index {0} out of range")]
        InvalidIslandIndex(usize),

        #[error("Invalid joint: {0}")]
        InvalidJoint(String),
    }
}

/// Result type for physics engine operations
pub type Result<T> = std::result::Result<T, error::PhysicsError>;

/// Engine version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
