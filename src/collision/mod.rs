pub mod manifold;
pub mod distance;
pub mod time_of_impact;
pub mod contact;
pub mod contact_solver;
pub mod narrow_phase;

pub use self::manifold::{ContactId, Manifold, ManifoldPoint, ManifoldType, WorldManifold};
pub use self::distance::{compute_distance, DistanceInput, DistanceOutput, DistanceProxy, SimplexCache};
pub use self::time_of_impact::{time_of_impact, ToiInput, ToiOutput, ToiState, ToiStats};
pub use self::contact::contact_flags::ContactFlags;
pub use self::contact::Contact;
pub use self::contact_solver::{ContactSolver, ContactVelocityConstraint, VelocityConstraintPoint};
pub use self::narrow_phase::{Narrowphase, RetainedManifolds};
