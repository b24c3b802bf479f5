mod joint;
mod revolute;
mod rope;

pub use self::joint::{BodyPair, Joint, JointConstraint, JointKind, LimitState};
pub use self::revolute::RevoluteJoint;
pub use self::rope::RopeJoint;
