mod rigid_body;
mod material;
mod body_type;

pub use self::rigid_body::{RigidBody, RigidBodyHandle};
pub use self::material::Material;
pub use self::body_type::RigidBodyType;

/// Flags for controlling body behavior
pub mod body_flags {
    use bitflags::bitflags;

    bitflags! {
        /// Flags for controlling the behavior of rigid bodies
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct BodyFlags: u32 {
            /// Body can go to sleep when inactive
            const CAN_SLEEP = 0x01;

            /// Body is currently sleeping
            const SLEEPING = 0x02;

            /// Body is affected by world gravity
            const AFFECTED_BY_GRAVITY = 0x04;

            /// Body is a bullet: continuous collision also against other dynamic bodies
            const CCD_ENABLED = 0x08;

            /// Body receives after-collision reports from the island
            const GENERATE_COLLISION_EVENTS = 0x10;

            /// Body does not rotate
            const FIXED_ROTATION = 0x20;
        }
    }
}
