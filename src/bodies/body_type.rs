#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Type of rigid body, determining how it behaves in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum RigidBodyType {
    /// Dynamic bodies are fully simulated (affected by forces, contacts and joints)
    #[default]
    Dynamic,

    /// Kinematic bodies move with their set velocity and push dynamic bodies
    Kinematic,

    /// Static bodies never move and have infinite mass
    Static,
}

impl RigidBodyType {
    /// Returns whether the body has finite mass
    #[inline]
    pub fn is_dynamic(self) -> bool {
        self == RigidBodyType::Dynamic
    }

    /// Returns whether the body never moves
    #[inline]
    pub fn is_static(self) -> bool {
        self == RigidBodyType::Static
    }
}
