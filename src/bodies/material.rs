#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Surface properties used to derive the friction and restitution of a contact
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Material {
    /// Coefficient of friction, usually in `[0, 1]`
    pub friction: f32,

    /// Coefficient of restitution (bounciness), usually in `[0, 1]`
    pub restitution: f32,
}

impl Material {
    /// Creates a new material with the specified properties
    pub fn new(friction: f32, restitution: f32) -> Self {
        Self {
            friction,
            restitution,
        }
    }

    /// Friction of a contact between two materials (geometric mean)
    ///
    /// A zero-friction surface slides on anything.
    #[inline]
    pub fn mix_friction(&self, other: &Material) -> f32 {
        (self.friction * other.friction).sqrt()
    }

    /// Restitution of a contact between two materials (the larger one)
    ///
    /// A bouncy surface bounces on anything.
    #[inline]
    pub fn mix_restitution(&self, other: &Material) -> f32 {
        self.restitution.max(other.restitution)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.2,
            restitution: 0.0,
        }
    }
}
