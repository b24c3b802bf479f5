use crate::math::{Rotation, Vector2};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// A rigid transformation in 2D space (translation and rotation)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Position in 2D space
    pub position: Vector2,

    /// Rotation about the origin
    pub rotation: Rotation,
}

impl Transform {
    /// Creates a new transform with the given position and rotation
    #[inline]
    pub fn new(position: Vector2, rotation: Rotation) -> Self {
        Self { position, rotation }
    }

    /// Creates a new identity transform
    #[inline]
    pub fn identity() -> Self {
        Self {
            position: Vector2::zero(),
            rotation: Rotation::identity(),
        }
    }

    /// Creates a new transform from just a position
    #[inline]
    pub fn from_position(position: Vector2) -> Self {
        Self {
            position,
            rotation: Rotation::identity(),
        }
    }

    /// Creates a new transform from a position and an angle in radians
    #[inline]
    pub fn from_position_angle(position: Vector2, angle: f32) -> Self {
        Self {
            position,
            rotation: Rotation::new(angle),
        }
    }

    /// Sets position and angle
    #[inline]
    pub fn set(&mut self, position: Vector2, angle: f32) {
        self.position = position;
        self.rotation.set(angle);
    }

    /// Transforms a point from local to world space
    #[inline]
    pub fn transform_point(&self, point: Vector2) -> Vector2 {
        self.rotation.rotate(point) + self.position
    }

    /// Transforms a point from world to local space
    #[inline]
    pub fn inverse_transform_point(&self, point: Vector2) -> Vector2 {
        self.rotation.inv_rotate(point - self.position)
    }

    /// Rotates a direction from local to world space
    #[inline]
    pub fn transform_vector(&self, v: Vector2) -> Vector2 {
        self.rotation.rotate(v)
    }

    /// Rotates a direction from world to local space
    #[inline]
    pub fn inverse_transform_vector(&self, v: Vector2) -> Vector2 {
        self.rotation.inv_rotate(v)
    }

    /// Combines two transforms: `self * other`
    #[inline]
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.rotation.rotate(other.position) + self.position,
            rotation: self.rotation.mul(&other.rotation),
        }
    }

    /// Expresses `other` in the frame of this transform: `self^-1 * other`
    #[inline]
    pub fn inverse_combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.rotation.inv_rotate(other.position - self.position),
            rotation: self.rotation.mul_t(&other.rotation),
        }
    }
}
