use crate::math::Vector2;
use std::fmt;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// A planar rotation stored as its sine and cosine
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Rotation {
    /// Sine of the angle
    pub s: f32,

    /// Cosine of the angle
    pub c: f32,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Rotation {
    /// Creates a rotation from an angle in radians
    #[inline]
    pub fn new(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self { s, c }
    }

    /// The identity rotation
    #[inline]
    pub fn identity() -> Self {
        Self { s: 0.0, c: 1.0 }
    }

    /// Sets the rotation from an angle in radians
    #[inline]
    pub fn set(&mut self, angle: f32) {
        let (s, c) = angle.sin_cos();
        self.s = s;
        self.c = c;
    }

    /// Returns the angle in radians, in `[-pi, pi]`
    #[inline]
    pub fn get_angle(&self) -> f32 {
        self.s.atan2(self.c)
    }

    /// The rotated x-axis
    #[inline]
    pub fn x_axis(&self) -> Vector2 {
        Vector2::new(self.c, self.s)
    }

    /// The rotated y-axis
    #[inline]
    pub fn y_axis(&self) -> Vector2 {
        Vector2::new(-self.s, self.c)
    }

    /// Rotates a vector
    #[inline]
    pub fn rotate(&self, v: Vector2) -> Vector2 {
        Vector2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Applies the inverse rotation to a vector
    #[inline]
    pub fn inv_rotate(&self, v: Vector2) -> Vector2 {
        Vector2::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }

    /// Composes two rotations: `self * other`
    #[inline]
    pub fn mul(&self, other: &Rotation) -> Rotation {
        Rotation {
            s: self.s * other.c + self.c * other.s,
            c: self.c * other.c - self.s * other.s,
        }
    }

    /// Composes the inverse of this rotation with another: `self^T * other`
    #[inline]
    pub fn mul_t(&self, other: &Rotation) -> Rotation {
        Rotation {
            s: self.c * other.s - self.s * other.c,
            c: self.c * other.c + self.s * other.s,
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Rotation({} rad)", self.get_angle())
    }
}
