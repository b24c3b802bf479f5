use nalgebra as na;
use std::ops::{Add, Sub, Mul, Div, Neg, AddAssign, SubAssign, MulAssign};
use std::fmt;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// A 2D vector representation for physics calculations
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

/// A 3-component vector, used for the stacked point/angle impulses of joints
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

// === Vector2 Implementation ===

impl Vector2 {
    /// Creates a new 2D vector
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Creates a new 2D vector with all components set to zero
    #[inline]
    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Creates a unit vector pointing in the x direction
    #[inline]
    pub fn unit_x() -> Self {
        Self { x: 1.0, y: 0.0 }
    }

    /// Creates a unit vector pointing in the y direction
    #[inline]
    pub fn unit_y() -> Self {
        Self { x: 0.0, y: 1.0 }
    }

    /// Computes the dot product of two vectors
    #[inline]
    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Computes the cross product magnitude of two 2D vectors
    #[inline]
    pub fn cross(&self, other: &Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Crosses this vector with a scalar on the right: `v × s`
    #[inline]
    pub fn cross_scalar(&self, s: f32) -> Self {
        Self::new(s * self.y, -s * self.x)
    }

    /// Crosses a scalar with a vector: `s × v`
    ///
    /// For an angular velocity `w` and lever arm `r` this is the point velocity `w × r`.
    #[inline]
    pub fn scalar_cross(s: f32, v: &Self) -> Self {
        Self::new(-s * v.y, s * v.x)
    }

    /// Returns the vector rotated by +90 degrees
    #[inline]
    pub fn skew(&self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Returns the squared length of the vector
    #[inline]
    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Returns the length of the vector
    #[inline]
    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Returns a normalized version of the vector
    ///
    /// Vectors shorter than `EPSILON` are returned unchanged.
    #[inline]
    pub fn normalize(&self) -> Self {
        let length = self.length();
        if length > crate::math::EPSILON {
            *self / length
        } else {
            *self
        }
    }

    /// Normalizes the vector in-place and returns its previous length
    ///
    /// Returns 0 and leaves the vector untouched when it is degenerate.
    #[inline]
    pub fn normalize_mut(&mut self) -> f32 {
        let length = self.length();
        if length < crate::math::EPSILON {
            return 0.0;
        }
        self.x /= length;
        self.y /= length;
        length
    }

    /// Returns true if the vector is approximately zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        crate::math::approx_zero(self.length_squared())
    }

    /// Returns true if both components are finite
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Component-wise absolute value
    #[inline]
    pub fn abs(&self) -> Self {
        Self::new(self.x.abs(), self.y.abs())
    }

    /// Convert to nalgebra Vector2
    #[inline]
    pub fn to_nalgebra(&self) -> na::Vector2<f32> {
        na::Vector2::new(self.x, self.y)
    }

    /// Convert from nalgebra Vector2
    #[inline]
    pub fn from_nalgebra(v: &na::Vector2<f32>) -> Self {
        Self::new(v.x, v.y)
    }

    /// Distance between two vectors
    #[inline]
    pub fn distance(&self, other: &Self) -> f32 {
        (*self - *other).length()
    }

    /// Squared distance between two vectors
    #[inline]
    pub fn distance_squared(&self, other: &Self) -> f32 {
        (*self - *other).length_squared()
    }
}

impl Add for Vector2 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vector2 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for Vector2 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl Mul<Vector2> for f32 {
    type Output = Vector2;

    #[inline]
    fn mul(self, v: Vector2) -> Vector2 {
        Vector2::new(self * v.x, self * v.y)
    }
}

impl Div<f32> for Vector2 {
    type Output = Self;

    #[inline]
    fn div(self, scalar: f32) -> Self {
        let inv = 1.0 / scalar;
        Self::new(self.x * inv, self.y * inv)
    }
}

impl Neg for Vector2 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl AddAssign for Vector2 {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl SubAssign for Vector2 {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl MulAssign<f32> for Vector2 {
    #[inline]
    fn mul_assign(&mut self, scalar: f32) {
        self.x *= scalar;
        self.y *= scalar;
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<na::Vector2<f32>> for Vector2 {
    fn from(v: na::Vector2<f32>) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Vector2> for na::Vector2<f32> {
    fn from(v: Vector2) -> Self {
        na::Vector2::new(v.x, v.y)
    }
}

// === Vector3 Implementation ===

impl Vector3 {
    /// Creates a new 3-component vector
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Creates a vector with all components set to zero
    #[inline]
    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }

    /// Computes the dot product of two vectors
    #[inline]
    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Computes the cross product of two vectors
    #[inline]
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// The first two components as a 2D vector
    #[inline]
    pub fn xy(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    /// Convert to nalgebra Vector3
    #[inline]
    pub fn to_nalgebra(&self) -> na::Vector3<f32> {
        na::Vector3::new(self.x, self.y, self.z)
    }
}

impl Add for Vector3 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f32> for Vector3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl AddAssign for Vector3 {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl MulAssign<f32> for Vector3 {
    #[inline]
    fn mul_assign(&mut self, scalar: f32) {
        self.x *= scalar;
        self.y *= scalar;
        self.z *= scalar;
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
