mod vector;
mod matrix;
mod transform;
mod rotation;
mod sweep;

pub use vector::{Vector2, Vector3};
pub use matrix::{Matrix2, Matrix3};
pub use transform::Transform;
pub use rotation::Rotation;
pub use sweep::Sweep;

/// Machine epsilon for single precision, used for degeneracy checks
pub const EPSILON: f32 = f32::EPSILON;

/// Returns true if the two floating point values are approximately equal
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Returns true if the value is approximately zero
#[inline]
pub fn approx_zero(a: f32) -> bool {
    a.abs() < EPSILON
}

/// Clamps a value between a minimum and maximum value
#[inline]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Converts degrees to radians
#[inline]
pub fn to_radians(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

/// Converts radians to degrees
#[inline]
pub fn to_degrees(radians: f32) -> f32 {
    radians * 180.0 / std::f32::consts::PI
}
