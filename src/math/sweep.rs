use crate::math::{Rotation, Transform, Vector2};
use std::f32::consts::PI;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Describes the motion of a body over one time step
///
/// The sweep interpolates the center of mass between `c0` (at time `alpha0`)
/// and `c` (at the end of the step). Shapes are defined relative to the body
/// origin, which may not coincide with the center of mass, so the local
/// center is carried along to recover the body transform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Sweep {
    /// Center of mass in body-local coordinates
    pub local_center: Vector2,

    /// World center of mass at `alpha0`
    pub c0: Vector2,

    /// World center of mass at the end of the step
    pub c: Vector2,

    /// World angle at `alpha0`
    pub a0: f32,

    /// World angle at the end of the step
    pub a: f32,

    /// Fraction of the current step already consumed, in `[0, 1)`
    pub alpha0: f32,
}

impl Sweep {
    /// Creates a sweep at rest at the given center and angle
    pub fn new(local_center: Vector2, center: Vector2, angle: f32) -> Self {
        Self {
            local_center,
            c0: center,
            c: center,
            a0: angle,
            a: angle,
            alpha0: 0.0,
        }
    }

    /// Returns the interpolated body transform at `beta` in `[0, 1]`
    ///
    /// `beta = 0` is the start of the sweep, `beta = 1` its end.
    pub fn get_transform(&self, beta: f32) -> Transform {
        let center = self.c0 * (1.0 - beta) + self.c * beta;
        let angle = (1.0 - beta) * self.a0 + beta * self.a;

        let rotation = Rotation::new(angle);
        Transform {
            position: center - rotation.rotate(self.local_center),
            rotation,
        }
    }

    /// Advances the start of the sweep forward to `alpha`, yielding a new initial state
    pub fn advance(&mut self, alpha: f32) {
        debug_assert!(self.alpha0 < 1.0);
        let beta = (alpha - self.alpha0) / (1.0 - self.alpha0);
        self.c0 += (self.c - self.c0) * beta;
        self.a0 += beta * (self.a - self.a0);
        self.alpha0 = alpha;
    }

    /// Shifts both angles by a multiple of 2π so that `a0` lies in `[0, 2π)`
    pub fn normalize(&mut self) {
        let two_pi = 2.0 * PI;
        let d = two_pi * (self.a0 / two_pi).floor();
        self.a0 -= d;
        self.a -= d;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_endpoints() {
        let mut sweep = Sweep::new(Vector2::new(0.5, 0.0), Vector2::zero(), 0.0);
        sweep.c = Vector2::new(4.0, 2.0);
        sweep.a = PI / 2.0;

        let start = sweep.get_transform(0.0);
        assert_relative_eq!(start.position.x, -0.5);
        assert_relative_eq!(start.position.y, 0.0);

        let end = sweep.get_transform(1.0);
        assert_relative_eq!(end.rotation.get_angle(), PI / 2.0, epsilon = 1e-6);
        assert_relative_eq!(end.position.x, 4.0, epsilon = 1e-6);
        assert_relative_eq!(end.position.y, 1.5, epsilon = 1e-6);
    }

    #[test]
    fn test_advance_keeps_end_state() {
        let mut sweep = Sweep::new(Vector2::zero(), Vector2::zero(), 0.0);
        sweep.c = Vector2::new(10.0, 0.0);
        sweep.a = 1.0;

        sweep.advance(0.5);
        assert_relative_eq!(sweep.c0.x, 5.0);
        assert_relative_eq!(sweep.a0, 0.5);

        // The remaining half of the step is now the full [0, 1] range.
        sweep.advance(0.75);
        assert_relative_eq!(sweep.c0.x, 7.5);
        assert_relative_eq!(sweep.c.x, 10.0);
    }

    #[test]
    fn test_normalize() {
        let mut sweep = Sweep::new(Vector2::zero(), Vector2::zero(), 7.0);
        sweep.a = 7.5;
        sweep.normalize();
        assert_relative_eq!(sweep.a0, 7.0 - 2.0 * PI, epsilon = 1e-5);
        assert_relative_eq!(sweep.a - sweep.a0, 0.5, epsilon = 1e-5);
    }
}
