use nalgebra as na;
use crate::math::{Vector2, Vector3};
use std::ops::{Add, Mul};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// A 2x2 matrix stored row-major
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Matrix2 {
    pub data: [[f32; 2]; 2],
}

/// A 3x3 matrix stored row-major
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Matrix3 {
    pub data: [[f32; 3]; 3],
}

// === Matrix2 Implementation ===

impl Matrix2 {
    /// Creates a new 2x2 matrix from a 2D array
    #[inline]
    pub fn new(data: [[f32; 2]; 2]) -> Self {
        Self { data }
    }

    /// Creates a matrix from its two columns
    #[inline]
    pub fn from_columns(col1: Vector2, col2: Vector2) -> Self {
        Self {
            data: [[col1.x, col2.x], [col1.y, col2.y]],
        }
    }

    /// Creates a new 2x2 identity matrix
    #[inline]
    pub fn identity() -> Self {
        Self {
            data: [[1.0, 0.0], [0.0, 1.0]],
        }
    }

    /// Creates a new 2x2 zero matrix
    #[inline]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns the determinant of the matrix
    #[inline]
    pub fn determinant(&self) -> f32 {
        let [[a, b], [c, d]] = self.data;
        a * d - b * c
    }

    /// Returns the inverse of the matrix
    ///
    /// A singular matrix yields the zero matrix, which turns any solve into a no-op.
    pub fn inverse(&self) -> Self {
        let [[a, b], [c, d]] = self.data;
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Self {
            data: [[det * d, -det * b], [-det * c, det * a]],
        }
    }

    /// Solves `A * x = b` without computing the inverse
    ///
    /// Returns zero when the matrix is singular.
    pub fn solve(&self, b: Vector2) -> Vector2 {
        let [[a11, a12], [a21, a22]] = self.data;
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vector2::new(
            det * (a22 * b.x - a12 * b.y),
            det * (a11 * b.y - a21 * b.x),
        )
    }

    /// Multiplies the matrix by a vector
    #[inline]
    pub fn mul_vector(&self, v: Vector2) -> Vector2 {
        Vector2::new(
            self.data[0][0] * v.x + self.data[0][1] * v.y,
            self.data[1][0] * v.x + self.data[1][1] * v.y,
        )
    }

    /// Convert to nalgebra Matrix2
    pub fn to_nalgebra(&self) -> na::Matrix2<f32> {
        na::Matrix2::new(
            self.data[0][0], self.data[0][1],
            self.data[1][0], self.data[1][1],
        )
    }

    /// Convert from nalgebra Matrix2
    pub fn from_nalgebra(m: &na::Matrix2<f32>) -> Self {
        Self {
            data: [[m[(0, 0)], m[(0, 1)]], [m[(1, 0)], m[(1, 1)]]],
        }
    }
}

impl Add for Matrix2 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        let mut out = self;
        for i in 0..2 {
            for j in 0..2 {
                out.data[i][j] += other.data[i][j];
            }
        }
        out
    }
}

impl Mul<Vector2> for Matrix2 {
    type Output = Vector2;

    #[inline]
    fn mul(self, v: Vector2) -> Vector2 {
        self.mul_vector(v)
    }
}

// === Matrix3 Implementation ===

impl Matrix3 {
    /// Creates a new 3x3 matrix from a 2D array
    #[inline]
    pub fn new(data: [[f32; 3]; 3]) -> Self {
        Self { data }
    }

    /// Creates a new 3x3 identity matrix
    #[inline]
    pub fn identity() -> Self {
        Self {
            data: [
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a new 3x3 zero matrix
    #[inline]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns the determinant of the matrix
    pub fn determinant(&self) -> f32 {
        let [[a, b, c], [d, e, f], [g, h, i]] = self.data;

        a * (e * i - f * h) -
        b * (d * i - f * g) +
        c * (d * h - e * g)
    }

    /// Column `j` of the matrix
    #[inline]
    fn column(&self, j: usize) -> Vector3 {
        Vector3::new(self.data[0][j], self.data[1][j], self.data[2][j])
    }

    /// Solves `A * x = b` with Cramer's rule
    ///
    /// Returns zero when the matrix is singular.
    pub fn solve33(&self, b: Vector3) -> Vector3 {
        let ex = self.column(0);
        let ey = self.column(1);
        let ez = self.column(2);

        let mut det = ex.dot(&ey.cross(&ez));
        if det != 0.0 {
            det = 1.0 / det;
        }

        Vector3::new(
            det * b.dot(&ey.cross(&ez)),
            det * ex.dot(&b.cross(&ez)),
            det * ex.dot(&ey.cross(&b)),
        )
    }

    /// Solves the upper-left 2x2 block `A22 * x = b`
    ///
    /// Returns zero when the block is singular.
    pub fn solve22(&self, b: Vector2) -> Vector2 {
        let a11 = self.data[0][0];
        let a12 = self.data[0][1];
        let a21 = self.data[1][0];
        let a22 = self.data[1][1];

        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }

        Vector2::new(
            det * (a22 * b.x - a12 * b.y),
            det * (a11 * b.y - a21 * b.x),
        )
    }

    /// Convert to nalgebra Matrix3
    pub fn to_nalgebra(&self) -> na::Matrix3<f32> {
        na::Matrix3::new(
            self.data[0][0], self.data[0][1], self.data[0][2],
            self.data[1][0], self.data[1][1], self.data[1][2],
            self.data[2][0], self.data[2][1], self.data[2][2],
        )
    }

    /// Convert from nalgebra Matrix3
    pub fn from_nalgebra(m: &na::Matrix3<f32>) -> Self {
        let mut data = [[0.0; 3]; 3];
        for (i, row) in data.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = m[(i, j)];
            }
        }
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve33_matches_nalgebra() {
        let m = Matrix3::new([
            [4.0, 1.0, 0.5],
            [1.0, 3.0, 0.2],
            [0.5, 0.2, 2.0],
        ]);
        let b = Vector3::new(1.0, -2.0, 0.5);

        let x = m.solve33(b);
        let expected = m
            .to_nalgebra()
            .lu()
            .solve(&b.to_nalgebra())
            .expect("matrix is invertible");

        assert_relative_eq!(x.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(x.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(x.z, expected.z, epsilon = 1e-5);
    }

    #[test]
    fn test_singular_solves_to_zero() {
        let m = Matrix2::zero();
        assert_eq!(m.solve(Vector2::new(1.0, 1.0)), Vector2::zero());
        assert_eq!(Matrix3::zero().solve22(Vector2::new(3.0, 1.0)), Vector2::zero());
    }
}
