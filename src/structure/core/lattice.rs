/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::errors::DegenerateLatticeError;

use nalgebra::{Matrix3, Vector3};
use std::sync::Arc;

/// Defines a vector basis for periodic boundary conditions in three dimensions.
///
/// A `Lattice` is something that you multiply against "fractional" data to
/// produce "cartesian" data.  The rows of the matrix are the lattice vectors,
/// so that a row vector of fractional coordinates `f` maps to `f M`.
#[derive(Debug, Clone)]
pub struct Lattice {
    matrix: Arc<Matrix3<f64>>,
    inverse: Arc<Matrix3<f64>>,
}

// Manual impl that doesn't compare the inverse.
impl PartialEq<Lattice> for Lattice {
    fn eq(&self, other: &Lattice) -> bool {
        // deconstruct to get errors when new fields are added
        let Lattice { ref matrix, inverse: _ } = *self;
        matrix == &other.matrix
    }
}

impl Lattice {
    /// Create a lattice from a matrix where the rows are lattice vectors.
    pub fn new(matrix: &Matrix3<f64>) -> Result<Self, DegenerateLatticeError> {
        let det = matrix.determinant();
        if !det.is_finite() || det.abs() < 1e-12 {
            return Err(DegenerateLatticeError { determinant: det });
        }
        let inverse = matrix.try_inverse().ok_or(DegenerateLatticeError { determinant: det })?;
        Ok(Lattice { matrix: Arc::new(*matrix), inverse: Arc::new(inverse) })
    }

    pub fn from_vectors(vectors: &[[f64; 3]; 3]) -> Result<Self, DegenerateLatticeError> {
        let [a, b, c] = *vectors;
        Self::new(&Matrix3::new(
            a[0], a[1], a[2],
            b[0], b[1], b[2],
            c[0], c[1], c[2],
        ))
    }

    /// Get the reciprocal lattice.
    ///
    /// This is defined as the inverse transpose. **There is no 2 PI factor.**
    /// It is the lattice that transforms between reciprocal space fractional
    /// and reciprocal space Euclidean coordinates.
    pub fn reciprocal(&self) -> Self {
        Lattice {
            matrix: Arc::new(self.inverse.transpose()),
            inverse: Arc::new(self.matrix.transpose()),
        }
    }

    /// Matrix where lattice vectors are rows.
    #[inline]
    pub fn matrix(&self) -> &Matrix3<f64>
    { &self.matrix }

    /// Get the (precomputed) inverse of the matrix where lattice vectors are rows.
    #[inline]
    pub fn inverse_matrix(&self) -> &Matrix3<f64>
    { &self.inverse }

    pub fn vectors(&self) -> [[f64; 3]; 3] {
        let m = &self.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    pub fn norms(&self) -> [f64; 3] {
        let m = &self.matrix;
        [m.row(0).norm(), m.row(1).norm(), m.row(2).norm()]
    }

    /// Get the (positive) volume of the lattice cell.
    pub fn volume(&self) -> f64
    { self.matrix.determinant().abs() }

    /// Distance between consecutive lattice planes spanned by the other two vectors.
    ///
    /// This bounds how many images must be searched to find every point
    /// within some distance.
    pub fn plane_spacings(&self) -> [f64; 3] {
        let recip = self.reciprocal();
        let [a, b, c] = recip.norms();
        [1.0 / a, 1.0 / b, 1.0 / c]
    }

    pub fn cart_from_frac(&self, frac: &[f64; 3]) -> [f64; 3] {
        let v = self.matrix.transpose() * Vector3::from(*frac);
        [v[0], v[1], v[2]]
    }

    pub fn frac_from_cart(&self, cart: &[f64; 3]) -> [f64; 3] {
        let v = self.inverse.transpose() * Vector3::from(*cart);
        [v[0], v[1], v[2]]
    }

    /// Cartesian displacement of an integer lattice translation.
    pub fn cart_from_image(&self, image: &[i32; 3]) -> [f64; 3] {
        let f = [f64::from(image[0]), f64::from(image[1]), f64::from(image[2])];
        self.cart_from_frac(&f)
    }
}

/// Helper constructors
impl Lattice {
    /// The identity lattice.
    #[inline]
    pub fn eye() -> Self { Self::cubic(1.0) }

    #[inline]
    pub fn diagonal(&[x, y, z]: &[f64; 3]) -> Self { Self::orthorhombic(x, y, z) }

    /// A cubic lattice ((a, a, a), (90, 90, 90))
    #[inline]
    pub fn cubic(a: f64) -> Self { Self::orthorhombic(a, a, a) }

    /// An orthorhombic lattice ((a, b, c), (90, 90, 90))
    ///
    /// # Panics
    ///
    /// Panics if any length is zero.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Self {
        assert!(a != 0.0 && b != 0.0 && c != 0.0, "zero-length lattice vector");
        Lattice {
            matrix: Arc::new(Matrix3::from_diagonal(&Vector3::new(a, b, c))),
            inverse: Arc::new(Matrix3::from_diagonal(&Vector3::new(1.0 / a, 1.0 / b, 1.0 / c))),
        }
    }
}

/// Defaults to the identity matrix.
impl Default for Lattice {
    #[inline]
    fn default() -> Lattice { Lattice::eye() }
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use super::*;

    #[test]
    fn get_inverse() {
        // matrix whose inverse should be able to be computed exactly
        // by any reasonable matrix inversion algorithm working on f64s
        let lattice = Lattice::from_vectors(&[
            [2.0, 2.0, 0.0],
            [0.0, 4.0, 0.0],
            [0.0, 0.0, 2.0],
        ]).unwrap();
        let exact_inverse = Matrix3::new(
            0.5, -0.25, 0.0,
            0.0,  0.25, 0.0,
            0.0,   0.0, 0.5,
        );
        assert_eq!(&exact_inverse, lattice.inverse_matrix());
        assert_eq!(lattice.volume(), 16.0);
        assert_ne!(&Lattice::eye(), &lattice);
    }

    #[test]
    fn degenerate() {
        let err = Lattice::from_vectors(&[
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
        ]).unwrap_err();
        assert_eq!(err.determinant, 0.0);
    }

    // make sure matrix multiplication is done in the correct order
    #[test]
    fn multiplication_order() {
        // a matrix not equal to its transpose
        let lattice = Lattice::from_vectors(&[
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
        ]).unwrap();

        assert_eq!(lattice.cart_from_frac(&[1.0, 0.0, 0.0]), [0.0, 1.0, 0.0]);
        assert_eq!(lattice.frac_from_cart(&[1.0, 0.0, 0.0]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn reciprocal_is_dual() {
        let lattice = Lattice::from_vectors(&[
            [3.0, 0.0, 0.0],
            [1.5, 2.598076211353316, 0.0],
            [0.0, 0.0, 5.0],
        ]).unwrap();
        let recip = lattice.reciprocal();
        let a = lattice.vectors();
        let b = recip.vectors();
        for i in 0..3 {
            for j in 0..3 {
                let dot: f64 = (0..3).map(|k| a[i][k] * b[j][k]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_close!(abs=1e-12, dot, expected);
            }
        }
        let spacings = lattice.plane_spacings();
        assert_close!(abs=1e-12, spacings[2], 5.0);
        assert_close!(abs=1e-12, spacings[0], 2.598076211353316);
    }
}
