/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::errors::IntPrecisionError;
use crate::Lattice;

// these f64 -> i32 conversions are written on a silly little type
// simply to avoid having a function with a signature like 'fn f(x: f64, tol: f64)'
// where the arguments could be swapped
pub(crate) struct Tol(pub(crate) f64);
impl Tol {
    pub(crate) fn unfloat(&self, x: f64) -> Result<i32, IntPrecisionError> {
        let r = x.round();
        if (r - x).abs() > self.0 {
            return Err(IntPrecisionError { value: x });
        }
        Ok(r as i32)
    }
}

pub(crate) fn sub_v3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3]
{ [a[0] - b[0], a[1] - b[1], a[2] - b[2]] }

pub(crate) fn norm_v3(a: &[f64; 3]) -> f64
{ (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt() }

pub(crate) fn add_image(a: &[i32; 3], b: &[i32; 3]) -> [i32; 3]
{ [a[0] + b[0], a[1] + b[1], a[2] + b[2]] }

pub(crate) fn sub_image(a: &[i32; 3], b: &[i32; 3]) -> [i32; 3]
{ [a[0] - b[0], a[1] - b[1], a[2] - b[2]] }

/// Find the image `L` minimizing the cartesian norm of `frac_diff - L`.
///
/// Rounding gives the answer for orthogonal cells; neighbors of the rounded
/// image are checked to cover skewed cells. Returns the image and the distance.
pub(crate) fn nearest_image(lattice: &Lattice, frac_diff: &[f64; 3]) -> ([i32; 3], f64) {
    let rounded = [
        frac_diff[0].round() as i32,
        frac_diff[1].round() as i32,
        frac_diff[2].round() as i32,
    ];

    let mut best = (rounded, ::std::f64::INFINITY);
    for a in -1..=1 {
        for b in -1..=1 {
            for c in -1..=1 {
                let image = add_image(&rounded, &[a, b, c]);
                let rem = [
                    frac_diff[0] - f64::from(image[0]),
                    frac_diff[1] - f64::from(image[1]),
                    frac_diff[2] - f64::from(image[2]),
                ];
                let dist = norm_v3(&lattice.cart_from_frac(&rem));
                if dist < best.1 {
                    best = (image, dist);
                }
            }
        }
    }
    best
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use super::*;

    #[test]
    fn unfloat() {
        assert_eq!(Tol(1e-4).unfloat(3.00001), Ok(3));
        assert_eq!(Tol(1e-4).unfloat(-2.99999), Ok(-3));
        assert!(Tol(1e-4).unfloat(0.5).is_err());
    }

    #[test]
    fn nearest_image_skewed() {
        // a strongly skewed cell where rounding alone picks the wrong image
        let lattice = Lattice::from_vectors(&[
            [1.0, 0.0, 0.0],
            [0.9, 0.2, 0.0],
            [0.0, 0.0, 1.0],
        ]).unwrap();
        let (image, dist) = nearest_image(&lattice, &[0.45, 0.45, 0.0]);
        let rem = [0.45 - f64::from(image[0]), 0.45 - f64::from(image[1]), 0.0];
        assert!((norm_v3(&lattice.cart_from_frac(&rem)) - dist).abs() < 1e-12);
        assert!(dist < norm_v3(&lattice.cart_from_frac(&[0.45, 0.45, 0.0])));
    }
}
