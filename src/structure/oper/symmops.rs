/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::errors::SymmetryError;
use crate::util::Tol;

#[cfg(feature = "serde")]
use serde::{Serialize, Deserialize};

// NOTE: Correct usage of spacegroup operators requires knowing the
//       primitive cell. Operators are always expressed in the fractional
//       basis of the structure they are applied to.

/// A point group operation on a primitive cell.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FracRot {
    /// Acts on column vectors of fractional coordinates.
    ///
    /// Invariants:
    ///  - `abs(det(r)) == 1`
    r: [[i32; 3]; 3],
}

/// The translation part of a spacegroup operation on a primitive cell.
///
/// This always has coordinates that are multiples of `1/12`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FracTrans (
    /// This is the vector times 12.
    ///
    /// Invariants:
    ///  - elements are reduced into the range `0 <= x < 12`.
    [i32; 3],
);

/// A spacegroup operation on a primitive cell, `x -> R x + t`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FracOp {
    rot: FracRot,
    trans: FracTrans,
}

impl Default for FracOp {
    fn default() -> Self
    { Self::eye() }
}

impl Default for FracTrans {
    fn default() -> Self
    { Self::eye() }
}

impl Default for FracRot {
    fn default() -> Self
    { Self::eye() }
}

impl From<FracTrans> for FracOp {
    fn from(v: FracTrans) -> Self
    { Self::new(&Default::default(), &v) }
}

impl From<FracRot> for FracOp {
    fn from(r: FracRot) -> Self
    { Self::new(&r, &Default::default()) }
}

fn det_i33(m: &[[i32; 3]; 3]) -> i32 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn mul_i33(a: &[[i32; 3]; 3], b: &[[i32; 3]; 3]) -> [[i32; 3]; 3] {
    let mut out = [[0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn reduce_twelfths(x: i32) -> i32
{ ((x % 12) + 12) % 12 }

impl FracRot {
    pub fn eye() -> Self
    { FracRot { r: [[1, 0, 0], [0, 1, 0], [0, 0, 1]] } }

    /// Construct from a matrix `R` acting on column vectors of fractional
    /// coordinates.
    pub fn new(r: &[[i32; 3]; 3]) -> Result<FracRot, SymmetryError> {
        match det_i33(r) {
            1 | -1 => Ok(FracRot { r: *r }),
            det => Err(SymmetryError::NotUnimodular { det }),
        }
    }

    pub fn matrix(&self) -> &[[i32; 3]; 3]
    { &self.r }

    /// Flipped group operator.
    ///
    /// `a.then(b) == b.of(a)`.
    pub fn then(&self, other: &FracRot) -> FracRot
    { FracRot { r: mul_i33(&other.r, &self.r) } }

    /// Conventional group operator.
    pub fn of(&self, other: &FracRot) -> FracRot
    { other.then(self) }

    pub fn transform_frac(&self, v: &[f64; 3]) -> [f64; 3] {
        let r = &self.r;
        let mut out = [0.0; 3];
        for i in 0..3 {
            out[i] = (0..3).map(|k| f64::from(r[i][k]) * v[k]).sum();
        }
        out
    }

    /// Rotate an integer lattice translation.
    pub fn transform_image(&self, v: &[i32; 3]) -> [i32; 3] {
        let r = &self.r;
        let mut out = [0; 3];
        for i in 0..3 {
            out[i] = (0..3).map(|k| r[i][k] * v[k]).sum();
        }
        out
    }
}

impl FracTrans {
    pub fn eye() -> Self
    { FracTrans([0, 0, 0]) }

    pub fn from_floats(xs: &[f64; 3]) -> Result<FracTrans, SymmetryError> {
        let mut out = [0; 3];
        for k in 0..3 {
            out[k] = Tol(1e-4).unfloat(xs[k] * 12.0)
                .map_err(|_| SymmetryError::BadTranslation { value: xs[k] })?;
            out[k] = reduce_twelfths(out[k]);
        }
        Ok(FracTrans(out))
    }

    pub fn float(&self) -> [f64; 3]
    { [0, 1, 2].map(|k| f64::from(self.0[k]) / 12.0) }
}

impl FracOp {
    pub fn eye() -> Self
    { FracOp { rot: FracRot::eye(), trans: FracTrans::eye() } }

    pub fn new(rot: &FracRot, trans: &FracTrans) -> Self
    { FracOp { rot: rot.clone(), trans: trans.clone() } }

    /// Build from the integer rotation and fractional translation that
    /// symmetry finders usually report.
    pub fn from_parts(rot: &[[i32; 3]; 3], trans: &[f64; 3]) -> Result<Self, SymmetryError>
    { Ok(FracOp { rot: FracRot::new(rot)?, trans: FracTrans::from_floats(trans)? }) }

    pub fn to_rot(&self) -> FracRot
    { self.rot.clone() }

    pub fn to_trans(&self) -> FracTrans
    { self.trans.clone() }

    pub fn rot(&self) -> &FracRot
    { &self.rot }

    pub fn is_identity(&self) -> bool
    { self == &FracOp::eye() }

    /// Flipped group operator.
    ///
    /// `a.then(b) == b.of(a)`.
    pub fn then(&self, other: &FracOp) -> FracOp {
        // x -> Rb (Ra x + ta) + tb
        let rot = self.rot.then(&other.rot);
        let rotated = other.rot.transform_image(&self.trans.0);
        let trans = FracTrans([0, 1, 2].map(|k| reduce_twelfths(rotated[k] + other.trans.0[k])));
        FracOp { rot, trans }
    }

    /// Conventional group operator.
    pub fn of(&self, other: &FracOp) -> FracOp
    { other.then(self) }

    pub fn transform_frac(&self, v: &[f64; 3]) -> [f64; 3] {
        let rotated = self.rot.transform_frac(v);
        let t = self.trans.float();
        [rotated[0] + t[0], rotated[1] + t[1], rotated[2] + t[2]]
    }

    pub fn transform_fracs(&self, fracs: &[[f64; 3]]) -> Vec<[f64; 3]>
    { fracs.iter().map(|v| self.transform_frac(v)).collect() }
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use super::*;

    #[test]
    fn rot_transform() {
        let r = FracRot::new(&[
            [0, -1, 0],
            [1,  0, 0],
            [0,  0, 1],
        ]).unwrap();
        assert_eq!(r.transform_frac(&[1.0, 5.0, 7.0]), [-5.0, 1.0, 7.0]);
        assert_eq!(r.transform_image(&[1, 5, 7]), [-5, 1, 7]);
    }

    #[test]
    fn not_unimodular() {
        let err = FracRot::new(&[[2, 0, 0], [0, 1, 0], [0, 0, 1]]).unwrap_err();
        assert_eq!(err, SymmetryError::NotUnimodular { det: 2 });
        assert!(FracTrans::from_floats(&[0.1, 0.0, 0.0]).is_err());
    }

    #[test]
    fn two_transform() {
        // two operations that don't commute
        let xy = FracRot::new(&[
            [0, 1, 0],
            [1, 0, 0],
            [0, 0, 1],
        ]).unwrap();
        let zx = FracRot::new(&[
            [0, 0, 1],
            [0, 1, 0],
            [1, 0, 0],
        ]).unwrap();
        let prim = [1., 2., 3.];
        assert_eq!(
            zx.transform_frac(&xy.transform_frac(&prim)),
            xy.then(&zx).transform_frac(&prim),
        );
        assert_eq!(xy.then(&zx), zx.of(&xy));

        let t = FracTrans::from_floats(&[0.5, 0.25, 0.0]).unwrap();
        let xy = FracOp::new(&xy, &t);
        let zx = FracOp::new(&zx, &FracTrans::eye());
        let composed = xy.then(&zx);
        let direct = zx.transform_frac(&xy.transform_frac(&prim));
        let via = composed.transform_frac(&prim);
        for k in 0..3 {
            let diff = direct[k] - via[k];
            assert!((diff - diff.round()).abs() < 1e-12);
        }
    }

    #[test]
    fn symmop_mul() {
        let op = FracOp::from_parts(
            &[
                [ 0, -1, 0],
                [ 1,  1, 0],
                [ 0,  0, 1],
            ],
            &[1./3., 2./3., 0.0],
        ).unwrap();
        let cube = op.then(&op).then(&op);
        // a sixfold rotation cubed is a twofold rotation
        assert_eq!(cube.rot().matrix(), &[[-1, 0, 0], [0, -1, 0], [0, 0, 1]]);
        assert_eq!(cube.to_trans(), FracTrans::from_floats(&[2./3., 0.0, 0.0]).unwrap());
        assert!(cube.then(&cube).is_identity());
        assert!(!op.is_identity());
    }
}
