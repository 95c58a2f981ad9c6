/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Uniform Brillouin zone meshes and their integration weights.

use crate::errors::{InterpolationError, WeightError};

use serde::{Serialize, Deserialize};

/// Tolerance for recognizing k-point coordinates as lying on a mesh.
const MESH_TOL: f64 = 1e-6;

/// A uniform `n1 x n2 x n3` grid over the full Brillouin zone.
///
/// Points are in fractional reciprocal coordinates.  Meshes built with
/// [`KMesh::gamma_centred`] list `k = (i/n1, j/n2, l/n3)` with `l` varying
/// fastest; meshes recognized from a list of points keep that list's order
/// (and its constant shift, if any).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMesh {
    dims: [usize; 3],
    points: Vec<[f64; 3]>,
}

impl KMesh {
    pub fn gamma_centred(dims: [usize; 3]) -> Result<Self, InterpolationError> {
        if dims.iter().any(|&n| n == 0) {
            return Err(InterpolationError::NonUniformMesh {
                reason: format!("mesh dimensions {:?} include a zero", dims),
            });
        }
        let points = iproduct!(0..dims[0], 0..dims[1], 0..dims[2])
            .map(|(i, j, l)| [
                i as f64 / dims[0] as f64,
                j as f64 / dims[1] as f64,
                l as f64 / dims[2] as f64,
            ])
            .collect();
        Ok(KMesh { dims, points })
    }

    /// Recognize an explicit list of k-points as a uniform mesh.
    ///
    /// The list must contain every point of some `n1 x n2 x n3` grid exactly
    /// once (in any order, modulo reciprocal lattice vectors), possibly with
    /// all points shifted by the same offset.
    pub fn from_points(points: &[[f64; 3]]) -> Result<Self, InterpolationError> {
        let fail = |reason: String| Err(InterpolationError::NonUniformMesh { reason });
        let first = match points.first() {
            Some(&p) => p,
            None => return fail("no k-points were supplied".to_string()),
        };

        // offsets from the first point, reduced into [0, 1)
        let reduced = points.iter()
            .map(|p| [0, 1, 2].map(|a| wrap_unit(p[a] - first[a])))
            .collect::<Vec<_>>();

        let mut dims = [0; 3];
        for a in 0..3 {
            let mut distinct = Vec::<f64>::new();
            for p in &reduced {
                if !distinct.iter().any(|&x| unit_distance(x, p[a]) < MESH_TOL) {
                    distinct.push(p[a]);
                }
            }
            let n = distinct.len();
            for &x in &distinct {
                let scaled = x * n as f64;
                if (scaled - scaled.round()).abs() > MESH_TOL * n as f64 {
                    return fail(format!(
                        "coordinate {} along axis {} is not a multiple of 1/{}", x, a, n,
                    ));
                }
            }
            dims[a] = n;
        }

        let expected = dims[0] * dims[1] * dims[2];
        if points.len() != expected {
            return fail(format!(
                "{} points cannot form a {:?} grid ({} points)", points.len(), dims, expected,
            ));
        }

        let mut seen = vec![false; expected];
        for (index, p) in reduced.iter().enumerate() {
            let cell = [0, 1, 2].map(|a| (p[a] * dims[a] as f64).round() as usize % dims[a]);
            let flat = (cell[0] * dims[1] + cell[1]) * dims[2] + cell[2];
            if seen[flat] {
                return fail(format!("k-point {} duplicates an earlier point", index));
            }
            seen[flat] = true;
        }

        debug!("Recognized {} k-points as a {:?} mesh", points.len(), dims);
        Ok(KMesh { dims, points: points.to_vec() })
    }

    pub fn dims(&self) -> [usize; 3]
    { self.dims }

    pub fn len(&self) -> usize
    { self.points.len() }

    pub fn is_empty(&self) -> bool
    { self.points.is_empty() }

    pub fn points(&self) -> &[[f64; 3]]
    { &self.points }

    pub fn uniform_weights(&self) -> KWeights
    { KWeights::uniform(self.len()) }

    /// The lattice translations resolvable by this mesh.
    pub fn translations(&self) -> Vec<[i32; 3]>
    { mesh_translations(self.dims) }
}

fn wrap_unit(x: f64) -> f64 {
    let y = x - x.floor();
    // values within rounding of 1 belong to 0
    if 1.0 - y < MESH_TOL { 0.0 } else { y }
}

fn unit_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs();
    d.min(1.0 - d)
}

/// Range of translation components along one direction of an `n`-point mesh.
///
/// For even `n`, both `-n/2` and `n/2` are included; they are the same
/// translation as seen by the mesh, and share it with [`translation_weight`].
pub fn translation_range(n: usize) -> std::ops::RangeInclusive<i32> {
    let half = (n / 2) as i32;
    -half ..= half
}

/// The translations of the Wigner-Seitz-like box of a mesh, closed under `R -> -R`.
pub fn mesh_translations(dims: [usize; 3]) -> Vec<[i32; 3]> {
    iproduct!(translation_range(dims[0]), translation_range(dims[1]), translation_range(dims[2]))
        .map(|(a, b, c)| [a, b, c])
        .collect()
}

/// Share of its mesh alias class held by a translation of [`mesh_translations`].
///
/// Each component on the boundary of an even direction halves the weight, so
/// that the weights of a class sum to 1.
pub fn translation_weight(r: &[i32; 3], dims: [usize; 3]) -> f64 {
    (0..3)
        .filter(|&a| dims[a] % 2 == 0 && r[a].abs() == (dims[a] / 2) as i32)
        .fold(1.0, |w, _| 0.5 * w)
}

/// Every translation of [`mesh_translations`] equal to `r` modulo the mesh.
pub fn mesh_aliases(r: [i32; 3], dims: [usize; 3]) -> Vec<[i32; 3]> {
    let per_axis = |a: usize| {
        let n = dims[a] as i32;
        // representative in [-(n-1)/2, n/2]
        let lo = -((n - 1) / 2);
        let x = (r[a] - lo).rem_euclid(n) + lo;
        match n % 2 == 0 && x == n / 2 {
            true => vec![-x, x],
            false => vec![x],
        }
    };
    iproduct!(per_axis(0), per_axis(1), per_axis(2))
        .map(|(a, b, c)| [a, b, c])
        .collect()
}

/// Brillouin zone integration weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KWeights(Vec<f64>);

impl KWeights {
    pub fn uniform(n: usize) -> Self
    { KWeights(vec![1.0 / n as f64; n]) }

    /// Validate user-supplied weights.
    pub fn from_values(values: Vec<f64>, num_kpoints: usize, tolerance: f64) -> Result<Self, WeightError> {
        if values.len() != num_kpoints {
            return Err(WeightError::WrongLength { expected: num_kpoints, found: values.len() });
        }
        if let Some((index, &value)) = values.iter().enumerate().find(|(_, w)| !(**w >= 0.0) || !w.is_finite()) {
            return Err(WeightError::Negative { index, value });
        }
        let sum: f64 = values.iter().sum();
        if (sum - 1.0).abs() > tolerance {
            return Err(WeightError::BadSum { sum, tolerance });
        }
        Ok(KWeights(values))
    }

    pub fn as_slice(&self) -> &[f64]
    { &self.0 }

    pub fn len(&self) -> usize
    { self.0.len() }

    pub fn is_empty(&self) -> bool
    { self.0.is_empty() }
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use super::*;

    #[test]
    fn gamma_centred() {
        let mesh = KMesh::gamma_centred([2, 1, 3]).unwrap();
        assert_eq!(mesh.len(), 6);
        assert_eq!(mesh.points()[0], [0.0, 0.0, 0.0]);
        assert_eq!(mesh.points()[1], [0.0, 0.0, 1.0 / 3.0]);
        assert_eq!(mesh.points()[3], [0.5, 0.0, 0.0]);
        assert!(KMesh::gamma_centred([2, 0, 3]).is_err());
    }

    #[test]
    fn translations_are_centred() {
        assert_eq!(translation_range(1).collect::<Vec<_>>(), vec![0]);
        assert_eq!(translation_range(2).collect::<Vec<_>>(), vec![-1, 0, 1]);
        assert_eq!(translation_range(3).collect::<Vec<_>>(), vec![-1, 0, 1]);
        assert_eq!(translation_range(4).collect::<Vec<_>>(), vec![-2, -1, 0, 1, 2]);
        assert_eq!(mesh_translations([3, 2, 1]).len(), 9);

        let dims = [3, 4, 1];
        for r in mesh_translations(dims) {
            assert!(mesh_translations(dims).contains(&[-r[0], -r[1], -r[2]]));
        }
        assert_eq!(mesh_aliases([-2, 3, 0], dims), vec![[1, -1, 0]]);
        assert_eq!(mesh_aliases([1, -1, 5], dims), vec![[1, -1, 0]]);
        assert_eq!(mesh_aliases([0, 6, 0], dims), vec![[0, -2, 0], [0, 2, 0]]);
    }

    #[test]
    fn boundary_weights_sum_to_one() {
        let dims = [2, 4, 3];
        assert_eq!(translation_weight(&[0, 0, 0], dims), 1.0);
        assert_eq!(translation_weight(&[1, 0, 1], dims), 0.5);
        assert_eq!(translation_weight(&[-1, 2, 0], dims), 0.25);

        // every residue class of the mesh carries a total weight of one
        for r in mesh_translations(dims) {
            let total: f64 = mesh_aliases(r, dims).iter().map(|a| translation_weight(a, dims)).sum();
            assert_eq!(total, 1.0);
        }
        let total: f64 = mesh_translations(dims).iter().map(|r| translation_weight(r, dims)).sum();
        assert_eq!(total, 24.0);
    }

    #[test]
    fn from_points_recovers_mesh() {
        let mesh = KMesh::gamma_centred([3, 2, 2]).unwrap();
        let mut points = mesh.points().to_vec();
        points.reverse();
        // shifted into another zone, and with a constant offset
        let shifted = points.iter()
            .map(|p| [p[0] - 1.0 + 0.1, p[1] + 0.25, p[2]])
            .collect::<Vec<_>>();
        let found = KMesh::from_points(&shifted).unwrap();
        assert_eq!(found.dims(), [3, 2, 2]);
        assert_eq!(found.points(), &shifted[..]);
    }

    #[test]
    fn from_points_rejects_irregular() {
        let mut points = KMesh::gamma_centred([2, 2, 1]).unwrap().points().to_vec();
        points[3] = [0.5, 0.3, 0.0];
        match KMesh::from_points(&points) {
            Err(InterpolationError::NonUniformMesh { .. }) => {},
            r => panic!("unexpected: {:?}", r),
        }

        // a missing point
        let points = KMesh::gamma_centred([2, 2, 1]).unwrap().points()[..3].to_vec();
        assert!(KMesh::from_points(&points).is_err());
        assert!(KMesh::from_points(&[]).is_err());
    }

    #[test]
    fn weights() {
        let w = KWeights::uniform(4);
        assert_eq!(w.as_slice(), &[0.25; 4]);

        assert!(KWeights::from_values(vec![0.5, 0.5], 2, 1e-8).is_ok());
        assert_eq!(
            KWeights::from_values(vec![0.5, 0.75], 2, 1e-8),
            Err(WeightError::BadSum { sum: 1.25, tolerance: 1e-8 }),
        );
        assert_eq!(
            KWeights::from_values(vec![1.5, -0.5], 2, 1e-8),
            Err(WeightError::Negative { index: 1, value: -0.5 }),
        );
        assert_eq!(
            KWeights::from_values(vec![1.0], 2, 1e-8),
            Err(WeightError::WrongLength { expected: 2, found: 1 }),
        );
    }
}
