/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::{Coords, FracOp};
use crate::errors::SymmetryError;
use crate::util::nearest_image;

/// How a spacegroup operator moves each site of a structure.
///
/// For every site `i`, `op(frac[i]) == frac[targets[i]] + images[i]`.
/// The images are what let bonds be transported by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteMapping {
    pub targets: Vec<usize>,
    pub images: Vec<[i32; 3]>,
}

impl SiteMapping {
    pub fn identity(num_atoms: usize) -> Self {
        SiteMapping {
            targets: (0..num_atoms).collect(),
            images: vec![[0; 3]; num_atoms],
        }
    }
}

/// Compute site mappings for all operators in a spacegroup.
pub fn of_spacegroup(
    coords: &Coords,
    ops: &[FracOp],
    tol: f64,
) -> Result<Vec<SiteMapping>, SymmetryError> {
    let dummy_meta = vec![(); coords.num_atoms()];
    of_spacegroup_with_meta(coords, &dummy_meta, ops, tol)
}

/// Compute site mappings, only matching sites with equal metadata.
///
/// Fails if any operator fails to map the structure onto itself within `tol`
/// (a cartesian distance).
pub fn of_spacegroup_with_meta<M: PartialEq>(
    coords: &Coords,
    metadata: &[M],
    ops: &[FracOp],
    tol: f64,
) -> Result<Vec<SiteMapping>, SymmetryError> {
    let num_atoms = coords.num_atoms();
    if metadata.len() != num_atoms {
        return Err(SymmetryError::SpeciesLengthMismatch {
            species: metadata.len(),
            atoms: num_atoms,
        });
    }

    let lattice = coords.lattice();
    let fracs = coords.to_fracs();

    ops.iter().enumerate().map(|(oper, op)| {
        let mut targets = Vec::with_capacity(num_atoms);
        let mut images = Vec::with_capacity(num_atoms);
        let mut hit = vec![false; num_atoms];

        for (site, frac) in fracs.iter().enumerate() {
            let moved = op.transform_frac(frac);

            let mut found = None;
            for (target, target_frac) in fracs.iter().enumerate() {
                if metadata[target] != metadata[site] {
                    continue;
                }
                let diff = [0, 1, 2].map(|k| moved[k] - target_frac[k]);
                let (image, dist) = nearest_image(lattice, &diff);
                if dist <= tol {
                    if found.is_some() {
                        return Err(SymmetryError::MultipleImages { oper, site });
                    }
                    found = Some((target, image));
                }
            }

            let (target, image) = found.ok_or(SymmetryError::NoImage { oper, site })?;
            if hit[target] {
                return Err(SymmetryError::NotAPermutation { oper, target });
            }
            hit[target] = true;
            targets.push(target);
            images.push(image);
        }
        Ok(SiteMapping { targets, images })
    }).collect()
}
