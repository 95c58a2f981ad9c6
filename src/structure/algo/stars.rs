/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::{Coords, FracOp, FracBond, FracBonds};
use crate::algo::find_perm::{self, SiteMapping};
use crate::errors::SymmetryError;
use crate::util::{add_image, sub_image};

use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "serde")]
use serde::{Serialize, Deserialize};

/// Whether `A -> B` and `B -> A` are the same bond.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum BondDirection {
    /// Each physical bond is counted once, by its canonical direction.
    Undirected,
    /// Both directions are distinct bonds.
    Directed,
}

impl Default for BondDirection {
    fn default() -> Self { BondDirection::Undirected }
}

impl BondDirection {
    /// The bonds that are reported under this convention.
    pub fn select(self, bonds: &FracBonds) -> FracBonds {
        match self {
            BondDirection::Undirected => bonds.canonical_only(),
            BondDirection::Directed => bonds.clone(),
        }
    }

    fn normalize(self, bond: FracBond) -> FracBond {
        match self {
            BondDirection::Undirected => bond.canonical(),
            BondDirection::Directed => bond,
        }
    }
}

/// Where a spacegroup operator sends a bond.
///
/// If `op(frac[i]) == frac[targets[i]] + images[i]`, then the bond from `a` to
/// the image `I` of `b` is sent to the bond from `targets[a]` to the image
/// `images[b] + R I - images[a]` of `targets[b]`.
pub fn transform_bond(op: &FracOp, mapping: &SiteMapping, bond: &FracBond) -> FracBond {
    let FracBond { from, to, image_diff } = *bond;
    let rotated = op.rot().transform_image(&image_diff);
    FracBond {
        from: mapping.targets[from],
        to: mapping.targets[to],
        image_diff: sub_image(&add_image(&mapping.images[to], &rotated), &mapping.images[from]),
    }
}

/// Compute the orbits of bonds under a spacegroup.
///
/// `bonds` is first reduced according to `direction`.  Every operator must map
/// the reduced set onto itself; a bond sent outside of it is an error, as that
/// means the selection (or the structure) does not have the symmetry.
///
/// An empty `ops` is treated as the trivial group.  Operators that are not closed
/// under composition are detected when two orbits overlap.
pub fn bond_stars(
    coords: &Coords,
    species: &[impl PartialEq],
    ops: &[FracOp],
    bonds: &FracBonds,
    direction: BondDirection,
    tol: f64,
) -> Result<BondStars, SymmetryError> {
    let eye = [FracOp::eye()];
    let ops = if ops.is_empty() { &eye[..] } else { ops };
    let mappings = find_perm::of_spacegroup_with_meta(coords, species, ops, tol)?;
    compute_bond_stars(ops, &mappings, &direction.select(bonds), direction)
}

/// Compute stars from precomputed site mappings.
pub fn compute_bond_stars(
    ops: &[FracOp],
    mappings: &[SiteMapping],
    bonds: &FracBonds,
    direction: BondDirection,
) -> Result<BondStars, SymmetryError> {
    assert_eq!(ops.len(), mappings.len());
    let bonds = bonds.as_slice();
    let index_of = bonds.iter().enumerate()
        .map(|(i, &b)| (b, i))
        .collect::<HashMap<_, _>>();

    let unassigned = std::usize::MAX; // an impossible index
    let mut assignments = vec![unassigned; bonds.len()];
    let mut stars = vec![];

    for rep_i in 0..bonds.len() {
        if assignments[rep_i] != unassigned {
            continue;
        }
        // the bond we found shall represent a new star
        let representative = bonds[rep_i];
        let star_i = stars.len();
        let mut members = BTreeMap::<FracBond, Vec<usize>>::new();

        for (oper_i, (op, mapping)) in ops.iter().zip(mappings).enumerate() {
            let image = direction.normalize(transform_bond(op, mapping, &representative));
            let image_i = *index_of.get(&image)
                .ok_or(SymmetryError::BondNotInSet { oper: oper_i, bond: representative })?;

            // Orbits of a group are disjoint.
            if assignments[image_i] != star_i && assignments[image_i] != unassigned {
                return Err(SymmetryError::NotAGroup { oper: oper_i, bond: representative });
            }
            assignments[image_i] = star_i;

            // Record each operator that brings us here.
            members.entry(image).or_insert_with(Vec::new).push(oper_i);
        }
        stars.push(BondStar { representative, members });
    }
    debug!("{} bonds fall into {} symmetry classes", bonds.len(), stars.len());
    Ok(BondStars { bonds: bonds.to_vec(), assignments, stars, num_opers: ops.len() })
}

/// Collects bonds which are equivalent under symmetry.
#[derive(Debug, Clone)]
pub struct BondStars {
    bonds: Vec<FracBond>,
    assignments: Vec<usize>,
    stars: Vec<BondStar>,
    num_opers: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BondStar {
    representative: FracBond,
    members: BTreeMap<FracBond, Vec<usize>>,
}

impl BondStars {
    pub fn len(&self) -> usize
    { self.stars.len() }

    pub fn is_empty(&self) -> bool
    { self.stars.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, BondStar>
    { self.stars.iter() }

    pub fn num_opers(&self) -> usize
    { self.num_opers }

    /// The star containing a bond, if the bond is in the set.
    pub fn star_of(&self, bond: &FracBond) -> Option<usize> {
        self.bonds.binary_search(bond).ok().map(|i| self.assignments[i])
    }
}

impl std::ops::Index<usize> for BondStars {
    type Output = BondStar;

    fn index(&self, i: usize) -> &BondStar { &self.stars[i] }
}

impl BondStar {
    pub fn representative(&self) -> FracBond
    { self.representative }

    pub fn members<'a>(&'a self) -> impl ExactSizeIterator<Item=FracBond> + 'a
    { self.members.keys().cloned() }

    /// Number of distinct bonds in the orbit.
    pub fn multiplicity(&self) -> usize
    { self.members.len() }

    /// All operators that map the representative onto a given member.
    pub fn opers_from_rep(&self, bond: &FracBond) -> &[usize]
    { &self.members[bond] }
}
