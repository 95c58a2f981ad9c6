/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::Coords;
use crate::util::{add_image, norm_v3};

#[cfg(feature = "serde")]
use serde::{Serialize, Deserialize};

/// Bond data in a widely-reusable form.
///
/// Represents each bond as a composite of the following data:
///
/// * The **source** site.
/// * The **target** site.
/// * A **lattice vector** that distinguishes different images of the target.
///
/// The lattice vector is chosen such that:
///
/// ```text
/// bond_cart_vector == carts[to] - carts[from] + image_diff * lattice
/// ```
///
/// Considering the data embedded in this representation, any of the following
/// actions will invalidate the bonds:
///
/// * removal, addition, or reordering of sites
/// * replacing a coordinate with an image (e.g. remapping sites into the unit cell)
/// * unimodular transformations of the lattice (these change the images)
#[derive(Debug, Clone, PartialEq)]
pub struct FracBonds {
    num_atoms: usize,
    bonds: Vec<FracBond>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FracBond {
    /// Source atom of this edge.
    pub from: usize,

    /// Target atom of this edge.
    pub to: usize,

    /// Determines which ghost of `to` is interacting with which ghost of `from`.
    ///
    /// Measured relative to the actual positions that were given to the bond
    /// search (as opposed to the reduced positions).
    pub image_diff: [i32; 3],
}

impl FracBond {
    /// A function that returns `true` for one of the bonds representing
    /// a pair of interacting ghosts, and `false` for the other bond.
    ///
    /// # Panics
    ///
    /// Panics on self-interactions with `image_diff = [0, 0, 0]`.
    /// (These never show up in `FracBonds` normally, but can be created through other means,
    ///  such as directly constructing one or by using `join`)
    pub fn is_canonical(&self) -> bool {
        match self.from.cmp(&self.to) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => {
                for &x in &self.image_diff {
                    if x != 0 {
                        return x > 0;
                    }
                }
                panic!("self interactions with zero image diff cannot be canonicalized");
            },
        }
    }

    /// Get the bond in the reverse direction.
    ///
    /// This will invert the output of `is_canonical()`.
    #[inline]
    pub fn flip(self) -> FracBond {
        FracBond {
            from: self.to,
            to: self.from,
            image_diff: [-self.image_diff[0], -self.image_diff[1], -self.image_diff[2]],
        }
    }

    /// Whichever of `self` and `self.flip()` is canonical.
    #[inline]
    pub fn canonical(self) -> FracBond {
        if self.is_canonical() { self } else { self.flip() }
    }

    /// If this bond is from `A` to `B` and the other bond is from `B` to `C`, construct
    /// a bond from `A` to `C` that has the correct `image_diff`.
    #[inline]
    pub fn join(self, other: FracBond) -> Option<FracBond> {
        if self.to == other.from {
            Some(FracBond {
                from: self.from,
                to: other.to,
                image_diff: add_image(&self.image_diff, &other.image_diff),
            })
        } else { None }
    }

    pub fn cart_vector(&self, coords: &Coords) -> [f64; 3]
    { coords.displacement(self.from, self.to, self.image_diff) }

    pub fn length(&self, coords: &Coords) -> f64
    { norm_v3(&self.cart_vector(coords)) }
}

impl<'a> IntoIterator for &'a FracBonds {
    type Item = FracBond;
    type IntoIter = std::iter::Cloned<std::slice::Iter<'a, FracBond>>;

    fn into_iter(self) -> Self::IntoIter
    { self.bonds.iter().cloned() }
}

impl FracBonds {
    pub fn from_iter(num_atoms: usize, iter: impl IntoIterator<Item=FracBond>) -> Self {
        let mut bonds = iter.into_iter().collect::<Vec<_>>();
        for bond in &bonds {
            assert!(bond.from < num_atoms && bond.to < num_atoms, "bond site out of range");
        }
        bonds.sort();
        bonds.dedup();
        FracBonds { num_atoms, bonds }
    }

    pub fn len(&self) -> usize
    { self.bonds.len() }

    pub fn is_empty(&self) -> bool
    { self.bonds.is_empty() }

    pub fn num_atoms_per_cell(&self) -> usize
    { self.num_atoms }

    pub fn as_slice(&self) -> &[FracBond]
    { &self.bonds }

    /// Keep only one of the two directed bonds for each pair of interacting ghosts.
    pub fn canonical_only(&self) -> FracBonds {
        FracBonds {
            num_atoms: self.num_atoms,
            bonds: self.bonds.iter().cloned().filter(|b| b.is_canonical()).collect(),
        }
    }

    pub fn contains(&self, bond: &FracBond) -> bool
    { self.bonds.binary_search(bond).is_ok() }
}

impl FracBonds {
    /// Compute bonds using a brute force search over lattice images.
    ///
    /// Both directions of every bond are included. Distances exactly equal
    /// to the range are included.
    pub fn from_brute_force(coords: &Coords, range: f64) -> Self {
        let fake_meta = vec![(); coords.num_atoms()];
        Self::from_brute_force_with_meta(coords, &fake_meta, range, |(), ()| Some(range))
    }

    /// Compute bonds, using different bond lengths for different types.
    ///
    /// `meta_range` must be symmetric, i.e. `meta_range(a, b) == meta_range(b, a)`,
    /// and never larger than `full_range`.
    ///
    /// # Non-interacting pairs
    ///
    /// If two types of atoms do not interact, `meta_range` can return `None` to guarantee that no
    /// bonds between these types are included in the output.
    pub fn from_brute_force_with_meta<M>(
        coords: &Coords,
        meta: impl IntoIterator<Item=M>,
        // The largest possible range needed. This determines how many images are searched.
        full_range: f64,
        mut meta_range: impl FnMut(&M, &M) -> Option<f64>,
    ) -> Self {
        let meta = meta.into_iter().collect::<Vec<_>>();
        let num_atoms = coords.num_atoms();
        assert_eq!(meta.len(), num_atoms);

        let lattice = coords.lattice();
        let fracs = coords.to_fracs();
        let spacings = lattice.plane_spacings();
        let reach = [0, 1, 2].map(|k| full_range / spacings[k]);

        let mut bonds = vec![];
        for from in 0..num_atoms {
            for to in 0..num_atoms {
                let range = match meta_range(&meta[from], &meta[to]) {
                    None => continue,
                    Some(x) => x,
                };
                debug_assert!(range <= full_range);

                let diff = [0, 1, 2].map(|k| fracs[to][k] - fracs[from][k]);
                // every image within range has |diff + image| <= reach in each direction
                let lo = [0, 1, 2].map(|k| (-reach[k] - diff[k]).ceil() as i32);
                let hi = [0, 1, 2].map(|k| (reach[k] - diff[k]).floor() as i32);
                for a in lo[0]..=hi[0] {
                    for b in lo[1]..=hi[1] {
                        for c in lo[2]..=hi[2] {
                            let image_diff = [a, b, c];
                            if from == to && image_diff == [0, 0, 0] {
                                continue; // no self interactions!
                            }
                            let shifted = [
                                diff[0] + f64::from(a),
                                diff[1] + f64::from(b),
                                diff[2] + f64::from(c),
                            ];
                            let dist = norm_v3(&lattice.cart_from_frac(&shifted));
                            if dist <= range {
                                bonds.push(FracBond { from, to, image_diff });
                            }
                        }
                    }
                }
            }
        }
        trace!("Found {} directed bonds within {}", bonds.len(), full_range);
        FracBonds::from_iter(num_atoms, bonds)
    }
}
