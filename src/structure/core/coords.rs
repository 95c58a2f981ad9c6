/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::Lattice;

/// Wrapper type for coordinates used as input to some APIs.
///
/// This allows a function to support either cartesian coordinates,
/// or fractional coordinates with respect to some lattice.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordsKind {
    Carts(Vec<[f64; 3]>),
    Fracs(Vec<[f64; 3]>),
}

impl CoordsKind {
    pub fn len(&self) -> usize
    { self.as_slice().len() }

    pub fn is_empty(&self) -> bool
    { self.len() == 0 }

    fn as_slice(&self) -> &[[f64; 3]]
    { match *self {
        CoordsKind::Carts(ref c) => c,
        CoordsKind::Fracs(ref c) => c,
    }}
}

// conversions
impl CoordsKind {
    pub fn into_carts(self, lattice: &Lattice) -> Vec<[f64; 3]>
    { match self {
        CoordsKind::Carts(c) => c,
        CoordsKind::Fracs(c) => c.iter().map(|f| lattice.cart_from_frac(f)).collect(),
    }}

    pub fn into_fracs(self, lattice: &Lattice) -> Vec<[f64; 3]>
    { match self {
        CoordsKind::Carts(c) => c.iter().map(|x| lattice.frac_from_cart(x)).collect(),
        CoordsKind::Fracs(c) => c,
    }}

    pub fn to_carts(&self, lattice: &Lattice) -> Vec<[f64; 3]>
    { match *self {
        CoordsKind::Carts(ref c) => c.clone(),
        CoordsKind::Fracs(ref c) => c.iter().map(|f| lattice.cart_from_frac(f)).collect(),
    }}

    pub fn to_fracs(&self, lattice: &Lattice) -> Vec<[f64; 3]>
    { match *self {
        CoordsKind::Carts(ref c) => c.iter().map(|x| lattice.frac_from_cart(x)).collect(),
        CoordsKind::Fracs(ref c) => c.clone(),
    }}
}

/// Pairs a `CoordsKind` with the `Lattice` it is periodic in.
///
/// The positions are not reduced into the unit cell; bond images are
/// always expressed relative to the positions exactly as given.
#[derive(Debug, Clone, PartialEq)]
pub struct Coords {
    lattice: Lattice,
    coords: CoordsKind,
}

impl Coords {
    pub fn new(lattice: Lattice, coords: CoordsKind) -> Self
    { Coords { lattice, coords } }

    pub fn lattice(&self) -> &Lattice
    { &self.lattice }

    pub fn coords_kind(&self) -> &CoordsKind
    { &self.coords }

    pub fn num_atoms(&self) -> usize
    { self.coords.len() }

    pub fn to_carts(&self) -> Vec<[f64; 3]>
    { self.coords.to_carts(&self.lattice) }

    pub fn to_fracs(&self) -> Vec<[f64; 3]>
    { self.coords.to_fracs(&self.lattice) }

    /// Cartesian vector from `from` to the image `image` of `to`.
    pub fn displacement(&self, from: usize, to: usize, image: [i32; 3]) -> [f64; 3] {
        let fracs = self.to_fracs();
        let mut diff = [0.0; 3];
        for k in 0..3 {
            diff[k] = fracs[to][k] + f64::from(image[k]) - fracs[from][k];
        }
        self.lattice.cart_from_frac(&diff)
    }
}
