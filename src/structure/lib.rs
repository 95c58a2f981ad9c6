/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Periodic structures, and the bookkeeping that ties Wannier orbitals to them.

#[macro_use] extern crate log;
#[cfg(test)] #[macro_use] extern crate wanbond_assert_close;

pub mod errors;

mod core;
mod algo;
mod oper;
mod util;
pub mod registry;

//---------------------------
// public reexports; API

pub use crate::core::lattice::Lattice;
pub use crate::core::coords::{Coords, CoordsKind};

pub use crate::oper::symmops::{FracRot, FracTrans, FracOp};

pub use crate::algo::bonds::{FracBond, FracBonds};
pub use crate::algo::find_perm::{self as find_perm, SiteMapping};
pub use crate::algo::stars::{self as stars, BondDirection, BondStar, BondStars, bond_stars};

pub use crate::registry::{AtomI, WannierOrbital, OrbitalCounts, OrbitalRegistry, AssignmentTolerances};
pub use crate::errors::{AssignmentError, SymmetryError, DegenerateLatticeError};
