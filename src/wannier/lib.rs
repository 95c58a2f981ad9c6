/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Bonding descriptors from a Wannier tight-binding model.
//!
//! The pipeline runs
//!
//! * [`Interpolator`]: k-space Hamiltonian to real space,
//! * [`SpectralEngine`]: real space to eigenstates on a dense k-mesh,
//! * [`DescriptorCalculator`]: eigenstates to energy-resolved DOS, WOHP and WOBI
//!   of orbital pairs,
//! * [`Aggregator`]: orbital pairs to atom pairs, bond classes and atoms.

#[macro_use] extern crate log;
#[macro_use] extern crate itertools;
#[cfg(test)] #[macro_use] extern crate wanbond_assert_close;

pub mod errors;

mod threading;
mod kmesh;
mod hamiltonian;
mod interp;
mod spectral;
mod occupation;
mod broadening;
mod descriptors;
mod aggregate;
mod cache;

pub use crate::threading::Threading;
pub use crate::kmesh::{KMesh, KWeights, mesh_aliases, mesh_translations, translation_range, translation_weight};
pub use crate::hamiltonian::{
    Block, HermiticityReport, KSpaceHamiltonian, RealSpaceHamiltonian, RealSpaceMatrix,
};
pub use crate::interp::{Interpolated, Interpolator, phase, DEFAULT_HERMITICITY_TOL};
pub use crate::spectral::{EigenSettings, KMeshState, SpectralEngine, hamiltonian_at_k};
pub use crate::occupation::{
    Occupation, Occupations, ReferenceEnergy, ReferenceSource, fermi_level, highest_occupied, FERMI_TOL,
};
pub use crate::broadening::{Broadening, EnergyGrid, running_integral, DEFAULT_GAUSSIAN_WIDTH};
pub use crate::descriptors::{
    BondDescriptor, BondIndexSource, Curve, DescriptorCalculator, DescriptorSelection,
    DescriptorSettings, Integrals, OrbitalPair, ORTHONORMAL_ASSUMPTION,
};
pub use crate::aggregate::{
    AggregationSettings, Aggregator, AtomPairSummary, AtomSummary, BondSelection, Bwdf,
    ClassSummary, Cutoffs, DescriptorTable, IntegrationRange, PairOutcome, PairReport,
    SpeciesCutoff, DEFAULT_INTERACTION_THRESHOLD,
};
pub use crate::cache::{Cache, CacheKey, InterpolationCache, SpectralCache};
pub use crate::errors::{
    AggregationError, DescriptorError, GridError, InterpolationError, OccupationError,
    SpectralError, WeightError,
};
