/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::descriptors::OrbitalPair;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolationError {
    #[error("the model contains no orbitals or no k-points")]
    EmptyModel,

    #[error("k-points do not form a uniform mesh: {reason}")]
    NonUniformMesh { reason: String },

    #[error("{found} Hamiltonian blocks were supplied for {expected} k-points")]
    BlockCountMismatch { expected: usize, found: usize },

    #[error("block {index} has shape {rows}x{cols}, expected {expected}x{expected}")]
    BlockShape { index: usize, rows: usize, cols: usize, expected: usize },

    #[error("translation {translation:?} appears more than once")]
    DuplicateTranslation { translation: [i32; 3] },

    #[error(
        "real-space Hamiltonian is not Hermitian: |H(R)_ij - conj(H(-R)_ji)| = {deviation:e} \
         at R = {translation:?}, (i, j) = ({i}, {j}), tolerance {tolerance:e}"
    )]
    HermiticityViolation { deviation: f64, tolerance: f64, translation: [i32; 3], i: usize, j: usize },

    #[error(
        "k-mesh {mesh:?} is not commensurate with the real-space translations, \
         which span {translations:?} distinct values per direction"
    )]
    MeshMismatch { mesh: [usize; 3], translations: [usize; 3] },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpectralError {
    #[error("cannot solve on an empty k-mesh")]
    EmptyMesh,

    #[error("H(k) at k-point {kpoint} is not Hermitian (deviation {deviation:e}, tolerance {tolerance:e})")]
    NonHermitian { kpoint: usize, deviation: f64, tolerance: f64 },

    #[error("Hermitian eigensolver did not converge at k-point {kpoint}")]
    NoConvergence { kpoint: usize },

    #[error("{weights} k-point weights for {kpoints} k-points")]
    WeightCount { weights: usize, kpoints: usize },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("expected {expected} k-point weights, found {found}")]
    WrongLength { expected: usize, found: usize },

    #[error("k-point weight {index} is negative or not finite ({value})")]
    Negative { index: usize, value: f64 },

    #[error("k-point weights sum to {sum}, not 1 (tolerance {tolerance:e})")]
    BadSum { sum: f64, tolerance: f64 },
}

/// Invalid energy grids, broadenings and occupation functions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("energy step must be positive (got {step})")]
    NonPositiveStep { step: f64 },

    #[error("energy range is inverted: [{min}, {max}]")]
    InvertedRange { min: f64, max: f64 },

    #[error("{what} width must be positive (got {width})")]
    NonPositiveWidth { what: &'static str, width: f64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OccupationError {
    #[error("cannot place {electrons} electrons in states that hold at most {capacity}")]
    TooManyElectrons { electrons: f64, capacity: f64 },

    #[error("the electron count must be non-negative (got {electrons})")]
    NegativeElectrons { electrons: f64 },

    #[error("Fermi level search did not converge (electron count error {error:e})")]
    NoConvergence { error: f64 },

    #[error("occupations have shape {found:?}, expected {expected:?}")]
    Shape { expected: (usize, usize), found: (usize, usize) },

    #[error("a reference energy requires either an explicit value or an electron count")]
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DescriptorError {
    #[error("orbital pair {pair:?} refers to an orbital beyond the {num_orbitals} in the model")]
    OrbitalOutOfRange { pair: OrbitalPair, num_orbitals: usize },

    #[error("bond-index matrix has {found} orbitals, but the model has {expected}")]
    BondIndexShape { expected: usize, found: usize },

    #[error(transparent)]
    Occupation(#[from] OccupationError),

    #[error(transparent)]
    Grid(#[from] GridError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregationError {
    #[error("unknown atom {atom}")]
    UnknownAtom { atom: String },

    #[error("no descriptor was computed for orbital pair {pair:?}")]
    MissingDescriptor { pair: OrbitalPair },

    #[error("energy grids disagree ({expected} vs {found} points)")]
    InconsistentGrid { expected: usize, found: usize },

    #[error("no interaction between {from} and {to}")]
    NoInteraction { from: String, to: String },

    #[error("integration window is inverted: [{lower}, {upper}]")]
    InvertedWindow { lower: f64, upper: f64 },

    #[error("pair {from}-{to} has no bond length; it was not selected geometrically")]
    MissingLength { from: String, to: String },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Symmetry(#[from] wanbond_structure::SymmetryError),
}
