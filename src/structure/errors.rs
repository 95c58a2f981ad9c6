/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::FracBond;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Not nearly an integer: {value}")]
pub struct IntPrecisionError {
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("lattice matrix is singular (determinant {determinant})")]
pub struct DegenerateLatticeError {
    pub determinant: f64,
}

/// Failures while attaching Wannier centres to atoms.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssignmentError {
    #[error("no Wannier centres were supplied")]
    NoCentres,

    #[error("{centres} Wannier centres were supplied for a structure with no atoms")]
    NoAtoms { centres: usize },

    #[error("{species} species labels were given for {atoms} atoms")]
    SpeciesLengthMismatch { species: usize, atoms: usize },

    #[error("no orbital count was given for species {species:?}")]
    MissingSpeciesCount { species: String },

    #[error("{found} Wannier centres were supplied, but the model has {expected} orbitals")]
    TotalMismatch { expected: usize, found: usize },

    #[error(
        "Wannier centre {centre} is {distance:.4} from its nearest atom ({atom}), \
         beyond the assignment tolerance of {tolerance}"
    )]
    NoAtomWithinTolerance { centre: usize, atom: usize, distance: f64, tolerance: f64 },

    #[error(
        "Wannier centre {centre} cannot be assigned uniquely: atoms {first} and {second} \
         are at distances {first_distance:.6} and {second_distance:.6} (tie tolerance {tie_tolerance})"
    )]
    Ambiguous {
        centre: usize,
        first: usize,
        second: usize,
        first_distance: f64,
        second_distance: f64,
        tie_tolerance: f64,
    },

    #[error("atom {label} was assigned {found} Wannier centres, but {expected} were expected")]
    CountMismatch { atom: usize, label: String, expected: usize, found: usize },
}

/// Failures of spacegroup operators to act on a structure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SymmetryError {
    #[error("rotation matrix has determinant {det}; expected +1 or -1")]
    NotUnimodular { det: i32 },

    #[error("translation component {value} is not a multiple of 1/12")]
    BadTranslation { value: f64 },

    #[error("operator {oper} maps site {site} onto no site of the same species")]
    NoImage { oper: usize, site: usize },

    #[error("operator {oper} maps site {site} onto more than one site")]
    MultipleImages { oper: usize, site: usize },

    #[error("operator {oper} does not permute the sites (site {target} is hit twice)")]
    NotAPermutation { oper: usize, target: usize },

    #[error("operator {oper} maps bond {bond:?} outside of the bond set")]
    BondNotInSet { oper: usize, bond: FracBond },

    #[error("the operators do not form a group: operator {oper} sends bond {bond:?} into another symmetry class")]
    NotAGroup { oper: usize, bond: FracBond },

    #[error("{species} species labels were given for {atoms} atoms")]
    SpeciesLengthMismatch { species: usize, atoms: usize },
}
