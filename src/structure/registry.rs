/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The mapping between Wannier orbitals and the atoms that own them.

use crate::Coords;
use crate::errors::AssignmentError;
use crate::util::{nearest_image, sub_v3};

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Serialize, Deserialize};

/// Index of an atom in the structure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AtomI(pub usize);

/// One Wannier function of the home cell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WannierOrbital {
    pub index: usize,
    pub atom: AtomI,
    /// Lattice image of the centre that sits closest to the atom.
    ///
    /// `centre + image * lattice` is the copy of this function that belongs
    /// to `atom` as given in the structure.
    pub image: [i32; 3],
    /// Cartesian centre, as supplied.
    pub centre: [f64; 3],
    /// Distance between the atom and the nearest image of the centre.
    pub distance: f64,
}

/// How many Wannier functions each atom is expected to own.
#[derive(Debug, Clone, PartialEq)]
pub enum OrbitalCounts {
    /// Any distribution of centres is accepted.
    Unchecked,
    PerSpecies(BTreeMap<String, usize>),
    PerAtom(Vec<usize>),
}

impl Default for OrbitalCounts {
    fn default() -> Self { OrbitalCounts::Unchecked }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AssignmentTolerances {
    /// Largest allowed distance between a centre and its atom.
    pub assignment: f64,
    /// Two atoms whose distances differ by less than this are a tie.
    pub tie: f64,
}

impl Default for AssignmentTolerances {
    fn default() -> Self {
        AssignmentTolerances { assignment: 2.5, tie: 1e-4 }
    }
}

/// Owns the structure and the orbital-to-atom lookup tables.
///
/// Orbitals and atoms are referred to by index everywhere else.
#[derive(Debug, Clone)]
pub struct OrbitalRegistry {
    coords: Coords,
    species: Vec<String>,
    labels: Vec<String>,
    orbitals: Vec<WannierOrbital>,
    atom_orbitals: Vec<Vec<usize>>,
}

/// Labels like "Ga1", "As2": the species followed by the 1-based position
/// of the atom in the structure.
pub fn atom_labels(species: &[String]) -> Vec<String> {
    species.iter().enumerate()
        .map(|(i, s)| format!("{}{}", s, i + 1))
        .collect()
}

impl OrbitalRegistry {
    /// Assign each Wannier centre to its nearest atom under periodic boundary conditions.
    ///
    /// `num_orbitals` is the orbital count of the model the centres belong to.
    pub fn assign(
        coords: Coords,
        species: Vec<String>,
        centres: &[[f64; 3]],
        num_orbitals: usize,
        counts: &OrbitalCounts,
        tol: AssignmentTolerances,
    ) -> Result<Self, AssignmentError> {
        let num_atoms = coords.num_atoms();
        if species.len() != num_atoms {
            return Err(AssignmentError::SpeciesLengthMismatch { species: species.len(), atoms: num_atoms });
        }
        if centres.is_empty() {
            return Err(AssignmentError::NoCentres);
        }
        if num_atoms == 0 {
            return Err(AssignmentError::NoAtoms { centres: centres.len() });
        }
        if centres.len() != num_orbitals {
            return Err(AssignmentError::TotalMismatch { expected: num_orbitals, found: centres.len() });
        }

        let lattice = coords.lattice();
        let atom_fracs = coords.to_fracs();

        let mut orbitals = Vec::with_capacity(centres.len());
        for (index, centre) in centres.iter().enumerate() {
            let centre_frac = lattice.frac_from_cart(centre);

            // nearest image of the centre for every atom, sorted by distance
            let mut candidates = atom_fracs.iter().enumerate()
                .map(|(atom, atom_frac)| {
                    let (shift, distance) = nearest_image(lattice, &sub_v3(&centre_frac, atom_frac));
                    // centre - shift is nearest to the atom
                    (atom, [-shift[0], -shift[1], -shift[2]], distance)
                })
                .collect::<Vec<_>>();
            candidates.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

            let (atom, image, distance) = candidates[0];
            if distance > tol.assignment {
                return Err(AssignmentError::NoAtomWithinTolerance {
                    centre: index, atom, distance, tolerance: tol.assignment,
                });
            }
            if let Some(&(second, _, second_distance)) = candidates.get(1) {
                if second_distance - distance < tol.tie {
                    return Err(AssignmentError::Ambiguous {
                        centre: index,
                        first: atom,
                        second,
                        first_distance: distance,
                        second_distance,
                        tie_tolerance: tol.tie,
                    });
                }
            }
            trace!("Wannier centre {} -> atom {} (image {:?}, distance {:.4})", index, atom, image, distance);
            orbitals.push(WannierOrbital {
                index,
                atom: AtomI(atom),
                image,
                centre: *centre,
                distance,
            });
        }

        let registry = Self::from_orbitals(coords, species, orbitals);
        registry.check_counts(counts)?;
        info!(
            "Assigned {} Wannier centres to {} atoms (largest distance {:.4})",
            registry.num_orbitals(),
            registry.num_atoms(),
            registry.orbitals.iter().map(|o| o.distance).fold(0.0, f64::max),
        );
        Ok(registry)
    }

    /// Build a registry from an assignment that is already known.
    ///
    /// # Panics
    ///
    /// Panics if an orbital refers to a nonexistent atom, or the orbital
    /// indices are not `0..n` in order.
    pub fn from_orbitals(coords: Coords, species: Vec<String>, orbitals: Vec<WannierOrbital>) -> Self {
        let num_atoms = coords.num_atoms();
        assert_eq!(species.len(), num_atoms);

        let mut atom_orbitals = vec![vec![]; num_atoms];
        for (i, orb) in orbitals.iter().enumerate() {
            assert_eq!(orb.index, i, "orbitals out of order");
            assert!(orb.atom.0 < num_atoms, "orbital {} refers to nonexistent atom {}", i, orb.atom.0);
            atom_orbitals[orb.atom.0].push(i);
        }
        let labels = atom_labels(&species);
        OrbitalRegistry { coords, species, labels, orbitals, atom_orbitals }
    }

    fn check_counts(&self, counts: &OrbitalCounts) -> Result<(), AssignmentError> {
        let expected = match counts {
            OrbitalCounts::Unchecked => return Ok(()),
            OrbitalCounts::PerAtom(counts) => {
                if counts.len() != self.num_atoms() {
                    return Err(AssignmentError::SpeciesLengthMismatch {
                        species: counts.len(),
                        atoms: self.num_atoms(),
                    });
                }
                counts.clone()
            },
            OrbitalCounts::PerSpecies(map) => {
                self.species.iter().map(|s| {
                    map.get(s).cloned()
                        .ok_or_else(|| AssignmentError::MissingSpeciesCount { species: s.clone() })
                }).collect::<Result<Vec<_>, _>>()?
            },
        };

        let total: usize = expected.iter().sum();
        if total != self.num_orbitals() {
            return Err(AssignmentError::TotalMismatch { expected: total, found: self.num_orbitals() });
        }
        for (atom, &expected) in expected.iter().enumerate() {
            let found = self.atom_orbitals[atom].len();
            if found != expected {
                return Err(AssignmentError::CountMismatch {
                    atom,
                    label: self.labels[atom].clone(),
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

// accessors
impl OrbitalRegistry {
    pub fn coords(&self) -> &Coords
    { &self.coords }

    pub fn num_atoms(&self) -> usize
    { self.species.len() }

    pub fn num_orbitals(&self) -> usize
    { self.orbitals.len() }

    pub fn orbitals(&self) -> &[WannierOrbital]
    { &self.orbitals }

    pub fn orbital(&self, i: usize) -> &WannierOrbital
    { &self.orbitals[i] }

    pub fn atom_of(&self, orbital: usize) -> AtomI
    { self.orbitals[orbital].atom }

    /// Orbitals owned by an atom, in increasing order.
    pub fn orbitals_of(&self, atom: AtomI) -> &[usize]
    { &self.atom_orbitals[atom.0] }

    pub fn species(&self) -> &[String]
    { &self.species }

    pub fn species_of(&self, atom: AtomI) -> &str
    { &self.species[atom.0] }

    pub fn labels(&self) -> &[String]
    { &self.labels }

    pub fn label(&self, atom: AtomI) -> &str
    { &self.labels[atom.0] }

    /// Look up an atom by its label ("Ga1").
    pub fn find_label(&self, label: &str) -> Option<AtomI>
    { self.labels.iter().position(|l| l == label).map(AtomI) }

    pub fn atoms_of_species<'a>(&'a self, species: &'a str) -> impl Iterator<Item=AtomI> + 'a {
        self.species.iter().enumerate()
            .filter(move |(_, s)| *s == species)
            .map(|(i, _)| AtomI(i))
    }
}
