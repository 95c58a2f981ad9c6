/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::FailResult;

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use wanbond_wannier::{
    AtomPairSummary, AtomSummary, Broadening, Bwdf, ClassSummary, Curve, Occupation, ReferenceEnergy,
};

/// Everything a run produces.
#[derive(Serialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct BondingReport {
    /// The energy grid shared by every curve.
    pub energies: Vec<f64>,
    pub pairs: Vec<AtomPairSummary>,
    /// Explicit pairs that had no interaction above the threshold.
    pub absent: Vec<(String, String)>,
    pub classes: Vec<ClassSummary>,
    pub atoms: Vec<AtomSummary>,
    pub total_dos: Curve,
    pub density_of_energy: Curve,
    /// Density of energy integrated like the bond descriptors.
    pub integrated_energy: f64,
    pub bwdf: Option<BwdfReport>,
    pub diagnostics: Diagnostics,
}

/// [`Bwdf`] with its species pairs written as `"A-B"`, so that it can be a JSON object.
#[derive(Serialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct BwdfReport {
    pub edges: Vec<f64>,
    pub series: BTreeMap<String, Vec<f64>>,
}

impl From<Bwdf> for BwdfReport {
    fn from(bwdf: Bwdf) -> Self {
        BwdfReport {
            edges: bwdf.edges,
            series: bwdf.series.into_iter().map(|((a, b), v)| (format!("{}-{}", a, b), v)).collect(),
        }
    }
}

/// How the numbers in a [`BondingReport`] were obtained.
#[derive(Serialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    pub num_orbitals: usize,
    pub num_atoms: usize,
    /// Mesh of the input Hamiltonian.
    pub source_mesh: [usize; 3],
    /// Mesh the spectral engine diagonalized on.
    pub kmesh: [usize; 3],
    /// Largest `|H(R)_ij - conj(H(-R)_ji)|` of the real-space Hamiltonian.
    pub max_hermitian_error: f64,
    pub broadening: Broadening,
    pub occupation: Occupation,
    pub nspin: f64,
    pub reference_energy: ReferenceEnergy,
    /// Electrons held by the occupied states, from the occupations that were used.
    pub electron_count: f64,
    /// `(class index, multiplicity)` for each symmetry class of bonds.
    pub multiplicities: Vec<(usize, usize)>,
    pub num_symmetry_ops: usize,
    pub assumptions: Vec<String>,
}

impl BondingReport {
    pub fn to_json(&self) -> FailResult<String>
    { Ok(serde_json::to_string_pretty(self)?) }

    pub fn write_json<W: Write>(&self, w: W) -> FailResult<()>
    { Ok(serde_json::to_writer_pretty(w, self)?) }
}

impl Diagnostics {
    pub fn to_json(&self) -> FailResult<String>
    { Ok(serde_json::to_string_pretty(self)?) }

    pub fn write_json<W: Write>(&self, w: W) -> FailResult<()>
    { Ok(serde_json::to_writer_pretty(w, self)?) }

    pub(crate) fn log_summary(&self) {
        info!(
            "{} orbitals on {} atoms; {:?} k-mesh interpolated from {:?}",
            self.num_orbitals, self.num_atoms, self.kmesh, self.source_mesh,
        );
        info!(
            "Reference energy {:.6} eV ({:?}), {:.6} electrons",
            self.reference_energy.value, self.reference_energy.source, self.electron_count,
        );
        for assumption in &self.assumptions {
            warn!("Assumption: {}", assumption);
        }
    }
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use super::*;
    use wanbond_wannier::ReferenceSource;

    #[test]
    fn bwdf_keys() {
        let mut series = BTreeMap::new();
        series.insert(("As".to_string(), "Ga".to_string()), vec![1.0, 2.0]);
        let report = BwdfReport::from(Bwdf { edges: vec![0.0, 1.0, 2.0], series });
        assert_eq!(report.series["As-Ga"], vec![1.0, 2.0]);
    }

    #[test]
    fn diagnostics_json() {
        let diagnostics = Diagnostics {
            num_orbitals: 2,
            num_atoms: 2,
            source_mesh: [1, 1, 1],
            kmesh: [4, 4, 4],
            max_hermitian_error: 0.0,
            broadening: Broadening::Histogram,
            occupation: Occupation::Fixed,
            nspin: 2.0,
            reference_energy: ReferenceEnergy { value: -1.0, source: ReferenceSource::HighestOccupied },
            electron_count: 2.0,
            multiplicities: vec![(0, 4)],
            num_symmetry_ops: 48,
            assumptions: vec!["orthonormal".to_string()],
        };
        let json: serde_json::Value = serde_json::from_str(&diagnostics.to_json().unwrap()).unwrap();
        assert_eq!(json["reference_energy"]["source"], "highest-occupied");
        assert_eq!(json["broadening"], "histogram");
        assert_eq!(json["kmesh"][2], 4);
        assert_eq!(json["multiplicities"][0][1], 4);
    }
}
