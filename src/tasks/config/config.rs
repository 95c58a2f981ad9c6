/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

// NOTE: Please make sure to use the YamlRead trait when deserializing these types!

use crate::YamlRead;

use serde::de;
use failure::Error;
use std::collections::BTreeMap;

use wanbond_structure::{AssignmentTolerances, BondDirection};
use wanbond_wannier::{
    BondSelection, Cutoffs, DescriptorSelection, EigenSettings, EnergyGrid, GridError,
    IntegrationRange,
};

pub use wanbond_wannier::{Broadening, Occupation, SpeciesCutoff, Threading};

pub const MAX_VERSION: u32 = 1;

/// Root settings object.
///
/// This is what you should deserialize.
#[derive(Serialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSettings(pub Settings);

/// Raw deserialized form of settings.
///
/// You shouldn't deserialize this type directly; deserialize `ValidatedSettings` instead,
/// so that additional validation and filling of defaults can be performed.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Identifies the version of the settings that this file uses.
    ///
    /// If not specified, assumes a value of 1.
    #[serde(default)]
    pub version: Option<u32>,

    #[serde(default)]
    pub threading: Threading,

    /// Size of the global thread pool.  Defaults to one thread per core.
    #[serde(default)]
    pub num_threads: Option<usize>,

    /// Dense k-mesh for the spectral engine.
    ///
    /// Defaults to the mesh that the Hamiltonian was computed on.
    #[serde(default)]
    pub kmesh: Option<[usize; 3]>,

    /// See the type for documentation.
    pub energy_grid: EnergyGridSettings,

    /// How discrete levels are spread over the energy grid.
    ///
    /// # Example:
    ///
    /// ```yaml
    /// broadening:
    ///   gaussian:
    ///     width: 0.05
    /// ```
    #[serde(default)]
    pub broadening: Broadening,

    /// Occupation function used for the density matrix and the integrated descriptors.
    #[serde(default)]
    pub occupation: Occupation,

    /// Electrons per state; 2 for spin-degenerate calculations, 1 for a single
    /// spin channel.
    #[serde(default = "_settings__nspin")]
    pub nspin: f64,

    /// Used to find the reference energy when `reference-energy` is not given.
    #[serde(default)]
    pub num_electrons: Option<f64>,

    /// Upper limit of the integrated descriptors (eV).
    #[serde(default)]
    pub reference_energy: Option<f64>,

    /// Integrate descriptors over `[lower, upper]` instead of up to the reference energy.
    #[serde(default)]
    pub integration_window: Option<[f64; 2]>,

    /// See the type for documentation.
    #[serde(default)]
    pub tolerances: Tolerances,

    /// See the type for documentation.
    pub bonds: Bonds,

    /// See the type for documentation.
    #[serde(default)]
    pub descriptors: Descriptors,

    /// Number of valence electrons of each species, for atomic charges.
    ///
    /// # Example:
    ///
    /// ```yaml
    /// valence:
    ///   Ga: 3
    ///   As: 5
    /// ```
    #[serde(default)]
    pub valence: BTreeMap<String, f64>,

    /// Enables the bond-weighted distribution function.
    #[serde(default)]
    pub bwdf: Option<BwdfSettings>,
}
fn _settings__nspin() -> f64 { 2.0 }
derive_yaml_read!{ValidatedSettings}

impl<'de> de::Deserialize<'de> for ValidatedSettings {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cereal: Settings = de::Deserialize::deserialize(deserializer)?;

        cereal.validate().map_err(de::Error::custom)
    }
}

impl Settings {
    pub fn integration_range(&self) -> IntegrationRange {
        match self.integration_window {
            Some([lower, upper]) => IntegrationRange::Window { lower, upper },
            None => IntegrationRange::ToReference,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct EnergyGridSettings {
    /// `[emin, emax]` in eV.  `emax` is included when it lies on the grid.
    pub range: [f64; 2],
    pub step: f64,
}

impl EnergyGridSettings {
    pub fn grid(&self) -> Result<EnergyGrid, GridError>
    { EnergyGrid::new(self.range[0], self.range[1], self.step) }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Tolerances {
    /// Largest accepted `|H(R) - H(-R)^dagger|` (eV).
    #[serde(default = "_tolerances__hermiticity")]
    pub hermiticity: f64,

    /// Largest accepted deviation of the k-point weights from a sum of 1.
    #[serde(default = "_tolerances__weight_sum")]
    pub weight_sum: f64,

    /// Largest distance between a Wannier centre and its atom (Angstrom).
    #[serde(default = "_tolerances__assignment")]
    pub assignment: f64,

    /// Distance below which two candidate atoms for a centre are a tie (Angstrom).
    #[serde(default = "_tolerances__tie")]
    pub tie: f64,

    /// Hamiltonian elements at most this large (eV) do not count as interactions.
    #[serde(default = "_tolerances__interaction_threshold")]
    pub interaction_threshold: f64,

    /// Cartesian tolerance for mapping sites under symmetry operators (Angstrom).
    #[serde(default = "_tolerances__symmetry")]
    pub symmetry: f64,

    #[serde(default = "_tolerances__eigen_eps")]
    pub eigen_eps: f64,

    #[serde(default = "_tolerances__eigen_max_iter")]
    pub eigen_max_iter: usize,
}
fn _tolerances__hermiticity() -> f64 { wanbond_wannier::DEFAULT_HERMITICITY_TOL }
fn _tolerances__weight_sum() -> f64 { 1e-8 }
fn _tolerances__assignment() -> f64 { AssignmentTolerances::default().assignment }
fn _tolerances__tie() -> f64 { AssignmentTolerances::default().tie }
fn _tolerances__interaction_threshold() -> f64 { wanbond_wannier::DEFAULT_INTERACTION_THRESHOLD }
fn _tolerances__symmetry() -> f64 { 1e-4 }
fn _tolerances__eigen_eps() -> f64 { EigenSettings::default().eps }
fn _tolerances__eigen_max_iter() -> usize { EigenSettings::default().max_iter }

impl Tolerances {
    pub fn assignment_tolerances(&self) -> AssignmentTolerances
    { AssignmentTolerances { assignment: self.assignment, tie: self.tie } }

    pub fn eigen_settings(&self) -> EigenSettings {
        EigenSettings {
            hermiticity_tol: self.hermiticity,
            eps: self.eigen_eps,
            max_iter: self.eigen_max_iter,
        }
    }
}

/// Which atom pairs to report.
///
/// Exactly one of `pairs`, `cutoffs` and `r-max` must be given.
///
/// # Example:
///
/// ```yaml
/// bonds:
///   cutoffs:
///     - species: [Ga, As]
///       r-max: 2.6
///   direction: undirected
/// ```
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Bonds {
    /// Explicit pairs of atom labels (`Ga1`, `As2`, ...), summed over all
    /// interacting lattice images.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairs: Option<Vec<(String, String)>>,

    /// Cutoffs per species pair.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoffs: Option<Vec<SpeciesCutoff>>,

    /// One cutoff for all species.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_max: Option<f64>,

    #[serde(default)]
    pub direction: BondDirection,

    /// Report an explicit pair with no interactions as zero instead of absent.
    #[serde(default)]
    pub absence_as_zero: bool,

    /// Evaluate one bond per symmetry class.  Requires spacegroup operators.
    #[serde(default = "_bonds__use_symmetry")]
    pub use_symmetry: bool,
}
fn _bonds__use_symmetry() -> bool { true }

impl Bonds {
    pub fn selection(&self) -> Result<BondSelection, Error> {
        match (&self.pairs, &self.cutoffs, self.r_max) {
            (Some(pairs), None, None) => Ok(BondSelection::Pairs(pairs.clone())),
            (None, Some(cutoffs), None) => Ok(BondSelection::Cutoffs(Cutoffs::Species(cutoffs.clone()))),
            (None, None, Some(r_max)) => Ok(BondSelection::Cutoffs(Cutoffs::Global(r_max))),
            (None, None, None) => bail!("`bonds` needs one of `pairs`, `cutoffs` or `r-max`."),
            _ => bail!("`bonds.pairs`, `bonds.cutoffs` and `bonds.r-max` are mutually exclusive."),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Descriptors {
    #[serde(default = "_descriptors__wohp")]
    pub wohp: bool,
    #[serde(default = "_descriptors__wobi")]
    pub wobi: bool,
    /// Also keep the DOS of each orbital pair at every k-point.
    #[serde(default)]
    pub resolve_k: bool,
}
fn _descriptors__wohp() -> bool { true }
fn _descriptors__wobi() -> bool { true }

impl Descriptors {
    pub fn selection(&self) -> DescriptorSelection {
        DescriptorSelection { wohp: self.wohp, wobi: self.wobi, resolve_k: self.resolve_k }
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct BwdfSettings {
    #[serde(default)]
    pub r_min: f64,
    pub r_max: f64,
    #[serde(default = "_bwdf__num_bins")]
    pub num_bins: usize,
}
fn _bwdf__num_bins() -> usize { 100 }

// --------------------------------------------------------

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            hermiticity: _tolerances__hermiticity(),
            weight_sum: _tolerances__weight_sum(),
            assignment: _tolerances__assignment(),
            tie: _tolerances__tie(),
            interaction_threshold: _tolerances__interaction_threshold(),
            symmetry: _tolerances__symmetry(),
            eigen_eps: _tolerances__eigen_eps(),
            eigen_max_iter: _tolerances__eigen_max_iter(),
        }
    }
}

impl Default for Descriptors {
    fn default() -> Self {
        Descriptors { wohp: _descriptors__wohp(), wobi: _descriptors__wobi(), resolve_k: false }
    }
}

#[test]
fn test_defaults()
{
    // the hand-written defaults must agree with an empty mapping
    assert_eq!(from_empty_mapping::<Tolerances>().unwrap(), Tolerances::default());
    assert_eq!(from_empty_mapping::<Descriptors>().unwrap(), Descriptors::default());
    assert_eq!(Descriptors::default().selection(), DescriptorSelection::default());
}

#[cfg(test)]
fn from_empty_mapping<T: for<'de> serde::Deserialize<'de>>() -> serde_yaml::Result<T> {
    use serde_yaml::{from_value, Value, Mapping};
    from_value(Value::Mapping(Mapping::new()))
}
