/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::FailResult;
use crate::report::{BondingReport, BwdfReport, Diagnostics};

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use wanbond_structure::{Coords, FracOp, OrbitalCounts, OrbitalRegistry};
use wanbond_tasks_config::{Settings, ValidatedSettings};
use wanbond_wannier::{
    AggregationSettings, Aggregator, BondIndexSource, BondSelection, CacheKey, DescriptorCalculator,
    DescriptorSettings, IntegrationRange, Interpolated, InterpolationCache, Interpolator, KMesh,
    KMeshState, KSpaceHamiltonian, KWeights, RealSpaceHamiltonian, RealSpaceMatrix, ReferenceEnergy,
    SpectralCache, SpectralEngine,
};

/// The tight-binding model, in whichever form it was produced.
#[derive(Debug, Clone)]
pub enum ModelInput {
    KSpace(KSpaceHamiltonian),
    RealSpace {
        hamiltonian: RealSpaceHamiltonian,
        /// Mesh of the calculation that produced `hamiltonian`.
        source_mesh: [usize; 3],
    },
}

impl ModelInput {
    fn cache_key(&self) -> CacheKey {
        match self {
            ModelInput::KSpace(h) => CacheKey { mesh: h.mesh().dims(), fingerprint: h.fingerprint() },
            ModelInput::RealSpace { hamiltonian, source_mesh } => {
                CacheKey { mesh: *source_mesh, fingerprint: hamiltonian.fingerprint() }
            },
        }
    }
}

/// Everything a run needs besides settings.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub coords: Coords,
    /// Species of each atom.
    pub species: Vec<String>,
    /// Cartesian Wannier centres, one per orbital of the model.
    pub centres: Vec<[f64; 3]>,
    pub model: ModelInput,
    /// Spacegroup operators in fractional coordinates.  Empty when unknown.
    pub ops: Vec<FracOp>,
    /// Real-space bond-index matrix for WOBI.  Without one, the density
    /// matrix is used.
    pub bond_index: Option<RealSpaceMatrix>,
    pub orbital_counts: OrbitalCounts,
    /// Weights of the dense k-points.  Uniform when absent.
    pub kweights: Option<Vec<f64>>,
}

impl Inputs {
    pub fn new(coords: Coords, species: Vec<String>, centres: Vec<[f64; 3]>, model: ModelInput) -> Self {
        Inputs {
            coords, species, centres, model,
            ops: vec![],
            bond_index: None,
            orbital_counts: OrbitalCounts::Unchecked,
            kweights: None,
        }
    }
}

/// Runs the pipeline, keeping interpolations and eigensolutions between runs.
pub struct Session {
    settings: Settings,
    interpolations: InterpolationCache,
    spectra: SpectralCache,
}

impl Session {
    pub fn new(settings: ValidatedSettings) -> Self {
        let ValidatedSettings(settings) = settings;
        Session {
            settings,
            interpolations: InterpolationCache::new(),
            spectra: SpectralCache::new(),
        }
    }

    pub fn settings(&self) -> &Settings
    { &self.settings }

    /// Number of cached interpolations and eigensolutions.
    pub fn cache_sizes(&self) -> (usize, usize)
    { (self.interpolations.len(), self.spectra.len()) }

    pub fn run(&self, inputs: &Inputs) -> FailResult<BondingReport> {
        match self.settings.num_threads {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
                pool.install(|| self.run_inner(inputs))
            },
            None => self.run_inner(inputs),
        }
    }

    /// Real-space Hamiltonian of the model.
    pub fn interpolate(&self, model: &ModelInput) -> FailResult<Arc<Interpolated>> {
        let interpolator = Interpolator {
            hermiticity_tol: self.settings.tolerances.hermiticity,
            threading: self.settings.threading,
        };
        Ok(self.interpolations.get_or_try_insert_with(model.cache_key(), || match model {
            ModelInput::KSpace(h) => interpolator.interpolate(h),
            ModelInput::RealSpace { hamiltonian, source_mesh } => {
                interpolator.accept(hamiltonian.clone(), *source_mesh)
            },
        })?)
    }

    /// Eigenstates on the dense mesh.
    pub fn solve(&self, model: &Interpolated, kweights: Option<&[f64]>) -> FailResult<Arc<KMeshState>> {
        let dims = self.settings.kmesh.unwrap_or(model.mesh_dims);
        let mesh = KMesh::gamma_centred(dims)?;
        let weights = match kweights {
            Some(values) => KWeights::from_values(values.to_vec(), mesh.len(), self.settings.tolerances.weight_sum)?,
            None => mesh.uniform_weights(),
        };

        let mut hasher = DefaultHasher::new();
        model.hamiltonian.fingerprint().hash(&mut hasher);
        for w in weights.as_slice() {
            w.to_bits().hash(&mut hasher);
        }
        let key = CacheKey { mesh: dims, fingerprint: hasher.finish() };

        let engine = SpectralEngine {
            settings: self.settings.tolerances.eigen_settings(),
            threading: self.settings.threading,
        };
        Ok(self.spectra.get_or_try_insert_with(key, || engine.solve(&model.hamiltonian, &mesh, weights))?)
    }

    fn run_inner(&self, inputs: &Inputs) -> FailResult<BondingReport> {
        let settings = &self.settings;
        let tol = &settings.tolerances;

        let model = self.interpolate(&inputs.model)?;
        let registry = OrbitalRegistry::assign(
            inputs.coords.clone(),
            inputs.species.clone(),
            &inputs.centres,
            model.hamiltonian.num_orbitals(),
            &inputs.orbital_counts,
            tol.assignment_tolerances(),
        )?;
        let state = self.solve(&model, inputs.kweights.as_ref().map(|w| &w[..]))?;

        let reference = ReferenceEnergy::resolve(
            &settings.occupation,
            &state,
            settings.nspin,
            settings.reference_energy,
            settings.num_electrons,
        )?;

        let bond_index = match &inputs.bond_index {
            Some(matrix) => BondIndexSource::Supplied(matrix),
            None => BondIndexSource::DensityMatrix,
        };
        let grid = settings.energy_grid.grid()?;
        let calc = DescriptorCalculator::new(&model, &state, bond_index, DescriptorSettings {
            grid: grid.clone(),
            broadening: settings.broadening,
            occupation: settings.occupation,
            reference_energy: reference.value,
            nspin: settings.nspin,
            selection: settings.descriptors.selection(),
            threading: settings.threading,
        })?;

        let aggregator = Aggregator::new(&registry, &calc, AggregationSettings {
            direction: settings.bonds.direction,
            absence_as_zero: settings.bonds.absence_as_zero,
            interaction_threshold: tol.interaction_threshold,
            range: settings.integration_range(),
            symmetry_tol: tol.symmetry,
        })?;

        let selection = settings.bonds.selection()?;
        let ops: &[FracOp] = if settings.bonds.use_symmetry { &inputs.ops } else { &[] };
        let mut assumptions = calc.assumptions();
        if settings.bonds.use_symmetry && inputs.ops.is_empty() {
            assumptions.push("no spacegroup operators were supplied; every bond is its own class".to_string());
        }

        let pairs = aggregator.run(&selection, ops)?;
        let atoms = aggregator.atoms(&pairs.pairs, &settings.valence)?;

        let bwdf = match (&settings.bwdf, &selection) {
            (Some(b), BondSelection::Cutoffs(_)) => {
                Some(BwdfReport::from(aggregator.bwdf(&pairs.pairs, b.r_min, b.r_max, b.num_bins)?))
            },
            (Some(_), BondSelection::Pairs(_)) => {
                warn!("`bwdf` needs bond lengths, which explicit pairs do not have; skipping it");
                None
            },
            (None, _) => None,
        };

        let density_of_energy = calc.density_of_energy();
        let integrated_energy = match settings.integration_range() {
            IntegrationRange::ToReference => density_of_energy.integral_to(&grid, reference.value),
            IntegrationRange::Window { lower, upper } => density_of_energy.integral_between(&grid, lower, upper),
        };

        let diagnostics = Diagnostics {
            num_orbitals: registry.num_orbitals(),
            num_atoms: registry.num_atoms(),
            source_mesh: model.mesh_dims,
            kmesh: state.mesh().dims(),
            max_hermitian_error: model.max_hermitian_error,
            broadening: settings.broadening,
            occupation: settings.occupation,
            nspin: settings.nspin,
            reference_energy: reference,
            electron_count: calc.occupations().electron_count(state.weights().as_slice(), settings.nspin),
            multiplicities: pairs.classes.iter().map(|c| (c.index, c.multiplicity)).collect(),
            num_symmetry_ops: ops.len(),
            assumptions,
        };
        diagnostics.log_summary();

        Ok(BondingReport {
            energies: grid.energies(),
            pairs: pairs.pairs,
            absent: pairs.absent,
            classes: pairs.classes,
            atoms,
            total_dos: calc.total_dos(),
            density_of_energy,
            integrated_energy,
            bwdf,
            diagnostics,
        })
    }
}
