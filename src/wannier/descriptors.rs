/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Energy-resolved bonding descriptors of orbital pairs.
//!
//! For a pair `(i, j, R)`, band `n` and k-point `k`, the spectral weight is
//!
//! ```text
//! W_nk = conj(V_k[i, n]) V_k[j, n] exp(2 PI i k.R)
//! G(E) = sum_k w_k sum_n W_nk K(E - e_nk)
//! ```
//!
//! from which
//!
//! ```text
//! DOS(E)  =  nspin Re G(E)
//! WOHP(E) = -nspin Re[H_ij(R) G(E)]
//! WOBI(E) =  nspin Re[B_ij(R) G(E)]
//! ```
//!
//! The sign of WOHP is flipped so that bonding interactions are positive.

use crate::broadening::{Broadening, EnergyGrid, running_integral};
use crate::errors::DescriptorError;
use crate::hamiltonian::RealSpaceMatrix;
use crate::interp::{Interpolated, phase};
use crate::occupation::{Occupation, Occupations};
use crate::spectral::KMeshState;
use crate::threading::Threading;

use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

/// Orbital `i` of the home cell and orbital `j` of the cell at `translation`.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrbitalPair {
    pub i: usize,
    pub j: usize,
    pub translation: [i32; 3],
}

impl OrbitalPair {
    pub fn new(i: usize, j: usize, translation: [i32; 3]) -> Self
    { OrbitalPair { i, j, translation } }

    pub fn on_site(i: usize) -> Self
    { OrbitalPair { i, j: i, translation: [0; 3] } }

    pub fn is_on_site(&self) -> bool
    { self.i == self.j && self.translation == [0; 3] }
}

/// Values on an energy grid, and their running trapezoid integral.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    values: Vec<f64>,
    running: Vec<f64>,
}

impl Curve {
    pub fn new(values: Vec<f64>, grid: &EnergyGrid) -> Self {
        let running = running_integral(&values, grid.step());
        Curve { values, running }
    }

    pub fn zeros(len: usize) -> Self
    { Curve { values: vec![0.0; len], running: vec![0.0; len] } }

    pub fn values(&self) -> &[f64]
    { &self.values }

    pub fn running(&self) -> &[f64]
    { &self.running }

    pub fn len(&self) -> usize
    { self.values.len() }

    pub fn is_empty(&self) -> bool
    { self.values.is_empty() }

    /// Trapezoid integral over the grid points at or below `e_ref`.
    pub fn integral_to(&self, grid: &EnergyGrid, e_ref: f64) -> f64 {
        match grid.last_at_or_below(e_ref) {
            Some(i) => self.running[i],
            None => 0.0,
        }
    }

    /// Trapezoid integral over the grid points within `[lower, upper]`.
    pub fn integral_between(&self, grid: &EnergyGrid, lower: f64, upper: f64) -> f64 {
        match (grid.first_at_or_above(lower), grid.last_at_or_below(upper)) {
            (Some(lo), Some(hi)) if lo <= hi => self.running[hi] - self.running[lo],
            _ => 0.0,
        }
    }

    /// `self += factor * other`
    pub fn accumulate(&mut self, other: &Curve, factor: f64) {
        assert_eq!(self.len(), other.len(), "curves on different grids");
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a += factor * b;
        }
        for (a, b) in self.running.iter_mut().zip(&other.running) {
            *a += factor * b;
        }
    }
}

/// Scalars belonging to each kind of curve.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Integrals {
    /// Integrated DOS matrix element; the orbital population for on-site pairs.
    pub population: f64,
    pub wohp: Option<f64>,
    pub wobi: Option<f64>,
}

impl Integrals {
    /// `self += factor * other`, keeping only the kinds both sides have.
    pub fn accumulate(&mut self, other: &Integrals, factor: f64) {
        fn add(a: &mut Option<f64>, b: Option<f64>, factor: f64) {
            *a = match (*a, b) {
                (Some(a), Some(b)) => Some(a + factor * b),
                _ => None,
            };
        }
        self.population += factor * other.population;
        add(&mut self.wohp, other.wohp, factor);
        add(&mut self.wobi, other.wobi, factor);
    }
}

/// Descriptors of a single orbital pair.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct BondDescriptor {
    pub pair: OrbitalPair,
    pub hamiltonian_element: Complex64,
    pub bond_index_weight: Complex64,
    pub dos: Curve,
    pub wohp: Option<Curve>,
    pub wobi: Option<Curve>,
    /// Trapezoid integrals of the curves up to the reference energy.
    pub integrated: Integrals,
    /// Occupation-weighted sums over eigenstates, free of broadening.
    pub exact: Integrals,
    /// `nspin Re G_k(E)` per k-point, without the k-point weight.
    pub k_resolved_dos: Option<Vec<Vec<f64>>>,
}

/// Which curves to compute.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct DescriptorSelection {
    pub wohp: bool,
    pub wobi: bool,
    pub resolve_k: bool,
}

impl Default for DescriptorSelection {
    fn default() -> Self { DescriptorSelection { wohp: true, wobi: true, resolve_k: false } }
}

/// Where the bond-index weight `B_ij(R)` of WOBI comes from.
#[derive(Debug, Copy, Clone)]
pub enum BondIndexSource<'a> {
    /// The Wannier density matrix, which assumes an orthonormal basis.
    DensityMatrix,
    /// A user-supplied real-space matrix.
    Supplied(&'a RealSpaceMatrix),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorSettings {
    pub grid: EnergyGrid,
    pub broadening: Broadening,
    pub occupation: Occupation,
    pub reference_energy: f64,
    pub nspin: f64,
    pub selection: DescriptorSelection,
    pub threading: Threading,
}

pub struct DescriptorCalculator<'a> {
    model: &'a Interpolated,
    state: &'a KMeshState,
    occupations: Occupations,
    bond_index: BondIndexSource<'a>,
    settings: DescriptorSettings,
}

pub const ORTHONORMAL_ASSUMPTION: &str =
    "no bond-index matrix was supplied; WOBI uses the Wannier density matrix (orthonormal basis assumed)";

impl<'a> DescriptorCalculator<'a> {
    pub fn new(
        model: &'a Interpolated,
        state: &'a KMeshState,
        bond_index: BondIndexSource<'a>,
        settings: DescriptorSettings,
    ) -> Result<Self, DescriptorError> {
        settings.broadening.validate()?;
        settings.occupation.validate()?;

        let expected = model.hamiltonian.num_orbitals();
        match bond_index {
            BondIndexSource::Supplied(m) => {
                if m.num_orbitals() != expected {
                    return Err(DescriptorError::BondIndexShape { expected, found: m.num_orbitals() });
                }
            },
            BondIndexSource::DensityMatrix => {
                if settings.selection.wobi {
                    info!("{}", ORTHONORMAL_ASSUMPTION);
                }
            },
        }
        let occupations = settings.occupation.occupations(state, settings.reference_energy);
        Ok(DescriptorCalculator { model, state, occupations, bond_index, settings })
    }

    pub fn settings(&self) -> &DescriptorSettings
    { &self.settings }

    pub fn model(&self) -> &'a Interpolated
    { self.model }

    pub fn state(&self) -> &'a KMeshState
    { self.state }

    pub fn occupations(&self) -> &Occupations
    { &self.occupations }

    pub fn num_orbitals(&self) -> usize
    { self.model.hamiltonian.num_orbitals() }

    /// Assumptions made in computing descriptors, for diagnostics.
    pub fn assumptions(&self) -> Vec<String> {
        match self.bond_index {
            BondIndexSource::DensityMatrix if self.settings.selection.wobi => {
                vec![ORTHONORMAL_ASSUMPTION.to_string()]
            },
            _ => vec![],
        }
    }

    /// Descriptors of each pair, in the order requested.
    pub fn compute(&self, pairs: &[OrbitalPair]) -> Result<Vec<BondDescriptor>, DescriptorError> {
        info!("Computing descriptors for {} orbital pairs", pairs.len());
        let out = self.settings.threading.maybe_serial(|| {
            pairs.par_iter().map(|pair| self.compute_one(pair)).collect::<Vec<_>>()
        });
        out.into_iter().collect()
    }

    pub fn compute_one(&self, pair: &OrbitalPair) -> Result<BondDescriptor, DescriptorError> {
        let n = self.num_orbitals();
        if pair.i >= n || pair.j >= n {
            return Err(DescriptorError::OrbitalOutOfRange { pair: *pair, num_orbitals: n });
        }
        let &OrbitalPair { i, j, translation } = pair;
        let DescriptorSettings { ref grid, broadening, reference_energy, nspin, selection, .. } = self.settings;

        let h = self.model.hamiltonian.element_on_mesh(&translation, i, j, self.model.mesh_dims);
        let b = match self.bond_index {
            BondIndexSource::DensityMatrix => {
                self.state.density_matrix_element(i, j, &translation, &self.occupations, nspin)
            },
            BondIndexSource::Supplied(m) => m.element(&translation, i, j),
        };

        let zero = Complex64::new(0.0, 0.0);
        let weights = self.state.weights().as_slice();
        let mut green = vec![zero; grid.len()];
        let mut occupied = zero;
        let mut per_k = match selection.resolve_k {
            true => Some(Vec::with_capacity(self.state.num_kpoints())),
            false => None,
        };

        for (kpoint, k) in self.state.mesh().points().iter().enumerate() {
            let v = self.state.eigenvectors(kpoint);
            let energies = self.state.eigenvalues(kpoint);
            let factor = phase(k, &translation);
            let f = self.occupations.at_kpoint(kpoint);

            let mut green_k = per_k.as_ref().map(|_| vec![zero; grid.len()]);
            for (band, &energy) in energies.iter().enumerate() {
                let w = v[(i, band)].conj() * v[(j, band)] * factor;
                broadening.deposit(grid, energy, w * weights[kpoint], &mut green);
                if let Some(green_k) = green_k.as_mut() {
                    broadening.deposit(grid, energy, w, green_k);
                }
                occupied += w * (weights[kpoint] * f[band]);
            }
            if let (Some(per_k), Some(green_k)) = (per_k.as_mut(), green_k) {
                per_k.push(green_k.iter().map(|g| nspin * g.re).collect::<Vec<_>>());
            }
        }
        trace!("{:?}: H = {}, B = {}, occupied weight = {}", pair, h, b, occupied);

        let curve = |scale: Complex64| {
            Curve::new(green.iter().map(|g| nspin * (scale * g).re).collect(), grid)
        };
        let dos = curve(Complex64::new(1.0, 0.0));
        let wohp = match selection.wohp {
            true => Some(curve(-h)),
            false => None,
        };
        let wobi = match selection.wobi {
            true => Some(curve(b)),
            false => None,
        };

        let integrated = Integrals {
            population: dos.integral_to(grid, reference_energy),
            wohp: wohp.as_ref().map(|c| c.integral_to(grid, reference_energy)),
            wobi: wobi.as_ref().map(|c| c.integral_to(grid, reference_energy)),
        };
        let exact = Integrals {
            population: nspin * occupied.re,
            wohp: match selection.wohp {
                true => Some(-nspin * (h * occupied).re),
                false => None,
            },
            wobi: match selection.wobi {
                true => Some(nspin * (b * occupied).re),
                false => None,
            },
        };

        Ok(BondDescriptor {
            pair: *pair,
            hamiltonian_element: h,
            bond_index_weight: b,
            dos,
            wohp,
            wobi,
            integrated,
            exact,
            k_resolved_dos: per_k,
        })
    }

    /// Total density of states, `nspin sum_k w_k sum_n K(E - e_nk)`.
    pub fn total_dos(&self) -> Curve {
        self.level_sum(|_| 1.0)
    }

    /// Density of energy, `-nspin sum_k w_k sum_n e_nk K(E - e_nk)`.
    ///
    /// This equals the sum of the WOHPs of all orbital pairs (on-site terms
    /// included) over the translations of the mesh.
    pub fn density_of_energy(&self) -> Curve {
        self.level_sum(|e| -e)
    }

    fn level_sum(&self, weight: impl Fn(f64) -> f64) -> Curve {
        let DescriptorSettings { ref grid, broadening, nspin, .. } = self.settings;
        let weights = self.state.weights().as_slice();
        let mut out = vec![0.0; grid.len()];
        for kpoint in 0..self.state.num_kpoints() {
            for &energy in self.state.eigenvalues(kpoint) {
                broadening.deposit(grid, energy, nspin * weights[kpoint] * weight(energy), &mut out);
            }
        }
        Curve::new(out, grid)
    }
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use super::*;
    use crate::hamiltonian::{Block, RealSpaceHamiltonian};
    use crate::interp::Interpolator;
    use crate::kmesh::KMesh;
    use crate::spectral::SpectralEngine;
    use crate::errors::GridError;

    fn c(re: f64, im: f64) -> Complex64 { Complex64::new(re, im) }

    fn diatomic() -> (Interpolated, KMeshState) {
        let h = Block::from_row_slice(2, 2, &[c(0.0, 0.0), c(-1.0, 0.0), c(-1.0, 0.0), c(0.0, 0.0)]);
        let h = RealSpaceHamiltonian::from_blocks(2, vec![([0, 0, 0], h)]).unwrap();
        let model = Interpolator::default().accept(h, [1, 1, 1]).unwrap();
        let mesh = KMesh::gamma_centred([1, 1, 1]).unwrap();
        let state = SpectralEngine::default().solve(&model.hamiltonian, &mesh, mesh.uniform_weights()).unwrap();
        (model, state)
    }

    fn settings(broadening: Broadening) -> DescriptorSettings {
        DescriptorSettings {
            grid: EnergyGrid::new(-3.0, 3.0, 0.005).unwrap(),
            broadening,
            occupation: Occupation::Fixed,
            reference_energy: 0.0,
            nspin: 2.0,
            selection: DescriptorSelection::default(),
            threading: Threading::Serial,
        }
    }

    #[test]
    fn curves() {
        let grid = EnergyGrid::new(0.0, 1.0, 0.5).unwrap();
        let mut a = Curve::new(vec![1.0, 1.0, 1.0], &grid);
        assert_eq!(a.running(), &[0.0, 0.5, 1.0]);
        assert_eq!(a.integral_to(&grid, 0.7), 0.5);
        assert_eq!(a.integral_to(&grid, -0.7), 0.0);
        assert_eq!(a.integral_between(&grid, 0.2, 1.0), 0.5);
        assert_eq!(a.integral_between(&grid, 0.7, 0.8), 0.0);

        a.accumulate(&Curve::new(vec![2.0, 0.0, 0.0], &grid), 0.5);
        assert_eq!(a.values(), &[2.0, 1.0, 1.0]);
        assert_eq!(a.running(), &[0.0, 0.75, 1.25]);
    }

    #[test]
    fn diatomic_bond() {
        let (model, state) = diatomic();
        let calc = DescriptorCalculator::new(
            &model, &state, BondIndexSource::DensityMatrix, settings(Broadening::Gaussian { width: 0.05 }),
        ).unwrap();
        assert_eq!(calc.assumptions().len(), 1);

        let out = calc.compute(&[OrbitalPair::new(0, 1, [0, 0, 0])]).unwrap();
        let bond = &out[0];
        assert_close!(abs=1e-12, bond.hamiltonian_element, c(-1.0, 0.0));
        assert_close!(abs=1e-12, bond.bond_index_weight, c(1.0, 0.0));
        assert_close!(abs=1e-12, bond.exact.wohp.unwrap(), 1.0);
        assert_close!(abs=1e-12, bond.exact.wobi.unwrap(), 1.0);
        assert_close!(abs=1e-12, bond.exact.population, 1.0);

        // the smeared curves integrate to nearly the same values
        assert_close!(abs=1e-6, bond.integrated.wohp.unwrap(), 1.0);
        assert_close!(abs=1e-6, bond.integrated.wobi.unwrap(), 1.0);

        // bonding below zero, antibonding above
        let grid = &calc.settings().grid;
        let wohp = bond.wohp.as_ref().unwrap();
        assert!(wohp.values()[grid.last_at_or_below(-1.0).unwrap()] > 0.0);
        assert!(wohp.values()[grid.last_at_or_below(1.0).unwrap()] < 0.0);
    }

    #[test]
    fn supplied_bond_index() {
        let (model, state) = diatomic();
        let overlap = RealSpaceMatrix::from_blocks(2, vec![
            ([0, 0, 0], Block::from_element(2, 2, c(0.5, 0.0))),
        ]).unwrap();
        let calc = DescriptorCalculator::new(
            &model, &state, BondIndexSource::Supplied(&overlap), settings(Broadening::Histogram),
        ).unwrap();
        assert!(calc.assumptions().is_empty());
        let bond = calc.compute_one(&OrbitalPair::new(0, 1, [0, 0, 0])).unwrap();
        assert_close!(abs=1e-12, bond.exact.wobi.unwrap(), 0.5);

        let wrong = RealSpaceMatrix::new(3);
        match DescriptorCalculator::new(&model, &state, BondIndexSource::Supplied(&wrong), settings(Broadening::Histogram)) {
            Err(DescriptorError::BondIndexShape { expected: 2, found: 3 }) => {},
            Err(e) => panic!("unexpected: {}", e),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn rejects_degenerate_widths() {
        let (model, state) = diatomic();
        let check = |s: DescriptorSettings, what: &str, width: f64| {
            match DescriptorCalculator::new(&model, &state, BondIndexSource::DensityMatrix, s) {
                Err(DescriptorError::Grid(GridError::NonPositiveWidth { what: w, width: x })) => {
                    assert_eq!(w, what);
                    assert_eq!(x.to_bits(), width.to_bits());
                },
                Err(e) => panic!("unexpected: {}", e),
                Ok(_) => panic!("expected an error"),
            }
        };
        check(settings(Broadening::Gaussian { width: 0.0 }), "Gaussian broadening", 0.0);
        check(settings(Broadening::Gaussian { width: -0.1 }), "Gaussian broadening", -0.1);

        let mut s = settings(Broadening::Histogram);
        s.occupation = Occupation::FermiDirac { width: 0.0 };
        check(s, "occupation smearing", 0.0);

        let mut s = settings(Broadening::Histogram);
        s.occupation = Occupation::Gaussian { width: f64::NAN };
        check(s, "occupation smearing", f64::NAN);
    }

    #[test]
    fn options_and_errors() {
        let (model, state) = diatomic();
        let mut s = settings(Broadening::Histogram);
        s.selection = DescriptorSelection { wohp: false, wobi: false, resolve_k: true };
        let calc = DescriptorCalculator::new(&model, &state, BondIndexSource::DensityMatrix, s).unwrap();
        assert!(calc.assumptions().is_empty());

        let bond = calc.compute_one(&OrbitalPair::on_site(0)).unwrap();
        assert!(bond.wohp.is_none() && bond.wobi.is_none());
        assert_eq!(bond.exact.wohp, None);
        // one electron per orbital in the bonding level
        assert_close!(abs=1e-12, bond.exact.population, 1.0);
        let per_k = bond.k_resolved_dos.as_ref().unwrap();
        assert_eq!(per_k.len(), 1);
        assert_close!(abs=1e-12, per_k[0].clone(), bond.dos.values().to_vec());

        let bad = OrbitalPair::new(0, 2, [0, 0, 0]);
        assert_eq!(
            calc.compute(&[OrbitalPair::on_site(1), bad]).unwrap_err(),
            DescriptorError::OrbitalOutOfRange { pair: bad, num_orbitals: 2 },
        );
    }

    #[test]
    fn density_of_energy() {
        let (model, state) = diatomic();
        let calc = DescriptorCalculator::new(
            &model, &state, BondIndexSource::DensityMatrix, settings(Broadening::Gaussian { width: 0.1 }),
        ).unwrap();
        let pairs = [
            OrbitalPair::new(0, 0, [0, 0, 0]),
            OrbitalPair::new(0, 1, [0, 0, 0]),
            OrbitalPair::new(1, 0, [0, 0, 0]),
            OrbitalPair::new(1, 1, [0, 0, 0]),
        ];
        let mut sum = Curve::zeros(calc.settings().grid.len());
        for d in calc.compute(&pairs).unwrap() {
            sum.accumulate(d.wohp.as_ref().unwrap(), 1.0);
        }
        let doe = calc.density_of_energy();
        assert_close!(abs=1e-10, sum.values().to_vec(), doe.values().to_vec());

        let dos = calc.total_dos();
        assert_close!(abs=1e-6, dos.running()[dos.len() - 1], 4.0);
    }
}
