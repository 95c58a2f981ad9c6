/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Diagonalization of the interpolated Hamiltonian over a dense k-mesh.

use crate::errors::SpectralError;
use crate::hamiltonian::{Block, RealSpaceHamiltonian, RealSpaceMatrix};
use crate::interp::phase;
use crate::kmesh::{KMesh, KWeights};
use crate::occupation::Occupations;
use crate::threading::Threading;

use nalgebra::SymmetricEigen;
use num_complex::Complex64;
use rayon::prelude::*;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EigenSettings {
    /// Largest tolerated `|H(k) - H(k)^H|` element.
    pub hermiticity_tol: f64,
    /// Convergence threshold of the eigensolver.
    pub eps: f64,
    /// Iteration limit of the eigensolver (`0` for no limit).
    pub max_iter: usize,
}

impl Default for EigenSettings {
    fn default() -> Self {
        EigenSettings {
            hermiticity_tol: crate::interp::DEFAULT_HERMITICITY_TOL,
            eps: f64::EPSILON,
            max_iter: 10_000,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SpectralEngine {
    pub settings: EigenSettings,
    pub threading: Threading,
}

/// `H(k) = sum_R exp(2 PI i k.R) H(R)`
pub fn hamiltonian_at_k(ham: &RealSpaceMatrix, k: &[f64; 3]) -> Block {
    let n = ham.num_orbitals();
    let mut out = Block::zeros(n, n);
    for (r, block) in ham.iter() {
        out += block * phase(k, &r);
    }
    out
}

fn max_hermitian_error(m: &Block) -> f64 {
    let n = m.nrows();
    let mut max = 0.0f64;
    for i in 0..n {
        for j in i..n {
            max = max.max((m[(i, j)] - m[(j, i)].conj()).norm());
        }
    }
    max
}

/// Eigenvalues (ascending) and eigenvectors (columns) at every point of a mesh.
#[derive(Debug, Clone)]
pub struct KMeshState {
    mesh: KMesh,
    weights: KWeights,
    eigenvalues: Vec<Vec<f64>>,
    eigenvectors: Vec<Block>,
}

impl SpectralEngine {
    pub fn solve(
        &self,
        ham: &RealSpaceHamiltonian,
        mesh: &KMesh,
        weights: KWeights,
    ) -> Result<KMeshState, SpectralError> {
        if mesh.is_empty() {
            return Err(SpectralError::EmptyMesh);
        }
        if weights.len() != mesh.len() {
            return Err(SpectralError::WeightCount { weights: weights.len(), kpoints: mesh.len() });
        }
        info!("Diagonalizing {} orbitals at {} k-points", ham.num_orbitals(), mesh.len());

        let settings = self.settings;
        let solved = self.threading.maybe_serial(|| {
            mesh.points().par_iter().enumerate()
                .map(|(kpoint, k)| solve_one(ham, kpoint, k, &settings))
                .collect::<Vec<_>>()
        });
        // report the failure at the lowest k-point
        let solved = solved.into_iter().collect::<Result<Vec<_>, _>>()?;
        let (eigenvalues, eigenvectors) = solved.into_iter().unzip();

        Ok(KMeshState { mesh: mesh.clone(), weights, eigenvalues, eigenvectors })
    }
}

fn solve_one(
    ham: &RealSpaceHamiltonian,
    kpoint: usize,
    k: &[f64; 3],
    settings: &EigenSettings,
) -> Result<(Vec<f64>, Block), SpectralError> {
    let hk = hamiltonian_at_k(ham, k);
    let deviation = max_hermitian_error(&hk);
    if !(deviation <= settings.hermiticity_tol) {
        return Err(SpectralError::NonHermitian { kpoint, deviation, tolerance: settings.hermiticity_tol });
    }

    let eigen = SymmetricEigen::try_new(hk, settings.eps, settings.max_iter)
        .ok_or(SpectralError::NoConvergence { kpoint })?;

    let mut order = (0..eigen.eigenvalues.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect::<Vec<_>>();
    let vectors = Block::from_fn(eigen.eigenvectors.nrows(), order.len(), |row, col| {
        eigen.eigenvectors[(row, order[col])]
    });
    trace!("k-point {} ({:?}): eigenvalues {:?}", kpoint, k, values);
    Ok((values, vectors))
}

impl KMeshState {
    pub fn mesh(&self) -> &KMesh
    { &self.mesh }

    pub fn weights(&self) -> &KWeights
    { &self.weights }

    pub fn num_kpoints(&self) -> usize
    { self.eigenvalues.len() }

    pub fn num_bands(&self) -> usize
    { self.eigenvalues.first().map_or(0, |v| v.len()) }

    pub fn num_orbitals(&self) -> usize
    { self.eigenvectors.first().map_or(0, |v| v.nrows()) }

    pub fn eigenvalues(&self, kpoint: usize) -> &[f64]
    { &self.eigenvalues[kpoint] }

    /// Columns are bands.
    pub fn eigenvectors(&self, kpoint: usize) -> &Block
    { &self.eigenvectors[kpoint] }

    /// Lowest and highest eigenvalue over the mesh.
    pub fn energy_range(&self) -> (f64, f64) {
        self.eigenvalues.iter().flatten().fold(
            (std::f64::INFINITY, std::f64::NEG_INFINITY),
            |(lo, hi), &e| (lo.min(e), hi.max(e)),
        )
    }

    /// The Wannier density matrix `P(R) = nspin sum_k w_k exp(-2 PI i k.R) V f V^H`.
    pub fn density_matrix(&self, translation: &[i32; 3], occupations: &Occupations, nspin: f64) -> Block {
        let n = self.num_orbitals();
        let mut out = Block::zeros(n, n);
        for (kpoint, k) in self.mesh.points().iter().enumerate() {
            let v = &self.eigenvectors[kpoint];
            let f = occupations.at_kpoint(kpoint);
            let scaled = Block::from_fn(n, f.len(), |i, band| v[(i, band)] * f[band]);
            let factor = phase(k, translation).conj() * (nspin * self.weights.as_slice()[kpoint]);
            out += (scaled * v.adjoint()) * factor;
        }
        out
    }

    /// A single element of [`KMeshState::density_matrix`].
    pub fn density_matrix_element(
        &self,
        i: usize,
        j: usize,
        translation: &[i32; 3],
        occupations: &Occupations,
        nspin: f64,
    ) -> Complex64 {
        let mut sum = Complex64::new(0.0, 0.0);
        for (kpoint, k) in self.mesh.points().iter().enumerate() {
            let v = &self.eigenvectors[kpoint];
            let f = occupations.at_kpoint(kpoint);
            let mut band_sum = Complex64::new(0.0, 0.0);
            for band in 0..f.len() {
                band_sum += v[(i, band)] * v[(j, band)].conj() * f[band];
            }
            sum += band_sum * phase(k, translation).conj() * self.weights.as_slice()[kpoint];
        }
        sum * nspin
    }

    /// The density matrix at every translation of `like`.
    pub fn density_matrices(&self, like: &RealSpaceMatrix, occupations: &Occupations, nspin: f64) -> RealSpaceMatrix {
        let mut out = RealSpaceMatrix::new(self.num_orbitals());
        for r in like.translations() {
            out.insert(r, self.density_matrix(&r, occupations, nspin))
                .expect("translations of a RealSpaceMatrix are distinct and each P(R) is square in the orbitals");
        }
        out
    }
}
