/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Fourier interpolation from a k-space Hamiltonian to real space.

use crate::errors::InterpolationError;
use crate::hamiltonian::{Block, KSpaceHamiltonian, RealSpaceHamiltonian};
use crate::kmesh::{translation_range, translation_weight};
use crate::threading::Threading;

use num_complex::Complex64;
use rayon::prelude::*;

use std::f64::consts::PI;

pub const DEFAULT_HERMITICITY_TOL: f64 = 1e-6;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Interpolator {
    /// Largest tolerated `|H(R)_ij - conj(H(-R)_ji)|`, in eV.
    pub hermiticity_tol: f64,
    pub threading: Threading,
}

impl Default for Interpolator {
    fn default() -> Self {
        Interpolator {
            hermiticity_tol: DEFAULT_HERMITICITY_TOL,
            threading: Threading::default(),
        }
    }
}

/// A validated real-space Hamiltonian together with the mesh it is periodic over.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolated {
    pub hamiltonian: RealSpaceHamiltonian,
    pub mesh_dims: [usize; 3],
    pub max_hermitian_error: f64,
}

/// `exp(i * 2 PI * k.R)`
pub fn phase(k: &[f64; 3], r: &[i32; 3]) -> Complex64 {
    let dot: f64 = (0..3).map(|a| k[a] * f64::from(r[a])).sum();
    Complex64::from_polar(1.0, 2.0 * PI * dot)
}

impl Interpolator {
    /// Compute `H(R) = (w_R/Nk) sum_k exp(-2 PI i k.R) H(k)` for every translation
    /// of the mesh box.
    ///
    /// `w_R` is the [`translation_weight`]: on an even mesh the boundary
    /// translations `+N/2` and `-N/2` are one translation to the mesh, and split
    /// it evenly.  This keeps `H(R) = H(-R)^H`, and therefore `H(k)` Hermitian at
    /// every `k`, not only on the input mesh.
    pub fn interpolate(&self, input: &KSpaceHamiltonian) -> Result<Interpolated, InterpolationError> {
        let mesh = input.mesh();
        let num_orbitals = input.num_orbitals();
        let translations = mesh.translations();
        let norm = 1.0 / mesh.len() as f64;
        info!(
            "Interpolating {} orbitals from a {:?} k-mesh onto {} translations",
            num_orbitals, mesh.dims(), translations.len(),
        );

        let blocks = self.threading.maybe_serial(|| {
            translations.par_iter().map(|r| {
                let scale = norm * translation_weight(r, mesh.dims());
                let mut block = Block::zeros(num_orbitals, num_orbitals);
                for (k, hk) in mesh.points().iter().zip(input.blocks()) {
                    block += hk * (phase(k, r).conj() * scale);
                }
                (*r, block)
            }).collect::<Vec<_>>()
        });

        let hamiltonian = RealSpaceHamiltonian::from_blocks(num_orbitals, blocks)?;
        self.validate(hamiltonian, mesh.dims())
    }

    /// Accept a Hamiltonian that is already in real space.
    ///
    /// Its translations must be commensurate with `source_mesh`, the mesh of the
    /// calculation that produced it.
    pub fn accept(
        &self,
        hamiltonian: RealSpaceHamiltonian,
        source_mesh: [usize; 3],
    ) -> Result<Interpolated, InterpolationError> {
        if hamiltonian.is_empty() || hamiltonian.num_orbitals() == 0 {
            return Err(InterpolationError::EmptyModel);
        }
        let translations = hamiltonian.translation_counts();
        let count = |a: usize| translation_range(source_mesh[a]).count();
        let expected = [count(0), count(1), count(2)];
        if translations != expected {
            return Err(InterpolationError::MeshMismatch { mesh: source_mesh, translations });
        }
        self.validate(hamiltonian, source_mesh)
    }

    fn validate(
        &self,
        hamiltonian: RealSpaceHamiltonian,
        mesh_dims: [usize; 3],
    ) -> Result<Interpolated, InterpolationError> {
        let report = hamiltonian.hermiticity();
        debug!(
            "Hermiticity deviation of H(R): {:e} at R = {:?}, ({}, {})",
            report.deviation, report.translation, report.i, report.j,
        );
        if !(report.deviation <= self.hermiticity_tol) {
            return Err(InterpolationError::HermiticityViolation {
                deviation: report.deviation,
                tolerance: self.hermiticity_tol,
                translation: report.translation,
                i: report.i,
                j: report.j,
            });
        }
        Ok(Interpolated { hamiltonian, mesh_dims, max_hermitian_error: report.deviation })
    }
}
