/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Occupation functions, Fermi level search and the reference energy.
//!
//! Occupations are fractions in `[0, 1]` per spin channel (the cold smearing
//! function slightly overshoots this range).  The spin degeneracy `nspin` is
//! always applied separately.

use crate::errors::{GridError, OccupationError};
use crate::spectral::KMeshState;

use serde::{Serialize, Deserialize};

use std::f64::consts::{PI, SQRT_2};

/// Electron count tolerance of the Fermi level search.
pub const FERMI_TOL: f64 = 1e-10;

const MAX_BISECTIONS: usize = 500;

#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Occupation {
    /// `f = 1` for `e <= e_ref`, else `0`.
    Fixed,
    FermiDirac { width: f64 },
    /// `f = erfc(x) / 2`
    Gaussian { width: f64 },
    /// Cold smearing.
    MarzariVanderbilt { width: f64 },
}

impl Default for Occupation {
    fn default() -> Self { Occupation::Fixed }
}

impl Occupation {
    pub fn validate(&self) -> Result<(), GridError> {
        match *self {
            Occupation::Fixed => Ok(()),
            Occupation::FermiDirac { width } |
            Occupation::Gaussian { width } |
            Occupation::MarzariVanderbilt { width } => {
                if width > 0.0 && width.is_finite() {
                    Ok(())
                } else {
                    Err(GridError::NonPositiveWidth { what: "occupation smearing", width })
                }
            },
        }
    }

    /// Occupation of a state at `energy`, relative to `e_ref`.
    pub fn value(&self, energy: f64, e_ref: f64) -> f64 {
        match *self {
            Occupation::Fixed => if energy <= e_ref { 1.0 } else { 0.0 },
            Occupation::FermiDirac { width } => {
                let x = (energy - e_ref) / width;
                // written to avoid overflow for large positive x
                if x > 0.0 {
                    let e = (-x).exp();
                    e / (1.0 + e)
                } else {
                    1.0 / (1.0 + x.exp())
                }
            },
            Occupation::Gaussian { width } => {
                let x = (energy - e_ref) / width;
                0.5 * libm::erfc(x)
            },
            Occupation::MarzariVanderbilt { width } => {
                let z = (energy - e_ref) / width + 1.0 / SQRT_2;
                0.5 * libm::erfc(z) + (-z * z).exp() / (2.0 * PI).sqrt()
            },
        }
    }

    /// Evaluate at every eigenvalue of a mesh.
    pub fn occupations(&self, state: &KMeshState, e_ref: f64) -> Occupations {
        Occupations(
            (0..state.num_kpoints())
                .map(|k| state.eigenvalues(k).iter().map(|&e| self.value(e, e_ref)).collect())
                .collect()
        )
    }
}

/// Occupation of each band at each k-point.
#[derive(Debug, Clone, PartialEq)]
pub struct Occupations(Vec<Vec<f64>>);

impl Occupations {
    /// Supply occupations directly.
    pub fn from_values(values: Vec<Vec<f64>>, state: &KMeshState) -> Result<Self, OccupationError> {
        let expected = (state.num_kpoints(), state.num_bands());
        let found = (values.len(), values.first().map_or(0, |v| v.len()));
        if found != expected || values.iter().any(|v| v.len() != expected.1) {
            return Err(OccupationError::Shape { expected, found });
        }
        Ok(Occupations(values))
    }

    #[inline]
    pub fn get(&self, kpoint: usize, band: usize) -> f64
    { self.0[kpoint][band] }

    #[inline]
    pub fn at_kpoint(&self, kpoint: usize) -> &[f64]
    { &self.0[kpoint] }

    /// `nspin * sum_k w_k sum_n f_nk`
    pub fn electron_count(&self, weights: &[f64], nspin: f64) -> f64 {
        nspin * self.0.iter().zip(weights)
            .map(|(fs, &w)| w * fs.iter().sum::<f64>())
            .sum::<f64>()
    }
}

/// How the reference energy was obtained.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceSource {
    Supplied,
    HighestOccupied,
    FermiLevel,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ReferenceEnergy {
    pub value: f64,
    pub source: ReferenceSource,
}

impl ReferenceEnergy {
    /// Use an explicit value if given, else derive one from the electron count.
    pub fn resolve(
        occupation: &Occupation,
        state: &KMeshState,
        nspin: f64,
        supplied: Option<f64>,
        num_electrons: Option<f64>,
    ) -> Result<Self, OccupationError> {
        match (supplied, num_electrons) {
            (Some(value), _) => Ok(ReferenceEnergy { value, source: ReferenceSource::Supplied }),
            (None, Some(electrons)) => match occupation {
                Occupation::Fixed => Ok(ReferenceEnergy {
                    value: highest_occupied(state, nspin, electrons)?,
                    source: ReferenceSource::HighestOccupied,
                }),
                _ => Ok(ReferenceEnergy {
                    value: fermi_level(occupation, state, nspin, electrons)?,
                    source: ReferenceSource::FermiLevel,
                }),
            },
            (None, None) => Err(OccupationError::Unspecified),
        }
    }
}

fn check_electrons(state: &KMeshState, nspin: f64, electrons: f64) -> Result<(), OccupationError> {
    if !(electrons >= 0.0) {
        return Err(OccupationError::NegativeElectrons { electrons });
    }
    let capacity = nspin * state.num_bands() as f64;
    if electrons > capacity + FERMI_TOL {
        return Err(OccupationError::TooManyElectrons { electrons, capacity });
    }
    Ok(())
}

/// The highest eigenvalue that is occupied when filling states from the bottom.
///
/// Each state holds `nspin * w_k` electrons.  A state that is only partially
/// filled still counts as occupied.
pub fn highest_occupied(state: &KMeshState, nspin: f64, electrons: f64) -> Result<f64, OccupationError> {
    check_electrons(state, nspin, electrons)?;
    let weights = state.weights().as_slice();
    let mut levels = (0..state.num_kpoints())
        .flat_map(|k| state.eigenvalues(k).iter().map(move |&e| (e, weights[k])))
        .collect::<Vec<_>>();
    levels.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut filled = 0.0;
    let mut highest = match levels.first() {
        Some(&(e, _)) => e,
        None => return Err(OccupationError::TooManyElectrons { electrons, capacity: 0.0 }),
    };
    for &(e, w) in &levels {
        if filled >= electrons - FERMI_TOL {
            break;
        }
        filled += nspin * w;
        highest = e;
    }
    debug!("Highest occupied level for {} electrons: {}", electrons, highest);
    Ok(highest)
}

/// Solve `nspin * sum_k w_k sum_n f(e_nk - mu) = electrons` for `mu` by bisection.
pub fn fermi_level(
    occupation: &Occupation,
    state: &KMeshState,
    nspin: f64,
    electrons: f64,
) -> Result<f64, OccupationError> {
    check_electrons(state, nspin, electrons)?;
    let weights = state.weights().as_slice();
    let count = |mu: f64| occupation.occupations(state, mu).electron_count(weights, nspin);

    let (emin, emax) = state.energy_range();
    let pad = match *occupation {
        Occupation::Fixed => 1.0,
        Occupation::FermiDirac { width } |
        Occupation::Gaussian { width } |
        Occupation::MarzariVanderbilt { width } => 50.0 * width + 1.0,
    };
    let mut lower = emin - pad;
    let mut upper = emax + pad;

    let mut mu = 0.5 * (lower + upper);
    let mut error = count(mu) - electrons;
    for _ in 0..MAX_BISECTIONS {
        if error.abs() <= FERMI_TOL {
            debug!("Fermi level for {} electrons: {}", electrons, mu);
            return Ok(mu);
        }
        if error > 0.0 {
            upper = mu;
        } else {
            lower = mu;
        }
        mu = 0.5 * (lower + upper);
        error = count(mu) - electrons;
    }
    // the step function of fixed occupations cannot always hit the count exactly
    match occupation {
        Occupation::Fixed => Ok(mu),
        _ => Err(OccupationError::NoConvergence { error }),
    }
}
