/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! All of the post-processing that occurs after deserialization is written here.

use crate::config::*;
use failure::Error;

impl Settings {
    pub fn validate(mut self) -> Result<ValidatedSettings, Error> {
        fix_version(&mut self.version)?;

        if self.num_threads == Some(0) {
            bail!("`num-threads` must be positive.");
        }
        if let Some(kmesh) = self.kmesh {
            if kmesh.iter().any(|&n| n == 0) {
                bail!("`kmesh: {:?}` has an empty direction.", kmesh);
            }
        }

        self.energy_grid.grid()?;
        self.broadening.validate()?;
        self.occupation.validate()?;

        if !(self.nspin == 1.0 || self.nspin == 2.0) {
            bail!("`nspin: {}` is invalid. (expected 1 or 2)", self.nspin);
        }
        match (self.reference_energy, self.num_electrons) {
            (None, None) => bail!("One of `reference-energy` or `num-electrons` is required."),
            (_, Some(n)) if !(n >= 0.0) => bail!("`num-electrons: {}` must be non-negative.", n),
            _ => {},
        }
        if let Some([lower, upper]) = self.integration_window {
            if !(lower <= upper) {
                bail!("`integration-window: [{}, {}]` is inverted.", lower, upper);
            }
        }

        check_tolerances(&self.tolerances)?;
        check_bonds(&self.bonds)?;

        if let Some(bwdf) = &self.bwdf {
            if !(bwdf.r_min < bwdf.r_max) || bwdf.num_bins == 0 {
                bail!(
                    "`bwdf` needs r-min < r-max and at least one bin. (got [{}, {}], {} bins)",
                    bwdf.r_min, bwdf.r_max, bwdf.num_bins,
                );
            }
        }
        for (species, &valence) in &self.valence {
            if !valence.is_finite() {
                bail!("`valence.{}: {}` is not a number.", species, valence);
            }
        }

        Ok(ValidatedSettings(self))
    }
}

fn fix_version(it: &mut Option<u32>) -> Result<(), Error> {
    match *it {
        Some(x) if x == 0 || x > MAX_VERSION => {
            bail!("`version: {}` is invalid. (1 <= version <= {})", x, MAX_VERSION);
        },
        None => {
            warn!("\
                Settings file has no `version` field! Assuming `version: 1`. \
                (the latest is version {})\
            ", MAX_VERSION);
            *it = Some(1);
        },
        _ => {},
    };

    Ok(())
}

fn check_tolerances(tol: &Tolerances) -> Result<(), Error> {
    let Tolerances {
        hermiticity, weight_sum, assignment, tie, interaction_threshold, symmetry,
        eigen_eps, eigen_max_iter,
    } = *tol;

    for &(name, value) in &[
        ("hermiticity", hermiticity),
        ("weight-sum", weight_sum),
        ("assignment", assignment),
        ("tie", tie),
        ("interaction-threshold", interaction_threshold),
        ("symmetry", symmetry),
        ("eigen-eps", eigen_eps),
    ] {
        if !(value >= 0.0) {
            bail!("`tolerances.{}: {}` must be non-negative.", name, value);
        }
    }
    if eigen_max_iter == 0 {
        warn!("`tolerances.eigen-max-iter: 0` places no limit on eigensolver iterations.");
    }
    Ok(())
}

fn check_bonds(bonds: &Bonds) -> Result<(), Error> {
    bonds.selection()?;

    if let Some(r_max) = bonds.r_max {
        if !(r_max > 0.0) {
            bail!("`bonds.r-max: {}` must be positive.", r_max);
        }
    }
    for cutoff in bonds.cutoffs.iter().flatten() {
        if !(cutoff.r_max > 0.0) {
            bail!(
                "cutoff for {}-{} must be positive. (got {})",
                cutoff.species.0, cutoff.species.1, cutoff.r_max,
            );
        }
    }
    if bonds.pairs.is_some() && bonds.use_symmetry {
        debug!("`bonds.use-symmetry` has no effect on explicit pairs");
    }
    Ok(())
}
