/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Energy grids and the kernels that spread discrete levels over them.

use crate::errors::GridError;

use serde::{Serialize, Deserialize};

use std::f64::consts::PI;

/// Gaussians are truncated this many widths away from their centre.
const GAUSSIAN_CUTOFF: f64 = 6.0;

/// `emin, emin + step, ...` up to and including `emax`.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyGrid {
    min: f64,
    step: f64,
    len: usize,
}

impl EnergyGrid {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self, GridError> {
        if !(step > 0.0) || !step.is_finite() {
            return Err(GridError::NonPositiveStep { step });
        }
        if !(min <= max) {
            return Err(GridError::InvertedRange { min, max });
        }
        // tolerate rounding when emax is meant to be on the grid
        let len = ((max - min) / step + 1e-9).floor() as usize + 1;
        Ok(EnergyGrid { min, step, len })
    }

    pub fn min(&self) -> f64
    { self.min }

    pub fn step(&self) -> f64
    { self.step }

    pub fn len(&self) -> usize
    { self.len }

    pub fn is_empty(&self) -> bool
    { self.len == 0 }

    #[inline]
    pub fn energy(&self, index: usize) -> f64
    { self.min + index as f64 * self.step }

    pub fn energies(&self) -> Vec<f64>
    { (0..self.len).map(|i| self.energy(i)).collect() }

    /// Index of the last grid point at or below `energy`.
    pub fn last_at_or_below(&self, energy: f64) -> Option<usize> {
        if energy < self.min {
            return None;
        }
        let index = ((energy - self.min) / self.step + 1e-9).floor() as usize;
        Some(index.min(self.len - 1))
    }

    /// Index of the first grid point at or above `energy`.
    pub fn first_at_or_above(&self, energy: f64) -> Option<usize> {
        if energy <= self.min {
            return Some(0);
        }
        let index = ((energy - self.min) / self.step - 1e-9).ceil() as usize;
        if index < self.len { Some(index) } else { None }
    }
}

/// Replaces the delta function of each level by a finite kernel.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Broadening {
    /// Normalized Gaussian whose standard deviation is `width` (eV).
    Gaussian { width: f64 },
    /// All weight lands in the nearest grid point, divided by the step.
    Histogram,
}

pub const DEFAULT_GAUSSIAN_WIDTH: f64 = 0.1;

impl Default for Broadening {
    fn default() -> Self { Broadening::Gaussian { width: DEFAULT_GAUSSIAN_WIDTH } }
}

impl Broadening {
    pub fn validate(&self) -> Result<(), GridError> {
        match *self {
            Broadening::Gaussian { width } => {
                if width > 0.0 && width.is_finite() {
                    Ok(())
                } else {
                    Err(GridError::NonPositiveWidth { what: "Gaussian broadening", width })
                }
            },
            Broadening::Histogram => Ok(()),
        }
    }

    /// Add `weight * K(E - level)` to `out` at every grid energy `E`.
    ///
    /// `T` is real for densities and complex for matrix elements.
    pub fn deposit<T>(&self, grid: &EnergyGrid, level: f64, weight: T, out: &mut [T])
    where T: Copy + std::ops::AddAssign + std::ops::Mul<f64, Output=T>,
    {
        debug_assert_eq!(out.len(), grid.len());
        match *self {
            Broadening::Gaussian { width } => {
                let reach = GAUSSIAN_CUTOFF * width;
                let start = match grid.first_at_or_above(level - reach) {
                    Some(i) => i,
                    None => return,
                };
                let norm = 1.0 / (width * (2.0 * PI).sqrt());
                for i in start..grid.len() {
                    let x = grid.energy(i) - level;
                    if x > reach {
                        break;
                    }
                    out[i] += weight * (norm * (-0.5 * (x / width) * (x / width)).exp());
                }
            },
            Broadening::Histogram => {
                let pos = ((level - grid.min()) / grid.step()).round();
                if pos >= 0.0 && (pos as usize) < grid.len() {
                    out[pos as usize] += weight * (1.0 / grid.step());
                }
            },
        }
    }

    /// Same as [`Broadening::deposit`], for a weight known to be real.
    pub fn kernel(&self, grid: &EnergyGrid, level: f64) -> Vec<f64> {
        let mut out = vec![0.0; grid.len()];
        self.deposit(grid, level, 1.0, &mut out);
        out
    }
}

/// Running trapezoid integral; `out[i]` integrates `values[0..=i]`.
pub fn running_integral(values: &[f64], step: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut acc = 0.0;
    for (i, &v) in values.iter().enumerate() {
        if i > 0 {
            acc += 0.5 * step * (values[i - 1] + v);
        }
        out.push(acc);
    }
    out
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn grid() {
        let grid = EnergyGrid::new(-1.0, 1.0, 0.1).unwrap();
        assert_eq!(grid.len(), 21);
        assert_close!(abs=1e-12, grid.energy(20), 1.0);
        assert_eq!(grid.last_at_or_below(0.0), Some(10));
        assert_eq!(grid.last_at_or_below(0.05), Some(10));
        assert_eq!(grid.last_at_or_below(-2.0), None);
        assert_eq!(grid.last_at_or_below(5.0), Some(20));
        assert_eq!(grid.first_at_or_above(0.05), Some(11));
        assert_eq!(grid.first_at_or_above(0.0), Some(10));
        assert_eq!(grid.first_at_or_above(-5.0), Some(0));
        assert_eq!(grid.first_at_or_above(1.5), None);

        // emax off the grid is excluded
        assert_eq!(EnergyGrid::new(0.0, 1.05, 0.1).unwrap().len(), 11);
        assert_eq!(EnergyGrid::new(0.0, 0.0, 0.1).unwrap().len(), 1);

        assert_eq!(EnergyGrid::new(0.0, 1.0, 0.0), Err(GridError::NonPositiveStep { step: 0.0 }));
        assert_eq!(EnergyGrid::new(1.0, 0.0, 0.1), Err(GridError::InvertedRange { min: 1.0, max: 0.0 }));
    }

    #[test]
    fn gaussian_is_normalized() {
        let grid = EnergyGrid::new(-3.0, 3.0, 0.01).unwrap();
        let k = Broadening::Gaussian { width: 0.2 }.kernel(&grid, 0.3);
        let total = running_integral(&k, grid.step());
        assert_close!(abs=1e-8, total[grid.len() - 1], 1.0);

        let peak = grid.last_at_or_below(0.3).unwrap();
        assert_close!(rel=1e-6, k[peak], 1.0 / (0.2 * (2.0 * PI).sqrt()));
        // truncated far from the centre
        assert_eq!(k[0], 0.0);
    }

    #[test]
    fn histogram() {
        let grid = EnergyGrid::new(0.0, 1.0, 0.25).unwrap();
        let mut out = vec![Complex64::new(0.0, 0.0); grid.len()];
        Broadening::Histogram.deposit(&grid, 0.3, Complex64::new(0.0, 1.0), &mut out);
        Broadening::Histogram.deposit(&grid, 7.0, Complex64::new(1.0, 0.0), &mut out);
        assert_eq!(out[1], Complex64::new(0.0, 4.0));
        assert_eq!(out.iter().filter(|z| z.norm() != 0.0).count(), 1);
    }

    #[test]
    fn validation() {
        assert!(Broadening::Gaussian { width: -0.1 }.validate().is_err());
        assert!(Broadening::Histogram.validate().is_ok());
        assert!(Broadening::default().validate().is_ok());
    }

    #[test]
    fn trapezoid() {
        let r = running_integral(&[0.0, 1.0, 2.0, 3.0], 0.5);
        assert_close!(abs=1e-15, r, vec![0.0, 0.25, 1.0, 2.25]);
    }
}
