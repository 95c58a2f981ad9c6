/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Reduction of orbital-pair descriptors to atom pairs, bond classes and atoms.

use crate::descriptors::{BondDescriptor, Curve, DescriptorCalculator, Integrals, OrbitalPair};
use crate::errors::AggregationError;

use wanbond_structure::{AtomI, BondDirection, FracBond, FracBonds, FracOp, OrbitalRegistry};
use wanbond_structure::bond_stars;

use serde::{Serialize, Deserialize};

use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const DEFAULT_INTERACTION_THRESHOLD: f64 = 1e-6;

/// How atom pairs are chosen.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum BondSelection {
    /// Explicit pairs of atom labels, summed over every interacting image.
    Pairs(Vec<(String, String)>),
    /// Every bond shorter than the cutoff of its species pair.
    Cutoffs(Cutoffs),
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Cutoffs {
    /// One cutoff for all species.
    Global(f64),
    /// Per species pair, in either order.  Unlisted pairs are never bonded.
    Species(Vec<SpeciesCutoff>),
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SpeciesCutoff {
    pub species: (String, String),
    pub r_max: f64,
}

impl Cutoffs {
    pub fn max_range(&self) -> f64 {
        match self {
            Cutoffs::Global(r) => *r,
            Cutoffs::Species(list) => list.iter().map(|c| c.r_max).fold(0.0, f64::max),
        }
    }

    pub fn range(&self, a: &str, b: &str) -> Option<f64> {
        match self {
            Cutoffs::Global(r) => Some(*r),
            Cutoffs::Species(list) => {
                list.iter()
                    .filter(|c| {
                        let (x, y) = (&c.species.0[..], &c.species.1[..]);
                        (x, y) == (a, b) || (x, y) == (b, a)
                    })
                    .map(|c| c.r_max)
                    .next()
            },
        }
    }
}

/// Energy range of the integrated scalars.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum IntegrationRange {
    /// Up to the reference energy of the descriptors.
    ToReference,
    Window { lower: f64, upper: f64 },
}

impl Default for IntegrationRange {
    fn default() -> Self { IntegrationRange::ToReference }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSettings {
    pub direction: BondDirection,
    /// Report an explicit pair with no interactions as zero instead of absent.
    pub absence_as_zero: bool,
    /// Hamiltonian elements at most this large (eV) do not count as interactions.
    pub interaction_threshold: f64,
    pub range: IntegrationRange,
    /// Cartesian tolerance for mapping sites under symmetry operators.
    pub symmetry_tol: f64,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        AggregationSettings {
            direction: BondDirection::default(),
            absence_as_zero: false,
            interaction_threshold: DEFAULT_INTERACTION_THRESHOLD,
            range: IntegrationRange::default(),
            symmetry_tol: 1e-4,
        }
    }
}

/// Descriptors summed over the orbital pairs of an atom pair.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct AtomPairSummary {
    pub from: AtomI,
    pub to: AtomI,
    pub from_label: String,
    pub to_label: String,
    /// Lattice image of `to`; only for geometrically selected bonds.
    pub image: Option<[i32; 3]>,
    pub length: Option<f64>,
    pub orbital_pairs: Vec<OrbitalPair>,
    pub dos: Curve,
    pub wohp: Option<Curve>,
    pub wobi: Option<Curve>,
    /// Trapezoid integrals over the integration range.
    pub integrated: Integrals,
    /// Broadening-free sums over occupied states.
    pub exact: Integrals,
    /// Number of bonds in the symmetry class of this bond.
    pub multiplicity: usize,
    pub class: Option<usize>,
}

/// Result of looking up an explicit atom pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Interaction(AtomPairSummary),
    NoInteraction { from: String, to: String },
}

impl PairOutcome {
    pub fn into_summary(self) -> Result<AtomPairSummary, AggregationError> {
        match self {
            PairOutcome::Interaction(summary) => Ok(summary),
            PairOutcome::NoInteraction { from, to } => Err(AggregationError::NoInteraction { from, to }),
        }
    }
}

/// A class of symmetry-equivalent bonds.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSummary {
    pub index: usize,
    pub representative: FracBond,
    pub from_label: String,
    pub to_label: String,
    pub length: f64,
    pub multiplicity: usize,
    pub members: Vec<FracBond>,
    /// Values of a single bond.
    pub per_bond: Integrals,
    /// `multiplicity` times `per_bond`.
    pub total: Integrals,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct AtomSummary {
    pub atom: AtomI,
    pub label: String,
    pub species: String,
    pub num_bonds: usize,
    /// Sum of the WOHPs of the atom's bonds.
    pub bonding: Option<Curve>,
    pub bonding_integrated: Option<f64>,
    /// On-site projected DOS.
    pub pdos: Curve,
    pub population: f64,
    /// `valence - population`, when the valence is known.
    pub charge: Option<f64>,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PairReport {
    pub pairs: Vec<AtomPairSummary>,
    /// Explicit pairs with no interaction above the threshold.
    pub absent: Vec<(String, String)>,
    pub classes: Vec<ClassSummary>,
}

/// Bond-weighted distribution function: integrated WOHP binned by bond length.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct Bwdf {
    /// `num_bins + 1` bin edges.
    pub edges: Vec<f64>,
    /// Per species pair (in sorted order), the sum over each bin.
    pub series: BTreeMap<(String, String), Vec<f64>>,
}

/// Descriptors by orbital pair.
pub type DescriptorTable = HashMap<OrbitalPair, BondDescriptor>;

struct Summed {
    dos: Curve,
    wohp: Option<Curve>,
    wobi: Option<Curve>,
    exact: Integrals,
}

pub struct Aggregator<'a> {
    registry: &'a OrbitalRegistry,
    calc: &'a DescriptorCalculator<'a>,
    settings: AggregationSettings,
}

impl<'a> Aggregator<'a> {
    pub fn new(
        registry: &'a OrbitalRegistry,
        calc: &'a DescriptorCalculator<'a>,
        settings: AggregationSettings,
    ) -> Result<Self, AggregationError> {
        if let IntegrationRange::Window { lower, upper } = settings.range {
            if !(lower <= upper) {
                return Err(AggregationError::InvertedWindow { lower, upper });
            }
        }
        Ok(Aggregator { registry, calc, settings })
    }

    pub fn settings(&self) -> &AggregationSettings
    { &self.settings }

    pub fn run(&self, selection: &BondSelection, ops: &[FracOp]) -> Result<PairReport, AggregationError> {
        match selection {
            BondSelection::Pairs(pairs) => {
                let mut report = PairReport::default();
                for outcome in self.explicit_pairs(pairs)? {
                    match outcome {
                        PairOutcome::Interaction(summary) => report.pairs.push(summary),
                        PairOutcome::NoInteraction { from, to } => {
                            warn!("No interaction between {} and {} above the threshold", from, to);
                            report.absent.push((from, to));
                        },
                    }
                }
                Ok(report)
            },
            BondSelection::Cutoffs(cutoffs) => self.bonds(cutoffs, ops),
        }
    }

    fn find_atom(&self, label: &str) -> Result<AtomI, AggregationError> {
        self.registry.find_label(label)
            .ok_or_else(|| AggregationError::UnknownAtom { atom: label.to_string() })
    }

    /// Orbital pairs coupling two atoms through any translation of the model.
    pub fn interacting_pairs(&self, from: AtomI, to: AtomI) -> Vec<OrbitalPair> {
        let ham = &self.calc.model().hamiltonian;
        let mut out = vec![];
        for (r, block) in ham.iter() {
            for &m in self.registry.orbitals_of(from) {
                for &n in self.registry.orbitals_of(to) {
                    if m == n && r == [0; 3] {
                        continue;
                    }
                    if !(block[(m, n)].norm() > self.settings.interaction_threshold) {
                        continue;
                    }
                    if from == to && self.settings.direction == BondDirection::Undirected {
                        // the same bond is seen from both ends
                        let image = self.atom_image(m, n, r);
                        let keep = match image == [0; 3] {
                            true => m < n,
                            false => FracBond { from: from.0, to: to.0, image_diff: image }.is_canonical(),
                        };
                        if !keep {
                            continue;
                        }
                    }
                    out.push(OrbitalPair::new(m, n, r));
                }
            }
        }
        out
    }

    /// Image of the atom owning `n` relative to the atom owning `m`, for the
    /// orbital pair `(m, n, r)`.
    fn atom_image(&self, m: usize, n: usize, r: [i32; 3]) -> [i32; 3] {
        let (im, in_) = (self.registry.orbital(m).image, self.registry.orbital(n).image);
        [0, 1, 2].map(|k| r[k] - in_[k] + im[k])
    }

    /// Orbital pairs of a bond: `(m, n, image + img(n) - img(m))`.
    pub fn bond_pairs(&self, bond: &FracBond) -> Vec<OrbitalPair> {
        let mut out = vec![];
        for &m in self.registry.orbitals_of(AtomI(bond.from)) {
            for &n in self.registry.orbitals_of(AtomI(bond.to)) {
                let (im, in_) = (self.registry.orbital(m).image, self.registry.orbital(n).image);
                let r = [0, 1, 2].map(|k| bond.image_diff[k] + in_[k] - im[k]);
                out.push(OrbitalPair::new(m, n, r));
            }
        }
        out
    }

    pub fn explicit_pair(&self, from: &str, to: &str) -> Result<PairOutcome, AggregationError> {
        let mut out = self.explicit_pairs(&[(from.to_string(), to.to_string())])?;
        Ok(out.remove(0))
    }

    /// Descriptors of every pair are computed in a single batch.
    pub fn explicit_pairs(&self, pairs: &[(String, String)]) -> Result<Vec<PairOutcome>, AggregationError> {
        let resolved = pairs.iter()
            .map(|(a, b)| {
                let (from, to) = (self.find_atom(a)?, self.find_atom(b)?);
                Ok((from, to, self.interacting_pairs(from, to)))
            })
            .collect::<Result<Vec<_>, AggregationError>>()?;

        let table = self.evaluate(resolved.iter().flat_map(|(_, _, p)| p.iter().cloned()))?;

        resolved.into_iter().map(|(from, to, orbital_pairs)| {
            let from_label = self.registry.label(from).to_string();
            let to_label = self.registry.label(to).to_string();
            if orbital_pairs.is_empty() && !self.settings.absence_as_zero {
                return Ok(PairOutcome::NoInteraction { from: from_label, to: to_label });
            }
            let summed = self.sum(&table, &orbital_pairs)?;
            Ok(PairOutcome::Interaction(self.summary(
                from, to, None, None, orbital_pairs, summed, 1, None,
            )))
        }).collect()
    }

    /// Summaries of every bond within the cutoffs.
    ///
    /// Bonds are grouped into classes under `ops` (the trivial group if empty),
    /// and descriptors are only computed for the representative of each class.
    pub fn bonds(&self, cutoffs: &Cutoffs, ops: &[FracOp]) -> Result<PairReport, AggregationError> {
        let coords = self.registry.coords();
        let species = self.registry.species();
        let bonds = FracBonds::from_brute_force_with_meta(
            coords,
            species.iter(),
            cutoffs.max_range(),
            |a, b| cutoffs.range(a, b),
        );
        let stars = bond_stars(
            coords, species, ops, &bonds, self.settings.direction, self.settings.symmetry_tol,
        )?;
        info!(
            "{} bonds within the cutoffs fall into {} classes under {} operators",
            self.settings.direction.select(&bonds).len(), stars.len(), stars.num_opers(),
        );

        let rep_pairs = stars.iter()
            .map(|star| self.bond_pairs(&star.representative()))
            .collect::<Vec<_>>();
        let table = self.evaluate(rep_pairs.iter().flatten().cloned())?;

        let mut report = PairReport::default();
        for (index, (star, pairs)) in stars.iter().zip(&rep_pairs).enumerate() {
            let rep = star.representative();
            let summed = self.sum(&table, pairs)?;
            let multiplicity = star.multiplicity();
            let rep_summary = self.summary(
                AtomI(rep.from), AtomI(rep.to), Some(rep.image_diff), Some(rep.length(coords)),
                pairs.clone(), summed, multiplicity, Some(index),
            );

            let mut total = Integrals::default();
            total.wohp = rep_summary.integrated.wohp.map(|_| 0.0);
            total.wobi = rep_summary.integrated.wobi.map(|_| 0.0);
            total.accumulate(&rep_summary.integrated, multiplicity as f64);

            report.classes.push(ClassSummary {
                index,
                representative: rep,
                from_label: rep_summary.from_label.clone(),
                to_label: rep_summary.to_label.clone(),
                length: rep.length(coords),
                multiplicity,
                members: star.members().collect(),
                per_bond: rep_summary.integrated,
                total,
            });

            for member in star.members() {
                let mut summary = rep_summary.clone();
                summary.from = AtomI(member.from);
                summary.to = AtomI(member.to);
                summary.from_label = self.registry.label(summary.from).to_string();
                summary.to_label = self.registry.label(summary.to).to_string();
                summary.image = Some(member.image_diff);
                summary.length = Some(member.length(coords));
                summary.orbital_pairs = self.bond_pairs(&member);
                report.pairs.push(summary);
            }
        }
        Ok(report)
    }

    fn evaluate(&self, pairs: impl IntoIterator<Item=OrbitalPair>) -> Result<DescriptorTable, AggregationError> {
        let unique = pairs.into_iter().collect::<BTreeSet<_>>().into_iter().collect::<Vec<_>>();
        let descriptors = self.calc.compute(&unique)?;
        Ok(unique.into_iter().zip(descriptors).collect())
    }

    fn sum(&self, table: &DescriptorTable, pairs: &[OrbitalPair]) -> Result<Summed, AggregationError> {
        let len = self.calc.settings().grid.len();
        let selection = self.calc.settings().selection;
        let zero_if = |on: bool| match on {
            true => Some(0.0),
            false => None,
        };
        let mut out = Summed {
            dos: Curve::zeros(len),
            wohp: if selection.wohp { Some(Curve::zeros(len)) } else { None },
            wobi: if selection.wobi { Some(Curve::zeros(len)) } else { None },
            exact: Integrals { population: 0.0, wohp: zero_if(selection.wohp), wobi: zero_if(selection.wobi) },
        };
        for pair in pairs {
            let d = table.get(pair).ok_or(AggregationError::MissingDescriptor { pair: *pair })?;
            if d.dos.len() != len {
                return Err(AggregationError::InconsistentGrid { expected: len, found: d.dos.len() });
            }
            out.dos.accumulate(&d.dos, 1.0);
            if let (Some(acc), Some(c)) = (out.wohp.as_mut(), d.wohp.as_ref()) {
                acc.accumulate(c, 1.0);
            }
            if let (Some(acc), Some(c)) = (out.wobi.as_mut(), d.wobi.as_ref()) {
                acc.accumulate(c, 1.0);
            }
            out.exact.accumulate(&d.exact, 1.0);
        }
        Ok(out)
    }

    fn integrate(&self, curve: &Curve) -> f64 {
        let settings = self.calc.settings();
        match self.settings.range {
            IntegrationRange::ToReference => curve.integral_to(&settings.grid, settings.reference_energy),
            IntegrationRange::Window { lower, upper } => curve.integral_between(&settings.grid, lower, upper),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn summary(
        &self,
        from: AtomI,
        to: AtomI,
        image: Option<[i32; 3]>,
        length: Option<f64>,
        orbital_pairs: Vec<OrbitalPair>,
        summed: Summed,
        multiplicity: usize,
        class: Option<usize>,
    ) -> AtomPairSummary {
        let integrated = Integrals {
            population: self.integrate(&summed.dos),
            wohp: summed.wohp.as_ref().map(|c| self.integrate(c)),
            wobi: summed.wobi.as_ref().map(|c| self.integrate(c)),
        };
        AtomPairSummary {
            from,
            to,
            from_label: self.registry.label(from).to_string(),
            to_label: self.registry.label(to).to_string(),
            image,
            length,
            orbital_pairs,
            dos: summed.dos,
            wohp: summed.wohp,
            wobi: summed.wobi,
            integrated,
            exact: summed.exact,
            multiplicity,
            class,
        }
    }

    /// Per-atom summaries from a set of pair summaries.
    ///
    /// An undirected bond counts fully towards both of its atoms (once, for a
    /// bond between images of the same atom).  A directed bond counts towards
    /// its `from` atom only, so that each atom still sees every bond once.
    pub fn atoms(
        &self,
        pairs: &[AtomPairSummary],
        valence: &BTreeMap<String, f64>,
    ) -> Result<Vec<AtomSummary>, AggregationError> {
        let num_atoms = self.registry.num_atoms();
        let onsite = (0..self.registry.num_orbitals()).map(OrbitalPair::on_site).collect::<Vec<_>>();
        let table = self.evaluate(onsite)?;

        let len = self.calc.settings().grid.len();
        let wohp_on = self.calc.settings().selection.wohp;
        let mut bonding = vec![None; num_atoms];
        let mut num_bonds = vec![0; num_atoms];
        if wohp_on {
            bonding = vec![Some(Curve::zeros(len)); num_atoms];
        }

        for pair in pairs {
            let mut owners = vec![pair.from];
            if self.settings.direction == BondDirection::Undirected && pair.to != pair.from {
                owners.push(pair.to);
            }
            for atom in owners {
                if atom.0 >= num_atoms {
                    return Err(AggregationError::UnknownAtom { atom: atom.0.to_string() });
                }
                num_bonds[atom.0] += 1;
                if let (Some(acc), Some(c)) = (bonding[atom.0].as_mut(), pair.wohp.as_ref()) {
                    if c.len() != len {
                        return Err(AggregationError::InconsistentGrid { expected: len, found: c.len() });
                    }
                    acc.accumulate(c, 1.0);
                }
            }
        }

        (0..num_atoms).map(|a| {
            let atom = AtomI(a);
            let orbitals = self.registry.orbitals_of(atom);
            let summed = self.sum(&table, &orbitals.iter().map(|&m| OrbitalPair::on_site(m)).collect::<Vec<_>>())?;
            let species = self.registry.species_of(atom).to_string();
            let population = summed.exact.population;
            let bonding_curve = bonding[a].take();
            Ok(AtomSummary {
                atom,
                label: self.registry.label(atom).to_string(),
                charge: valence.get(&species).map(|v| v - population),
                species,
                num_bonds: num_bonds[a],
                bonding_integrated: bonding_curve.as_ref().map(|c| self.integrate(c)),
                bonding: bonding_curve,
                pdos: summed.dos,
                population,
            })
        }).collect()
    }

    /// Histogram the integrated WOHP of each bond by length, per species pair.
    ///
    /// Bins split `[r_min, r_max)` evenly. Bonds outside the range and bonds
    /// without WOHP are ignored.
    pub fn bwdf(
        &self,
        pairs: &[AtomPairSummary],
        r_min: f64,
        r_max: f64,
        num_bins: usize,
    ) -> Result<Bwdf, AggregationError> {
        if !(r_min < r_max) || num_bins == 0 {
            return Err(AggregationError::InvertedWindow { lower: r_min, upper: r_max });
        }
        let width = (r_max - r_min) / num_bins as f64;
        let edges = (0..=num_bins).map(|i| r_min + i as f64 * width).collect();

        let mut series = BTreeMap::<(String, String), Vec<f64>>::new();
        for pair in pairs {
            let length = pair.length.ok_or_else(|| AggregationError::MissingLength {
                from: pair.from_label.clone(),
                to: pair.to_label.clone(),
            })?;
            let mut key = (
                self.registry.species_of(pair.from).to_string(),
                self.registry.species_of(pair.to).to_string(),
            );
            if key.1 < key.0 {
                key = (key.1, key.0);
            }
            let bins = series.entry(key).or_insert_with(|| vec![0.0; num_bins]);
            if !(r_min <= length && length < r_max) {
                continue;
            }
            let bin = (((length - r_min) / width) as usize).min(num_bins - 1);
            if let Some(iwohp) = pair.integrated.wohp {
                bins[bin] += iwohp;
            }
        }
        Ok(Bwdf { edges, series })
    }
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use super::*;
    use crate::broadening::{Broadening, EnergyGrid};
    use crate::descriptors::{BondIndexSource, DescriptorSelection, DescriptorSettings};
    use crate::hamiltonian::{Block, RealSpaceHamiltonian};
    use crate::interp::{Interpolated, Interpolator};
    use crate::kmesh::KMesh;
    use pretty_assertions::assert_eq;
    use crate::occupation::Occupation;
    use crate::spectral::{KMeshState, SpectralEngine};
    use crate::threading::Threading;
    use num_complex::Complex64;
    use wanbond_structure::{Coords, CoordsKind, Lattice, WannierOrbital};

    fn c(re: f64) -> Complex64 { Complex64::new(re, 0.0) }

    fn registry(coords: Coords, species: &[&str]) -> OrbitalRegistry {
        let carts = coords.to_carts();
        let orbitals = carts.iter().enumerate().map(|(index, &centre)| WannierOrbital {
            index, atom: AtomI(index), image: [0; 3], centre, distance: 0.0,
        }).collect();
        OrbitalRegistry::from_orbitals(coords, species.iter().map(|s| s.to_string()).collect(), orbitals)
    }

    // one s orbital per site of a square lattice, nearest neighbor hopping -1
    fn square() -> (OrbitalRegistry, Interpolated, KMeshState) {
        let coords = Coords::new(Lattice::orthorhombic(1.0, 1.0, 10.0), CoordsKind::Fracs(vec![[0.0; 3]]));
        let one = |x| Block::from_element(1, 1, c(x));
        let h = RealSpaceHamiltonian::from_blocks(1, vec![
            ([0, 0, 0], one(0.0)),
            ([1, 0, 0], one(-1.0)),
            ([-1, 0, 0], one(-1.0)),
            ([0, 1, 0], one(-1.0)),
            ([0, -1, 0], one(-1.0)),
        ]).unwrap();
        let model = Interpolator::default().accept(h, [3, 3, 1]).unwrap();
        let mesh = KMesh::gamma_centred([8, 8, 1]).unwrap();
        let state = SpectralEngine::default().solve(&model.hamiltonian, &mesh, mesh.uniform_weights()).unwrap();
        (registry(coords, &["H"]), model, state)
    }

    fn settings() -> DescriptorSettings {
        DescriptorSettings {
            grid: EnergyGrid::new(-5.0, 5.0, 0.01).unwrap(),
            broadening: Broadening::Gaussian { width: 0.1 },
            occupation: Occupation::Fixed,
            reference_energy: -0.5,
            nspin: 2.0,
            selection: DescriptorSelection::default(),
            threading: Threading::Serial,
        }
    }

    fn fourfold() -> Vec<FracOp> {
        let mut ops = vec![];
        for &(a, b) in &[(1, 0), (0, 1), (-1, 0), (0, -1)] {
            for &mirror in &[1, -1] {
                let rot = [[a, -b * mirror, 0], [b, a * mirror, 0], [0, 0, 1]];
                ops.push(FracOp::from_parts(&rot, &[0.0; 3]).unwrap());
            }
        }
        ops
    }

    #[test]
    fn symmetry_folding() {
        let (registry, model, state) = square();
        let calc = DescriptorCalculator::new(&model, &state, BondIndexSource::DensityMatrix, settings()).unwrap();
        let agg = Aggregator::new(&registry, &calc, AggregationSettings::default()).unwrap();

        let unfolded = agg.bonds(&Cutoffs::Global(1.1), &[]).unwrap();
        assert_eq!(unfolded.pairs.len(), 2);
        assert_eq!(unfolded.classes.len(), 2);
        let x = unfolded.pairs[0].integrated.wohp.unwrap();
        let y = unfolded.pairs[1].integrated.wohp.unwrap();
        assert_close!(abs=1e-10, x, y);
        assert!(x > 0.0);

        let folded = agg.bonds(&Cutoffs::Global(1.1), &fourfold()).unwrap();
        assert_eq!(folded.pairs.len(), 2);
        assert_eq!(folded.classes.len(), 1);
        let class = &folded.classes[0];
        assert_eq!(class.multiplicity, 2);
        assert_close!(abs=1e-10, class.per_bond.wohp.unwrap(), x);
        assert_close!(abs=1e-10, class.total.wohp.unwrap(), 2.0 * x);
        for pair in &folded.pairs {
            assert_eq!(pair.multiplicity, 2);
            assert_eq!(pair.class, Some(0));
            assert_close!(abs=1e-12, pair.length.unwrap(), 1.0);
            assert_close!(abs=1e-10, pair.integrated.wohp.unwrap(), x);
        }

        let directed = Aggregator::new(&registry, &calc, AggregationSettings {
            direction: BondDirection::Directed,
            ..Default::default()
        }).unwrap();
        let report = directed.bonds(&Cutoffs::Global(1.1), &fourfold()).unwrap();
        assert_eq!(report.pairs.len(), 4);
        assert_eq!(report.classes[0].multiplicity, 4);
    }

    #[test]
    fn explicit_pair_images() {
        let (registry, model, state) = square();
        let calc = DescriptorCalculator::new(&model, &state, BondIndexSource::DensityMatrix, settings()).unwrap();
        let agg = Aggregator::new(&registry, &calc, AggregationSettings::default()).unwrap();

        // each physical bond once
        let summary = agg.explicit_pair("H1", "H1").unwrap().into_summary().unwrap();
        assert_eq!(summary.orbital_pairs, vec![
            OrbitalPair::new(0, 0, [0, 1, 0]),
            OrbitalPair::new(0, 0, [1, 0, 0]),
        ]);
        let bonds = agg.bonds(&Cutoffs::Global(1.1), &[]).unwrap();
        let per_bond = bonds.pairs[0].integrated.wohp.unwrap();
        assert_close!(abs=1e-10, summary.integrated.wohp.unwrap(), 2.0 * per_bond);

        assert_eq!(
            agg.explicit_pair("H1", "He7").unwrap_err(),
            AggregationError::UnknownAtom { atom: "He7".to_string() },
        );

        // per atom: both bonds, each once
        let atoms = agg.atoms(&bonds.pairs, &vec![("H".to_string(), 1.0)].into_iter().collect()).unwrap();
        assert_eq!(atoms.len(), 1);
        assert_eq!(atoms[0].num_bonds, 2);
        assert_close!(abs=1e-10, atoms[0].bonding_integrated.unwrap(), 2.0 * per_bond);
        assert_close!(abs=1e-12, atoms[0].charge.unwrap(), 1.0 - atoms[0].population);
    }

    #[test]
    fn windows() {
        let (registry, model, state) = square();
        let calc = DescriptorCalculator::new(&model, &state, BondIndexSource::DensityMatrix, settings()).unwrap();
        let to_ref = Aggregator::new(&registry, &calc, AggregationSettings::default()).unwrap();
        let window = Aggregator::new(&registry, &calc, AggregationSettings {
            range: IntegrationRange::Window { lower: -10.0, upper: -0.5 },
            ..Default::default()
        }).unwrap();
        let a = to_ref.bonds(&Cutoffs::Global(1.1), &[]).unwrap();
        let b = window.bonds(&Cutoffs::Global(1.1), &[]).unwrap();
        assert_close!(abs=1e-12, a.pairs[0].integrated.wohp.unwrap(), b.pairs[0].integrated.wohp.unwrap());

        match Aggregator::new(&registry, &calc, AggregationSettings {
            range: IntegrationRange::Window { lower: 1.0, upper: 0.0 },
            ..Default::default()
        }) {
            Err(AggregationError::InvertedWindow { .. }) => {},
            _ => panic!("expected an inverted window"),
        }
    }

    #[test]
    fn disconnected_pair() {
        let coords = Coords::new(
            Lattice::cubic(20.0),
            CoordsKind::Carts(vec![[0.0; 3], [10.0, 0.0, 0.0]]),
        );
        let h = RealSpaceHamiltonian::from_blocks(2, vec![
            ([0, 0, 0], Block::from_diagonal(&nalgebra::DVector::from_vec(vec![c(-1.0), c(1.0)]))),
        ]).unwrap();
        let model = Interpolator::default().accept(h, [1, 1, 1]).unwrap();
        let mesh = KMesh::gamma_centred([1, 1, 1]).unwrap();
        let state = SpectralEngine::default().solve(&model.hamiltonian, &mesh, mesh.uniform_weights()).unwrap();
        let registry = registry(coords, &["Na", "Cl"]);
        let calc = DescriptorCalculator::new(&model, &state, BondIndexSource::DensityMatrix, settings()).unwrap();

        let strict = Aggregator::new(&registry, &calc, AggregationSettings::default()).unwrap();
        let outcome = strict.explicit_pair("Na1", "Cl2").unwrap();
        assert_eq!(outcome, PairOutcome::NoInteraction { from: "Na1".to_string(), to: "Cl2".to_string() });
        assert_eq!(
            outcome.into_summary().unwrap_err(),
            AggregationError::NoInteraction { from: "Na1".to_string(), to: "Cl2".to_string() },
        );
        let report = strict.run(&BondSelection::Pairs(vec![("Na1".to_string(), "Cl2".to_string())]), &[]).unwrap();
        assert!(report.pairs.is_empty());
        assert_eq!(report.absent.len(), 1);

        let lenient = Aggregator::new(&registry, &calc, AggregationSettings {
            absence_as_zero: true,
            ..Default::default()
        }).unwrap();
        let summary = lenient.explicit_pair("Na1", "Cl2").unwrap().into_summary().unwrap();
        assert!(summary.orbital_pairs.is_empty());
        assert_eq!(summary.integrated.wohp, Some(0.0));
        assert!(summary.dos.values().iter().all(|&x| x == 0.0));

        // the lower orbital holds both electrons
        let valence = vec![("Na".to_string(), 1.0), ("Cl".to_string(), 1.0)].into_iter().collect();
        let atoms = lenient.atoms(&[], &valence).unwrap();
        assert_close!(abs=1e-12, atoms[0].population, 2.0);
        assert_close!(abs=1e-12, atoms[1].population, 0.0);
        assert_close!(abs=1e-12, atoms[0].charge.unwrap(), -1.0);
        assert_eq!(atoms[0].num_bonds, 0);
    }

    #[test]
    fn bwdf() {
        let (registry, model, state) = square();
        let calc = DescriptorCalculator::new(&model, &state, BondIndexSource::DensityMatrix, settings()).unwrap();
        let agg = Aggregator::new(&registry, &calc, AggregationSettings::default()).unwrap();
        let report = agg.bonds(&Cutoffs::Global(1.5), &[]).unwrap();
        // nearest and next-nearest neighbors
        assert_eq!(report.pairs.len(), 4);

        let bwdf = agg.bwdf(&report.pairs, 0.5, 2.0, 4).unwrap();
        assert_eq!(bwdf.edges.len(), 5);
        let series = &bwdf.series[&("H".to_string(), "H".to_string())];
        let nearest: f64 = report.pairs.iter()
            .filter(|p| p.length.unwrap() < 1.2)
            .map(|p| p.integrated.wohp.unwrap())
            .sum();
        assert_close!(abs=1e-12, series[1], nearest);
        // no hopping to next-nearest neighbors
        assert_close!(abs=1e-10, series[2], 0.0);
        assert_eq!(series[0], 0.0);

        let explicit = agg.explicit_pair("H1", "H1").unwrap().into_summary().unwrap();
        match agg.bwdf(&[explicit], 0.5, 2.0, 4) {
            Err(AggregationError::MissingLength { .. }) => {},
            r => panic!("unexpected: {:?}", r),
        }
    }
}
