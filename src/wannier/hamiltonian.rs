/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Dense matrices over orbitals, in real space (per translation) and k-space (per k-point).

use crate::errors::InterpolationError;
use crate::kmesh::{KMesh, mesh_aliases};

use nalgebra::DMatrix;
use num_complex::Complex64;

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub type Block = DMatrix<Complex64>;

/// Dense `n x n` blocks indexed by lattice translation.
///
/// Element `(i, j)` of the block at `R` couples orbital `i` of the home cell
/// with orbital `j` of cell `R`.  Translations missing from the map have zero
/// blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct RealSpaceMatrix {
    num_orbitals: usize,
    index: BTreeMap<[i32; 3], usize>,
    blocks: Vec<Block>,
}

/// The real-space Hamiltonian `H(R)`, in eV.
pub type RealSpaceHamiltonian = RealSpaceMatrix;

/// Location and size of the worst violation of `M(R) = M(-R)^H`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HermiticityReport {
    pub deviation: f64,
    pub translation: [i32; 3],
    pub i: usize,
    pub j: usize,
}

impl RealSpaceMatrix {
    pub fn new(num_orbitals: usize) -> Self
    { RealSpaceMatrix { num_orbitals, index: BTreeMap::new(), blocks: vec![] } }

    pub fn from_blocks(
        num_orbitals: usize,
        blocks: impl IntoIterator<Item=([i32; 3], Block)>,
    ) -> Result<Self, InterpolationError> {
        let mut out = Self::new(num_orbitals);
        for (translation, block) in blocks {
            out.insert(translation, block)?;
        }
        Ok(out)
    }

    pub fn insert(&mut self, translation: [i32; 3], block: Block) -> Result<(), InterpolationError> {
        if block.nrows() != self.num_orbitals || block.ncols() != self.num_orbitals {
            return Err(InterpolationError::BlockShape {
                index: self.blocks.len(),
                rows: block.nrows(),
                cols: block.ncols(),
                expected: self.num_orbitals,
            });
        }
        if self.index.contains_key(&translation) {
            return Err(InterpolationError::DuplicateTranslation { translation });
        }
        self.index.insert(translation, self.blocks.len());
        self.blocks.push(block);
        Ok(())
    }

    pub fn num_orbitals(&self) -> usize
    { self.num_orbitals }

    pub fn len(&self) -> usize
    { self.blocks.len() }

    pub fn is_empty(&self) -> bool
    { self.blocks.is_empty() }

    pub fn get(&self, translation: &[i32; 3]) -> Option<&Block>
    { self.index.get(translation).map(|&i| &self.blocks[i]) }

    /// Translations in sorted order.
    pub fn translations<'a>(&'a self) -> impl Iterator<Item=[i32; 3]> + 'a
    { self.index.keys().cloned() }

    /// `(R, block)` in sorted order of `R`.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item=([i32; 3], &'a Block)> + 'a
    { self.index.iter().map(move |(&r, &i)| (r, &self.blocks[i])) }

    pub fn element(&self, translation: &[i32; 3], i: usize, j: usize) -> Complex64 {
        self.get(translation)
            .map(|b| b[(i, j)])
            .unwrap_or_else(|| Complex64::new(0.0, 0.0))
    }

    /// Like [`RealSpaceMatrix::element`], but a translation that is absent
    /// takes the sum over its aliases in the box of `dims`, which is what a
    /// calculation on that mesh sees at `translation`.
    pub fn element_on_mesh(&self, translation: &[i32; 3], i: usize, j: usize, dims: [usize; 3]) -> Complex64 {
        match self.get(translation) {
            Some(b) => b[(i, j)],
            None => mesh_aliases(*translation, dims).iter().map(|r| self.element(r, i, j)).sum(),
        }
    }

    /// Number of distinct translation components along each direction.
    pub fn translation_counts(&self) -> [usize; 3] {
        [0, 1, 2].map(|a| {
            let mut values = self.index.keys().map(|r| r[a]).collect::<Vec<_>>();
            values.sort();
            values.dedup();
            values.len()
        })
    }

    /// Largest `|M(R)_ij - conj(M(-R)_ji)|`, where an absent `-R` counts as a zero block.
    pub fn hermiticity(&self) -> HermiticityReport {
        let zero = Block::zeros(self.num_orbitals, self.num_orbitals);
        let mut worst = HermiticityReport { deviation: 0.0, translation: [0; 3], i: 0, j: 0 };
        for (r, block) in self.iter() {
            let partner = self.get(&[-r[0], -r[1], -r[2]]).unwrap_or(&zero);

            for i in 0..self.num_orbitals {
                for j in 0..self.num_orbitals {
                    let deviation = (block[(i, j)] - partner[(j, i)].conj()).norm();
                    if deviation > worst.deviation {
                        worst = HermiticityReport { deviation, translation: r, i, j };
                    }
                }
            }
        }
        worst
    }

    /// Hash of the contents, used to key caches.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.num_orbitals.hash(&mut hasher);
        for (r, block) in self.iter() {
            r.hash(&mut hasher);
            hash_block(block, &mut hasher);
        }
        hasher.finish()
    }
}

fn hash_block(block: &Block, hasher: &mut impl Hasher) {
    for z in block.iter() {
        z.re.to_bits().hash(hasher);
        z.im.to_bits().hash(hasher);
    }
}

/// One `n x n` Hamiltonian block per point of a uniform mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct KSpaceHamiltonian {
    mesh: KMesh,
    blocks: Vec<Block>,
}

impl KSpaceHamiltonian {
    pub fn new(mesh: KMesh, blocks: Vec<Block>) -> Result<Self, InterpolationError> {
        if blocks.len() != mesh.len() {
            return Err(InterpolationError::BlockCountMismatch { expected: mesh.len(), found: blocks.len() });
        }
        let n = match blocks.first() {
            Some(b) => b.nrows(),
            None => return Err(InterpolationError::EmptyModel),
        };
        if n == 0 {
            return Err(InterpolationError::EmptyModel);
        }
        for (index, b) in blocks.iter().enumerate() {
            if b.nrows() != n || b.ncols() != n {
                return Err(InterpolationError::BlockShape { index, rows: b.nrows(), cols: b.ncols(), expected: n });
            }
        }
        Ok(KSpaceHamiltonian { mesh, blocks })
    }

    /// Build from an explicit list of k-points, which must form a uniform mesh.
    pub fn from_points(points: &[[f64; 3]], blocks: Vec<Block>) -> Result<Self, InterpolationError> {
        if points.len() != blocks.len() {
            return Err(InterpolationError::BlockCountMismatch { expected: points.len(), found: blocks.len() });
        }
        Self::new(KMesh::from_points(points)?, blocks)
    }

    pub fn mesh(&self) -> &KMesh
    { &self.mesh }

    pub fn blocks(&self) -> &[Block]
    { &self.blocks }

    pub fn num_orbitals(&self) -> usize
    { self.blocks[0].nrows() }

    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.mesh.dims().hash(&mut hasher);
        for (k, block) in self.mesh.points().iter().zip(&self.blocks) {
            for x in k {
                x.to_bits().hash(&mut hasher);
            }
            hash_block(block, &mut hasher);
        }
        hasher.finish()
    }
}
