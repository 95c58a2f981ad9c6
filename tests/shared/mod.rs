/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

// Each test binary uses a different subset of these.
#![allow(dead_code)]

use num_complex::Complex64;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use std::collections::BTreeMap;

use wanbond::structure::{Coords, CoordsKind, FracOp, Lattice};
use wanbond::wannier::{
    Block, KMesh, KSpaceHamiltonian, RealSpaceHamiltonian, hamiltonian_at_k, mesh_translations,
    translation_weight,
};
use wanbond::{Inputs, ModelInput, Session, ValidatedSettings, YamlRead};

pub fn c(re: f64) -> Complex64
{ Complex64::new(re, 0.0) }

pub const BASE_SETTINGS: &str = "
version: 1
threading: serial
energy-grid:
  range: [-4.0, 4.0]
  step: 0.002
broadening:
  gaussian:
    width: 0.05
";

/// [`BASE_SETTINGS`] followed by more YAML.
pub fn settings(extra: &str) -> ValidatedSettings {
    let yaml = format!("{}{}", BASE_SETTINGS, extra);
    ValidatedSettings::from_reader(yaml.as_bytes()).unwrap()
}

pub fn session(extra: &str) -> Session
{ Session::new(settings(extra)) }

fn inputs(
    lattice: Lattice,
    carts: Vec<[f64; 3]>,
    species: &[&str],
    blocks: Vec<([i32; 3], Block)>,
    source_mesh: [usize; 3],
) -> Inputs {
    let num_orbitals = blocks[0].1.nrows();
    let hamiltonian = RealSpaceHamiltonian::from_blocks(num_orbitals, blocks).unwrap();
    Inputs::new(
        Coords::new(lattice, CoordsKind::Carts(carts.clone())),
        species.iter().map(|s| s.to_string()).collect(),
        carts,
        ModelInput::RealSpace { hamiltonian, source_mesh },
    )
}

/// Two atoms 1 Å apart in a large box, one orbital each, coupled by -1 eV.
///
/// The levels are -1 (bonding) and +1 (antibonding) at every k.
pub fn diatomic() -> Inputs {
    let h = Block::from_row_slice(2, 2, &[c(0.0), c(-1.0), c(-1.0), c(0.0)]);
    inputs(
        Lattice::cubic(10.0),
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
        &["H", "H"],
        vec![([0, 0, 0], h)],
        [1, 1, 1],
    )
}

/// Like [`diatomic`], but nothing couples the two atoms.
pub fn disconnected() -> Inputs {
    let h = Block::from_row_slice(2, 2, &[c(-1.0), c(0.0), c(0.0), c(1.0)]);
    inputs(
        Lattice::cubic(10.0),
        vec![[0.0, 0.0, 0.0], [2.8, 0.0, 0.0]],
        &["Na", "Cl"],
        vec![([0, 0, 0], h)],
        [1, 1, 1],
    )
}

/// A dimerized chain along x: atoms `A` at 0 and `B` at 1 Å in a 2 Å cell, with
/// hopping -1 eV inside the cell, -0.5 eV between cells and on-site energies of
/// +-0.2 eV.
///
/// The bands are gapped around 0 eV.
pub fn dimer_chain() -> Inputs {
    let onsite = Block::from_row_slice(2, 2, &[c(0.2), c(-1.0), c(-1.0), c(-0.2)]);
    // B of the cell at -1 couples to A of the home cell
    let back = Block::from_row_slice(2, 2, &[c(0.0), c(-0.5), c(0.0), c(0.0)]);
    let forward = back.adjoint();
    inputs(
        Lattice::orthorhombic(2.0, 10.0, 10.0),
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
        &["A", "B"],
        vec![([0, 0, 0], onsite), ([-1, 0, 0], back), ([1, 0, 0], forward)],
        [3, 1, 1],
    )
}

/// One s orbital per site of a 1 Å square lattice, nearest-neighbour hopping -1 eV.
pub fn square() -> Inputs {
    let one = |x: f64| Block::from_element(1, 1, c(x));
    inputs(
        Lattice::orthorhombic(1.0, 1.0, 10.0),
        vec![[0.0; 3]],
        &["H"],
        vec![
            ([0, 0, 0], one(0.0)),
            ([1, 0, 0], one(-1.0)),
            ([-1, 0, 0], one(-1.0)),
            ([0, 1, 0], one(-1.0)),
            ([0, -1, 0], one(-1.0)),
        ],
        [3, 3, 1],
    )
}

/// The point group of the square lattice.
pub fn square_ops() -> Vec<FracOp> {
    let mut ops = vec![];
    for &(a, b) in &[(1, 0), (0, 1), (-1, 0), (0, -1)] {
        for &mirror in &[1, -1] {
            let rot = [[a, -b * mirror, 0], [b, a * mirror, 0], [0, 0, 1]];
            ops.push(FracOp::from_parts(&rot, &[0.0; 3]).unwrap());
        }
    }
    ops
}

/// A random Hermitian model whose translations are exactly those resolved by `dims`,
/// and its samples on the Gamma-centred mesh.
///
/// On an even dimension the translations `+N/2` and `-N/2` carry halves of one
/// block, the way interpolation produces them.
pub fn random_model(seed: u64, num_orbitals: usize, dims: [usize; 3]) -> (RealSpaceHamiltonian, KSpaceHamiltonian) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut random_block = || Block::from_fn(num_orbitals, num_orbitals, |_, _| {
        Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
    });

    // translations that are one point of the mesh share a key
    let key = |r: [i32; 3]| {
        let mut out = r;
        for a in 0..3 {
            if dims[a] % 2 == 0 && r[a].abs() == (dims[a] / 2) as i32 {
                out[a] = r[a].abs();
            }
        }
        out
    };

    let mut classes: BTreeMap<[i32; 3], Block> = BTreeMap::new();
    for r in mesh_translations(dims) {
        let (plus, minus) = (key(r), key([-r[0], -r[1], -r[2]]));
        if classes.contains_key(&plus) {
            continue;
        }
        let m = random_block();
        if plus == minus {
            classes.insert(plus, (&m + m.adjoint()) * c(0.5));
        } else {
            classes.insert(minus, m.adjoint());
            classes.insert(plus, m);
        }
    }
    let blocks: Vec<_> = mesh_translations(dims).into_iter()
        .map(|r| (r, &classes[&key(r)] * c(translation_weight(&r, dims))))
        .collect();
    let real = RealSpaceHamiltonian::from_blocks(num_orbitals, blocks).unwrap();

    let mesh = KMesh::gamma_centred(dims).unwrap();
    let samples = mesh.points().iter().map(|k| hamiltonian_at_k(&real, k)).collect();
    let kspace = KSpaceHamiltonian::new(mesh, samples).unwrap();
    (real, kspace)
}
