/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */


mod shared;

use shared::c;
use wanbond::structure::AssignmentError;
use wanbond::wannier::{AggregationError, Block, InterpolationError, RealSpaceHamiltonian};
use wanbond::ModelInput;

const PAIRS: &str = "
reference-energy: 0.0
bonds:
  pairs:
    - [Na1, Cl2]
";

#[test]
fn absent_pair() {
    let report = shared::session(PAIRS).run(&shared::disconnected()).unwrap();
    assert!(report.pairs.is_empty());
    assert_eq!(report.absent, vec![("Na1".to_string(), "Cl2".to_string())]);

    let zero = shared::session(&format!("{}  absence-as-zero: true\n", PAIRS));
    let report = zero.run(&shared::disconnected()).unwrap();
    assert!(report.absent.is_empty());
    assert_eq!(report.pairs.len(), 1);
    let pair = &report.pairs[0];
    assert!(pair.orbital_pairs.is_empty());
    assert_eq!(pair.exact.wohp, Some(0.0));
    assert!(pair.wohp.as_ref().unwrap().values().iter().all(|&x| x == 0.0));
}

#[test]
fn unknown_atom() {
    let session = shared::session(&PAIRS.replace("Cl2", "Cl7"));
    let err = session.run(&shared::disconnected()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<AggregationError>(),
        Some(&AggregationError::UnknownAtom { atom: "Cl7".to_string() }),
    );
}

#[test]
fn mesh_mismatch() {
    let mut inputs = shared::dimer_chain();
    match &mut inputs.model {
        ModelInput::RealSpace { source_mesh, .. } => *source_mesh = [5, 1, 1],
        ModelInput::KSpace(_) => unreachable!(),
    }
    let err = shared::session(PAIRS).run(&inputs).unwrap_err();
    assert_eq!(
        err.downcast_ref::<InterpolationError>(),
        Some(&InterpolationError::MeshMismatch { mesh: [5, 1, 1], translations: [3, 1, 1] }),
    );
}

#[test]
fn not_hermitian() {
    let mut inputs = shared::diatomic();
    let h = Block::from_row_slice(2, 2, &[c(0.0), c(-1.0), c(-0.5), c(0.0)]);
    inputs.model = ModelInput::RealSpace {
        hamiltonian: RealSpaceHamiltonian::from_blocks(2, vec![([0, 0, 0], h)]).unwrap(),
        source_mesh: [1, 1, 1],
    };
    let err = shared::session(PAIRS).run(&inputs).unwrap_err();
    match err.downcast_ref::<InterpolationError>() {
        Some(&InterpolationError::HermiticityViolation { deviation, translation, .. }) => {
            assert!((deviation - 0.5).abs() < 1e-12);
            assert_eq!(translation, [0, 0, 0]);
        },
        other => panic!("unexpected: {:?} ({})", other, err),
    }
}

#[test]
fn stray_centre() {
    let mut inputs = shared::diatomic();
    inputs.centres[1] = [5.0, 5.0, 5.0];
    let err = shared::session(PAIRS).run(&inputs).unwrap_err();
    match err.downcast_ref::<AssignmentError>() {
        Some(&AssignmentError::NoAtomWithinTolerance { centre, tolerance, .. }) => {
            assert_eq!(centre, 1);
            assert_eq!(tolerance, 2.5);
        },
        other => panic!("unexpected: {:?} ({})", other, err),
    }
}
