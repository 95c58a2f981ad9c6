/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */


#[macro_use] extern crate wanbond_assert_close;

mod shared;

use wanbond::wannier::WeightError;

const SETTINGS: &str = "
kmesh: [12, 1, 1]
reference-energy: 0.0
bonds:
  r-max: 1.1
";

fn iwohps(report: &wanbond::BondingReport) -> Vec<f64> {
    let mut out = report.pairs.iter().map(|p| p.integrated.wohp.unwrap()).collect::<Vec<_>>();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap());
    out
}

#[test]
fn explicit_uniform_weights() {
    let implicit = shared::session(SETTINGS).run(&shared::dimer_chain()).unwrap();

    let mut inputs = shared::dimer_chain();
    inputs.kweights = Some(vec![1.0 / 12.0; 12]);
    let explicit = shared::session(SETTINGS).run(&inputs).unwrap();

    for (a, b) in iwohps(&implicit).into_iter().zip(iwohps(&explicit)) {
        assert_close!(rel=1e-12, a, b);
    }
    assert_close!(rel=1e-12, implicit.integrated_energy, explicit.integrated_energy);
}

#[test]
fn bad_weights() {
    let session = shared::session(SETTINGS);

    let mut inputs = shared::dimer_chain();
    inputs.kweights = Some(vec![0.1; 12]);
    let err = session.run(&inputs).unwrap_err();
    match err.downcast_ref::<WeightError>() {
        Some(WeightError::BadSum { sum, .. }) => assert_close!(*sum, 1.2),
        other => panic!("unexpected: {:?} ({})", other, err),
    }

    inputs.kweights = Some(vec![0.25; 4]);
    let err = session.run(&inputs).unwrap_err();
    assert_eq!(
        err.downcast_ref::<WeightError>(),
        Some(&WeightError::WrongLength { expected: 12, found: 4 }),
    );
}

#[test]
fn denser_mesh_agrees() {
    let coarse = shared::session(&SETTINGS.replace("12", "6")).run(&shared::dimer_chain()).unwrap();
    let dense = shared::session(SETTINGS).run(&shared::dimer_chain()).unwrap();
    assert_eq!(coarse.diagnostics.kmesh, [6, 1, 1]);
    assert_eq!(dense.diagnostics.kmesh, [12, 1, 1]);

    // the chain is gapped, so both meshes are close to converged
    for (a, b) in iwohps(&coarse).into_iter().zip(iwohps(&dense)) {
        assert!(a > 0.0 && b > 0.0);
        assert_close!(rel=1e-2, a, b);
    }
}
