// crates/tf_optim/tests/gradient_verification.rs

//! Taylor 检验集成测试
//!
//! 检验器通过 ReducedFunctional 对桩仿真和内置后端运行。

mod common;

use common::{discrete_farm, FrictionSquares};
use glam::DVec2;
use tf_config::{CacheConfig, ControlSelection, TaylorTestConfig};
use tf_farm::{ControlMapping, Device, FarmModel, FieldGrid, Footprint, Site, TurbineShape};
use tf_foundation::{ErrorKind, TfError};
use tf_optim::{
    FieldNormFunctional, GradientVerifier, ReducedFunctional, Simulation, TaylorVerdict,
    WakeSurrogate,
};

fn reduced<S: Simulation>(
    sim: S,
    farm: FarmModel,
    selection: ControlSelection,
    scaling: f64,
) -> ReducedFunctional<S> {
    let mapping = ControlMapping::build(&farm, selection).unwrap();
    ReducedFunctional::from_parts(sim, farm, mapping, scaling, CacheConfig::default()).unwrap()
}

fn assert_second_order(report: &tf_optim::TaylorReport) {
    assert_eq!(report.verdict, TaylorVerdict::Passed, "\n{report}");
    let min = report.min_rate.unwrap();
    assert!(min >= 1.9, "最小收敛率 {min}\n{report}");
}

// ============================================================
// 桩仿真
// ============================================================

#[test]
fn test_sum_of_squares_passes() {
    let farm = discrete_farm(
        &[([20.0, 50.0], 1.0), ([50.0, 50.0], 2.0), ([80.0, 50.0], 0.5)],
        10.0,
    );
    let mut rf = reduced(
        FrictionSquares { gradient_scale: 2.0 },
        farm,
        ControlSelection::Friction,
        1.0,
    );
    let m0 = rf.initial_vector().unwrap();
    let report = GradientVerifier::default().verify(&mut rf, &m0).unwrap();
    assert_second_order(&report);
    assert_eq!(report.steps.len(), 5);
    assert!(report.directional_derivative > 0.0);
    assert!(rf.consistency_warnings().is_empty());
}

#[test]
fn test_wrong_gradient_is_rejected() {
    let farm = discrete_farm(&[([30.0, 50.0], 1.0), ([70.0, 50.0], 2.0)], 10.0);
    let mut rf = reduced(
        FrictionSquares { gradient_scale: 1.0 },
        farm,
        ControlSelection::Friction,
        1.0,
    );
    let m0 = rf.initial_vector().unwrap();
    let verifier = GradientVerifier::default();

    let report = verifier.verify(&mut rf, &m0).unwrap();
    assert_eq!(report.verdict, TaylorVerdict::Failed);
    assert!(report.min_rate.unwrap() < 1.5);

    let err = verifier.check(&mut rf, &m0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Verification);
    assert!(matches!(err, TfError::GradientVerificationFailed { .. }));
}

#[test]
fn test_allow_failure_lets_wrong_gradient_through() {
    let farm = discrete_farm(&[([30.0, 50.0], 1.0), ([70.0, 50.0], 2.0)], 10.0);
    let mut rf = reduced(
        FrictionSquares { gradient_scale: 1.0 },
        farm,
        ControlSelection::Friction,
        1.0,
    );
    let m0 = rf.initial_vector().unwrap();
    let verifier =
        GradientVerifier::new(TaylorTestConfig { allow_failure: true, ..Default::default() })
            .unwrap();
    let report = verifier.check(&mut rf, &m0).unwrap();
    assert!(!report.passed());
}

// ============================================================
// 内置后端
// ============================================================

#[test]
fn test_wake_surrogate_discrete_passes() {
    let farm = discrete_farm(
        &[([30.0, 40.0], 2.0), ([55.0, 60.0], 1.0), ([75.0, 35.0], 3.0)],
        10.0,
    );
    let mut rf = reduced(
        WakeSurrogate::default(),
        farm,
        ControlSelection::FrictionAndPosition,
        -1.0,
    );
    let m0 = rf.initial_vector().unwrap();
    let report = GradientVerifier::default().verify(&mut rf, &m0).unwrap();
    assert_second_order(&report);
}

#[test]
fn test_wake_surrogate_continuous_passes() {
    let site = Site::rectangle(DVec2::ZERO, DVec2::new(100.0, 100.0)).unwrap();
    let grid = FieldGrid::covering(&site, 5, 5).unwrap();
    let farm = FarmModel::continuous(site, grid, 2.0, 20.0).unwrap();
    let mut rf = reduced(WakeSurrogate::default(), farm, ControlSelection::Friction, -1.0);
    let m0 = rf.initial_vector().unwrap();
    let report = GradientVerifier::default().verify(&mut rf, &m0).unwrap();
    assert_second_order(&report);
}

#[test]
fn test_field_norm_positions_pass() {
    let site = Site::rectangle(DVec2::ZERO, DVec2::new(100.0, 100.0)).unwrap();
    let farm = FarmModel::discrete(
        site,
        vec![
            Device::new(0, DVec2::new(35.0, 45.0), 2.0),
            Device::new(1, DVec2::new(62.0, 55.0), 1.5),
        ],
        Footprint::new(20.0, 20.0),
        TurbineShape::Gaussian,
    )
    .unwrap();
    let sim = FieldNormFunctional::for_farm(&farm, 40).unwrap();
    let mut rf = reduced(sim, farm, ControlSelection::FrictionAndPosition, 1.0);
    let m0 = rf.initial_vector().unwrap();
    let report = GradientVerifier::default().verify(&mut rf, &m0).unwrap();
    assert_second_order(&report);
}

// ============================================================
// 退化
// ============================================================

#[test]
fn test_zero_friction_positions_are_degenerate() {
    // 零摩擦时目标与位置无关，所有步长退化
    let farm = discrete_farm(&[([50.0, 50.0], 0.0)], 20.0);
    let mut rf = reduced(WakeSurrogate::default(), farm, ControlSelection::Position, -1.0);
    let m0 = rf.initial_vector().unwrap();
    let verifier = GradientVerifier::default();
    let report = verifier.verify(&mut rf, &m0).unwrap();
    assert_eq!(report.verdict, TaylorVerdict::Degenerate);
    assert!(report.steps.iter().all(|s| s.degenerate));
    assert!(matches!(
        verifier.check(&mut rf, &m0),
        Err(TfError::GradientVerificationDegenerate { steps: 5 })
    ));
}
