// crates/tf_optim/tests/reduced_functional.rs

//! 约化泛函集成测试
//!
//! 缓存计数、value → gradient 一致性、零摩擦基准。

mod common;

use common::{discrete_farm, FrictionSquares};
use glam::DVec2;
use tf_config::{CacheConfig, ControlSelection};
use tf_farm::{ControlMapping, FarmModel, Footprint, TurbineShape};
use tf_optim::{CacheState, FieldNormFunctional, ReducedFunctional, Simulation, WakeSurrogate};

fn friction_rf(farm: FarmModel) -> ReducedFunctional<FrictionSquares> {
    let mapping = ControlMapping::build(&farm, ControlSelection::Friction).unwrap();
    ReducedFunctional::from_parts(
        FrictionSquares { gradient_scale: 2.0 },
        farm,
        mapping,
        1.0,
        CacheConfig::default(),
    )
    .unwrap()
}

// ============================================================
// 缓存
// ============================================================

#[test]
fn test_value_twice_solves_once() {
    let farm = discrete_farm(&[([30.0, 50.0], 1.0), ([70.0, 50.0], 2.0)], 10.0);
    let mut rf = friction_rf(farm);
    let v = rf.initial_vector().unwrap();

    let a = rf.value(&v).unwrap();
    let b = rf.value(&v).unwrap();
    assert_eq!(a, b);
    assert_eq!(rf.evaluator().forward_solves(), 1);
    assert_eq!(rf.evaluator().adjoint_solves(), 0);
}

#[test]
fn test_value_then_gradient_is_consistent() {
    let farm = discrete_farm(&[([30.0, 50.0], 1.5), ([70.0, 50.0], 0.5)], 10.0);
    let mut rf = friction_rf(farm);
    let v = rf.initial_vector().unwrap();

    let cached = rf.value(&v).unwrap();
    let g = rf.gradient(&v).unwrap();
    assert_eq!(g, vec![3.0, 1.0]);

    // 梯度路径重算的目标值与先前缓存值一致，没有一致性警告
    let after = rf.cached_value(&v).unwrap();
    assert!((after - cached).abs() < 1e-12);
    assert!(rf.consistency_warnings().is_empty());
    assert_eq!(rf.cache_state(&v), Some(CacheState::ValueAndGradient));
    // value-only 条目不能当作梯度复用：多做了一次前向和一次伴随
    assert_eq!(rf.evaluator().forward_solves(), 2);
    assert_eq!(rf.evaluator().adjoint_solves(), 1);
}

#[test]
fn test_distinct_vectors_are_distinct_entries() {
    let farm = discrete_farm(&[([50.0, 50.0], 1.0)], 10.0);
    let mut rf = friction_rf(farm);
    for f in [1.0, 2.0, 3.0, 2.0, 1.0] {
        rf.value(&[f]).unwrap();
    }
    let stats = rf.cache_stats();
    assert_eq!(stats.entries, 3);
    assert_eq!(stats.hits, 2);
    assert_eq!(rf.evaluator().forward_solves(), 3);
}

#[test]
fn test_tolerant_cache_reuses_nearby_vectors() {
    let farm = discrete_farm(&[([50.0, 50.0], 1.0)], 10.0);
    let mapping = ControlMapping::build(&farm, ControlSelection::Friction).unwrap();
    let cache = CacheConfig { key_tolerance: Some(1e-8), ..CacheConfig::default() };
    let mut rf = ReducedFunctional::from_parts(
        FrictionSquares { gradient_scale: 2.0 },
        farm,
        mapping,
        1.0,
        cache,
    )
    .unwrap();
    rf.gradient(&[1.0]).unwrap();
    rf.gradient(&[1.0 + 1e-10]).unwrap();
    assert_eq!(rf.evaluator().adjoint_solves(), 1);
}

// ============================================================
// 零摩擦基准
// ============================================================

#[test]
fn test_zero_friction_matches_empty_farm() {
    let one = discrete_farm(&[([50.0, 50.0], 0.0)], 20.0);
    let empty = FarmModel::discrete(
        common::square_site(),
        Vec::new(),
        Footprint::new(20.0, 20.0),
        TurbineShape::Bump,
    )
    .unwrap();

    let mut wake = WakeSurrogate::default();
    let with_device = wake.forward(&one).unwrap();
    let without = wake.forward(&empty).unwrap();
    assert!(with_device.abs() < 1e-12);
    assert!((with_device - without).abs() < 1e-12);

    let mut norm = FieldNormFunctional::for_farm(&one, 25).unwrap();
    assert!(norm.forward(&one).unwrap().abs() < 1e-12);
}

#[test]
fn test_zero_friction_through_reduced_functional() {
    let farm = discrete_farm(&[([50.0, 50.0], 0.0)], 20.0);
    let mapping = ControlMapping::build(&farm, ControlSelection::FrictionAndPosition).unwrap();
    let mut rf = ReducedFunctional::from_parts(
        WakeSurrogate::default(),
        farm,
        mapping,
        -1.0,
        CacheConfig::default(),
    )
    .unwrap();
    let v = rf.initial_vector().unwrap();
    assert_eq!(v, vec![0.0, 50.0, 50.0]);
    assert!(rf.value(&v).unwrap().abs() < 1e-12);
    // 位置导数在零摩擦时为零
    let g = rf.gradient(&v).unwrap();
    assert!(g[1].abs() < 1e-12 && g[2].abs() < 1e-12);
    assert_eq!(rf.farm().devices()[0].position, DVec2::new(50.0, 50.0));
}
