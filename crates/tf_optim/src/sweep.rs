// crates/tf_optim/src/sweep.rs

//! 均匀摩擦扫描
//!
//! 对一组摩擦值分别求目标值，用于在优化前观察目标随摩擦的变化。
//! 各摩擦值并行评估，每个工作单元持有独立的农场副本、映射和评估器，
//! 工作单元之间不共享任何可变状态。

use rayon::prelude::*;
use tf_config::ControlSelection;
use tf_farm::{ControlMapping, FarmModel};
use tf_foundation::TfResult;
use tracing::debug;

use crate::evaluator::ObjectiveEvaluator;
use crate::simulation::Simulation;

/// 扫描中的一个点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    /// 统一摩擦值
    pub friction: f64,
    /// 目标值（未缩放）
    pub objective: f64,
}

/// 对每个摩擦值把所有设备（或场单元）设为该值并求目标
///
/// `make_simulation` 为每个工作单元创建独立的仿真后端。
pub fn friction_sweep<S, M>(
    farm: &FarmModel,
    frictions: &[f64],
    make_simulation: M,
) -> TfResult<Vec<SweepPoint>>
where
    S: Simulation,
    M: Fn() -> S + Sync,
{
    frictions
        .par_iter()
        .map(|&friction| -> TfResult<SweepPoint> {
            let mut local = farm.clone();
            local.set_uniform_friction(friction);
            let mapping = ControlMapping::build(&local, ControlSelection::Friction)?;
            let control = mapping.encode(&local)?;
            let mut evaluator = ObjectiveEvaluator::new(make_simulation(), local, mapping)?;
            let objective = evaluator.evaluate(&control, false)?.objective;
            debug!("扫描: f = {friction:.4e}, J = {objective:.8e}");
            Ok(SweepPoint { friction, objective })
        })
        .collect()
}
