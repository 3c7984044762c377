// crates/tf_optim/src/evaluator.rs

//! ObjectiveEvaluator - 外部仿真的适配器
//!
//! 每次 [`ObjectiveEvaluator::evaluate`] 恰好触发一次前向求解，
//! 仅当请求梯度时再触发一次伴随求解。适配器本身不缓存，
//! 缓存由 [`ReducedFunctional`](crate::reduced::ReducedFunctional) 负责。

use tf_farm::{ControlMapping, FarmModel};
use tf_foundation::{Counter, TfError, TfResult};

use crate::simulation::Simulation;

/// 一次评估的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// 目标值（未缩放）
    pub objective: f64,
    /// 梯度（未缩放），仅在请求时给出
    pub gradient: Option<Vec<f64>>,
}

/// 目标评估器
pub struct ObjectiveEvaluator<S: Simulation> {
    simulation: S,
    farm: FarmModel,
    mapping: ControlMapping,
    forward_solves: Counter,
    adjoint_solves: Counter,
}

impl<S: Simulation> ObjectiveEvaluator<S> {
    /// 创建评估器
    ///
    /// 映射必须与农场形状一致，否则返回 ShapeMismatch。
    pub fn new(simulation: S, farm: FarmModel, mapping: ControlMapping) -> TfResult<Self> {
        mapping.encode(&farm)?;
        Ok(Self {
            simulation,
            farm,
            mapping,
            forward_solves: Counter::new(),
            adjoint_solves: Counter::new(),
        })
    }

    /// 在控制向量处求值
    pub fn evaluate(&mut self, control: &[f64], want_gradient: bool) -> TfResult<Evaluation> {
        self.mapping.decode(control, &mut self.farm)?;

        self.forward_solves.inc();
        let objective = self
            .simulation
            .forward(&self.farm)
            .map_err(|e| e.into_tf(control))?;
        if !objective.is_finite() {
            return Err(TfError::diverged(
                format!("{} 返回非有限目标值 {objective}", self.simulation.name()),
                control,
            ));
        }

        let gradient = if want_gradient {
            self.adjoint_solves.inc();
            let g = self
                .simulation
                .adjoint(&self.farm, &self.mapping)
                .map_err(|e| e.into_tf(control))?;
            if g.len() != self.mapping.len() {
                return Err(TfError::shape_mismatch("gradient", self.mapping.len(), g.len()));
            }
            if g.iter().any(|v| !v.is_finite()) {
                return Err(TfError::diverged(
                    format!("{} 返回非有限梯度", self.simulation.name()),
                    control,
                ));
            }
            Some(g)
        } else {
            None
        };

        Ok(Evaluation { objective, gradient })
    }

    /// 外部前向求解次数
    pub fn forward_solves(&self) -> u64 {
        self.forward_solves.get()
    }

    /// 外部伴随求解次数
    pub fn adjoint_solves(&self) -> u64 {
        self.adjoint_solves.get()
    }

    /// 农场（最近一次评估写回的状态）
    pub fn farm(&self) -> &FarmModel {
        &self.farm
    }

    /// 可变农场
    pub fn farm_mut(&mut self) -> &mut FarmModel {
        &mut self.farm
    }

    /// 控制映射
    pub fn mapping(&self) -> &ControlMapping {
        &self.mapping
    }

    /// 仿真后端
    pub fn simulation(&self) -> &S {
        &self.simulation
    }

    /// 拆出农场
    pub fn into_farm(self) -> FarmModel {
        self.farm
    }
}
