// crates/tf_optim/src/reduced.rs

//! ReducedFunctional - 带缓存的约化泛函
//!
//! 以控制向量为键缓存评估结果。每个键的状态：
//!
//! ```text
//! Unevaluated ──value()──> ValueOnly ──gradient()──> ValueAndGradient
//!      └──────────────────gradient()──────────────────────┘
//! ```
//!
//! `gradient()` 在 ValueOnly 状态下会重新做一次前向求解再做伴随求解，
//! 并把重算的目标值与缓存值比较；超出容差记一条一致性警告，运行继续。
//!
//! 缓存保存未缩放的值，`scaling_factor` 在返回时同时乘到目标和梯度上。
//! 条目在一次运行内不淘汰。

use std::collections::HashMap;

use tf_config::CacheConfig;
use tf_farm::{ControlMapping, FarmModel};
use tf_foundation::vector::max_abs_diff;
use tf_foundation::{Counter, TfError, TfResult};
use tracing::{trace, warn};

use crate::evaluator::ObjectiveEvaluator;
use crate::functional::Functional;
use crate::simulation::Simulation;

/// 缓存条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CacheState {
    /// 仅有目标值
    ValueOnly,
    /// 目标值与梯度
    ValueAndGradient,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    key: Vec<f64>,
    state: CacheState,
    objective: f64,
    gradient: Option<Vec<f64>>,
}

/// 一致性警告：梯度路径重算的目标值与缓存值不一致
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyWarning {
    /// 控制向量
    pub control: Vec<f64>,
    /// 缓存的目标值（未缩放）
    pub cached: f64,
    /// 重算的目标值（未缩放）
    pub recomputed: f64,
}

/// 缓存统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// 命中次数
    pub hits: u64,
    /// 未命中次数
    pub misses: u64,
    /// 条目数
    pub entries: usize,
}

/// 约化泛函
pub struct ReducedFunctional<S: Simulation> {
    evaluator: ObjectiveEvaluator<S>,
    scaling_factor: f64,
    config: CacheConfig,
    entries: Vec<CacheEntry>,
    // 位级精确键 -> entries 下标
    exact_index: HashMap<Vec<u64>, usize>,
    warnings: Vec<ConsistencyWarning>,
    hits: Counter,
    misses: Counter,
}

fn bit_key(control: &[f64]) -> Vec<u64> {
    control.iter().map(|v| v.to_bits()).collect()
}

impl<S: Simulation> ReducedFunctional<S> {
    /// 创建约化泛函
    pub fn new(
        evaluator: ObjectiveEvaluator<S>,
        scaling_factor: f64,
        config: CacheConfig,
    ) -> TfResult<Self> {
        if !scaling_factor.is_finite() || scaling_factor == 0.0 {
            return Err(TfError::invalid_config(
                "scaling_factor",
                scaling_factor,
                "必须为非零有限值",
            ));
        }
        config.validate()?;
        Ok(Self {
            evaluator,
            scaling_factor,
            config,
            entries: Vec::new(),
            exact_index: HashMap::new(),
            warnings: Vec::new(),
            hits: Counter::new(),
            misses: Counter::new(),
        })
    }

    /// 由仿真、农场与映射直接构建
    pub fn from_parts(
        simulation: S,
        farm: FarmModel,
        mapping: ControlMapping,
        scaling_factor: f64,
        config: CacheConfig,
    ) -> TfResult<Self> {
        let evaluator = ObjectiveEvaluator::new(simulation, farm, mapping)?;
        Self::new(evaluator, scaling_factor, config)
    }

    fn check_len(&self, control: &[f64]) -> TfResult<()> {
        let n = self.evaluator.mapping().len();
        if control.len() != n {
            return Err(TfError::shape_mismatch("control", n, control.len()));
        }
        Ok(())
    }

    fn lookup(&self, control: &[f64]) -> Option<usize> {
        match self.config.key_tolerance {
            None => self.exact_index.get(&bit_key(control)).copied(),
            Some(tol) => self
                .entries
                .iter()
                .rposition(|e| max_abs_diff(&e.key, control) <= tol),
        }
    }

    fn insert(&mut self, entry: CacheEntry) {
        if self.config.key_tolerance.is_none() {
            self.exact_index.insert(bit_key(&entry.key), self.entries.len());
        }
        self.entries.push(entry);
    }

    /// 目标值（已缩放）
    pub fn value(&mut self, control: &[f64]) -> TfResult<f64> {
        self.check_len(control)?;
        if let Some(i) = self.lookup(control) {
            self.hits.inc();
            trace!("缓存命中: value");
            return Ok(self.scaling_factor * self.entries[i].objective);
        }
        self.misses.inc();
        let eval = self.evaluator.evaluate(control, false)?;
        self.insert(CacheEntry {
            key: control.to_vec(),
            state: CacheState::ValueOnly,
            objective: eval.objective,
            gradient: None,
        });
        Ok(self.scaling_factor * eval.objective)
    }

    /// 梯度（已缩放）
    pub fn gradient(&mut self, control: &[f64]) -> TfResult<Vec<f64>> {
        self.check_len(control)?;
        let existing = self.lookup(control);
        if let Some(i) = existing {
            if let (CacheState::ValueAndGradient, Some(g)) =
                (self.entries[i].state, &self.entries[i].gradient)
            {
                self.hits.inc();
                trace!("缓存命中: gradient");
                return Ok(g.iter().map(|v| self.scaling_factor * v).collect());
            }
        }
        self.misses.inc();
        let eval = self.evaluator.evaluate(control, true)?;
        let gradient = eval
            .gradient
            .ok_or_else(|| TfError::internal("评估器未返回梯度"))?;
        let scaled = gradient.iter().map(|v| self.scaling_factor * v).collect();

        match existing {
            Some(i) => {
                let cached = self.entries[i].objective;
                let tol = self.config.consistency_tolerance * cached.abs().max(1.0);
                if (eval.objective - cached).abs() > tol {
                    warn!(
                        "一致性警告: 缓存目标值 {cached:.12e} 与梯度路径重算值 {:.12e} 不一致",
                        eval.objective
                    );
                    self.warnings.push(ConsistencyWarning {
                        control: control.to_vec(),
                        cached,
                        recomputed: eval.objective,
                    });
                }
                let entry = &mut self.entries[i];
                entry.state = CacheState::ValueAndGradient;
                entry.objective = eval.objective;
                entry.gradient = Some(gradient);
            }
            None => self.insert(CacheEntry {
                key: control.to_vec(),
                state: CacheState::ValueAndGradient,
                objective: eval.objective,
                gradient: Some(gradient),
            }),
        }
        Ok(scaled)
    }

    /// 缓存中的目标值（已缩放），未评估时为 None
    pub fn cached_value(&self, control: &[f64]) -> Option<f64> {
        self.lookup(control)
            .map(|i| self.scaling_factor * self.entries[i].objective)
    }

    /// 某个键的缓存状态
    pub fn cache_state(&self, control: &[f64]) -> Option<CacheState> {
        self.lookup(control).map(|i| self.entries[i].state)
    }

    /// 优化起点：当前农场状态的编码
    pub fn initial_vector(&self) -> TfResult<Vec<f64>> {
        self.evaluator.mapping().encode(self.evaluator.farm())
    }

    /// 把控制向量写回农场（不求解）
    pub fn apply(&mut self, control: &[f64]) -> TfResult<()> {
        let mapping = self.evaluator.mapping().clone();
        mapping.decode(control, self.evaluator.farm_mut())
    }

    /// 缩放因子
    pub fn scaling_factor(&self) -> f64 {
        self.scaling_factor
    }

    /// 已记录的一致性警告
    pub fn consistency_warnings(&self) -> &[ConsistencyWarning] {
        &self.warnings
    }

    /// 缓存统计
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            entries: self.entries.len(),
        }
    }

    /// 取出命中/未命中计数并归零，缓存条目保留
    pub fn take_cache_stats(&mut self) -> CacheStats {
        CacheStats {
            hits: self.hits.take(),
            misses: self.misses.take(),
            entries: self.entries.len(),
        }
    }

    /// 评估器
    pub fn evaluator(&self) -> &ObjectiveEvaluator<S> {
        &self.evaluator
    }

    /// 农场
    pub fn farm(&self) -> &FarmModel {
        self.evaluator.farm()
    }

    /// 可变农场
    pub fn farm_mut(&mut self) -> &mut FarmModel {
        self.evaluator.farm_mut()
    }

    /// 控制映射
    pub fn mapping(&self) -> &ControlMapping {
        self.evaluator.mapping()
    }

    /// 拆出农场
    pub fn into_farm(self) -> FarmModel {
        self.evaluator.into_farm()
    }
}

impl<S: Simulation> Functional for ReducedFunctional<S> {
    fn len(&self) -> usize {
        self.evaluator.mapping().len()
    }

    fn value(&mut self, control: &[f64]) -> TfResult<f64> {
        ReducedFunctional::value(self, control)
    }

    fn gradient(&mut self, control: &[f64]) -> TfResult<Vec<f64>> {
        ReducedFunctional::gradient(self, control)
    }
}
