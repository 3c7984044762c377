// crates/tf_optim/src/solver.rs

//! 约束优化求解器
//!
//! [`Solver`] 是外部数值方法的接口：它只通过 [`Functional`] 取目标与梯度，
//! 并遵守给定的盒约束与不等式约束。
//!
//! 内置的 [`ProjectedGradientSolver`] 使用：
//!
//! - 投影梯度 + Armijo 回溯线搜索处理盒约束，每个迭代点都在盒内
//! - 外层二次罚函数处理不等式约束：
//!   `φ(x) = J(x) + μ/2 Σ min(0, c_k(x))²`，罚参数逐轮放大直到可行

use tf_config::DriverConfig;
use tf_foundation::vector::{dot, norm_inf};
use tf_foundation::{TfError, TfResult};
use tracing::debug;

use crate::constraints::{BoxBounds, InequalityConstraint};
use crate::functional::Functional;

/// Armijo 充分下降系数
const ARMIJO_C1: f64 = 1e-4;
/// 单次迭代最多回溯次数
const MAX_BACKTRACK: usize = 40;

/// 求解状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// 收敛
    Converged,
    /// 达到最大迭代次数
    MaxIterationsReached,
    /// 线搜索无法继续下降
    Stagnated,
    /// 罚循环结束时约束违反量仍超过可行性容差
    Infeasible,
}

/// 求解结果
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    /// 最优控制向量
    pub x: Vec<f64>,
    /// 最优处的目标值（不含罚项）
    pub value: f64,
    /// 迭代次数
    pub iterations: usize,
    /// 状态
    pub status: SolverStatus,
    /// 不等式约束的最大违反量
    pub max_violation: f64,
}

/// 约束优化求解器
pub trait Solver {
    /// 求解器名称
    fn name(&self) -> &'static str;

    /// 从 `x0` 出发最小化 `f`
    fn minimize<F: Functional + ?Sized>(
        &mut self,
        f: &mut F,
        x0: &[f64],
        bounds: &BoxBounds,
        constraints: &[&dyn InequalityConstraint],
    ) -> TfResult<SolverOutcome>;
}

/// 投影梯度 + 二次罚函数求解器
#[derive(Debug, Clone)]
pub struct ProjectedGradientSolver {
    config: DriverConfig,
}

impl ProjectedGradientSolver {
    /// 创建求解器
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }
}

impl Default for ProjectedGradientSolver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

/// 罚函数值与梯度
struct Penalized<'a, F: ?Sized> {
    f: &'a mut F,
    constraints: &'a [&'a dyn InequalityConstraint],
    mu: f64,
}

impl<F: Functional + ?Sized> Penalized<'_, F> {
    /// 返回 (φ, J)
    fn value(&mut self, x: &[f64]) -> TfResult<(f64, f64)> {
        let j = self.f.value(x)?;
        let penalty: f64 = self
            .constraints
            .iter()
            .flat_map(|c| c.values(x))
            .map(|c| c.min(0.0).powi(2))
            .sum();
        Ok((j + 0.5 * self.mu * penalty, j))
    }

    fn gradient(&mut self, x: &[f64]) -> TfResult<Vec<f64>> {
        let mut g = self.f.gradient(x)?;
        for c in self.constraints {
            let w: Vec<f64> = c.values(x).iter().map(|v| self.mu * v.min(0.0)).collect();
            if w.iter().all(|&v| v == 0.0) {
                continue;
            }
            for (gi, ji) in g.iter_mut().zip(c.jacobian_transpose_vector(x, &w)) {
                *gi += ji;
            }
        }
        Ok(g)
    }
}

fn max_violation(constraints: &[&dyn InequalityConstraint], x: &[f64]) -> f64 {
    constraints
        .iter()
        .map(|c| c.max_violation(x))
        .fold(0.0, f64::max)
}

impl ProjectedGradientSolver {
    /// 固定罚参数下的内层投影梯度迭代
    ///
    /// 返回内层是否收敛；`iterations` 为全局迭代计数。
    fn inner<F: Functional + ?Sized>(
        &self,
        phi: &mut Penalized<'_, F>,
        x: &mut Vec<f64>,
        bounds: &BoxBounds,
        iterations: &mut usize,
    ) -> TfResult<SolverStatus> {
        let (mut phi_x, _) = phi.value(x)?;
        let mut grad = phi.gradient(x)?;
        let mut alpha = 1.0 / norm_inf(&grad).max(1.0);
        let mut trial = vec![0.0; x.len()];
        let mut step = vec![0.0; x.len()];

        loop {
            // 投影梯度 x - P(x - g)
            for i in 0..x.len() {
                trial[i] = x[i] - grad[i];
            }
            bounds.project(&mut trial);
            let pg = x.iter().zip(&trial).fold(0.0_f64, |m, (a, b)| m.max((a - b).abs()));
            if pg <= self.config.tolerance {
                return Ok(SolverStatus::Converged);
            }
            if *iterations >= self.config.max_iterations {
                return Ok(SolverStatus::MaxIterationsReached);
            }

            let mut accepted = None;
            for _ in 0..MAX_BACKTRACK {
                for i in 0..x.len() {
                    trial[i] = x[i] - alpha * grad[i];
                }
                bounds.project(&mut trial);
                for i in 0..x.len() {
                    step[i] = trial[i] - x[i];
                }
                if norm_inf(&step) == 0.0 {
                    break;
                }
                let (phi_new, j_new) = phi.value(&trial)?;
                if phi_new <= phi_x + ARMIJO_C1 * dot(&grad, &step) {
                    accepted = Some((phi_new, j_new));
                    break;
                }
                alpha *= 0.5;
            }
            let Some((phi_new, j_new)) = accepted else {
                return Ok(SolverStatus::Stagnated);
            };

            std::mem::swap(x, &mut trial);
            *iterations += 1;
            phi.f.on_iteration(*iterations, x, j_new);

            let decrease = phi_x - phi_new;
            phi_x = phi_new;
            if decrease <= self.config.tolerance * phi_x.abs().max(1.0) {
                return Ok(SolverStatus::Converged);
            }
            grad = phi.gradient(x)?;
            alpha *= 2.0;
        }
    }
}

impl Solver for ProjectedGradientSolver {
    fn name(&self) -> &'static str {
        "projected_gradient"
    }

    fn minimize<F: Functional + ?Sized>(
        &mut self,
        f: &mut F,
        x0: &[f64],
        bounds: &BoxBounds,
        constraints: &[&dyn InequalityConstraint],
    ) -> TfResult<SolverOutcome> {
        if x0.len() != f.len() {
            return Err(TfError::shape_mismatch("control", f.len(), x0.len()));
        }
        if bounds.len() != x0.len() {
            return Err(TfError::shape_mismatch("bounds", x0.len(), bounds.len()));
        }

        let mut x = x0.to_vec();
        bounds.project(&mut x);
        let mut iterations = 0;
        let mut status = SolverStatus::Converged;
        let mut phi = Penalized { f, constraints, mu: self.config.penalty_initial };

        for outer in 0..self.config.max_outer {
            status = self.inner(&mut phi, &mut x, bounds, &mut iterations)?;
            let violation = max_violation(constraints, &x);
            debug!(
                "罚循环 {outer}: μ={:.3e} 违反量={violation:.3e} 累计迭代={iterations} 状态={status:?}",
                phi.mu
            );
            if violation <= self.config.feasibility_tolerance
                || status == SolverStatus::MaxIterationsReached
            {
                break;
            }
            phi.mu *= self.config.penalty_growth;
        }

        let violation = max_violation(constraints, &x);
        if violation > self.config.feasibility_tolerance {
            debug!(
                "罚循环结束仍不可行: 违反量 {violation:.3e} > {:.3e}",
                self.config.feasibility_tolerance
            );
            status = SolverStatus::Infeasible;
        }
        let value = phi.f.value(&x)?;
        Ok(SolverOutcome {
            max_violation: violation,
            x,
            value,
            iterations,
            status,
        })
    }
}
