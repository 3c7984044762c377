// crates/tf_optim/src/driver.rs

//! OptimizationDriver - 优化运行驱动
//!
//! 一次运行的步骤：
//!
//! 1. 取农场当前状态的编码作为起点
//! 2. 在起点做 Taylor 检验；未通过时终止，除非配置显式放行（记录警告）
//! 3. 把约化泛函、盒约束和不等式约束交给求解器
//! 4. 把最优向量解码回农场，连续农场再把场址外的值清零
//! 5. 校验设备仍在场址多边形内，并在最终控制向量处重新取目标值
//!
//! 求解发散时返回 [`TfError::RunInterrupted`]，其中保留已完成的迭代数和
//! 最后一个被接受的控制向量，调用者可以从该点重新开始。
//! 罚循环结束仍不可行时返回 `Ok`，状态为 [`SolverStatus::Infeasible`]。
//! 设备落到场址外时返回 [`TfError::OutOfSite`]，农场保留该布局供检查。

use tf_config::{DriverConfig, TaylorTestConfig, Verbosity};
use tf_foundation::{ErrorKind, TfError, TfResult};
use tracing::{debug, info, warn};

use crate::constraints::{BoxBounds, InequalityConstraint};
use crate::functional::Functional;
use crate::reduced::ReducedFunctional;
use crate::simulation::Simulation;
use crate::solver::{ProjectedGradientSolver, Solver, SolverStatus};
use crate::taylor::{GradientVerifier, TaylorReport};

/// 优化结果
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// 最优控制向量（清零后重新编码）
    pub control: Vec<f64>,
    /// `control` 处的目标值（已缩放）
    pub objective: f64,
    /// 迭代次数
    pub iterations: usize,
    /// 求解状态
    pub status: SolverStatus,
    /// 不等式约束的最大违反量
    pub max_violation: f64,
    /// 起点处的 Taylor 检验报告
    pub taylor: Option<TaylorReport>,
    /// 被清零的场单元数
    pub zeroed_cells: usize,
}

/// 记录迭代进度的包装
struct Tracker<'a, F: ?Sized> {
    inner: &'a mut F,
    iterations: usize,
    last_valid: Vec<f64>,
    verbosity: Verbosity,
}

impl<F: Functional + ?Sized> Functional for Tracker<'_, F> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn value(&mut self, control: &[f64]) -> TfResult<f64> {
        self.inner.value(control)
    }

    fn gradient(&mut self, control: &[f64]) -> TfResult<Vec<f64>> {
        self.inner.gradient(control)
    }

    fn on_iteration(&mut self, iteration: usize, control: &[f64], value: f64) {
        self.iterations = iteration;
        self.last_valid.clear();
        self.last_valid.extend_from_slice(control);
        match self.verbosity {
            Verbosity::Quiet => {}
            Verbosity::Normal => debug!("迭代 {iteration}: J = {value:.8e}"),
            Verbosity::Verbose => info!("迭代 {iteration}: J = {value:.8e}"),
        }
        self.inner.on_iteration(iteration, control, value);
    }
}

/// 优化驱动器
pub struct OptimizationDriver<V: Solver = ProjectedGradientSolver> {
    config: DriverConfig,
    verifier: Option<GradientVerifier>,
    solver: V,
}

impl OptimizationDriver<ProjectedGradientSolver> {
    /// 使用内置求解器
    pub fn new(config: DriverConfig, taylor: TaylorTestConfig) -> TfResult<Self> {
        let solver = ProjectedGradientSolver::new(config.clone());
        Self::with_solver(config, taylor, solver)
    }
}

impl<V: Solver> OptimizationDriver<V> {
    /// 使用指定求解器
    pub fn with_solver(config: DriverConfig, taylor: TaylorTestConfig, solver: V) -> TfResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            verifier: Some(GradientVerifier::new(taylor)?),
            solver,
        })
    }

    /// 跳过起点处的梯度验证
    ///
    /// 仅在调用者已经对同一约化泛函做过验证时使用。
    pub fn without_preflight(mut self) -> Self {
        self.verifier = None;
        self
    }

    /// 配置
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    fn preflight<S: Simulation>(
        &self,
        rf: &mut ReducedFunctional<S>,
        x0: &[f64],
    ) -> TfResult<Option<TaylorReport>> {
        let Some(verifier) = &self.verifier else {
            return Ok(None);
        };
        let report = verifier.verify(rf, x0)?;
        // 检验会把扰动点写入农场，恢复到起点
        rf.apply(x0)?;
        let stats = rf.take_cache_stats();
        debug!(
            "梯度检验: 缓存命中 {}, 未命中 {}, 条目 {}",
            stats.hits, stats.misses, stats.entries
        );
        if let Err(e) = report.ensure_passed() {
            if !(self.config.allow_unverified_gradient || verifier.config().allow_failure) {
                return Err(e);
            }
            warn!("梯度验证未通过，按配置继续优化: {e}");
        } else {
            info!("梯度验证通过: 最小收敛率 {:.4}", report.min_rate.unwrap_or(f64::NAN));
        }
        Ok(Some(report))
    }

    /// 运行一次优化
    pub fn run<S: Simulation>(
        &mut self,
        rf: &mut ReducedFunctional<S>,
        bounds: &BoxBounds,
        constraints: &[&dyn InequalityConstraint],
    ) -> TfResult<OptimizationResult> {
        let x0 = rf.initial_vector()?;
        if bounds.len() != x0.len() {
            return Err(TfError::shape_mismatch("bounds", x0.len(), bounds.len()));
        }
        info!(
            "开始优化: {} 个控制量, {} 组约束, 求解器 {}",
            x0.len(),
            constraints.len(),
            self.solver.name()
        );

        let taylor = self.preflight(rf, &x0)?;

        let mut tracker = Tracker {
            inner: &mut *rf,
            iterations: 0,
            last_valid: x0.clone(),
            verbosity: self.config.verbosity,
        };
        let outcome = match self.solver.minimize(&mut tracker, &x0, bounds, constraints) {
            Ok(outcome) => outcome,
            Err(e) if e.kind() == ErrorKind::Solve => {
                warn!("优化在第 {} 次迭代后中断: {e}", tracker.iterations);
                return Err(TfError::RunInterrupted {
                    iterations: tracker.iterations,
                    last_valid: tracker.last_valid,
                    source: Box::new(e),
                });
            }
            Err(e) => return Err(e),
        };

        rf.apply(&outcome.x)?;
        // 盒约束只覆盖场址外包框
        rf.farm().check_in_site()?;
        let zeroed_cells = rf.farm_mut().zero_outside_site();
        let control = rf.initial_vector()?;
        if zeroed_cells > 0 {
            debug!("场址外清零 {zeroed_cells} 个单元");
        }
        // 未清零时命中缓存
        let objective = rf.value(&control)?;
        if outcome.status == SolverStatus::Infeasible {
            warn!(
                "约束未满足: 最大违反量 {:.3e} 超过可行性容差 {:.3e}",
                outcome.max_violation, self.config.feasibility_tolerance
            );
        }
        let stats = rf.cache_stats();
        info!(
            "优化结束: {:?}, {} 次迭代, J = {:.8e}, 约束违反 {:.3e}, 缓存命中 {}/{}",
            outcome.status,
            outcome.iterations,
            objective,
            outcome.max_violation,
            stats.hits,
            stats.hits + stats.misses
        );

        Ok(OptimizationResult {
            control,
            objective,
            iterations: outcome.iterations,
            status: outcome.status,
            max_violation: outcome.max_violation,
            taylor,
            zeroed_cells,
        })
    }
}
