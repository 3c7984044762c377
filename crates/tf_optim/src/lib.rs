// crates/tf_optim/src/lib.rs

//! TidalFarm Optimization Layer (Layer 4)
//!
//! 控制向量优化与梯度验证层。外部仿真被抽象为 [`Simulation`]，
//! 本层负责缓存求解结果、验证梯度并驱动约束优化。
//!
//! # 模块概览
//!
//! - [`simulation`]: 外部仿真协作者接口
//! - [`evaluator`]: ObjectiveEvaluator，一次调用一次前向（+ 一次伴随）
//! - [`reduced`]: ReducedFunctional，按控制向量缓存
//! - [`taylor`]: GradientVerifier，Taylor 余项收敛检验
//! - [`constraints`]: 盒约束与最小间距约束
//! - [`solver`]: 求解器接口与内置投影梯度/罚函数求解器
//! - [`driver`]: OptimizationDriver
//! - [`sweep`]: 并行摩擦扫描
//! - [`backends`]: 解析代理后端
//!
//! # 数据流
//!
//! ```text
//! FarmModel + ControlMapping ──initial_vector──> OptimizationDriver
//!                                                   │ value / gradient
//!                                                   ▼
//!                                ReducedFunctional (cache)
//!                                                   │ miss
//!                                                   ▼
//!                                ObjectiveEvaluator ──> Simulation
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backends;
pub mod constraints;
pub mod driver;
pub mod evaluator;
pub mod functional;
pub mod reduced;
pub mod simulation;
pub mod solver;
pub mod sweep;
pub mod taylor;

/// 层级标识
pub const LAYER: u8 = 4;

pub use backends::{FieldNormFunctional, WakeParams, WakeSurrogate};
pub use constraints::{
    BoxBounds, InequalityConstraint, MinimumDistanceConstraint, SiteBoundaryConstraint,
};
pub use driver::{OptimizationDriver, OptimizationResult};
pub use evaluator::{Evaluation, ObjectiveEvaluator};
pub use functional::{FnFunctional, Functional};
pub use reduced::{CacheState, CacheStats, ConsistencyWarning, ReducedFunctional};
pub use simulation::{Simulation, SimulationError};
pub use solver::{ProjectedGradientSolver, Solver, SolverOutcome, SolverStatus};
pub use sweep::{friction_sweep, SweepPoint};
pub use taylor::{GradientVerifier, TaylorReport, TaylorStep, TaylorVerdict};
