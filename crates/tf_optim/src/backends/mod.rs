// crates/tf_optim/src/backends/mod.rs

//! 解析代理后端
//!
//! 实现 [`Simulation`](crate::simulation::Simulation) 的封闭形式目标，带精确梯度。
//! 用于测试与命令行演示，不是流体物理模型。
//!
//! - [`FieldNormFunctional`]: 摩擦场 L2 范数
//! - [`WakeSurrogate`]: 尾流功率代理

pub mod field_norm;
pub mod wake;

pub use field_norm::FieldNormFunctional;
pub use wake::{WakeParams, WakeSurrogate};
