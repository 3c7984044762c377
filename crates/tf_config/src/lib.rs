// crates/tf_config/src/lib.rs

//! TidalFarm Config Layer (Layer 2)
//!
//! 配置层，提供控制量选择、缓存策略、梯度验证策略、优化驱动策略
//! 以及农场描述文件的 serde 定义。
//!
//! # 模块概览
//!
//! - [`controls`]: ControlSelection 控制量选择与 Verbosity 输出级别
//! - [`run_config`]: RunConfig 运行配置（缓存、Taylor 检验、驱动器）
//! - [`farm_spec`]: FarmSpec 农场描述文件
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! Layer 5: tf_cli        ─> uses RunConfig, FarmSpec
//! Layer 4: tf_optim      ─> ReducedFunctional, GradientVerifier, OptimizationDriver
//! Layer 3: tf_farm       ─> FarmModel, ControlMapping
//! Layer 2: tf_config     ─> (本层)
//! Layer 1: tf_foundation
//! ```
//!
//! # 设计原则
//!
//! 1. **全 f64 配置**: 所有数值使用 f64，便于 JSON 序列化
//! 2. **显式传递**: 输出级别是配置值而不是全局状态
//! 3. **缺省可用**: 空 JSON 对象即可得到完整的默认配置

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod controls;
pub mod error;
pub mod farm_spec;
pub mod run_config;

/// 层级标识
pub const LAYER: u8 = 2;

// 重导出核心类型
pub use controls::{ControlSelection, Verbosity};
pub use error::ConfigError;
pub use farm_spec::{
    DeviceSpec, FarmSpec, FootprintSpec, GridDeploySpec, LayoutSpec, ShapeKind,
};
pub use run_config::{CacheConfig, DriverConfig, FrictionBounds, RunConfig, TaylorTestConfig};
