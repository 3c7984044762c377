// crates/tf_config/src/run_config.rs

//! RunConfig - 一次优化运行的全部配置（全 f64）
//!
//! 空 JSON 对象 `{}` 即得到默认配置：摩擦与位置均为控制量，
//! 缩放因子 -1（把功率最大化转为最小化），位级精确缓存键。

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::controls::{ControlSelection, Verbosity};
use crate::error::ConfigError;

/// 运行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// 控制量选择
    #[serde(default)]
    pub controls: ControlSelection,

    /// 目标与梯度的统一缩放因子
    #[serde(default = "default_scaling_factor")]
    pub scaling_factor: f64,

    /// 评估缓存
    #[serde(default)]
    pub cache: CacheConfig,

    /// Taylor 余项检验
    #[serde(default)]
    pub taylor: TaylorTestConfig,

    /// 优化驱动
    #[serde(default)]
    pub driver: DriverConfig,

    /// 摩擦系数上下界
    #[serde(default)]
    pub friction_bounds: FrictionBounds,

    /// 设备最小间距 [m]，缺省取占地最大边长
    #[serde(default)]
    pub min_distance: Option<f64>,
}

fn default_scaling_factor() -> f64 { -1.0 }

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            controls: ControlSelection::default(),
            scaling_factor: default_scaling_factor(),
            cache: CacheConfig::default(),
            taylor: TaylorTestConfig::default(),
            driver: DriverConfig::default(),
            friction_bounds: FrictionBounds::default(),
            min_distance: None,
        }
    }
}

impl RunConfig {
    /// 从 JSON 字符串解析并校验
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载并校验
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.scaling_factor.is_finite() || self.scaling_factor == 0.0 {
            return Err(ConfigError::invalid(
                "scaling_factor",
                self.scaling_factor,
                "必须为非零有限值",
            ));
        }
        if let Some(d) = self.min_distance {
            if !(d > 0.0) {
                return Err(ConfigError::invalid("min_distance", d, "必须为正"));
            }
        }
        self.cache.validate()?;
        self.taylor.validate()?;
        self.driver.validate()?;
        self.friction_bounds.validate()
    }
}

/// 评估缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 键容差：None 表示逐位精确匹配，Some(tol) 表示逐分量最大差 ≤ tol 即命中
    #[serde(default)]
    pub key_tolerance: Option<f64>,

    /// 梯度路径重算目标值与缓存值的相对一致性容差
    #[serde(default = "default_consistency_tolerance")]
    pub consistency_tolerance: f64,
}

fn default_consistency_tolerance() -> f64 { 1e-10 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_tolerance: None,
            consistency_tolerance: default_consistency_tolerance(),
        }
    }
}

impl CacheConfig {
    /// 校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(tol) = self.key_tolerance {
            if !(tol >= 0.0) || !tol.is_finite() {
                return Err(ConfigError::invalid("cache.key_tolerance", tol, "必须为非负有限值"));
            }
        }
        if !(self.consistency_tolerance >= 0.0) {
            return Err(ConfigError::invalid(
                "cache.consistency_tolerance",
                self.consistency_tolerance,
                "必须为非负",
            ));
        }
        Ok(())
    }
}

/// Taylor 余项检验配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaylorTestConfig {
    /// 扰动方向随机种子（固定，保证可复现）
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// 初始步长 h_0
    #[serde(default = "default_initial_step")]
    pub initial_step: f64,

    /// 步长缩减比 r
    #[serde(default = "default_ratio")]
    pub ratio: f64,

    /// 步长个数
    #[serde(default = "default_steps")]
    pub steps: usize,

    /// 二阶余项最小收敛率阈值
    #[serde(default = "default_rate_threshold")]
    pub rate_threshold: f64,

    /// 显式允许带着失败的梯度继续（会记录警告）
    #[serde(default)]
    pub allow_failure: bool,

    /// 输出级别
    #[serde(default)]
    pub verbosity: Verbosity,
}

fn default_seed() -> u64 { 21 }
fn default_initial_step() -> f64 { 1e-2 }
fn default_ratio() -> f64 { 2.0 }
fn default_steps() -> usize { 5 }
fn default_rate_threshold() -> f64 { 1.9 }

impl Default for TaylorTestConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            initial_step: default_initial_step(),
            ratio: default_ratio(),
            steps: default_steps(),
            rate_threshold: default_rate_threshold(),
            allow_failure: false,
            verbosity: Verbosity::default(),
        }
    }
}

impl TaylorTestConfig {
    /// 校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_step > 0.0) || !self.initial_step.is_finite() {
            return Err(ConfigError::invalid("taylor.initial_step", self.initial_step, "必须为正"));
        }
        if !(self.ratio > 1.0) || !self.ratio.is_finite() {
            return Err(ConfigError::invalid("taylor.ratio", self.ratio, "必须大于 1"));
        }
        if self.steps < 2 {
            return Err(ConfigError::invalid("taylor.steps", self.steps, "至少需要 2 个步长"));
        }
        if !(self.rate_threshold > 0.0) {
            return Err(ConfigError::invalid(
                "taylor.rate_threshold",
                self.rate_threshold,
                "必须为正",
            ));
        }
        Ok(())
    }

    /// 第 k 个步长 h_0 / r^k
    pub fn step(&self, k: usize) -> f64 {
        self.initial_step / self.ratio.powi(k as i32)
    }
}

/// 优化驱动配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// 最大迭代次数（所有外层循环合计）
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// 投影梯度收敛容差
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// 不等式约束可行性容差
    #[serde(default = "default_feasibility_tolerance")]
    pub feasibility_tolerance: f64,

    /// 初始罚参数
    #[serde(default = "default_penalty_initial")]
    pub penalty_initial: f64,

    /// 罚参数增长倍数
    #[serde(default = "default_penalty_growth")]
    pub penalty_growth: f64,

    /// 最大外层罚循环次数
    #[serde(default = "default_max_outer")]
    pub max_outer: usize,

    /// 输出级别
    #[serde(default)]
    pub verbosity: Verbosity,

    /// 显式允许未通过梯度验证时继续优化（会记录警告）
    #[serde(default)]
    pub allow_unverified_gradient: bool,
}

fn default_max_iterations() -> usize { 200 }
fn default_tolerance() -> f64 { 1e-6 }
fn default_feasibility_tolerance() -> f64 { 1e-4 }
fn default_penalty_initial() -> f64 { 10.0 }
fn default_penalty_growth() -> f64 { 10.0 }
fn default_max_outer() -> usize { 8 }

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            feasibility_tolerance: default_feasibility_tolerance(),
            penalty_initial: default_penalty_initial(),
            penalty_growth: default_penalty_growth(),
            max_outer: default_max_outer(),
            verbosity: Verbosity::default(),
            allow_unverified_gradient: false,
        }
    }
}

impl DriverConfig {
    /// 校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid("driver.max_iterations", 0, "必须为正"));
        }
        if !(self.tolerance > 0.0) {
            return Err(ConfigError::invalid("driver.tolerance", self.tolerance, "必须为正"));
        }
        if !(self.feasibility_tolerance > 0.0) {
            return Err(ConfigError::invalid(
                "driver.feasibility_tolerance",
                self.feasibility_tolerance,
                "必须为正",
            ));
        }
        if !(self.penalty_initial > 0.0) {
            return Err(ConfigError::invalid(
                "driver.penalty_initial",
                self.penalty_initial,
                "必须为正",
            ));
        }
        if !(self.penalty_growth > 1.0) {
            return Err(ConfigError::invalid(
                "driver.penalty_growth",
                self.penalty_growth,
                "必须大于 1",
            ));
        }
        if self.max_outer == 0 {
            return Err(ConfigError::invalid("driver.max_outer", 0, "必须为正"));
        }
        Ok(())
    }
}

/// 摩擦系数上下界
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrictionBounds {
    /// 下界
    #[serde(default)]
    pub lower: f64,
    /// 上界
    #[serde(default = "default_friction_upper")]
    pub upper: f64,
}

fn default_friction_upper() -> f64 { 100.0 }

impl Default for FrictionBounds {
    fn default() -> Self {
        Self { lower: 0.0, upper: default_friction_upper() }
    }
}

impl FrictionBounds {
    /// 校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lower < 0.0 {
            return Err(ConfigError::invalid("friction_bounds.lower", self.lower, "摩擦系数不能为负"));
        }
        if !(self.upper >= self.lower) {
            return Err(ConfigError::invalid(
                "friction_bounds.upper",
                self.upper,
                "上界不能小于下界",
            ));
        }
        Ok(())
    }
}
