// apps/tf_cli/src/commands/mod.rs

//! 子命令
//!
//! 各命令共享同一套问题输入：农场描述文件、可选的运行配置文件和目标后端。

pub mod optimize;
pub mod sweep;
pub mod validate;
pub mod verify;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tf_config::{ControlSelection, FarmSpec, RunConfig};
use tf_farm::{ControlMapping, FarmModel};
use tf_optim::{FieldNormFunctional, ReducedFunctional, Simulation, WakeSurrogate};
use tracing::{info, warn};

/// 目标后端
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// 尾流功率代理
    Wake,
    /// 摩擦场 L2 范数
    FieldNorm,
}

/// 问题输入
#[derive(Args)]
pub struct ProblemArgs {
    /// 农场描述文件 (JSON)
    #[arg(short, long)]
    pub farm: PathBuf,

    /// 运行配置文件 (JSON)，缺省使用默认配置
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 目标后端
    #[arg(short, long, value_enum, default_value = "wake")]
    pub backend: BackendKind,

    /// field-norm 后端叠加网格的每边单元数（离散农场）
    #[arg(long, default_value = "50")]
    pub resolution: usize,
}

/// 已构建的后端原型，每个工作单元克隆一份
#[derive(Clone)]
pub enum Backend {
    /// 尾流功率代理
    Wake(WakeSurrogate),
    /// 摩擦场 L2 范数
    FieldNorm(FieldNormFunctional),
}

impl Backend {
    /// 新的仿真实例
    pub fn instantiate(&self) -> Box<dyn Simulation> {
        match self {
            Self::Wake(sim) => Box::new(sim.clone()),
            Self::FieldNorm(sim) => Box::new(sim.clone()),
        }
    }
}

/// 加载后的问题
pub struct Problem {
    pub farm: FarmModel,
    pub config: RunConfig,
    pub backend: Backend,
}

impl ProblemArgs {
    /// 读取并校验输入
    pub fn load(&self) -> Result<Problem> {
        let spec = FarmSpec::from_json_file(&self.farm)
            .with_context(|| format!("无法加载农场描述: {}", self.farm.display()))?;
        let farm = FarmModel::from_spec(&spec).context("农场几何无效")?;

        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)
                .with_context(|| format!("无法加载运行配置: {}", path.display()))?,
            None => RunConfig::default(),
        };
        if farm.is_continuous() && config.controls != ControlSelection::Friction {
            warn!("连续农场只支持摩擦控制，忽略配置的 {}", config.controls.name());
            config.controls = ControlSelection::Friction;
        }

        let backend = match self.backend {
            BackendKind::Wake => Backend::Wake(WakeSurrogate::default()),
            BackendKind::FieldNorm => Backend::FieldNorm(
                FieldNormFunctional::for_farm(&farm, self.resolution)
                    .context("无法构建叠加网格")?,
            ),
        };

        info!(
            "农场: {} 模式, {} 个实体, 控制量 {}, 后端 {:?}",
            farm.mode_name(),
            farm.n_entities(),
            config.controls.name(),
            self.backend
        );
        Ok(Problem { farm, config, backend })
    }
}

impl Problem {
    /// 构建约化泛函，农场所有权转入其中
    pub fn into_reduced(self) -> Result<(ReducedFunctional<Box<dyn Simulation>>, RunConfig)> {
        let mapping = ControlMapping::build(&self.farm, self.config.controls)?;
        let rf = ReducedFunctional::from_parts(
            self.backend.instantiate(),
            self.farm,
            mapping,
            self.config.scaling_factor,
            self.config.cache.clone(),
        )?;
        Ok((rf, self.config))
    }
}
