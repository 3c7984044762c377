// apps/tf_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 检查农场描述文件与运行配置文件，不调用任何仿真。

use anyhow::{bail, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tf_config::{ControlSelection, FarmSpec, RunConfig};
use tf_farm::FarmModel;
use tracing::{error, info, warn};

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 农场描述文件路径
    #[arg(short, long)]
    pub farm: Option<PathBuf>,

    /// 运行配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn is_ok(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== TidalFarm 配置验证 ===");

    if args.farm.is_none() && args.config.is_none() {
        println!("用法: tf_cli validate --farm <农场描述> [--config <运行配置>]");
        return Ok(());
    }

    let mut result = ValidationResult::default();
    let farm = args.farm.as_deref().and_then(|p| validate_farm(p, &mut result));
    let config = args.config.as_deref().and_then(|p| validate_config(p, &mut result));

    if let (Some(farm), Some(config)) = (&farm, &config) {
        cross_check(farm, config, &mut result);
    }

    print_validation_result(&result, args.strict)
}

fn validate_farm(path: &Path, result: &mut ValidationResult) -> Option<FarmModel> {
    println!("\n检查农场描述: {}", path.display());

    let spec = match FarmSpec::from_json_file(path) {
        Ok(spec) => spec,
        Err(e) => {
            result.add_error(format!("农场描述无效: {e}"));
            return None;
        }
    };
    let farm = match FarmModel::from_spec(&spec) {
        Ok(farm) => farm,
        Err(e) => {
            result.add_error(format!("农场几何无效: {e}"));
            return None;
        }
    };

    match farm.as_field() {
        Some(field) => {
            println!(
                "  ✓ 连续农场: {} 个单元, 其中 {} 个位于场址内",
                field.grid().n_cells(),
                field.support_len()
            );
        }
        None => {
            println!("  ✓ 离散农场: {} 台设备", farm.devices().len());
            let idle: Vec<usize> = farm
                .devices()
                .iter()
                .filter(|d| d.friction == 0.0)
                .map(|d| d.index)
                .collect();
            if !idle.is_empty() {
                result.add_warning(format!("设备 {idle:?} 摩擦为零，其位置梯度恒为零"));
            }
        }
    }
    Some(farm)
}

fn validate_config(path: &Path, result: &mut ValidationResult) -> Option<RunConfig> {
    println!("\n检查运行配置: {}", path.display());

    let config = match RunConfig::from_json_file(path) {
        Ok(config) => config,
        Err(e) => {
            result.add_error(format!("运行配置无效: {e}"));
            return None;
        }
    };

    if config.taylor.allow_failure || config.driver.allow_unverified_gradient {
        result.add_warning("已允许在梯度验证失败时继续优化");
    }
    if config.scaling_factor > 0.0 {
        result.add_warning(format!(
            "scaling_factor = {} 为正，优化将最小化目标",
            config.scaling_factor
        ));
    }
    if config.cache.key_tolerance.is_some_and(|tol| tol > 0.0) {
        result.add_warning("缓存键容差非零，相近的控制向量会共享评估结果");
    }

    println!("  ✓ 运行配置有效");
    Some(config)
}

fn cross_check(farm: &FarmModel, config: &RunConfig, result: &mut ValidationResult) {
    if farm.is_continuous() && config.controls != ControlSelection::Friction {
        result.add_warning(format!(
            "连续农场只支持摩擦控制，配置的 {} 将被替换",
            config.controls.name()
        ));
    }
    if let (Some(discrete), Some(d)) = (farm.as_discrete(), config.min_distance) {
        let extent = discrete.footprint().max_extent();
        if d < extent {
            result.add_warning(format!("最小间距 {d} 小于占地边长 {extent}，占地可能重叠"));
        }
    }
    if !farm.is_continuous() && config.controls.controls_position() && !farm.site().is_convex() {
        result.add_warning("场址非凸，位置优化不加边界约束，设备越出场址时运行失败");
    }
    if config.controls.controls_friction() {
        let bounds = config.friction_bounds;
        let outside = farm
            .devices()
            .iter()
            .filter(|dev| dev.friction < bounds.lower || dev.friction > bounds.upper)
            .count();
        if outside > 0 {
            result.add_warning(format!(
                "{outside} 台设备的初始摩擦不在 [{}, {}] 内，优化起点将被投影",
                bounds.lower, bounds.upper
            ));
        }
    }
}

fn print_validation_result(result: &ValidationResult, strict: bool) -> Result<()> {
    println!();
    for e in &result.errors {
        error!("{e}");
        println!("  ✗ {e}");
    }
    for w in &result.warnings {
        warn!("{w}");
        println!("  ! {w}");
    }
    println!(
        "\n结果: {} 个错误, {} 个警告",
        result.errors.len(),
        result.warnings.len()
    );

    if !result.is_ok(strict) {
        bail!("验证未通过");
    }
    Ok(())
}
