// apps/tf_cli/src/commands/optimize.rs

//! 优化命令
//!
//! 梯度检验通过后运行优化，打印最终布局，可选写出 JSON 结果。

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;
use tf_farm::FarmModel;
use tf_foundation::TfError;
use tf_optim::{
    BoxBounds, InequalityConstraint, MinimumDistanceConstraint, OptimizationDriver,
    SiteBoundaryConstraint, SolverStatus,
};
use tracing::{error, info, warn};

use super::ProblemArgs;

/// 优化参数
#[derive(Args)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub problem: ProblemArgs,

    /// 覆盖配置中的最大迭代次数
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// 跳过起点处的梯度检验
    #[arg(long)]
    pub skip_verify: bool,

    /// 结果输出文件 (JSON)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// 执行优化命令
pub fn execute(args: OptimizeArgs) -> Result<()> {
    info!("=== TidalFarm 优化启动 ===");

    let (mut rf, mut config) = args.problem.load()?.into_reduced()?;
    if let Some(n) = args.max_iterations {
        config.driver.max_iterations = n;
    }

    let bounds = BoxBounds::for_farm(rf.farm(), rf.mapping(), config.friction_bounds)
        .context("无法构建控制量边界")?;
    let spacing = if config.controls.controls_position() && rf.farm().devices().len() > 1 {
        let c = MinimumDistanceConstraint::for_farm(rf.farm(), rf.mapping(), config.min_distance)?;
        info!("最小间距约束: {} 对设备, d = {}", c.len(), c.min_distance());
        Some(c)
    } else {
        None
    };
    let boundary = if config.controls.controls_position() {
        if rf.farm().site().is_convex() {
            Some(SiteBoundaryConstraint::for_farm(rf.farm(), rf.mapping())?)
        } else {
            warn!("场址非凸，只在优化结束后校验设备是否在场址内");
            None
        }
    } else {
        None
    };
    let mut constraints: Vec<&dyn InequalityConstraint> = Vec::new();
    if let Some(c) = &spacing {
        constraints.push(c);
    }
    if let Some(c) = &boundary {
        constraints.push(c);
    }

    let mut driver = OptimizationDriver::new(config.driver.clone(), config.taylor.clone())
        .context("优化配置无效")?;
    if args.skip_verify {
        driver = driver.without_preflight();
    }

    let start = Instant::now();
    let result = match driver.run(&mut rf, &bounds, &constraints) {
        Ok(result) => result,
        Err(TfError::RunInterrupted { iterations, last_valid, source }) => {
            error!("优化在第 {iterations} 次迭代后中断: {source}");
            println!("\n最后有效控制向量 ({} 个分量):", last_valid.len());
            println!("{last_valid:?}");
            return Err(TfError::RunInterrupted { iterations, last_valid, source }.into());
        }
        Err(e) => return Err(e).context("优化失败"),
    };
    let elapsed = start.elapsed();

    if let Some(report) = &result.taylor {
        println!("\n起点梯度检验:\n{report}");
    }

    info!("=== 优化完成 ===");
    info!("状态: {:?}", result.status);
    info!("迭代次数: {}", result.iterations);
    info!("目标值: {:.8e} (缩放因子 {})", result.objective, rf.scaling_factor());
    info!("约束违反: {:.3e}", result.max_violation);
    info!(
        "求解次数: 前向 {}, 伴随 {}",
        rf.evaluator().forward_solves(),
        rf.evaluator().adjoint_solves()
    );
    info!("计算时间: {:.2} s", elapsed.as_secs_f64());

    print_layout(rf.farm(), result.zeroed_cells);

    if let Some(path) = &args.output {
        let doc = json!({
            "mode": rf.farm().mode_name(),
            "controls": config.controls,
            "status": format!("{:?}", result.status),
            "iterations": result.iterations,
            "objective": result.objective,
            "max_violation": result.max_violation,
            "control": result.control,
            "zeroed_cells": result.zeroed_cells,
        });
        let text = serde_json::to_string_pretty(&doc)?;
        std::fs::write(path, text)
            .with_context(|| format!("无法写出结果: {}", path.display()))?;
        info!("结果已写出: {}", path.display());
    }

    if result.status == SolverStatus::Infeasible {
        bail!(
            "布局不满足约束: 最大违反量 {:.3e} 超过可行性容差 {:.3e}",
            result.max_violation,
            config.driver.feasibility_tolerance
        );
    }
    Ok(())
}

fn print_layout(farm: &FarmModel, zeroed_cells: usize) {
    match farm.as_field() {
        Some(field) => {
            println!("\n连续摩擦场:");
            println!("  单元数:       {}", field.grid().n_cells());
            println!("  场址内单元:   {}", field.support_len());
            println!("  清零单元:     {zeroed_cells}");
            println!("  总摩擦:       {:.6e}", field.total_friction());
        }
        None => {
            println!("\n{:>6} {:>12} {:>12} {:>12}", "设备", "x [m]", "y [m]", "摩擦");
            for d in farm.devices() {
                println!(
                    "{:>6} {:>12.3} {:>12.3} {:>12.5}",
                    d.index, d.position.x, d.position.y, d.friction
                );
            }
        }
    }
}
