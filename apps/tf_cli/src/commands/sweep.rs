// apps/tf_cli/src/commands/sweep.rs

//! 摩擦扫描命令
//!
//! 把所有设备（或场单元）设为同一摩擦值，对一组等距摩擦值并行求目标。

use anyhow::{bail, Result};
use clap::Args;
use std::time::Instant;
use tf_optim::friction_sweep;
use tracing::info;

use super::ProblemArgs;

/// 扫描参数
#[derive(Args)]
pub struct SweepArgs {
    #[command(flatten)]
    pub problem: ProblemArgs,

    /// 起始摩擦
    #[arg(long, default_value = "0.0")]
    pub from: f64,

    /// 终止摩擦
    #[arg(long, default_value = "40.0")]
    pub to: f64,

    /// 采样点数
    #[arg(short = 'n', long, default_value = "21")]
    pub samples: usize,
}

/// 执行扫描命令
pub fn execute(args: SweepArgs) -> Result<()> {
    info!("=== TidalFarm 摩擦扫描 ===");

    if args.samples < 2 {
        bail!("采样点数至少为 2");
    }
    if !(args.to > args.from) || args.from < 0.0 {
        bail!("摩擦区间无效: [{}, {}]", args.from, args.to);
    }

    let problem = args.problem.load()?;
    let step = (args.to - args.from) / (args.samples - 1) as f64;
    let frictions: Vec<f64> = (0..args.samples).map(|i| args.from + step * i as f64).collect();

    let start = Instant::now();
    let backend = &problem.backend;
    let points = friction_sweep(&problem.farm, &frictions, || backend.instantiate())?;
    info!("扫描完成: {} 个点, 耗时 {:.3} s", points.len(), start.elapsed().as_secs_f64());

    println!("\n{:>12} {:>18}", "摩擦", "目标值");
    for p in &points {
        println!("{:>12.4} {:>18.8e}", p.friction, p.objective);
    }
    if let Some(best) = points.iter().max_by(|a, b| a.objective.total_cmp(&b.objective)) {
        println!("\n最大目标值: f = {:.4}, J = {:.8e}", best.friction, best.objective);
    }
    Ok(())
}
