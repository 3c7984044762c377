// apps/tf_cli/src/commands/verify.rs

//! 梯度检验命令
//!
//! 在农场初始状态处运行 Taylor 余项检验并打印每个步长的余项与收敛率。

use anyhow::{Context, Result};
use clap::Args;
use std::time::Instant;
use tf_optim::GradientVerifier;
use tracing::{info, warn};

use super::ProblemArgs;

/// 梯度检验参数
#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub problem: ProblemArgs,

    /// 覆盖配置中的初始步长
    #[arg(long)]
    pub initial_step: Option<f64>,

    /// 覆盖配置中的步长个数
    #[arg(long)]
    pub steps: Option<usize>,
}

/// 执行梯度检验
pub fn execute(args: VerifyArgs) -> Result<()> {
    info!("=== TidalFarm 梯度检验 ===");

    let (mut rf, config) = args.problem.load()?.into_reduced()?;
    let mut taylor = config.taylor;
    if let Some(h) = args.initial_step {
        taylor.initial_step = h;
    }
    if let Some(n) = args.steps {
        taylor.steps = n;
    }
    let verifier = GradientVerifier::new(taylor).context("Taylor 检验配置无效")?;

    let m0 = rf.initial_vector()?;
    info!("控制量: {} 个, 种子 {}", m0.len(), verifier.config().seed);

    let start = Instant::now();
    let report = verifier.verify(&mut rf, &m0).context("检验过程中求解失败")?;
    let elapsed = start.elapsed();

    println!("\n{report}");
    println!("\n方向导数: {:.8e}", report.directional_derivative);
    println!(
        "求解次数: 前向 {}, 伴随 {}, 耗时 {:.3} s",
        rf.evaluator().forward_solves(),
        rf.evaluator().adjoint_solves(),
        elapsed.as_secs_f64()
    );

    if let Err(e) = report.ensure_passed() {
        if verifier.config().allow_failure {
            warn!("梯度验证未通过，配置允许继续: {e}");
            return Ok(());
        }
        return Err(e.into());
    }
    Ok(())
}
