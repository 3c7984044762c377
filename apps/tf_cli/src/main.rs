// apps/tf_cli/src/main.rs

//! TidalFarm 命令行界面
//!
//! 读取农场描述与运行配置，对内置目标后端做梯度检验、优化和摩擦扫描。
//!
//! # 架构层级
//!
//! 本模块属于 **Layer 5: Application**：
//! - 后端在运行时按名称选择，之后以 `Box<dyn Simulation>` 传入优化层
//! - 错误在此层统一转为 `anyhow::Error` 并附加上下文

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// TidalFarm 布局与摩擦优化命令行工具
#[derive(Parser)]
#[command(name = "tf_cli")]
#[command(author = "TidalFarm Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "TidalFarm turbine layout and friction optimization", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 验证农场描述与运行配置
    Validate(commands::validate::ValidateArgs),
    /// 在初始布局处做 Taylor 梯度检验
    Verify(commands::verify::VerifyArgs),
    /// 梯度检验后运行优化
    Optimize(commands::optimize::OptimizeArgs),
    /// 均匀摩擦扫描
    Sweep(commands::sweep::SweepArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 表格结果走 stdout，日志走 stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Verify(args) => commands::verify::execute(args),
        Commands::Optimize(args) => commands::optimize::execute(args),
        Commands::Sweep(args) => commands::sweep::execute(args),
    }
}
