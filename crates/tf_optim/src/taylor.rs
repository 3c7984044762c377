// crates/tf_optim/src/taylor.rs

//! GradientVerifier - Taylor 余项收敛检验
//!
//! 对基点 `m0`、固定种子生成的扰动方向 `p` 和几何递减步长 `h_k = h_0 / r^k`：
//!
//! ```text
//! R1(h) = |J(m0 + h p) - J(m0)|
//! R2(h) = |J(m0 + h p) - J(m0) - h ∇J(m0)·p|
//! rate_k = ln(R2(h_{k-1}) / R2(h_k)) / ln(r)
//! ```
//!
//! 梯度正确时 R1 一阶收敛、R2 二阶收敛。最小 R2 收敛率低于阈值即判定梯度不一致。
//! J1 与 J0 在浮点精度内相同的步长视为退化，不参与收敛率计算。

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tf_config::{TaylorTestConfig, Verbosity};
use tf_foundation::vector::{axpy_into, dot};
use tf_foundation::{TfError, TfResult};
use tracing::{debug, info, warn};

use crate::functional::Functional;

/// 单个步长的检验记录
#[derive(Debug, Clone, PartialEq)]
pub struct TaylorStep {
    /// 步长 h
    pub h: f64,
    /// J(m0)
    pub j0: f64,
    /// J(m0 + h p)
    pub j1: f64,
    /// 一阶余项
    pub r1: f64,
    /// 二阶余项
    pub r2: f64,
    /// R1 相对上一步的收敛率
    pub r1_rate: Option<f64>,
    /// R2 相对上一步的收敛率
    pub r2_rate: Option<f64>,
    /// J1 与 J0 在浮点精度内相同
    pub degenerate: bool,
}

/// 检验结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaylorVerdict {
    /// 通过
    Passed,
    /// 最小收敛率低于阈值
    Failed,
    /// 没有任何可用的收敛率
    Degenerate,
}

/// 检验报告
#[derive(Debug, Clone, PartialEq)]
pub struct TaylorReport {
    /// 逐步记录
    pub steps: Vec<TaylorStep>,
    /// 方向导数 ∇J(m0)·p
    pub directional_derivative: f64,
    /// 最小 R2 收敛率
    pub min_rate: Option<f64>,
    /// 阈值
    pub threshold: f64,
    /// 结论
    pub verdict: TaylorVerdict,
}

impl TaylorReport {
    /// 是否通过
    pub fn passed(&self) -> bool {
        self.verdict == TaylorVerdict::Passed
    }

    /// 所有步长的 R2 收敛率
    pub fn rates(&self) -> Vec<Option<f64>> {
        self.steps.iter().map(|s| s.r2_rate).collect()
    }

    /// 未通过时转为对应错误
    pub fn ensure_passed(&self) -> TfResult<()> {
        match self.verdict {
            TaylorVerdict::Passed => Ok(()),
            TaylorVerdict::Failed => Err(TfError::GradientVerificationFailed {
                min_rate: self.min_rate.unwrap_or(f64::NAN),
                threshold: self.threshold,
            }),
            TaylorVerdict::Degenerate => Err(TfError::GradientVerificationDegenerate {
                steps: self.steps.len(),
            }),
        }
    }
}

impl fmt::Display for TaylorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>14} {:>14} {:>8} {:>8}", "h", "R1", "R2", "R1率", "R2率")?;
        let rate = |r: Option<f64>| r.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
        for s in &self.steps {
            writeln!(
                f,
                "{:>12.4e} {:>14.6e} {:>14.6e} {:>8} {:>8}{}",
                s.h,
                s.r1,
                s.r2,
                rate(s.r1_rate),
                rate(s.r2_rate),
                if s.degenerate { "  (退化)" } else { "" }
            )?;
        }
        match self.verdict {
            TaylorVerdict::Passed => write!(f, "通过: 最小收敛率 {}", rate(self.min_rate)),
            TaylorVerdict::Failed => write!(
                f,
                "失败: 最小收敛率 {} < 阈值 {:.4}",
                rate(self.min_rate),
                self.threshold
            ),
            TaylorVerdict::Degenerate => write!(f, "退化: 无可用收敛率"),
        }
    }
}

/// 梯度验证器
#[derive(Debug, Clone, Default)]
pub struct GradientVerifier {
    config: TaylorTestConfig,
}

impl GradientVerifier {
    /// 创建验证器
    pub fn new(config: TaylorTestConfig) -> TfResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 配置
    pub fn config(&self) -> &TaylorTestConfig {
        &self.config
    }

    /// 固定种子的扰动方向，分量均匀分布于 [0, 1)
    pub fn direction(&self, len: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        (0..len).map(|_| rng.gen::<f64>()).collect()
    }

    fn log_step(&self, step: &TaylorStep) {
        let rate = step.r2_rate.unwrap_or(f64::NAN);
        match self.config.verbosity {
            Verbosity::Quiet => {}
            Verbosity::Normal => debug!(
                "Taylor h={:.3e} R1={:.6e} R2={:.6e} rate={:.4}",
                step.h, step.r1, step.r2, rate
            ),
            Verbosity::Verbose => info!(
                "Taylor h={:.3e} R1={:.6e} R2={:.6e} rate={:.4}",
                step.h, step.r1, step.r2, rate
            ),
        }
    }

    /// 在 `m0` 处运行检验并给出报告
    ///
    /// 评估失败（例如外部求解发散）直接上抛；检验结论不通过时仍返回 `Ok(report)`。
    pub fn verify<F: Functional + ?Sized>(&self, f: &mut F, m0: &[f64]) -> TfResult<TaylorReport> {
        if m0.len() != f.len() {
            return Err(TfError::shape_mismatch("control", f.len(), m0.len()));
        }
        let p = self.direction(m0.len());
        let j0 = f.value(m0)?;
        let g = f.gradient(m0)?;
        let dj = dot(&g, &p);

        let mut steps: Vec<TaylorStep> = Vec::with_capacity(self.config.steps);
        let mut perturbed = Vec::with_capacity(m0.len());
        for k in 0..self.config.steps {
            let h = self.config.step(k);
            axpy_into(&mut perturbed, m0, h, &p);
            let j1 = f.value(&perturbed)?;
            let r1 = (j1 - j0).abs();
            let r2 = (j1 - j0 - h * dj).abs();
            let degenerate = r1 <= f64::EPSILON * j0.abs().max(j1.abs());

            let (r1_rate, r2_rate) = match steps.last() {
                Some(prev) if !prev.degenerate && !degenerate => {
                    (self.rate(prev.r1, r1), self.rate(prev.r2, r2))
                }
                _ => (None, None),
            };
            let step = TaylorStep { h, j0, j1, r1, r2, r1_rate, r2_rate, degenerate };
            self.log_step(&step);
            steps.push(step);
        }

        let min_rate = steps
            .iter()
            .filter_map(|s| s.r2_rate)
            .fold(None, |m: Option<f64>, r| Some(m.map_or(r, |m| m.min(r))));
        let verdict = match min_rate {
            None => TaylorVerdict::Degenerate,
            Some(r) if r >= self.config.rate_threshold => TaylorVerdict::Passed,
            Some(_) => TaylorVerdict::Failed,
        };
        Ok(TaylorReport {
            steps,
            directional_derivative: dj,
            min_rate,
            threshold: self.config.rate_threshold,
            verdict,
        })
    }

    /// 运行检验并按配置决定是否放行
    ///
    /// 未通过时返回对应错误，除非配置显式允许失败（此时记录警告）。
    pub fn check<F: Functional + ?Sized>(&self, f: &mut F, m0: &[f64]) -> TfResult<TaylorReport> {
        let report = self.verify(f, m0)?;
        if let Err(e) = report.ensure_passed() {
            if !self.config.allow_failure {
                return Err(e);
            }
            warn!("梯度验证未通过但配置允许继续: {e}");
        }
        Ok(report)
    }

    fn rate(&self, prev: f64, cur: f64) -> Option<f64> {
        if prev > 0.0 && cur > 0.0 {
            Some((prev / cur).ln() / self.config.ratio.ln())
        } else {
            None
        }
    }
}
