// crates/tf_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `TfError` 枚举和 `TfResult` 类型别名，用于整个项目的错误处理。
//!
//! # 错误分类
//!
//! | 分类 | 变体 | 处理策略 |
//! |------|------|----------|
//! | Configuration | `ShapeMismatch`, `OutOfSite`, `Overlap`, `InvalidConfig`, `UnsupportedControl` | 构造/校验阶段抛出，不重试，终止运行 |
//! | Solve | `SolveDiverged`, `RunInterrupted` | 原样上抛，不自动重试，保留控制向量 |
//! | Verification | `GradientVerificationFailed`, `GradientVerificationDegenerate` | 默认阻止进入优化 |
//! | Internal | `Io`, `Serialization`, `Internal` | 上抛 |
//!
//! 一致性警告（前向值与梯度路径重算值不一致）不是错误，只记录日志。

use thiserror::Error;

/// 统一结果类型
pub type TfResult<T> = Result<T, TfError>;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 配置错误（构造期）
    Configuration,
    /// 外部求解失败
    Solve,
    /// 梯度验证失败
    Verification,
    /// 内部错误
    Internal,
}

/// TidalFarm 错误类型
#[derive(Error, Debug)]
pub enum TfError {
    // ========================================================================
    // 配置错误
    // ========================================================================
    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    ShapeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 设备位置超出场址
    #[error("设备 {device} 位于场址之外: ({x}, {y})")]
    OutOfSite {
        /// 设备编号
        device: usize,
        /// x 坐标
        x: f64,
        /// y 坐标
        y: f64,
    },

    /// 设备占地重叠
    #[error("设备 {first} 与 {second} 占地重叠: 间距 {distance:.3}, 最小 {min_distance:.3}")]
    Overlap {
        /// 第一个设备编号
        first: usize,
        /// 第二个设备编号
        second: usize,
        /// 实际中心距
        distance: f64,
        /// 允许的最小中心距
        min_distance: f64,
    },

    /// 配置值无效
    #[error("配置值无效: {key}={value}, 原因: {reason}")]
    InvalidConfig {
        /// 配置键名
        key: String,
        /// 配置值
        value: String,
        /// 无效原因说明
        reason: String,
    },

    /// 控制量与农场模式不兼容
    #[error("控制量 {control} 不适用于 {mode} 农场")]
    UnsupportedControl {
        /// 控制量名称
        control: &'static str,
        /// 农场模式
        mode: &'static str,
    },

    // ========================================================================
    // 求解错误
    // ========================================================================
    /// 外部求解器不收敛
    #[error("外部求解发散: {message}")]
    SolveDiverged {
        /// 求解器给出的信息
        message: String,
        /// 触发发散的控制向量
        control: Vec<f64>,
    },

    /// 优化运行因求解失败中断
    #[error("优化在第 {iterations} 次迭代中断: {source}")]
    RunInterrupted {
        /// 已完成迭代数
        iterations: usize,
        /// 最后一个成功评估的控制向量
        last_valid: Vec<f64>,
        /// 底层错误
        #[source]
        source: Box<TfError>,
    },

    // ========================================================================
    // 梯度验证
    // ========================================================================
    /// Taylor 余项收敛率低于阈值
    #[error("梯度验证失败: 最小收敛率 {min_rate:.4} < 阈值 {threshold:.4}")]
    GradientVerificationFailed {
        /// 观测到的最小收敛率
        min_rate: f64,
        /// 要求的阈值
        threshold: f64,
    },

    /// 所有步长均退化，无法给出收敛率
    #[error("梯度验证退化: {steps} 个步长均无有效收敛率")]
    GradientVerificationDegenerate {
        /// 步长数量
        steps: usize,
    },

    // ========================================================================
    // 内部错误
    // ========================================================================
    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        /// 底层 IO 错误
        #[source]
        source: Option<std::io::Error>,
    },

    /// 序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        /// 序列化失败原因
        message: String,
    },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

impl TfError {
    /// 构造大小不匹配错误
    pub fn shape_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch { name, expected, actual }
    }

    /// 构造配置值错误
    pub fn invalid_config(
        key: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// 构造发散错误，保留控制向量
    pub fn diverged(message: impl Into<String>, control: &[f64]) -> Self {
        Self::SolveDiverged {
            message: message.into(),
            control: control.to_vec(),
        }
    }

    /// 构造 IO 错误
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 构造内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// 错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ShapeMismatch { .. }
            | Self::OutOfSite { .. }
            | Self::Overlap { .. }
            | Self::InvalidConfig { .. }
            | Self::UnsupportedControl { .. } => ErrorKind::Configuration,
            Self::SolveDiverged { .. } | Self::RunInterrupted { .. } => ErrorKind::Solve,
            Self::GradientVerificationFailed { .. }
            | Self::GradientVerificationDegenerate { .. } => ErrorKind::Verification,
            Self::Io { .. } | Self::Serialization { .. } | Self::Internal { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// 是否为配置错误
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// 发散时的控制向量（若有）
    ///
    /// 对 `RunInterrupted` 返回底层发散错误携带的向量。
    pub fn diverged_control(&self) -> Option<&[f64]> {
        match self {
            Self::SolveDiverged { control, .. } => Some(control),
            Self::RunInterrupted { source, .. } => source.diverged_control(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TfError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_display() {
        let err = TfError::shape_mismatch("control", 4, 3);
        let msg = err.to_string();
        assert!(msg.contains("control"));
        assert!(msg.contains('4'));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_diverged_keeps_control() {
        let err = TfError::diverged("Newton 迭代未收敛", &[1.0, 2.0]);
        assert_eq!(err.kind(), ErrorKind::Solve);
        assert_eq!(err.diverged_control(), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_interrupted_exposes_inner_control() {
        let err = TfError::RunInterrupted {
            iterations: 3,
            last_valid: vec![0.5],
            source: Box::new(TfError::diverged("nan", &[0.7])),
        };
        assert_eq!(err.kind(), ErrorKind::Solve);
        assert_eq!(err.diverged_control(), Some(&[0.7][..]));
    }

    #[test]
    fn test_verification_kind_is_distinct() {
        let failed = TfError::GradientVerificationFailed { min_rate: 1.0, threshold: 1.9 };
        let diverged = TfError::diverged("x", &[]);
        assert_eq!(failed.kind(), ErrorKind::Verification);
        assert_ne!(failed.kind(), diverged.kind());
    }
}
