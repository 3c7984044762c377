// crates/tf_config/src/controls.rs

//! 控制量选择与输出级别

use serde::{Deserialize, Serialize};

/// 离散农场中哪些属性是控制量
///
/// 在映射构建时确定，优化开始后不可更改。连续农场只有场值一种控制量，
/// 忽略此选择之外的组合会在映射构建时报错。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControlSelection {
    /// 仅摩擦系数
    Friction,
    /// 仅位置
    Position,
    /// 摩擦系数与位置
    #[default]
    FrictionAndPosition,
}

impl ControlSelection {
    /// 是否控制摩擦
    pub fn controls_friction(self) -> bool {
        matches!(self, Self::Friction | Self::FrictionAndPosition)
    }

    /// 是否控制位置
    pub fn controls_position(self) -> bool {
        matches!(self, Self::Position | Self::FrictionAndPosition)
    }

    /// 名称
    pub fn name(self) -> &'static str {
        match self {
            Self::Friction => "friction",
            Self::Position => "position",
            Self::FrictionAndPosition => "friction_and_position",
        }
    }
}

/// 输出级别
///
/// 显式传入 GradientVerifier 与 OptimizationDriver，控制逐步输出。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// 不输出逐步信息
    Quiet,
    /// 逐步信息记为 debug
    #[default]
    Normal,
    /// 逐步信息记为 info
    Verbose,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_flags() {
        assert!(ControlSelection::Friction.controls_friction());
        assert!(!ControlSelection::Friction.controls_position());
        assert!(ControlSelection::FrictionAndPosition.controls_position());
    }

    #[test]
    fn test_selection_serde_names() {
        let s: ControlSelection = serde_json::from_str("\"position\"").unwrap();
        assert_eq!(s, ControlSelection::Position);
        assert_eq!(serde_json::to_string(&Verbosity::Verbose).unwrap(), "\"verbose\"");
    }
}
