// crates/tf_optim/src/simulation.rs

//! 外部仿真协作者接口
//!
//! 流场的前向求解与伴随求解对本层是黑盒。实现者需满足：
//!
//! - 对相同的农场快照给出确定性的输出（缓存与 Taylor 检验都依赖这一点）
//! - `adjoint` 返回的梯度长度与顺序和传入的 [`ControlMapping`] 一致
//! - 不在目标泛函的不可微点上求值。二次拖曳项在零流速处不可微，
//!   后端应自行在初始条件中避开该点，这一阈值属于后端而不是本层的约定
//!
//! 求解句柄在每次调用时显式传入，不存在全局的微分记录状态。

use thiserror::Error;
use tf_farm::{ControlMapping, FarmModel};
use tf_foundation::TfError;

/// 仿真失败
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// 非线性求解不收敛
    #[error("{0}")]
    NotConverged(String),

    /// 其他后端错误
    #[error("后端错误: {0}")]
    Backend(String),
}

impl SimulationError {
    /// 转为统一错误，发散时保留触发它的控制向量
    pub fn into_tf(self, control: &[f64]) -> TfError {
        match self {
            Self::NotConverged(message) => TfError::diverged(message, control),
            Self::Backend(message) => TfError::internal(message),
        }
    }
}

/// 外部仿真
pub trait Simulation {
    /// 后端名称
    fn name(&self) -> &'static str;

    /// 前向求解，返回标量目标值
    fn forward(&mut self, farm: &FarmModel) -> Result<f64, SimulationError>;

    /// 伴随求解，返回目标对每个控制槽位的导数
    ///
    /// 总是紧跟在同一快照的 `forward` 之后调用。
    fn adjoint(
        &mut self,
        farm: &FarmModel,
        mapping: &ControlMapping,
    ) -> Result<Vec<f64>, SimulationError>;
}

impl<S: Simulation + ?Sized> Simulation for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn forward(&mut self, farm: &FarmModel) -> Result<f64, SimulationError> {
        (**self).forward(farm)
    }

    fn adjoint(
        &mut self,
        farm: &FarmModel,
        mapping: &ControlMapping,
    ) -> Result<Vec<f64>, SimulationError> {
        (**self).adjoint(farm, mapping)
    }
}
