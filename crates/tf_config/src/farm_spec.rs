// crates/tf_config/src/farm_spec.rs

//! FarmSpec - 农场描述文件
//!
//! 描述场址多边形和农场布局，布局二选一：
//!
//! ```json
//! {
//!   "site": [[0, 0], [320, 0], [320, 160], [0, 160]],
//!   "layout": {
//!     "mode": "discrete",
//!     "footprint": {"width": 20, "length": 20},
//!     "grid": {"nx": 4, "ny": 2, "friction": 10.0}
//!   }
//! }
//! ```
//!
//! 连续模式给出单元划分与初始摩擦密度：
//!
//! ```json
//! { "site": [[0,0],[100,0],[100,50],[0,50]],
//!   "layout": {"mode": "continuous", "nx": 20, "ny": 10, "max_friction": 0.0589} }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// 农场描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmSpec {
    /// 场址多边形顶点（逆时针或顺时针均可）
    pub site: Vec<[f64; 2]>,
    /// 布局
    pub layout: LayoutSpec,
}

/// 布局描述
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LayoutSpec {
    /// 离散设备
    Discrete {
        /// 显式列出的设备
        #[serde(default)]
        devices: Vec<DeviceSpec>,
        /// 网格自动布置（追加在显式设备之后）
        #[serde(default)]
        grid: Option<GridDeploySpec>,
        /// 单台设备占地
        footprint: FootprintSpec,
        /// 摩擦分布形状
        #[serde(default)]
        shape: ShapeKind,
    },
    /// 连续摩擦场
    Continuous {
        /// x 方向单元数
        nx: usize,
        /// y 方向单元数
        ny: usize,
        /// 初始摩擦密度
        #[serde(default = "default_initial_density")]
        initial_friction: f64,
        /// 摩擦密度上界
        max_friction: f64,
    },
}

// 内点法需要从可行内点出发
fn default_initial_density() -> f64 { 1e-4 }

/// 单台设备
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeviceSpec {
    /// 位置 [m]
    pub position: [f64; 2],
    /// 摩擦系数
    pub friction: f64,
}

/// 网格布置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridDeploySpec {
    /// x 方向台数
    pub nx: usize,
    /// y 方向台数
    pub ny: usize,
    /// 初始摩擦系数
    pub friction: f64,
    /// 布置区域 [[x_min, y_min], [x_max, y_max]]，缺省取场址外包框
    #[serde(default)]
    pub region: Option<[[f64; 2]; 2]>,
}

/// 设备占地
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FootprintSpec {
    /// x 方向宽度 [m]
    pub width: f64,
    /// y 方向长度 [m]
    pub length: f64,
}

/// 摩擦分布形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// 紧支撑 bump 函数
    #[default]
    Bump,
    /// 高斯函数
    Gaussian,
}

impl FarmSpec {
    /// 从 JSON 字符串解析并校验
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let spec: Self = serde_json::from_str(text)?;
        spec.validate()?;
        Ok(spec)
    }

    /// 从 JSON 文件加载并校验
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// 形状层面的校验（几何合法性由 tf_farm 负责）
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.len() < 3 {
            return Err(ConfigError::invalid("site", self.site.len(), "多边形至少需要 3 个顶点"));
        }
        match &self.layout {
            LayoutSpec::Discrete { devices, grid, footprint, .. } => {
                if !(footprint.width > 0.0) || !(footprint.length > 0.0) {
                    return Err(ConfigError::invalid(
                        "layout.footprint",
                        format!("{}x{}", footprint.width, footprint.length),
                        "占地尺寸必须为正",
                    ));
                }
                if devices.is_empty() && grid.is_none() {
                    return Err(ConfigError::Missing("layout.devices 或 layout.grid".into()));
                }
                if let Some(g) = grid {
                    if g.nx == 0 || g.ny == 0 {
                        return Err(ConfigError::invalid(
                            "layout.grid",
                            format!("{}x{}", g.nx, g.ny),
                            "台数必须为正",
                        ));
                    }
                }
                Ok(())
            }
            LayoutSpec::Continuous { nx, ny, initial_friction, max_friction } => {
                if *nx == 0 || *ny == 0 {
                    return Err(ConfigError::invalid(
                        "layout.nx/ny",
                        format!("{nx}x{ny}"),
                        "单元数必须为正",
                    ));
                }
                if !(*max_friction > 0.0) {
                    return Err(ConfigError::invalid("layout.max_friction", max_friction, "必须为正"));
                }
                if *initial_friction < 0.0 || initial_friction > max_friction {
                    return Err(ConfigError::invalid(
                        "layout.initial_friction",
                        initial_friction,
                        "必须位于 [0, max_friction]",
                    ));
                }
                Ok(())
            }
        }
    }
}
