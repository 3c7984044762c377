// crates/tf_farm/src/lib.rs

//! TidalFarm Farm Layer (Layer 3)
//!
//! 农场层，描述设备、场址与连续摩擦场，并提供农场属性与扁平控制向量之间的
//! 双向映射。
//!
//! # 模块概览
//!
//! - [`site`]: 场址多边形
//! - [`device`]: 设备与占地
//! - [`field`]: 连续摩擦场与结构化网格
//! - [`shape`]: 设备摩擦分布形状
//! - [`deploy`]: 规则网格布置
//! - [`model`]: FarmModel（离散/连续二选一）
//! - [`mapping`]: ControlMapping
//!
//! # 示例
//!
//! ```
//! use glam::DVec2;
//! use tf_config::ControlSelection;
//! use tf_farm::{ControlMapping, Device, FarmModel, Footprint, Site, TurbineShape};
//!
//! let site = Site::rectangle(DVec2::ZERO, DVec2::new(100.0, 50.0)).unwrap();
//! let devices = vec![Device::new(0, DVec2::new(50.0, 25.0), 1.0)];
//! let farm = FarmModel::discrete(site, devices, Footprint::new(20.0, 20.0), TurbineShape::Bump).unwrap();
//! let mapping = ControlMapping::build(&farm, ControlSelection::FrictionAndPosition).unwrap();
//! assert_eq!(mapping.encode(&farm).unwrap(), vec![1.0, 50.0, 25.0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod deploy;
pub mod device;
pub mod field;
pub mod mapping;
pub mod model;
pub mod shape;
pub mod site;

/// 层级标识
pub const LAYER: u8 = 3;

pub use deploy::deploy_grid;
pub use device::{Device, Footprint};
pub use field::{FieldGrid, FrictionField};
pub use mapping::{ControlMapping, ControlSlot, SlotKind};
pub use model::{DiscreteFarm, FarmLayout, FarmModel};
pub use shape::{ShapeSample, TurbineShape};
pub use site::Site;
