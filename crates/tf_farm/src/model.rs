// crates/tf_farm/src/model.rs

//! FarmModel - 农场模型
//!
//! 农场要么是离散设备集合，要么是连续摩擦场，两种模式在构建时二选一，
//! 之后不再切换。构建时做全部几何校验（设备位于场址内、占地互不重叠），
//! 保证在任何外部求解之前暴露配置错误。
//!
//! 除了 [`ControlMapping::decode`] 写回的设备属性或场值外，模型在一次
//! 优化运行中保持不变。

use glam::DVec2;
use tf_config::{FarmSpec, LayoutSpec};
use tf_foundation::{TfError, TfResult};
use tracing::debug;

use crate::deploy::deploy_grid;
use crate::device::{Device, Footprint};
use crate::field::{FieldGrid, FrictionField};
use crate::mapping::ControlMapping;
use crate::shape::TurbineShape;
use crate::site::Site;

/// 离散设备农场
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteFarm {
    devices: Vec<Device>,
    footprint: Footprint,
    shape: TurbineShape,
}

impl DiscreteFarm {
    /// 设备
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// 可变设备
    pub fn devices_mut(&mut self) -> &mut [Device] {
        &mut self.devices
    }

    /// 占地
    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// 摩擦分布形状
    pub fn shape(&self) -> TurbineShape {
        self.shape
    }

    /// 设备数
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// 农场布局（互斥的两种控制模式）
#[derive(Debug, Clone, PartialEq)]
pub enum FarmLayout {
    /// 离散设备
    Discrete(DiscreteFarm),
    /// 连续摩擦场
    Continuous(FrictionField),
}

/// 农场模型
#[derive(Debug, Clone, PartialEq)]
pub struct FarmModel {
    site: Site,
    layout: FarmLayout,
}

impl FarmModel {
    /// 创建离散农场并校验
    ///
    /// 设备编号按给定顺序重新赋为 0..n。
    pub fn discrete(
        site: Site,
        mut devices: Vec<Device>,
        footprint: Footprint,
        shape: TurbineShape,
    ) -> TfResult<Self> {
        if !(footprint.width > 0.0) || !(footprint.length > 0.0) {
            return Err(TfError::invalid_config(
                "footprint",
                format!("{}x{}", footprint.width, footprint.length),
                "占地尺寸必须为正",
            ));
        }
        for (i, d) in devices.iter_mut().enumerate() {
            d.index = i;
        }
        let model = Self {
            site,
            layout: FarmLayout::Discrete(DiscreteFarm { devices, footprint, shape }),
        };
        model.validate()?;
        Ok(model)
    }

    /// 创建连续农场
    pub fn continuous(site: Site, grid: FieldGrid, initial: f64, max_friction: f64) -> TfResult<Self> {
        let field = FrictionField::new(&site, grid, initial, max_friction)?;
        Ok(Self { site, layout: FarmLayout::Continuous(field) })
    }

    /// 由描述文件构建
    pub fn from_spec(spec: &FarmSpec) -> TfResult<Self> {
        spec.validate()?;
        let site = Site::from_points(&spec.site)?;
        match &spec.layout {
            LayoutSpec::Discrete { devices, grid, footprint, shape } => {
                let footprint = Footprint::new(footprint.width, footprint.length);
                let mut all: Vec<Device> = devices
                    .iter()
                    .enumerate()
                    .map(|(i, d)| Device::new(i, DVec2::from(d.position), d.friction))
                    .collect();
                if let Some(g) = grid {
                    let (min, max) = match g.region {
                        Some([lo, hi]) => (DVec2::from(lo), DVec2::from(hi)),
                        None => site.bounding_box(),
                    };
                    all.extend(deploy_grid(min, max, g.nx, g.ny, g.friction, &footprint, all.len())?);
                }
                debug!("离散农场: {} 台设备", all.len());
                Self::discrete(site, all, footprint, TurbineShape::from(*shape))
            }
            LayoutSpec::Continuous { nx, ny, initial_friction, max_friction } => {
                let grid = FieldGrid::covering(&site, *nx, *ny)?;
                debug!("连续农场: {}x{} 单元", nx, ny);
                Self::continuous(site, grid, *initial_friction, *max_friction)
            }
        }
    }

    /// 几何校验
    ///
    /// 离散模式：摩擦系数非负有限、位置在场址内、占地两两不重叠。
    pub fn validate(&self) -> TfResult<()> {
        let FarmLayout::Discrete(farm) = &self.layout else {
            return Ok(());
        };
        for d in &farm.devices {
            if !(d.friction >= 0.0) || !d.friction.is_finite() {
                return Err(TfError::invalid_config(
                    format!("devices[{}].friction", d.index),
                    d.friction,
                    "摩擦系数必须为非负有限值",
                ));
            }
        }
        self.check_in_site()?;
        for (i, a) in farm.devices.iter().enumerate() {
            for b in &farm.devices[i + 1..] {
                if farm.footprint.overlaps(a.position, b.position) {
                    return Err(TfError::Overlap {
                        first: a.index,
                        second: b.index,
                        distance: a.position.distance(b.position),
                        min_distance: farm.footprint.max_extent(),
                    });
                }
            }
        }
        Ok(())
    }

    /// 所有设备位置都在场址多边形内，连续模式总是成立
    pub fn check_in_site(&self) -> TfResult<()> {
        match self.devices().iter().find(|d| !self.site.contains(d.position)) {
            Some(d) => Err(TfError::OutOfSite {
                device: d.index,
                x: d.position.x,
                y: d.position.y,
            }),
            None => Ok(()),
        }
    }

    /// 场址
    pub fn site(&self) -> &Site {
        &self.site
    }

    /// 布局
    pub fn layout(&self) -> &FarmLayout {
        &self.layout
    }

    /// 可变布局（仅供映射写回）
    pub(crate) fn layout_mut(&mut self) -> &mut FarmLayout {
        &mut self.layout
    }

    /// 模式名称
    pub fn mode_name(&self) -> &'static str {
        match self.layout {
            FarmLayout::Discrete(_) => "discrete",
            FarmLayout::Continuous(_) => "continuous",
        }
    }

    /// 是否为连续模式
    pub fn is_continuous(&self) -> bool {
        matches!(self.layout, FarmLayout::Continuous(_))
    }

    /// 离散农场（若是）
    pub fn as_discrete(&self) -> Option<&DiscreteFarm> {
        match &self.layout {
            FarmLayout::Discrete(farm) => Some(farm),
            FarmLayout::Continuous(_) => None,
        }
    }

    /// 连续摩擦场（若是）
    pub fn as_field(&self) -> Option<&FrictionField> {
        match &self.layout {
            FarmLayout::Continuous(field) => Some(field),
            FarmLayout::Discrete(_) => None,
        }
    }

    /// 设备列表，连续模式为空
    pub fn devices(&self) -> &[Device] {
        self.as_discrete().map(DiscreteFarm::devices).unwrap_or(&[])
    }

    /// 实体数（设备数或单元数）
    pub fn n_entities(&self) -> usize {
        match &self.layout {
            FarmLayout::Discrete(farm) => farm.len(),
            FarmLayout::Continuous(field) => field.grid().n_cells(),
        }
    }

    /// 把控制向量写回模型
    pub fn apply(&mut self, control: &[f64], mapping: &ControlMapping) -> TfResult<()> {
        mapping.decode(control, self)
    }

    /// 所有设备摩擦系数设为同一值（连续模式设为场值）
    pub fn set_uniform_friction(&mut self, friction: f64) {
        match &mut self.layout {
            FarmLayout::Discrete(farm) => {
                for d in farm.devices_mut() {
                    d.friction = friction;
                }
            }
            FarmLayout::Continuous(field) => field.values_mut().fill(friction),
        }
    }

    /// 连续模式：把场址外的场值清零，返回改动单元数；离散模式无操作
    pub fn zero_outside_site(&mut self) -> usize {
        match &mut self.layout {
            FarmLayout::Continuous(field) => field.zero_outside_site(),
            FarmLayout::Discrete(_) => 0,
        }
    }
}
