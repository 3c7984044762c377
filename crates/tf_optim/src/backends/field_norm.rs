// crates/tf_optim/src/backends/field_norm.rs

//! 摩擦场 L2 范数
//!
//! `J = Σ_c A_c F(x_c)²`，离散农场的 F 由设备形状叠加到网格上得到，
//! 连续农场的 F 即场值。梯度通过形状函数的解析偏导精确给出，
//! 适合作为映射与梯度链路的检验目标。

use tf_farm::{ControlMapping, FarmLayout, FarmModel, FieldGrid};
use tf_foundation::TfResult;

use crate::simulation::{Simulation, SimulationError};

/// 摩擦场范数目标
#[derive(Debug, Clone)]
pub struct FieldNormFunctional {
    grid: Option<FieldGrid>,
}

impl FieldNormFunctional {
    /// 离散农场在给定网格上叠加
    pub fn new(grid: FieldGrid) -> Self {
        Self { grid: Some(grid) }
    }

    /// 覆盖场址外包框的 `resolution × resolution` 网格
    pub fn for_farm(farm: &FarmModel, resolution: usize) -> TfResult<Self> {
        let grid = match farm.as_field() {
            Some(field) => *field.grid(),
            None => FieldGrid::covering(farm.site(), resolution, resolution)?,
        };
        Ok(Self::new(grid))
    }

    /// 仅用于连续农场
    pub fn continuous() -> Self {
        Self { grid: None }
    }

    fn discrete_grid(&self) -> Result<&FieldGrid, SimulationError> {
        self.grid
            .as_ref()
            .ok_or_else(|| SimulationError::Backend("离散农场需要叠加网格".into()))
    }
}

impl Simulation for FieldNormFunctional {
    fn name(&self) -> &'static str {
        "field_norm"
    }

    fn forward(&mut self, farm: &FarmModel) -> Result<f64, SimulationError> {
        match farm.layout() {
            FarmLayout::Discrete(d) => {
                let grid = self.discrete_grid()?;
                let field = d.shape().rasterize(d.devices(), d.footprint(), grid);
                Ok(grid.cell_area() * field.iter().map(|v| v * v).sum::<f64>())
            }
            FarmLayout::Continuous(field) => {
                let area = field.grid().cell_area();
                let sum: f64 = field
                    .values()
                    .iter()
                    .enumerate()
                    .filter(|&(cell, _)| field.in_support(cell))
                    .map(|(_, v)| v * v)
                    .sum();
                Ok(area * sum)
            }
        }
    }

    fn adjoint(
        &mut self,
        farm: &FarmModel,
        mapping: &ControlMapping,
    ) -> Result<Vec<f64>, SimulationError> {
        let mut g = vec![0.0; mapping.len()];
        match farm.layout() {
            FarmLayout::Discrete(d) => {
                let grid = self.discrete_grid()?;
                let shape = d.shape();
                let field = shape.rasterize(d.devices(), d.footprint(), grid);
                let area = grid.cell_area();
                for (center, &f) in grid.cell_centers().zip(&field) {
                    if f == 0.0 {
                        continue;
                    }
                    let w = 2.0 * area * f;
                    for device in d.devices() {
                        let s = shape.sample(device, d.footprint(), center);
                        if let Some(k) = mapping.friction_slot(device.index) {
                            g[k] += w * s.d_friction;
                        }
                        if let Some((kx, ky)) = mapping.position_slots(device.index) {
                            g[kx] += w * s.d_x;
                            g[ky] += w * s.d_y;
                        }
                    }
                }
            }
            FarmLayout::Continuous(field) => {
                let area = field.grid().cell_area();
                for (cell, &v) in field.values().iter().enumerate() {
                    if let (Some(k), true) = (mapping.cell_slot(cell), field.in_support(cell)) {
                        g[k] = 2.0 * area * v;
                    }
                }
            }
        }
        Ok(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;
    use tf_config::ControlSelection;
    use tf_farm::{Device, Footprint, Site, TurbineShape};

    #[test]
    fn test_zero_friction_gives_zero() {
        let site = Site::rectangle(DVec2::ZERO, DVec2::new(100.0, 100.0)).unwrap();
        let farm = FarmModel::discrete(
            site,
            vec![Device::new(0, DVec2::new(50.0, 50.0), 0.0)],
            Footprint::new(20.0, 20.0),
            TurbineShape::Bump,
        )
        .unwrap();
        let mut sim = FieldNormFunctional::for_farm(&farm, 20).unwrap();
        assert_eq!(sim.forward(&farm).unwrap(), 0.0);
    }

    #[test]
    fn test_continuous_gradient() {
        let site = Site::rectangle(DVec2::ZERO, DVec2::new(10.0, 10.0)).unwrap();
        let grid = FieldGrid::covering(&site, 2, 2).unwrap();
        let farm = FarmModel::continuous(site, grid, 0.5, 1.0).unwrap();
        let mapping = ControlMapping::build(&farm, ControlSelection::Friction).unwrap();
        let mut sim = FieldNormFunctional::continuous();
        // 4 个单元，面积 25
        assert!((sim.forward(&farm).unwrap() - 25.0).abs() < 1e-12);
        assert_eq!(sim.adjoint(&farm, &mapping).unwrap(), vec![25.0; 4]);
    }
}
