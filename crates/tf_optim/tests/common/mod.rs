// crates/tf_optim/tests/common/mod.rs

//! 集成测试共用的农场与仿真桩

#![allow(dead_code)]

use glam::DVec2;
use tf_farm::{ControlMapping, Device, FarmModel, Footprint, Site, TurbineShape};
use tf_optim::{Simulation, SimulationError};

/// 100 × 100 矩形场址
pub fn square_site() -> Site {
    Site::rectangle(DVec2::ZERO, DVec2::new(100.0, 100.0)).unwrap()
}

/// 直角边 100 的三角形场址，斜边为 x + y = 100
pub fn triangle_site() -> Site {
    Site::from_points(&[[0.0, 0.0], [100.0, 0.0], [0.0, 100.0]]).unwrap()
}

/// 给定位置与摩擦的离散农场
pub fn discrete_farm(devices: &[([f64; 2], f64)], footprint: f64) -> FarmModel {
    let devices = devices
        .iter()
        .enumerate()
        .map(|(i, (p, f))| Device::new(i, DVec2::from(*p), *f))
        .collect();
    FarmModel::discrete(
        square_site(),
        devices,
        Footprint::new(footprint, footprint),
        TurbineShape::Bump,
    )
    .unwrap()
}

/// J = Σ f_i²；`gradient_scale` 为 2 时梯度正确
pub struct FrictionSquares {
    pub gradient_scale: f64,
}

impl Simulation for FrictionSquares {
    fn name(&self) -> &'static str {
        "friction_squares"
    }

    fn forward(&mut self, farm: &FarmModel) -> Result<f64, SimulationError> {
        Ok(farm.devices().iter().map(|d| d.friction * d.friction).sum())
    }

    fn adjoint(
        &mut self,
        farm: &FarmModel,
        mapping: &ControlMapping,
    ) -> Result<Vec<f64>, SimulationError> {
        let mut g = vec![0.0; mapping.len()];
        for d in farm.devices() {
            if let Some(k) = mapping.friction_slot(d.index) {
                g[k] = self.gradient_scale * d.friction;
            }
        }
        Ok(g)
    }
}

/// J = |p_0 - p_1|²，把两台设备拉到一起
pub struct PairDistance;

impl Simulation for PairDistance {
    fn name(&self) -> &'static str {
        "pair_distance"
    }

    fn forward(&mut self, farm: &FarmModel) -> Result<f64, SimulationError> {
        let d = farm.devices();
        Ok(d[0].position.distance_squared(d[1].position))
    }

    fn adjoint(
        &mut self,
        farm: &FarmModel,
        mapping: &ControlMapping,
    ) -> Result<Vec<f64>, SimulationError> {
        let d = farm.devices();
        let delta = 2.0 * (d[0].position - d[1].position);
        let mut g = vec![0.0; mapping.len()];
        if let (Some((x0, y0)), Some((x1, y1))) = (mapping.position_slots(0), mapping.position_slots(1)) {
            g[x0] = delta.x;
            g[y0] = delta.y;
            g[x1] = -delta.x;
            g[y1] = -delta.y;
        }
        Ok(g)
    }
}

/// J = Σ (f_i - 10)²，任一摩擦超过 `limit` 时不收敛
pub struct FragileQuadratic {
    pub limit: f64,
}

impl Simulation for FragileQuadratic {
    fn name(&self) -> &'static str {
        "fragile_quadratic"
    }

    fn forward(&mut self, farm: &FarmModel) -> Result<f64, SimulationError> {
        let mut j = 0.0;
        for d in farm.devices() {
            if d.friction > self.limit {
                return Err(SimulationError::NotConverged(format!(
                    "摩擦 {} 超过稳定上限",
                    d.friction
                )));
            }
            j += (d.friction - 10.0).powi(2);
        }
        Ok(j)
    }

    fn adjoint(
        &mut self,
        farm: &FarmModel,
        mapping: &ControlMapping,
    ) -> Result<Vec<f64>, SimulationError> {
        let mut g = vec![0.0; mapping.len()];
        for d in farm.devices() {
            if let Some(k) = mapping.friction_slot(d.index) {
                g[k] = 2.0 * (d.friction - 10.0);
            }
        }
        Ok(g)
    }
}
