// crates/tf_optim/src/backends/wake.rs

//! 尾流功率代理模型
//!
//! 离散农场：
//!
//! ```text
//! D_i = 1 + a f_i + Σ_{j≠i} c f_j w_ij,   w_ij = exp(-|p_i - p_j|² / ℓ²)
//! u_i = U0 s(p_i) / D_i
//! P   = Σ_i k f_i u_i³
//! ```
//!
//! `s(p) = 1 + β sin(πξ) sin(πη)` 是场址外包框内的来流分布（中心流速最大）。
//! 连续农场只对场址内单元求和：`P = Σ_{c∈Ω} A k f_c u_c³`，`u_c = U0 s(x_c) / (1 + a f_c)`，
//! 场址外单元的梯度为零。
//!
//! 摩擦为零时功率为零。有效阻力 `D` 非正时报告不收敛。

use std::f64::consts::PI;

use glam::DVec2;
use tf_farm::{ControlMapping, FarmLayout, FarmModel, Site};

use crate::simulation::{Simulation, SimulationError};

/// 代理模型参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WakeParams {
    /// 来流速度 U0 [m/s]
    pub free_stream: f64,
    /// 功率系数 k
    pub power_coefficient: f64,
    /// 自身诱导系数 a
    pub induction: f64,
    /// 尾流耦合系数 c
    pub wake_coupling: f64,
    /// 尾流长度尺度 ℓ [m]
    pub wake_length: f64,
    /// 来流中心增强 β
    pub channel_boost: f64,
}

impl Default for WakeParams {
    fn default() -> Self {
        Self {
            free_stream: 2.0,
            power_coefficient: 1.0,
            induction: 0.05,
            wake_coupling: 0.02,
            wake_length: 50.0,
            channel_boost: 0.2,
        }
    }
}

/// 尾流功率代理
#[derive(Debug, Clone, Default)]
pub struct WakeSurrogate {
    params: WakeParams,
}

/// 离散农场的中间量
struct DiscreteState {
    positions: Vec<DVec2>,
    friction: Vec<f64>,
    resistance: Vec<f64>,
    velocity: Vec<f64>,
}

impl WakeSurrogate {
    /// 创建
    pub fn new(params: WakeParams) -> Self {
        Self { params }
    }

    /// 参数
    pub fn params(&self) -> &WakeParams {
        &self.params
    }

    /// 来流分布 s(p) 及其梯度
    fn profile(&self, site: &Site, p: DVec2) -> (f64, DVec2) {
        let (min, max) = site.bounding_box();
        let size = max - min;
        let xi = (p.x - min.x) / size.x;
        let eta = (p.y - min.y) / size.y;
        let (sx, cx) = (PI * xi).sin_cos();
        let (sy, cy) = (PI * eta).sin_cos();
        let beta = self.params.channel_boost;
        let grad = DVec2::new(beta * PI * cx * sy / size.x, beta * PI * sx * cy / size.y);
        (1.0 + beta * sx * sy, grad)
    }

    fn weight(&self, a: DVec2, b: DVec2) -> f64 {
        let l2 = self.params.wake_length * self.params.wake_length;
        (-a.distance_squared(b) / l2).exp()
    }

    fn discrete_state(&self, farm: &FarmModel) -> Result<DiscreteState, SimulationError> {
        let devices = farm.devices();
        let positions: Vec<DVec2> = devices.iter().map(|d| d.position).collect();
        let friction: Vec<f64> = devices.iter().map(|d| d.friction).collect();
        let n = devices.len();
        let WakeParams { free_stream, induction, wake_coupling, .. } = self.params;

        let mut resistance = Vec::with_capacity(n);
        let mut velocity = Vec::with_capacity(n);
        for i in 0..n {
            let (s, _) = self.profile(farm.site(), positions[i]);
            let mut d = 1.0 + induction * friction[i];
            for j in (0..n).filter(|&j| j != i) {
                d += wake_coupling * friction[j] * self.weight(positions[i], positions[j]);
            }
            if !(d > 0.0) {
                return Err(SimulationError::NotConverged(format!(
                    "设备 {i} 有效阻力非正: {d:.3e}"
                )));
            }
            resistance.push(d);
            velocity.push(free_stream * s / d);
        }
        Ok(DiscreteState { positions, friction, resistance, velocity })
    }

    fn discrete_adjoint(
        &self,
        farm: &FarmModel,
        mapping: &ControlMapping,
    ) -> Result<Vec<f64>, SimulationError> {
        let st = self.discrete_state(farm)?;
        let WakeParams { free_stream, power_coefficient: k, induction: a, wake_coupling: c, wake_length, .. } =
            self.params;
        let n = st.positions.len();
        let l2 = wake_length * wake_length;

        // q_i = ∂P/∂u_i，e_i = -∂P/∂D_i
        let q: Vec<f64> = (0..n).map(|i| 3.0 * k * st.friction[i] * st.velocity[i].powi(2)).collect();
        let e: Vec<f64> = (0..n).map(|i| q[i] * st.velocity[i] / st.resistance[i]).collect();

        let mut g = vec![0.0; mapping.len()];
        for m in 0..n {
            if let Some(slot) = mapping.friction_slot(m) {
                let mut dp = k * st.velocity[m].powi(3) - a * e[m];
                for i in (0..n).filter(|&i| i != m) {
                    dp -= c * e[i] * self.weight(st.positions[i], st.positions[m]);
                }
                g[slot] = dp;
            }
            if let Some((sx, sy)) = mapping.position_slots(m) {
                let (_, grad_s) = self.profile(farm.site(), st.positions[m]);
                let mut dp = grad_s * (q[m] * free_stream / st.resistance[m]);
                for j in (0..n).filter(|&j| j != m) {
                    let w = self.weight(st.positions[m], st.positions[j]);
                    let coupling = e[m] * st.friction[j] + e[j] * st.friction[m];
                    dp += (st.positions[m] - st.positions[j]) * (2.0 * c / l2 * w * coupling);
                }
                g[sx] = dp.x;
                g[sy] = dp.y;
            }
        }
        Ok(g)
    }
}

impl Simulation for WakeSurrogate {
    fn name(&self) -> &'static str {
        "wake_surrogate"
    }

    fn forward(&mut self, farm: &FarmModel) -> Result<f64, SimulationError> {
        let k = self.params.power_coefficient;
        match farm.layout() {
            FarmLayout::Discrete(_) => {
                let st = self.discrete_state(farm)?;
                Ok(st
                    .friction
                    .iter()
                    .zip(&st.velocity)
                    .map(|(f, u)| k * f * u.powi(3))
                    .sum())
            }
            FarmLayout::Continuous(field) => {
                let grid = field.grid();
                let area = grid.cell_area();
                let mut power = 0.0;
                for (cell, (center, &f)) in grid.cell_centers().zip(field.values()).enumerate() {
                    // 只积分场址内的功率
                    if !field.in_support(cell) {
                        continue;
                    }
                    let d = 1.0 + self.params.induction * f;
                    if !(d > 0.0) {
                        return Err(SimulationError::NotConverged(format!("单元阻力非正: {d:.3e}")));
                    }
                    let (s, _) = self.profile(farm.site(), center);
                    let u = self.params.free_stream * s / d;
                    power += area * k * f * u.powi(3);
                }
                Ok(power)
            }
        }
    }

    fn adjoint(
        &mut self,
        farm: &FarmModel,
        mapping: &ControlMapping,
    ) -> Result<Vec<f64>, SimulationError> {
        match farm.layout() {
            FarmLayout::Discrete(_) => self.discrete_adjoint(farm, mapping),
            FarmLayout::Continuous(field) => {
                let grid = field.grid();
                let area = grid.cell_area();
                let WakeParams { free_stream, power_coefficient: k, induction: a, .. } = self.params;
                let mut g = vec![0.0; mapping.len()];
                for (cell, (center, &f)) in grid.cell_centers().zip(field.values()).enumerate() {
                    let Some(slot) = mapping.cell_slot(cell) else {
                        continue;
                    };
                    if !field.in_support(cell) {
                        continue;
                    }
                    let d = 1.0 + a * f;
                    let (s, _) = self.profile(farm.site(), center);
                    let u = free_stream * s / d;
                    g[slot] = area * k * u.powi(3) * (1.0 - 3.0 * a * f / d);
                }
                Ok(g)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tf_config::ControlSelection;
    use tf_farm::{Device, FieldGrid, Footprint, TurbineShape};

    fn farm(frictions: [f64; 3]) -> FarmModel {
        let site = Site::rectangle(DVec2::ZERO, DVec2::new(300.0, 100.0)).unwrap();
        let devices = vec![
            Device::new(0, DVec2::new(60.0, 50.0), frictions[0]),
            Device::new(1, DVec2::new(110.0, 40.0), frictions[1]),
            Device::new(2, DVec2::new(170.0, 55.0), frictions[2]),
        ];
        FarmModel::discrete(site, devices, Footprint::new(20.0, 20.0), TurbineShape::Bump).unwrap()
    }

    #[test]
    fn test_zero_friction_zero_power() {
        let mut sim = WakeSurrogate::default();
        assert_eq!(sim.forward(&farm([0.0; 3])).unwrap(), 0.0);
    }

    #[test]
    fn test_isolated_device_power() {
        let site = Site::rectangle(DVec2::ZERO, DVec2::new(100.0, 100.0)).unwrap();
        let f = FarmModel::discrete(
            site,
            vec![Device::new(0, DVec2::new(50.0, 50.0), 10.0)],
            Footprint::new(20.0, 20.0),
            TurbineShape::Bump,
        )
        .unwrap();
        let mut sim = WakeSurrogate::default();
        // s = 1.2, D = 1.5, u = 1.6, P = 10 * 1.6³
        let expected = 10.0 * 1.6_f64.powi(3);
        assert!((sim.forward(&f).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_discrete_gradient_matches_finite_difference() {
        let base = farm([3.0, 8.0, 12.0]);
        let mapping = ControlMapping::build(&base, ControlSelection::FrictionAndPosition).unwrap();
        let x = mapping.encode(&base).unwrap();
        let mut sim = WakeSurrogate::default();
        let g = sim.adjoint(&base, &mapping).unwrap();

        let eps = 1e-6;
        for k in 0..x.len() {
            let mut plus = base.clone();
            let mut minus = base.clone();
            let mut xp = x.clone();
            let mut xm = x.clone();
            xp[k] += eps;
            xm[k] -= eps;
            mapping.decode(&xp, &mut plus).unwrap();
            mapping.decode(&xm, &mut minus).unwrap();
            let fd = (sim.forward(&plus).unwrap() - sim.forward(&minus).unwrap()) / (2.0 * eps);
            assert!((fd - g[k]).abs() < 1e-5 * fd.abs().max(1.0), "slot {k}: fd {fd} vs {}", g[k]);
        }
    }

    #[test]
    fn test_continuous_gradient_matches_finite_difference() {
        let site = Site::rectangle(DVec2::ZERO, DVec2::new(100.0, 50.0)).unwrap();
        let grid = FieldGrid::covering(&site, 4, 2).unwrap();
        let base = FarmModel::continuous(site, grid, 2.0, 50.0).unwrap();
        let mapping = ControlMapping::build(&base, ControlSelection::Friction).unwrap();
        let x = mapping.encode(&base).unwrap();
        let mut sim = WakeSurrogate::default();
        let g = sim.adjoint(&base, &mapping).unwrap();

        let eps = 1e-6;
        for k in 0..x.len() {
            let mut plus = base.clone();
            let mut minus = base.clone();
            let mut xp = x.clone();
            let mut xm = x.clone();
            xp[k] += eps;
            xm[k] -= eps;
            mapping.decode(&xp, &mut plus).unwrap();
            mapping.decode(&xm, &mut minus).unwrap();
            let fd = (sim.forward(&plus).unwrap() - sim.forward(&minus).unwrap()) / (2.0 * eps);
            assert!((fd - g[k]).abs() < 1e-5 * fd.abs().max(1.0), "cell {k}: fd {fd} vs {}", g[k]);
        }
    }

    #[test]
    fn test_continuous_ignores_cells_outside_site() {
        let site = Site::from_points(&[[0.0, 0.0], [100.0, 0.0], [0.0, 100.0]]).unwrap();
        let grid = FieldGrid::covering(&site, 4, 4).unwrap();
        let mut farm = FarmModel::continuous(site, grid, 3.0, 20.0).unwrap();
        let mapping = ControlMapping::build(&farm, ControlSelection::Friction).unwrap();
        let mut sim = WakeSurrogate::default();
        let before = sim.forward(&farm).unwrap();
        let g = sim.adjoint(&farm, &mapping).unwrap();

        let field = farm.as_field().unwrap().clone();
        assert!(field.support_len() < field.grid().n_cells());
        for cell in 0..field.grid().n_cells() {
            if field.in_support(cell) {
                assert!(g[cell] != 0.0, "单元 {cell}");
            } else {
                assert_eq!(g[cell], 0.0, "单元 {cell}");
            }
        }

        // 清零场址外单元不改变功率
        assert!(farm.zero_outside_site() > 0);
        assert_eq!(sim.forward(&farm).unwrap(), before);
    }

    #[test]
    fn test_negative_resistance_does_not_converge() {
        let mut f = farm([1.0; 3]);
        let mapping = ControlMapping::build(&f, ControlSelection::Friction).unwrap();
        mapping.decode(&[-30.0, 1.0, 1.0], &mut f).unwrap();
        let mut sim = WakeSurrogate::default();
        let err = sim.forward(&f).unwrap_err();
        assert!(matches!(err, SimulationError::NotConverged(_)));
    }
}
