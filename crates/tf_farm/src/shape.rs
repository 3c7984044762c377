// crates/tf_farm/src/shape.rs

//! 涡轮摩擦分布形状
//!
//! 把单台设备的摩擦系数按占地铺成空间分布 `F(x) = f · ψ(t_x) · ψ(t_y)`，
//! 其中 `t_x = (x - p_x) / r_x`，`t_y = (y - p_y) / r_y`，`r` 为占地半宽/半长。
//!
//! - Bump: `ψ(t) = exp(1 - 1/(1 - t²))`，|t| < 1，紧支撑且光滑，中心值为 1
//! - Gaussian: `ψ(t) = exp(-t²)`
//!
//! 形状在农场构建时确定一次，之后不再按名称分发。

use glam::DVec2;
use tf_config::ShapeKind;

use crate::device::{Device, Footprint};
use crate::field::FieldGrid;

/// 设备摩擦分布形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurbineShape {
    /// 紧支撑 bump 函数
    #[default]
    Bump,
    /// 高斯函数
    Gaussian,
}

/// 单点处的分布值及其偏导
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShapeSample {
    /// F(x)
    pub value: f64,
    /// ∂F/∂f
    pub d_friction: f64,
    /// ∂F/∂p_x
    pub d_x: f64,
    /// ∂F/∂p_y
    pub d_y: f64,
}

impl From<ShapeKind> for TurbineShape {
    fn from(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Bump => Self::Bump,
            ShapeKind::Gaussian => Self::Gaussian,
        }
    }
}

impl TurbineShape {
    /// 一维形函数 ψ(t) 与 ψ'(t)
    #[inline]
    fn profile(self, t: f64) -> (f64, f64) {
        match self {
            Self::Bump => {
                let s = 1.0 - t * t;
                if s <= 0.0 {
                    return (0.0, 0.0);
                }
                let psi = (1.0 - 1.0 / s).exp();
                (psi, psi * (-2.0 * t / (s * s)))
            }
            Self::Gaussian => {
                let psi = (-t * t).exp();
                (psi, -2.0 * t * psi)
            }
        }
    }

    /// 设备在点 x 处的分布值与偏导
    pub fn sample(self, device: &Device, footprint: &Footprint, x: DVec2) -> ShapeSample {
        let r = footprint.half_extent();
        let t = (x - device.position) / r;
        let (px, dpx) = self.profile(t.x);
        if px == 0.0 {
            return ShapeSample::default();
        }
        let (py, dpy) = self.profile(t.y);
        let unit = px * py;
        ShapeSample {
            value: device.friction * unit,
            d_friction: unit,
            // dt/dp = -1/r
            d_x: -device.friction * dpx * py / r.x,
            d_y: -device.friction * px * dpy / r.y,
        }
    }

    /// 把所有设备的分布叠加到网格单元中心上
    pub fn rasterize(self, devices: &[Device], footprint: &Footprint, grid: &FieldGrid) -> Vec<f64> {
        grid.cell_centers()
            .map(|c| devices.iter().map(|d| self.sample(d, footprint, c).value).sum())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(x: f64, y: f64, f: f64) -> Device {
        Device::new(0, DVec2::new(x, y), f)
    }

    #[test]
    fn test_bump_center_and_support() {
        let fp = Footprint::new(20.0, 20.0);
        let d = device(0.0, 0.0, 3.0);
        let s = TurbineShape::Bump.sample(&d, &fp, DVec2::ZERO);
        assert!((s.value - 3.0).abs() < 1e-12);
        assert!((s.d_friction - 1.0).abs() < 1e-12);
        assert!(s.d_x.abs() < 1e-12);
        // 支撑外为零
        let s = TurbineShape::Bump.sample(&d, &fp, DVec2::new(10.0, 0.0));
        assert_eq!(s.value, 0.0);
    }

    #[test]
    fn test_partial_derivatives_match_finite_difference() {
        let fp = Footprint::new(20.0, 40.0);
        let x = DVec2::new(3.0, -5.0);
        let eps = 1e-6;
        for shape in [TurbineShape::Bump, TurbineShape::Gaussian] {
            let d = device(1.0, 2.0, 4.0);
            let s = shape.sample(&d, &fp, x);

            let dx_plus = shape.sample(&device(1.0 + eps, 2.0, 4.0), &fp, x).value;
            let dx_minus = shape.sample(&device(1.0 - eps, 2.0, 4.0), &fp, x).value;
            let fd_x = (dx_plus - dx_minus) / (2.0 * eps);
            assert!((fd_x - s.d_x).abs() < 1e-6, "{shape:?}: {fd_x} vs {}", s.d_x);

            let dy_plus = shape.sample(&device(1.0, 2.0 + eps, 4.0), &fp, x).value;
            let dy_minus = shape.sample(&device(1.0, 2.0 - eps, 4.0), &fp, x).value;
            let fd_y = (dy_plus - dy_minus) / (2.0 * eps);
            assert!((fd_y - s.d_y).abs() < 1e-6, "{shape:?}: {fd_y} vs {}", s.d_y);

            assert!((s.value - 4.0 * s.d_friction).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rasterize_sums_devices() {
        let fp = Footprint::new(2.0, 2.0);
        let grid = FieldGrid::new(DVec2::ZERO, 4, 1, DVec2::ONE).unwrap();
        let devices = [
            Device::new(0, DVec2::new(0.5, 0.5), 1.0),
            Device::new(1, DVec2::new(3.5, 0.5), 2.0),
        ];
        let field = TurbineShape::Bump.rasterize(&devices, &fp, &grid);
        assert_eq!(field.len(), 4);
        assert!((field[0] - 1.0).abs() < 1e-12);
        assert!((field[3] - 2.0).abs() < 1e-12);
        // 单元 1 距设备 0 一个半宽，位于支撑边界上
        assert!(field[1].abs() < 1e-12);
    }
}
