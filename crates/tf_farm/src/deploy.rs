// crates/tf_farm/src/deploy.rs

//! 规则网格布置
//!
//! 在矩形区域内按 `nx × ny` 均匀布置设备，外圈设备与区域边界留出半个占地，
//! 使占地完整落在区域内。单行/单列时设备居中。

use glam::DVec2;
use tf_foundation::{TfError, TfResult};

use crate::device::{Device, Footprint};

/// 在 [min, max] 区域内布置 nx × ny 台设备
///
/// 编号从 `first_index` 开始，按 x 外层、y 内层递增。
pub fn deploy_grid(
    min: DVec2,
    max: DVec2,
    nx: usize,
    ny: usize,
    friction: f64,
    footprint: &Footprint,
    first_index: usize,
) -> TfResult<Vec<Device>> {
    if nx == 0 || ny == 0 {
        return Err(TfError::invalid_config("grid", format!("{nx}x{ny}"), "台数必须为正"));
    }
    if friction < 0.0 {
        return Err(TfError::invalid_config("grid.friction", friction, "摩擦系数不能为负"));
    }
    let half = footprint.half_extent();
    let lo = min + half;
    let hi = max - half;
    if lo.x > hi.x || lo.y > hi.y {
        return Err(TfError::invalid_config(
            "grid.region",
            format!("[{min}, {max}]"),
            "区域放不下一个完整占地",
        ));
    }

    let xs = linspace(lo.x, hi.x, nx);
    let ys = linspace(lo.y, hi.y, ny);
    let mut devices = Vec::with_capacity(nx * ny);
    for &x in &xs {
        for &y in &ys {
            let index = first_index + devices.len();
            devices.push(Device::new(index, DVec2::new(x, y), friction));
        }
    }
    Ok(devices)
}

fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![0.5 * (a + b)];
    }
    let step = (b - a) / (n - 1) as f64;
    (0..n).map(|i| a + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_grid_positions() {
        let fp = Footprint::new(20.0, 20.0);
        let devices =
            deploy_grid(DVec2::ZERO, DVec2::new(100.0, 60.0), 3, 2, 12.0, &fp, 0).unwrap();
        assert_eq!(devices.len(), 6);
        assert_eq!(devices[0].position, DVec2::new(10.0, 10.0));
        assert_eq!(devices[1].position, DVec2::new(10.0, 50.0));
        assert_eq!(devices[5].position, DVec2::new(90.0, 50.0));
        assert!(devices.iter().enumerate().all(|(i, d)| d.index == i && d.friction == 12.0));
    }

    #[test]
    fn test_single_device_is_centered() {
        let fp = Footprint::new(2.0, 2.0);
        let devices = deploy_grid(DVec2::ZERO, DVec2::new(10.0, 4.0), 1, 1, 1.0, &fp, 7).unwrap();
        assert_eq!(devices[0].position, DVec2::new(5.0, 2.0));
        assert_eq!(devices[0].index, 7);
    }

    #[test]
    fn test_region_too_small() {
        let fp = Footprint::new(20.0, 20.0);
        assert!(deploy_grid(DVec2::ZERO, DVec2::new(10.0, 100.0), 1, 1, 1.0, &fp, 0).is_err());
    }
}
