// crates/tf_farm/src/device.rs

//! 设备（涡轮）描述

use glam::DVec2;

/// 单台设备
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Device {
    /// 编号（与在农场中的顺序一致）
    pub index: usize,
    /// 位置 [m]
    pub position: DVec2,
    /// 摩擦系数（非负）
    pub friction: f64,
}

impl Device {
    /// 创建设备
    pub fn new(index: usize, position: DVec2, friction: f64) -> Self {
        Self { index, position, friction }
    }
}

/// 设备占地（以设备位置为中心的轴对齐矩形）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// x 方向宽度 [m]
    pub width: f64,
    /// y 方向长度 [m]
    pub length: f64,
}

impl Footprint {
    /// 创建占地
    pub fn new(width: f64, length: f64) -> Self {
        Self { width, length }
    }

    /// 半宽/半长
    #[inline]
    pub fn half_extent(&self) -> DVec2 {
        DVec2::new(0.5 * self.width, 0.5 * self.length)
    }

    /// 最大边长，缺省的最小间距
    #[inline]
    pub fn max_extent(&self) -> f64 {
        self.width.max(self.length)
    }

    /// 两个相同占地、中心分别在 a、b 的矩形是否重叠（仅接触不算）
    pub fn overlaps(&self, a: DVec2, b: DVec2) -> bool {
        let d = (a - b).abs();
        d.x < self.width && d.y < self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap() {
        let fp = Footprint::new(20.0, 10.0);
        assert!(fp.overlaps(DVec2::new(0.0, 0.0), DVec2::new(19.0, 9.0)));
        assert!(!fp.overlaps(DVec2::new(0.0, 0.0), DVec2::new(20.0, 0.0))); // 接触
        assert!(!fp.overlaps(DVec2::new(0.0, 0.0), DVec2::new(5.0, 10.5)));
    }

    #[test]
    fn test_extents() {
        let fp = Footprint::new(20.0, 40.0);
        assert_eq!(fp.half_extent(), DVec2::new(10.0, 20.0));
        assert_eq!(fp.max_extent(), 40.0);
    }
}
