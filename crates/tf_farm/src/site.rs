// crates/tf_farm/src/site.rs

//! 场址几何
//!
//! 场址是一个简单多边形（顶点顺序任意），用于校验设备位置、
//! 划定连续摩擦场的支撑区域以及生成位置上下界。

use glam::DVec2;
use tf_foundation::{TfError, TfResult};

/// 场址多边形
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    vertices: Vec<DVec2>,
    min: DVec2,
    max: DVec2,
}

impl Site {
    /// 由顶点创建场址
    ///
    /// 至少 3 个有限顶点且面积非零。
    pub fn new(vertices: Vec<DVec2>) -> TfResult<Self> {
        if vertices.len() < 3 {
            return Err(TfError::invalid_config("site", vertices.len(), "多边形至少需要 3 个顶点"));
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(TfError::invalid_config("site", "NaN/Inf", "顶点坐标必须有限"));
        }
        let min = vertices.iter().fold(DVec2::splat(f64::INFINITY), |m, v| m.min(*v));
        let max = vertices.iter().fold(DVec2::splat(f64::NEG_INFINITY), |m, v| m.max(*v));
        let site = Self { vertices, min, max };
        if site.area() <= 0.0 {
            return Err(TfError::invalid_config("site", "退化多边形", "面积必须为正"));
        }
        Ok(site)
    }

    /// 轴对齐矩形场址
    pub fn rectangle(min: DVec2, max: DVec2) -> TfResult<Self> {
        Self::new(vec![
            min,
            DVec2::new(max.x, min.y),
            max,
            DVec2::new(min.x, max.y),
        ])
    }

    /// 从 `[x, y]` 数组创建
    pub fn from_points(points: &[[f64; 2]]) -> TfResult<Self> {
        Self::new(points.iter().map(|p| DVec2::from(*p)).collect())
    }

    /// 顶点
    pub fn vertices(&self) -> &[DVec2] {
        &self.vertices
    }

    /// 外包框 (min, max)
    pub fn bounding_box(&self) -> (DVec2, DVec2) {
        (self.min, self.max)
    }

    /// 面积（鞋带公式）
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// 有向面积，逆时针为正
    fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        let twice: f64 = (0..n)
            .map(|i| self.vertices[i].perp_dot(self.vertices[(i + 1) % n]))
            .sum();
        0.5 * twice
    }

    /// 是否为凸多边形（共线顶点不影响判断）
    pub fn is_convex(&self) -> bool {
        let n = self.vertices.len();
        let mut turn = 0.0_f64;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let c = self.vertices[(i + 2) % n];
            let cross = (b - a).perp_dot(c - b);
            if cross.abs() <= 1e-12 * (b - a).length() * (c - b).length() {
                continue;
            }
            if turn == 0.0 {
                turn = cross.signum();
            } else if cross.signum() != turn {
                return false;
            }
        }
        true
    }

    /// 每条边的起点与单位内法向
    ///
    /// 凸场址内的点对每条边都满足 `n · (p - a) ≥ 0`。长度为零的边被跳过。
    pub fn inward_edges(&self) -> Vec<(DVec2, DVec2)> {
        let n = self.vertices.len();
        let orientation = self.signed_area().signum();
        (0..n)
            .filter_map(|i| {
                let a = self.vertices[i];
                let edge = self.vertices[(i + 1) % n] - a;
                let len = edge.length();
                (len > 0.0).then(|| (a, edge.perp() * (orientation / len)))
            })
            .collect()
    }

    /// 形心（顶点平均）
    pub fn center(&self) -> DVec2 {
        self.vertices.iter().copied().sum::<DVec2>() / self.vertices.len() as f64
    }

    /// 点是否位于场址内（含边界）
    pub fn contains(&self, p: DVec2) -> bool {
        if p.x < self.min.x || p.x > self.max.x || p.y < self.min.y || p.y > self.max.y {
            return false;
        }
        let n = self.vertices.len();
        let mut inside = false;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            if on_segment(p, a, b) {
                return true;
            }
            // 射线法
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

fn on_segment(p: DVec2, a: DVec2, b: DVec2) -> bool {
    let ab = b - a;
    let ap = p - a;
    let scale = ab.length().max(1.0);
    if ab.perp_dot(ap).abs() > 1e-12 * scale * scale {
        return false;
    }
    let t = ap.dot(ab);
    t >= 0.0 && t <= ab.length_squared()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Site {
        Site::rectangle(DVec2::ZERO, DVec2::ONE).unwrap()
    }

    #[test]
    fn test_rectangle_area_and_box() {
        let site = Site::rectangle(DVec2::new(1.0, 2.0), DVec2::new(4.0, 6.0)).unwrap();
        assert!((site.area() - 12.0).abs() < 1e-12);
        assert_eq!(site.bounding_box(), (DVec2::new(1.0, 2.0), DVec2::new(4.0, 6.0)));
        assert!((site.center() - DVec2::new(2.5, 4.0)).length() < 1e-12);
    }

    #[test]
    fn test_contains_interior_boundary_exterior() {
        let site = unit_square();
        assert!(site.contains(DVec2::new(0.5, 0.5)));
        assert!(site.contains(DVec2::new(0.0, 0.3))); // 边界
        assert!(site.contains(DVec2::new(1.0, 1.0))); // 顶点
        assert!(!site.contains(DVec2::new(1.2, 0.5)));
        assert!(!site.contains(DVec2::new(-0.01, 0.5)));
    }

    #[test]
    fn test_contains_concave() {
        // L 形场址
        let site = Site::from_points(&[
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [0.0, 2.0],
        ])
        .unwrap();
        assert!(site.contains(DVec2::new(0.5, 1.5)));
        assert!(site.contains(DVec2::new(1.5, 0.5)));
        assert!(!site.contains(DVec2::new(1.5, 1.5)));
        assert!((site.area() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_convexity() {
        assert!(unit_square().is_convex());
        let l_shape = Site::from_points(&[
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [0.0, 2.0],
        ])
        .unwrap();
        assert!(!l_shape.is_convex());
    }

    #[test]
    fn test_inward_edges_match_contains() {
        // 顺时针给出的三角形
        let site = Site::from_points(&[[0.0, 0.0], [0.0, 4.0], [4.0, 0.0]]).unwrap();
        let edges = site.inward_edges();
        assert_eq!(edges.len(), 3);
        for (_, n) in &edges {
            assert!((n.length() - 1.0).abs() < 1e-12);
        }
        let inside = |p: DVec2| edges.iter().all(|(a, n)| n.dot(p - *a) >= 0.0);
        for p in [
            DVec2::new(1.0, 1.0),
            DVec2::new(3.0, 0.5),
            DVec2::new(2.5, 2.5),
            DVec2::new(-0.5, 1.0),
            DVec2::new(0.1, 3.8),
        ] {
            assert_eq!(inside(p), site.contains(p), "{p}");
        }
    }

    #[test]
    fn test_rejects_degenerate() {
        assert!(Site::from_points(&[[0.0, 0.0], [1.0, 0.0]]).is_err());
        assert!(Site::from_points(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]).is_err());
    }
}
