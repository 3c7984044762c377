// crates/tf_optim/src/constraints.rs

//! 盒约束与不等式约束
//!
//! 不等式约束统一写成 `c(x) ≥ 0`，并提供雅可比与向量的乘积，
//! 优化器不需要显式组装雅可比矩阵。

use glam::DVec2;
use tf_config::FrictionBounds;
use tf_farm::{ControlMapping, FarmModel, SlotKind};
use tf_foundation::{TfError, TfResult};

/// 逐分量上下界
#[derive(Debug, Clone, PartialEq)]
pub struct BoxBounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl BoxBounds {
    /// 创建，要求长度相同且 lower ≤ upper
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> TfResult<Self> {
        if lower.len() != upper.len() {
            return Err(TfError::shape_mismatch("upper bounds", lower.len(), upper.len()));
        }
        if let Some(i) = (0..lower.len()).find(|&i| !(lower[i] <= upper[i])) {
            return Err(TfError::invalid_config(
                format!("bounds[{i}]"),
                format!("[{}, {}]", lower[i], upper[i]),
                "下界大于上界",
            ));
        }
        Ok(Self { lower, upper })
    }

    /// 无界
    pub fn unbounded(len: usize) -> Self {
        Self {
            lower: vec![f64::NEG_INFINITY; len],
            upper: vec![f64::INFINITY; len],
        }
    }

    /// 按农场与映射生成界
    ///
    /// - 摩擦槽：配置的摩擦上下界
    /// - 位置槽：场址外包框向内收缩半个占地
    /// - 场单元：`[0, max_friction]`
    pub fn for_farm(
        farm: &FarmModel,
        mapping: &ControlMapping,
        friction: FrictionBounds,
    ) -> TfResult<Self> {
        let (min, max) = farm.site().bounding_box();
        let (lo, hi) = match farm.as_discrete() {
            Some(discrete) => {
                let half = discrete.footprint().half_extent();
                (min + half, max - half)
            }
            None => (min, max),
        };
        let max_field = farm.as_field().map_or(f64::INFINITY, |f| f.max_friction());

        let mut lower = Vec::with_capacity(mapping.len());
        let mut upper = Vec::with_capacity(mapping.len());
        for slot in mapping.slots() {
            let (l, u) = match slot.kind {
                SlotKind::Friction => (friction.lower, friction.upper),
                SlotKind::PositionX => (lo.x, hi.x),
                SlotKind::PositionY => (lo.y, hi.y),
                SlotKind::FieldCell => (0.0, max_field),
            };
            lower.push(l);
            upper.push(u);
        }
        Self::new(lower, upper)
    }

    /// 长度
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// 下界
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// 上界
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// 投影到盒内
    pub fn project(&self, x: &mut [f64]) {
        for ((v, &l), &u) in x.iter_mut().zip(&self.lower).zip(&self.upper) {
            *v = v.clamp(l, u);
        }
    }

    /// 是否满足界
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.len()
            && x.iter()
                .zip(&self.lower)
                .zip(&self.upper)
                .all(|((v, l), u)| l <= v && v <= u)
    }
}

/// 不等式约束 `c(x) ≥ 0`
pub trait InequalityConstraint {
    /// 约束个数
    fn len(&self) -> usize;

    /// 约束值
    fn values(&self, x: &[f64]) -> Vec<f64>;

    /// J(x) v，长度为约束个数
    fn jacobian_vector(&self, x: &[f64], v: &[f64]) -> Vec<f64>;

    /// J(x)ᵀ w，长度为控制向量长度
    fn jacobian_transpose_vector(&self, x: &[f64], w: &[f64]) -> Vec<f64>;

    /// 最大违反量 max(0, -min c)
    fn max_violation(&self, x: &[f64]) -> f64 {
        self.values(x).iter().fold(0.0_f64, |m, c| m.max(-c))
    }
}

/// 设备两两最小间距约束
///
/// 每对设备一条：`|p_i - p_j|² - d² ≥ 0`。
#[derive(Debug, Clone, PartialEq)]
pub struct MinimumDistanceConstraint {
    // 每对设备的 (x_i, y_i, x_j, y_j) 槽下标
    pairs: Vec<[usize; 4]>,
    min_distance: f64,
    n_controls: usize,
}

impl MinimumDistanceConstraint {
    /// 为农场的全部设备对构建约束
    ///
    /// 映射必须包含位置控制量。`min_distance` 缺省取占地最大边长。
    pub fn for_farm(
        farm: &FarmModel,
        mapping: &ControlMapping,
        min_distance: Option<f64>,
    ) -> TfResult<Self> {
        let discrete = farm.as_discrete().ok_or(TfError::UnsupportedControl {
            control: "min_distance",
            mode: farm.mode_name(),
        })?;
        let d = min_distance.unwrap_or_else(|| discrete.footprint().max_extent());
        if !(d > 0.0) {
            return Err(TfError::invalid_config("min_distance", d, "必须为正"));
        }
        let n = discrete.len();
        let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in i + 1..n {
                let (Some((xi, yi)), Some((xj, yj))) =
                    (mapping.position_slots(i), mapping.position_slots(j))
                else {
                    return Err(TfError::UnsupportedControl {
                        control: "min_distance",
                        mode: mapping.selection().name(),
                    });
                };
                pairs.push([xi, yi, xj, yj]);
            }
        }
        Ok(Self { pairs, min_distance: d, n_controls: mapping.len() })
    }

    /// 最小间距
    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }
}

impl InequalityConstraint for MinimumDistanceConstraint {
    fn len(&self) -> usize {
        self.pairs.len()
    }

    fn values(&self, x: &[f64]) -> Vec<f64> {
        let d2 = self.min_distance * self.min_distance;
        self.pairs
            .iter()
            .map(|&[xi, yi, xj, yj]| {
                let dx = x[xi] - x[xj];
                let dy = x[yi] - x[yj];
                dx * dx + dy * dy - d2
            })
            .collect()
    }

    fn jacobian_vector(&self, x: &[f64], v: &[f64]) -> Vec<f64> {
        self.pairs
            .iter()
            .map(|&[xi, yi, xj, yj]| {
                let dx = x[xi] - x[xj];
                let dy = x[yi] - x[yj];
                2.0 * (dx * (v[xi] - v[xj]) + dy * (v[yi] - v[yj]))
            })
            .collect()
    }

    fn jacobian_transpose_vector(&self, x: &[f64], w: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.n_controls];
        for (&[xi, yi, xj, yj], &wk) in self.pairs.iter().zip(w) {
            let dx = 2.0 * wk * (x[xi] - x[xj]);
            let dy = 2.0 * wk * (x[yi] - x[yj]);
            out[xi] += dx;
            out[xj] -= dx;
            out[yi] += dy;
            out[yj] -= dy;
        }
        out
    }
}

/// 场址边界约束
///
/// 凸场址的每条边、每台设备一条线性约束：
/// `n · (p - a) - (|n_x| h_x + |n_y| h_y) ≥ 0`，
/// 其中 `n` 为单位内法向，`h` 为半个占地，即整个占地矩形位于边的内侧。
#[derive(Debug, Clone, PartialEq)]
pub struct SiteBoundaryConstraint {
    rows: Vec<BoundaryRow>,
    n_controls: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BoundaryRow {
    kx: usize,
    ky: usize,
    normal: DVec2,
    offset: f64,
}

impl SiteBoundaryConstraint {
    /// 为农场全部设备构建约束
    ///
    /// 需要离散农场、凸场址以及全部设备的位置控制量。
    pub fn for_farm(farm: &FarmModel, mapping: &ControlMapping) -> TfResult<Self> {
        let discrete = farm.as_discrete().ok_or(TfError::UnsupportedControl {
            control: "site_boundary",
            mode: farm.mode_name(),
        })?;
        if !farm.site().is_convex() {
            return Err(TfError::invalid_config(
                "site",
                "非凸多边形",
                "场址边界约束要求凸场址",
            ));
        }
        let half = discrete.footprint().half_extent();
        let edges = farm.site().inward_edges();

        let mut rows = Vec::with_capacity(discrete.len() * edges.len());
        for device in discrete.devices() {
            let Some((kx, ky)) = mapping.position_slots(device.index) else {
                return Err(TfError::UnsupportedControl {
                    control: "site_boundary",
                    mode: mapping.selection().name(),
                });
            };
            for &(a, normal) in &edges {
                let margin = normal.abs().dot(half);
                rows.push(BoundaryRow { kx, ky, normal, offset: normal.dot(a) + margin });
            }
        }
        Ok(Self { rows, n_controls: mapping.len() })
    }
}

impl InequalityConstraint for SiteBoundaryConstraint {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn values(&self, x: &[f64]) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| r.normal.x * x[r.kx] + r.normal.y * x[r.ky] - r.offset)
            .collect()
    }

    fn jacobian_vector(&self, _x: &[f64], v: &[f64]) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| r.normal.x * v[r.kx] + r.normal.y * v[r.ky])
            .collect()
    }

    fn jacobian_transpose_vector(&self, _x: &[f64], w: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.n_controls];
        for (r, &wk) in self.rows.iter().zip(w) {
            out[r.kx] += wk * r.normal.x;
            out[r.ky] += wk * r.normal.y;
        }
        out
    }
}
