// crates/tf_farm/src/field.rs

//! 连续摩擦场
//!
//! 在场址外包框上铺一张结构化网格，每个单元一个摩擦密度值。
//! 单元中心落在场址内的单元构成支撑区域；优化期间所有单元都是控制量，
//! 优化结束后由 [`FrictionField::zero_outside_site`] 把支撑区域外的值清零。
//!
//! 单元编号按行优先：`cell = j * nx + i`。

use glam::DVec2;
use tf_foundation::{TfError, TfResult};

use crate::site::Site;

/// 结构化网格
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldGrid {
    /// 左下角
    pub origin: DVec2,
    /// x 方向单元数
    pub nx: usize,
    /// y 方向单元数
    pub ny: usize,
    /// 单元尺寸
    pub spacing: DVec2,
}

impl FieldGrid {
    /// 创建网格
    pub fn new(origin: DVec2, nx: usize, ny: usize, spacing: DVec2) -> TfResult<Self> {
        if nx == 0 || ny == 0 {
            return Err(TfError::invalid_config("grid", format!("{nx}x{ny}"), "单元数必须为正"));
        }
        if !(spacing.x > 0.0) || !(spacing.y > 0.0) {
            return Err(TfError::invalid_config("grid.spacing", spacing, "单元尺寸必须为正"));
        }
        Ok(Self { origin, nx, ny, spacing })
    }

    /// 覆盖场址外包框的网格
    pub fn covering(site: &Site, nx: usize, ny: usize) -> TfResult<Self> {
        let (min, max) = site.bounding_box();
        let n = DVec2::new(nx.max(1) as f64, ny.max(1) as f64);
        Self::new(min, nx, ny, (max - min) / n)
    }

    /// 单元总数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny
    }

    /// 单元面积
    #[inline]
    pub fn cell_area(&self) -> f64 {
        self.spacing.x * self.spacing.y
    }

    /// 单元中心
    #[inline]
    pub fn cell_center(&self, cell: usize) -> DVec2 {
        let i = cell % self.nx;
        let j = cell / self.nx;
        self.origin + DVec2::new((i as f64 + 0.5) * self.spacing.x, (j as f64 + 0.5) * self.spacing.y)
    }

    /// 所有单元中心（行优先）
    pub fn cell_centers(&self) -> impl Iterator<Item = DVec2> + '_ {
        (0..self.n_cells()).map(move |c| self.cell_center(c))
    }
}

/// 连续摩擦场
#[derive(Debug, Clone, PartialEq)]
pub struct FrictionField {
    grid: FieldGrid,
    values: Vec<f64>,
    support: Vec<bool>,
    max_friction: f64,
}

impl FrictionField {
    /// 在场址上创建均匀初值的摩擦场
    pub fn new(site: &Site, grid: FieldGrid, initial: f64, max_friction: f64) -> TfResult<Self> {
        if !(max_friction > 0.0) {
            return Err(TfError::invalid_config("max_friction", max_friction, "必须为正"));
        }
        if !(0.0..=max_friction).contains(&initial) {
            return Err(TfError::invalid_config(
                "initial_friction",
                initial,
                "必须位于 [0, max_friction]",
            ));
        }
        let support: Vec<bool> = grid.cell_centers().map(|c| site.contains(c)).collect();
        if !support.iter().any(|&s| s) {
            return Err(TfError::invalid_config("grid", format!("{}x{}", grid.nx, grid.ny), "没有单元落在场址内"));
        }
        Ok(Self {
            grid,
            values: vec![initial; grid.n_cells()],
            support,
            max_friction,
        })
    }

    /// 网格
    pub fn grid(&self) -> &FieldGrid {
        &self.grid
    }

    /// 单元值
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 可变单元值
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// 单元是否位于场址内
    pub fn in_support(&self, cell: usize) -> bool {
        self.support.get(cell).copied().unwrap_or(false)
    }

    /// 支撑区域单元数
    pub fn support_len(&self) -> usize {
        self.support.iter().filter(|&&s| s).count()
    }

    /// 摩擦密度上界
    pub fn max_friction(&self) -> f64 {
        self.max_friction
    }

    /// 支撑区域内的总摩擦 ∫ f dA
    pub fn total_friction(&self) -> f64 {
        let area = self.grid.cell_area();
        self.values
            .iter()
            .zip(&self.support)
            .filter(|&(_, &s)| s)
            .map(|(v, _)| v * area)
            .sum()
    }

    /// 把支撑区域外的单元清零，返回被改动的单元数
    pub fn zero_outside_site(&mut self) -> usize {
        let mut changed = 0;
        for (v, &inside) in self.values.iter_mut().zip(&self.support) {
            if !inside && *v != 0.0 {
                *v = 0.0;
                changed += 1;
            }
        }
        changed
    }
}
