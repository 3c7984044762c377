// crates/tf_optim/src/functional.rs

//! 面向优化器的目标接口
//!
//! [`ReducedFunctional`](crate::reduced::ReducedFunctional)、Taylor 检验用的
//! 合成目标以及驱动器内部的迭代记录器都实现 [`Functional`]。

use tf_foundation::{TfError, TfResult};

/// 控制向量上的可微标量函数
pub trait Functional {
    /// 控制向量长度
    fn len(&self) -> usize;

    /// 目标值
    fn value(&mut self, control: &[f64]) -> TfResult<f64>;

    /// 梯度
    fn gradient(&mut self, control: &[f64]) -> TfResult<Vec<f64>>;

    /// 优化器接受一个新迭代点后调用
    fn on_iteration(&mut self, _iteration: usize, _control: &[f64], _value: f64) {}
}

impl<F: Functional + ?Sized> Functional for &mut F {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn value(&mut self, control: &[f64]) -> TfResult<f64> {
        (**self).value(control)
    }

    fn gradient(&mut self, control: &[f64]) -> TfResult<Vec<f64>> {
        (**self).gradient(control)
    }

    fn on_iteration(&mut self, iteration: usize, control: &[f64], value: f64) {
        (**self).on_iteration(iteration, control, value)
    }
}

/// 由闭包构成的目标
///
/// ```
/// use tf_optim::{FnFunctional, Functional};
///
/// let mut f = FnFunctional::new(
///     2,
///     |m: &[f64]| m.iter().map(|x| x * x).sum(),
///     |m: &[f64]| m.iter().map(|x| 2.0 * x).collect(),
/// );
/// assert_eq!(f.value(&[1.0, 2.0]).unwrap(), 5.0);
/// ```
pub struct FnFunctional<V, G> {
    len: usize,
    value_fn: V,
    gradient_fn: G,
}

impl<V, G> FnFunctional<V, G>
where
    V: FnMut(&[f64]) -> f64,
    G: FnMut(&[f64]) -> Vec<f64>,
{
    /// 创建
    pub fn new(len: usize, value_fn: V, gradient_fn: G) -> Self {
        Self { len, value_fn, gradient_fn }
    }
}

impl<V, G> Functional for FnFunctional<V, G>
where
    V: FnMut(&[f64]) -> f64,
    G: FnMut(&[f64]) -> Vec<f64>,
{
    fn len(&self) -> usize {
        self.len
    }

    fn value(&mut self, control: &[f64]) -> TfResult<f64> {
        if control.len() != self.len {
            return Err(TfError::shape_mismatch("control", self.len, control.len()));
        }
        Ok((self.value_fn)(control))
    }

    fn gradient(&mut self, control: &[f64]) -> TfResult<Vec<f64>> {
        if control.len() != self.len {
            return Err(TfError::shape_mismatch("control", self.len, control.len()));
        }
        Ok((self.gradient_fn)(control))
    }
}
