// crates/tf_foundation/src/vector.rs

//! 控制向量基础运算
//!
//! 控制向量就是 `&[f64]`，这里只放几个全项目都要用的小函数。

/// 内积
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// 无穷范数
#[inline]
pub fn norm_inf(a: &[f64]) -> f64 {
    a.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

/// 逐分量最大绝对差
///
/// 长度不同时返回 `f64::INFINITY`。
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .fold(0.0_f64, |m, (x, y)| m.max((x - y).abs()))
}

/// out = x + alpha * d
pub fn axpy_into(out: &mut Vec<f64>, x: &[f64], alpha: f64, d: &[f64]) {
    out.clear();
    out.extend(x.iter().zip(d).map(|(xi, di)| xi + alpha * di));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_and_norm() {
        let a = [1.0, -3.0, 2.0];
        let b = [2.0, 1.0, 0.5];
        assert!((dot(&a, &b) - 0.0).abs() < 1e-15);
        assert_eq!(norm_inf(&a), 3.0);
    }

    #[test]
    fn test_max_abs_diff_length_mismatch() {
        assert_eq!(max_abs_diff(&[1.0], &[1.0, 2.0]), f64::INFINITY);
        assert!((max_abs_diff(&[1.0, 2.0], &[1.5, 2.0]) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_axpy_into() {
        let mut out = Vec::new();
        axpy_into(&mut out, &[1.0, 1.0], 2.0, &[0.5, -1.0]);
        assert_eq!(out, vec![2.0, -1.0]);
    }
}
