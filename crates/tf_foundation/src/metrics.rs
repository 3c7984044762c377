// crates/tf_foundation/src/metrics.rs

//! 求解计数
//!
//! 评估器用它统计外部前向/伴随求解次数，约化泛函用它统计缓存命中。
//! 计数可以整体取走，便于把梯度检验与优化本身的开销分开记录。

use std::sync::atomic::{AtomicU64, Ordering};

/// 单调递增的原子计数
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// 零值
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// 计一次
    #[inline]
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// 当前值
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// 取出当前值并归零
    #[inline]
    pub fn take(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

impl Clone for Counter {
    fn clone(&self) -> Self {
        Self(AtomicU64::new(self.get()))
    }
}
