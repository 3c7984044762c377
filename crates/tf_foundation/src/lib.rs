// crates/tf_foundation/src/lib.rs

//! TidalFarm Foundation Layer
//!
//! 基础层，提供整个项目共用的错误类型与轻量工具。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `TfError` 与错误分类 `ErrorKind`
//! - [`metrics`]: 原子计数器（外部求解次数统计）
//! - [`vector`]: 控制向量的基础运算
//!
//! # 示例
//!
//! ```
//! use tf_foundation::error::{TfError, TfResult, ErrorKind};
//!
//! fn check_len(v: &[f64]) -> TfResult<()> {
//!     if v.len() != 3 {
//!         return Err(TfError::shape_mismatch("control", 3, v.len()));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_len(&[1.0]).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Configuration);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod metrics;
pub mod vector;

// 重导出常用类型
pub use error::{ErrorKind, TfError, TfResult};
pub use metrics::Counter;

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{ErrorKind, TfError, TfResult};
    pub use crate::metrics::Counter;
    pub use crate::vector::{axpy_into, dot, max_abs_diff, norm_inf};
}
