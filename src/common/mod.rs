//! 通用模块
//!
//! 包含多错误聚合器等通用功能

pub mod multi_error;

// 重新导出主要类型
pub use multi_error::MultiError;
