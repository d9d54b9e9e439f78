//! INI 解析模块
//!
//! 解析 INI 格式或纯键值对格式的文本，支持节、注释与错误聚合

pub mod parser;
pub mod section;

// 重新导出主要类型
pub use parser::{get_sections, DEFAULT_MAX_ERRORS};
pub use section::{Ini, Section};
