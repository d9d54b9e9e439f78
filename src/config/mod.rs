//! 配置管理模块
//!
//! 提供配置源组合、类型化查询和变更监控功能

pub mod file_source;
pub mod listener;
pub mod map_source;
pub mod monitor;
pub mod resolver;
pub mod source;
pub mod value;

// 重新导出主要类型
pub use file_source::SrcFile;
pub use listener::{ChangedListener, ChangedPropListener};
pub use map_source::SrcMap;
pub use resolver::Config;
pub use source::{MonitorFreq, MonitoredSource, Source};
pub use value::Resolved;
