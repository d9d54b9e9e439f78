//! Layered Config - 分层配置解析库
//!
//! 将多个键值对配置源组合为一条有序的查询链，支持：
//! - 内存映射与 INI 文件配置源
//! - 带默认值回退的类型化查询（整数、浮点数、布尔值、时长）
//! - 时长文本解析（"1.5 minutes"、"30s" 等）
//! - 轮询配置源变更并通知监听器
//! - 结构化日志记录

pub mod cli;
pub mod common;
pub mod config;
pub mod error;
pub mod ini;
pub mod logging;
pub mod timeconv;

// 重新导出主要类型
pub use config::{ChangedListener, ChangedPropListener, Config, MonitoredSource, Source, SrcFile, SrcMap};
pub use error::{ConfigError, LayeredConfigError};
pub use ini::Ini;

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
