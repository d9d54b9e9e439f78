//! 命令行参数定义
//!
//! 使用clap定义 layercfg 的命令行接口

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// layercfg - 分层配置查询工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "layercfg",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// INI 配置文件，可重复指定，先指定的优先
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help = "INI配置文件（可重复，先指定的优先）",
        env = "LAYERCFG_FILE",
        value_delimiter = ','
    )]
    pub files: Vec<PathBuf>,

    /// 覆盖属性，优先级最高
    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        help = "覆盖属性（可重复，优先级最高）",
        value_parser = parse_key_val
    )]
    pub overrides: Vec<(String, String)>,

    /// 日志级别
    #[arg(
        short,
        long,
        value_enum,
        default_value = "warn",
        help = "日志级别",
        env = "LAYERCFG_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// 使用JSON格式输出日志
    #[arg(long, help = "使用JSON格式输出日志")]
    pub json_logs: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 解析 `key=value` 形式的覆盖参数
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("无效的覆盖参数 '{}'，应为 KEY=VALUE", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("覆盖参数 '{}' 的键为空", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 查询单个属性
    Get {
        /// 属性名，其他节使用 `section.key`
        #[arg(value_name = "NAME", help = "属性名")]
        name: String,

        /// 值类型
        #[arg(
            short = 't',
            long = "type",
            value_enum,
            default_value = "string",
            help = "值类型"
        )]
        value_type: ValueType,

        /// 属性不存在或无法转换时使用的默认值
        #[arg(short, long, value_name = "VALUE", help = "默认值")]
        default: Option<String>,
    },

    /// 输出合并后的全部属性
    Dump {
        /// 输出格式
        #[arg(long, value_enum, default_value = "ini", help = "输出格式")]
        format: DumpFormat,
    },

    /// 列出每个配置文件的节
    Sections,

    /// 将时长文本换算为毫秒
    Duration {
        /// 时长文本，如 "1.5 minutes"
        #[arg(value_name = "TEXT", help = "时长文本")]
        text: String,
    },
}

/// 查询的值类型
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum ValueType {
    /// 字符串
    String,
    /// 32位整数
    Int,
    /// 64位整数
    Int64,
    /// 浮点数
    Float,
    /// 布尔值
    Bool,
    /// 时长（毫秒）
    Duration,
}

/// dump 的输出格式
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum DumpFormat {
    /// INI 键值对
    Ini,
    /// JSON 对象
    Json,
    /// TOML 表
    Toml,
}
