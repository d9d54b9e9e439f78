//! 错误处理模块
//!
//! 定义配置解析与查询的统一错误类型

use crate::common::MultiError;
use thiserror::Error;

/// Layered Config 的顶层错误类型
#[derive(Error, Debug)]
pub enum LayeredConfigError {
    /// 属性查询或类型转换错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// INI 解析错误
    #[error("INI错误: {0}")]
    Ini(#[from] IniError),

    /// 时长解析错误
    #[error("时长错误: {0}")]
    Duration(#[from] DurationError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 被转换的目标类型，用于错误信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Int64,
    Float,
    Bool,
    Duration,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Int => write!(f, "int"),
            ValueKind::Int64 => write!(f, "int64"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Duration => write!(f, "duration"),
        }
    }
}

/// 属性查询与类型转换错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 所有配置源中都不存在该属性
    #[error("属性不存在 (not found): {name}")]
    NotFound { name: String },

    /// 属性值无法解析为目标类型
    #[error("无法将 '{value}' 解析为 {kind} (invalid syntax)")]
    InvalidSyntax { value: String, kind: ValueKind },

    /// 属性值超出目标类型的表示范围
    #[error("'{value}' 超出 {kind} 的取值范围 (out of range)")]
    OutOfRange { value: String, kind: ValueKind },

    /// 移除的监听器从未注册
    #[error("监听器未注册 (not found)")]
    ListenerNotFound,
}

impl ConfigError {
    /// 是否为属性不存在错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::NotFound { .. })
    }
}

/// 时长解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    /// 数字部分格式错误
    #[error("时长格式错误: '{0}'")]
    InvalidSyntax(String),

    /// 不支持的时间单位
    #[error("不支持的时间单位: '{0}'")]
    UnknownUnit(String),

    /// 换算后的毫秒数超出 i64 范围
    #[error("时长超出范围: '{0}'")]
    OutOfRange(String),
}

impl DurationError {
    /// 转换为属性查询错误
    pub fn into_config_error(self, value: &str) -> ConfigError {
        match self {
            DurationError::OutOfRange(_) => ConfigError::OutOfRange {
                value: value.to_string(),
                kind: ValueKind::Duration,
            },
            DurationError::InvalidSyntax(_) | DurationError::UnknownUnit(_) => {
                ConfigError::InvalidSyntax {
                    value: value.to_string(),
                    kind: ValueKind::Duration,
                }
            }
        }
    }
}

/// INI 解析与读取错误
#[derive(Error, Debug)]
pub enum IniError {
    /// 一次解析中累积的全部行错误
    #[error("{0}")]
    Parse(MultiError),

    /// 请求的节不存在
    #[error("节不存在: '{section}'")]
    SectionNotFound { section: String },

    /// 读取文件失败
    #[error("读取INI失败: {0}")]
    Io(#[from] std::io::Error),
}

/// 单行解析错误，由 [`MultiError`] 聚合
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// 行内没有 '='
    #[error("不是键值对: '{0}'")]
    NotKeyValue(String),

    /// '=' 左侧为空
    #[error("键为空: '{0}'")]
    EmptyKey(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, LayeredConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_error_mapping() {
        let err = DurationError::OutOfRange("x".into()).into_config_error("400000000 years");
        assert!(matches!(err, ConfigError::OutOfRange { kind: ValueKind::Duration, .. }));

        let err = DurationError::UnknownUnit("px".into()).into_config_error("27px");
        assert!(matches!(err, ConfigError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_error_messages_carry_category() {
        let err = ConfigError::NotFound { name: "blap".into() };
        assert!(err.to_string().contains("not found"));
        assert!(err.is_not_found());

        let err = ConfigError::OutOfRange {
            value: "4294967294".into(),
            kind: ValueKind::Int,
        };
        assert!(err.to_string().contains("out of range"));
        assert!(!err.is_not_found());
    }
}
