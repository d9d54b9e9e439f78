//! 属性值的类型转换
//!
//! 将配置源返回的字符串严格转换为整数、浮点数、布尔值和时长

use crate::error::{ConfigError, ValueKind};
use crate::timeconv::parse_milliseconds;
use chrono::TimeDelta;
use std::num::IntErrorKind;

/// 带默认值回退的查询结果
///
/// 查询失败（属性不存在或转换失败）时 `value` 为调用方提供的默认值，
/// `error` 记录具体原因。
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    /// 查询结果（失败时为默认值）
    pub value: T,
    /// 失败原因
    pub error: Option<ConfigError>,
}

impl<T> Resolved<T> {
    pub(crate) fn from_result(result: Result<T, ConfigError>, default: T) -> Self {
        match result {
            Ok(value) => Self { value, error: None },
            Err(error) => Self {
                value: default,
                error: Some(error),
            },
        }
    }

    /// 查询是否成功
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// 成功时返回 `Ok(value)`，失败时返回错误并丢弃默认值
    pub fn into_result(self) -> Result<T, ConfigError> {
        match self.error {
            None => Ok(self.value),
            Some(e) => Err(e),
        }
    }
}

fn int_error(kind: &IntErrorKind, value: &str, target: ValueKind) -> ConfigError {
    match kind {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ConfigError::OutOfRange {
            value: value.to_string(),
            kind: target,
        },
        _ => ConfigError::InvalidSyntax {
            value: value.to_string(),
            kind: target,
        },
    }
}

/// 十进制解析 32 位整数，前导零按十进制处理
pub fn parse_int(value: &str) -> Result<i32, ConfigError> {
    value
        .parse::<i32>()
        .map_err(|e| int_error(e.kind(), value, ValueKind::Int))
}

/// 十进制解析 64 位整数
pub fn parse_int64(value: &str) -> Result<i64, ConfigError> {
    value
        .parse::<i64>()
        .map_err(|e| int_error(e.kind(), value, ValueKind::Int64))
}

/// 解析 64 位浮点数
///
/// 有限的数字文本溢出为无穷大时返回 `OutOfRange`。
pub fn parse_float(value: &str) -> Result<f64, ConfigError> {
    let parsed = value.parse::<f64>().map_err(|_| ConfigError::InvalidSyntax {
        value: value.to_string(),
        kind: ValueKind::Float,
    })?;

    let literal_infinity = value
        .trim_start_matches(['+', '-'])
        .to_ascii_lowercase()
        .starts_with("inf");
    if parsed.is_infinite() && !literal_infinity {
        return Err(ConfigError::OutOfRange {
            value: value.to_string(),
            kind: ValueKind::Float,
        });
    }
    Ok(parsed)
}

/// 解析布尔值
///
/// 大小写不敏感：`t, true, 1, y, yes` 为真，`f, false, 0, n, no` 为假。
pub fn parse_bool(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "y" | "yes" => Ok(true),
        "f" | "false" | "0" | "n" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidSyntax {
            value: value.to_string(),
            kind: ValueKind::Bool,
        }),
    }
}

/// 解析时长文本，支持的格式见 [`crate::timeconv::parse_milliseconds`]
pub fn parse_duration(value: &str) -> Result<TimeDelta, ConfigError> {
    let millis = parse_milliseconds(value).map_err(|e| e.into_config_error(value))?;
    TimeDelta::try_milliseconds(millis).ok_or_else(|| ConfigError::OutOfRange {
        value: value.to_string(),
        kind: ValueKind::Duration,
    })
}
