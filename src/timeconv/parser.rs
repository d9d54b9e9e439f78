//! 时长文本解析器
//!
//! 文本格式: `[+|-]<数字>[.<小数>] [单位]`，单位可省略（默认为毫秒），
//! 数字与单位之间允许任意空白。

use super::{
    MILLIS_PER_DAY, MILLIS_PER_HOUR, MILLIS_PER_MINUTE, MILLIS_PER_SECOND, MILLIS_PER_WEEK,
    MILLIS_PER_YEAR,
};
use crate::error::DurationError;
use regex::Regex;
use std::sync::OnceLock;
use tracing::trace;

/// 时长文本的词法结构：符号、整数部分、小数部分、单位
fn duration_regex() -> &'static Regex {
    static DURATION_RE: OnceLock<Regex> = OnceLock::new();
    DURATION_RE.get_or_init(|| {
        Regex::new(r"^([+-]?)([0-9]+)(?:\.([0-9]+))?\s*([A-Za-z]*)$")
            .expect("时长正则表达式无效")
    })
}

/// 解析时长文本，返回对应的毫秒数
///
/// # 示例
/// * `"1 second"` 返回 1000
/// * `"1.5 minutes"` 返回 90000
/// * `"-0.5 min"` 返回 -30000
///
/// 小数部分乘以单位后向零截断。支持的单位见 [`units_to_millis`]。
///
/// # 返回
/// * `Result<i64, DurationError>` - 毫秒数；格式错误或单位未知时返回
///   `InvalidSyntax`/`UnknownUnit`，超出 i64 范围时返回 `OutOfRange`
pub fn parse_milliseconds(text: &str) -> Result<i64, DurationError> {
    let trimmed = text.trim();
    let captures = duration_regex()
        .captures(trimmed)
        .ok_or_else(|| DurationError::InvalidSyntax(text.to_string()))?;

    let negative = &captures[1] == "-";
    let unit = &captures[4];
    let factor = if unit.is_empty() {
        1
    } else {
        units_to_millis(unit)?
    };

    let out_of_range = || DurationError::OutOfRange(text.to_string());

    // 整数部分用 i128 计算，足以容纳 i64 范围外的中间结果
    let whole: i128 = captures[2].parse().map_err(|_| out_of_range())?;
    let mut millis = whole
        .checked_mul(i128::from(factor))
        .ok_or_else(out_of_range)?;

    if let Some(fraction) = captures.get(3) {
        millis = millis
            .checked_add(fraction_millis(fraction.as_str(), factor))
            .ok_or_else(out_of_range)?;
    }

    if negative {
        millis = -millis;
    }

    trace!("时长解析: '{}' -> {}ms", trimmed, millis);
    i64::try_from(millis).map_err(|_| out_of_range())
}

/// 小数部分乘以单位后的毫秒数，向零截断
///
/// 从最低位开始逐位除以 10，`floor((d + floor(x)) / 10) == floor((d + x) / 10)`
/// 保证结果精确，且中间值始终小于 `factor * 10`，任意位数都不会溢出。
fn fraction_millis(digits: &str, factor: i64) -> i128 {
    let factor = i128::from(factor);
    digits
        .bytes()
        .rev()
        .fold(0, |carry, b| (i128::from(b - b'0') * factor + carry) / 10)
}

/// 返回时间单位对应的毫秒数，大小写不敏感
///
/// 支持的单位:
/// * "milliseconds", "millisecond", "millis", "ms"
/// * "seconds", "second", "secs", "sec", "s"
/// * "minutes", "minute", "mins", "min", "m"
/// * "hours", "hour", "h"
/// * "days", "day", "d"
/// * "weeks", "week", "w"
/// * "years", "year", "y"
pub fn units_to_millis(unit: &str) -> Result<i64, DurationError> {
    let millis = match unit.to_ascii_lowercase().as_str() {
        "milliseconds" | "millisecond" | "millis" | "ms" => 1,
        "seconds" | "second" | "secs" | "sec" | "s" => MILLIS_PER_SECOND,
        "minutes" | "minute" | "mins" | "min" | "m" => MILLIS_PER_MINUTE,
        "hours" | "hour" | "h" => MILLIS_PER_HOUR,
        "days" | "day" | "d" => MILLIS_PER_DAY,
        "weeks" | "week" | "w" => MILLIS_PER_WEEK,
        "years" | "year" | "y" => MILLIS_PER_YEAR,
        _ => return Err(DurationError::UnknownUnit(unit.to_string())),
    };
    Ok(millis)
}
