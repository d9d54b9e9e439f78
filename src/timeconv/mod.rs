//! 时长解析模块
//!
//! 将 "1.5 minutes"、"30s"、"-7 hours" 这类文本换算为毫秒数

pub mod parser;

pub use parser::{parse_milliseconds, units_to_millis};

/// 每秒毫秒数
pub const MILLIS_PER_SECOND: i64 = 1000;

/// 每分钟毫秒数
pub const MILLIS_PER_MINUTE: i64 = MILLIS_PER_SECOND * 60;

/// 每小时毫秒数
pub const MILLIS_PER_HOUR: i64 = MILLIS_PER_MINUTE * 60;

/// 每天毫秒数
pub const MILLIS_PER_DAY: i64 = MILLIS_PER_HOUR * 24;

/// 每周毫秒数
pub const MILLIS_PER_WEEK: i64 = MILLIS_PER_DAY * 7;

/// 每年毫秒数（按 365.25 天计）
pub const MILLIS_PER_YEAR: i64 = MILLIS_PER_DAY * 365 + MILLIS_PER_DAY / 4;
