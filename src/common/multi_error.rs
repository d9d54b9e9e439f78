//! 多错误聚合器
//!
//! 在一次操作中累积多个错误而不中断处理，超过上限的错误只计数

use std::error::Error;
use std::fmt;

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// 有上限的错误累积器
///
/// 最多保留 `max` 个错误，之后追加的错误只增加溢出计数。
/// [`MultiError::len`] 只统计保留下来的错误。
#[derive(Debug)]
pub struct MultiError {
    max: usize,
    errors: Vec<BoxError>,
    overflow: usize,
}

impl MultiError {
    /// 创建新的聚合器
    ///
    /// # 参数
    /// * `max` - 最多保留的错误数量
    pub fn new(max: usize) -> Self {
        Self {
            max,
            errors: Vec::with_capacity(max.min(10)),
            overflow: 0,
        }
    }

    /// 追加一个错误
    pub fn append<E>(&mut self, err: E)
    where
        E: Into<BoxError>,
    {
        if self.errors.len() >= self.max {
            self.overflow += 1;
        } else {
            self.errors.push(err.into());
        }
    }

    /// 追加一个可能不存在的错误，`None` 时不做任何事
    pub fn append_opt<E>(&mut self, err: Option<E>)
    where
        E: Into<BoxError>,
    {
        if let Some(err) = err {
            self.append(err);
        }
    }

    /// 保留下来的错误数量
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// 超出上限而被丢弃的错误数量
    pub fn overflow(&self) -> usize {
        self.overflow
    }

    /// 保留下来的错误
    pub fn errors(&self) -> impl Iterator<Item = &(dyn Error + Send + Sync + 'static)> {
        self.errors.iter().map(|e| e.as_ref())
    }

    /// 有错误时转换为 `Err`，否则返回 `Ok(())`
    pub fn into_result(self) -> Result<(), MultiError> {
        if self.is_empty() && self.overflow == 0 {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "共 {} 个错误:", self.errors.len() + self.overflow)?;
        for err in &self.errors {
            writeln!(f, "{err}")?;
        }
        if self.overflow > 0 {
            writeln!(f, "... {} errors truncated.", self.overflow)?;
        }
        Ok(())
    }
}

impl Error for MultiError {}
