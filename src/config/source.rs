//! 配置源接口
//!
//! 定义属性查询接口 [`Source`] 以及可被监控变更的 [`MonitoredSource`]

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 键值对配置源
///
/// `get_prop` 应从内存中返回结果，解析器在持有读锁时调用它。
pub trait Source: Send + Sync {
    /// 获取属性值，不存在时返回 `None`
    fn get_prop(&self, name: &str) -> Option<String>;

    /// 如果该配置源支持变更监控，返回其监控接口
    ///
    /// 只在配置源注册时检查一次。支持监控的实现应返回 `Some(self)`。
    fn monitored(self: Arc<Self>) -> Option<Arc<dyn MonitoredSource>> {
        None
    }
}

/// 可被监控变更的配置源
pub trait MonitoredSource: Source {
    /// 最近一次属性变更的时间
    ///
    /// 不支持运行时修改的配置源应返回固定值，以免产生重载事件。
    fn last_modified(&self) -> DateTime<Utc>;

    /// 两次变更检查之间的间隔
    ///
    /// 返回零表示暂停：暂停期间不调用 `last_modified`，
    /// 每 10 秒重新读取一次间隔，直到返回非零值后恢复检查。
    fn monitor_freq(&self) -> Duration;

    /// 当前全部属性的快照，用于计算逐属性的变更
    ///
    /// 无法枚举属性的配置源返回 `None`，此时不会发出逐属性通知。
    fn properties(&self) -> Option<HashMap<String, String>> {
        None
    }
}

/// 线程安全的监控间隔，供配置源实现内嵌使用
#[derive(Debug, Default)]
pub struct MonitorFreq {
    freq: Mutex<Duration>,
}

impl MonitorFreq {
    pub fn new(freq: Duration) -> Self {
        Self {
            freq: Mutex::new(freq),
        }
    }

    /// 获取当前监控间隔
    pub fn get(&self) -> Duration {
        *self.freq.lock()
    }

    /// 设置监控间隔，零表示暂停
    pub fn set(&self, freq: Duration) {
        *self.freq.lock() = freq;
    }
}
