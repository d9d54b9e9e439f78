//! 基于内存映射的配置源

use crate::config::source::{MonitorFreq, MonitoredSource, Source};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 由 `HashMap` 支撑的配置源
///
/// 每次 `put`/`put_all` 都会刷新最后修改时间，默认每分钟检查一次变更。
#[derive(Debug)]
pub struct SrcMap {
    state: RwLock<MapState>,
    freq: MonitorFreq,
}

#[derive(Debug)]
struct MapState {
    props: HashMap<String, String>,
    last_modified: DateTime<Utc>,
}

impl MapState {
    /// 刷新最后修改时间，保证严格递增
    fn touch(&mut self) {
        let now = Utc::now();
        self.last_modified = if now > self.last_modified {
            now
        } else {
            self.last_modified
                .checked_add_signed(TimeDelta::nanoseconds(1))
                .unwrap_or(now)
        };
    }
}

impl SrcMap {
    /// 默认监控间隔
    pub const DEFAULT_MONITOR_FREQ: Duration = Duration::from_secs(60);

    /// 创建空的配置源
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MapState {
                props: HashMap::new(),
                last_modified: Utc::now(),
            }),
            freq: MonitorFreq::new(Self::DEFAULT_MONITOR_FREQ),
        }
    }

    /// 创建包含给定键值对副本的配置源
    pub fn from_map<K, V, I>(props: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let src = Self::new();
        src.put_all(props);
        src
    }

    /// 插入或更新属性
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut state = self.state.write();
        state.props.insert(key.into(), value.into());
        state.touch();
    }

    /// 批量插入或更新属性
    pub fn put_all<K, V, I>(&self, props: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut state = self.state.write();
        for (k, v) in props {
            state.props.insert(k.into(), v.into());
        }
        state.touch();
    }

    /// 删除属性，返回被删除的值
    pub fn remove(&self, key: &str) -> Option<String> {
        let mut state = self.state.write();
        let removed = state.props.remove(key);
        if removed.is_some() {
            state.touch();
        }
        removed
    }

    /// 设置监控间隔，零表示暂停
    pub fn set_monitor_freq(&self, freq: Duration) {
        self.freq.set(freq);
    }

    pub fn len(&self) -> usize {
        self.state.read().props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().props.is_empty()
    }
}

impl Default for SrcMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for SrcMap {
    fn get_prop(&self, name: &str) -> Option<String> {
        self.state.read().props.get(name).cloned()
    }

    fn monitored(self: Arc<Self>) -> Option<Arc<dyn MonitoredSource>> {
        Some(self)
    }
}

impl MonitoredSource for SrcMap {
    fn last_modified(&self) -> DateTime<Utc> {
        self.state.read().last_modified
    }

    fn monitor_freq(&self) -> Duration {
        self.freq.get()
    }

    fn properties(&self) -> Option<HashMap<String, String>> {
        Some(self.state.read().props.clone())
    }
}
