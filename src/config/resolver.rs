//! 配置解析器
//!
//! 按顺序组合多个配置源，提供带默认值回退的类型化查询，并管理变更监听器

use crate::config::listener::{remove_all, ChangedListener, ChangedPropListener};
use crate::config::monitor;
use crate::config::source::Source;
use crate::config::value::{
    parse_bool, parse_duration, parse_float, parse_int, parse_int64, Resolved,
};
use crate::error::ConfigError;
use chrono::TimeDelta;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// 配置解析器
///
/// 按配置源列表的顺序查询属性，第一个包含该属性的配置源胜出。
/// 句柄可以廉价克隆，所有克隆共享同一份状态。
///
/// 配置源列表与监听器列表各自使用独立的锁，监听器回调中可以安全地
/// 再次查询属性或增删监听器。
#[derive(Clone)]
pub struct Config {
    pub(crate) inner: Arc<ConfigInner>,
}

pub(crate) struct ConfigInner {
    /// 有序配置源列表
    sources: RwLock<Vec<Arc<dyn Source>>>,
    /// 变更监听器
    listeners: RwLock<Listeners>,
    /// 停止信号，值为 `true` 表示已停止
    pub(crate) shutdown_tx: watch::Sender<bool>,
}

#[derive(Default)]
struct Listeners {
    changed: Vec<Arc<dyn ChangedListener>>,
    prop: Vec<Arc<dyn ChangedPropListener>>,
}

impl Drop for ConfigInner {
    fn drop(&mut self) {
        // 最后一个句柄释放时停止所有监控任务
        self.shutdown_tx.send_replace(true);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("sources", &self.source_count())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

impl Config {
    /// 创建没有配置源的解析器
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ConfigInner {
                sources: RwLock::new(Vec::new()),
                listeners: RwLock::new(Listeners::default()),
                shutdown_tx,
            }),
        }
    }

    /// 在列表开头插入一个配置源，它将最先被查询
    pub fn prepend_source(&self, src: Arc<dyn Source>) {
        self.prepend_sources([src]);
    }

    /// 在列表开头按原顺序插入多个配置源
    ///
    /// 第一个配置源将最先被查询。支持监控的配置源会启动监控任务。
    pub fn prepend_sources<I>(&self, srcs: I)
    where
        I: IntoIterator<Item = Arc<dyn Source>>,
    {
        let srcs: Vec<Arc<dyn Source>> = srcs.into_iter().collect();
        let mut sources = self.inner.sources.write();
        let mut combined = srcs.clone();
        combined.extend(sources.drain(..));
        *sources = combined;
        info!("已在开头添加 {} 个配置源，共 {} 个", srcs.len(), sources.len());
        self.start_monitoring(srcs);
    }

    /// 在列表末尾追加一个配置源，它将最后被查询
    pub fn append_source(&self, src: Arc<dyn Source>) {
        self.append_sources([src]);
    }

    /// 在列表末尾按原顺序追加多个配置源
    pub fn append_sources<I>(&self, srcs: I)
    where
        I: IntoIterator<Item = Arc<dyn Source>>,
    {
        let srcs: Vec<Arc<dyn Source>> = srcs.into_iter().collect();
        let mut sources = self.inner.sources.write();
        sources.extend(srcs.iter().cloned());
        info!("已在末尾追加 {} 个配置源，共 {} 个", srcs.len(), sources.len());
        self.start_monitoring(srcs);
    }

    /// 为支持监控的配置源启动监控任务
    fn start_monitoring(&self, srcs: Vec<Arc<dyn Source>>) {
        for src in srcs {
            if let Some(monitored) = src.monitored() {
                monitor::spawn_monitor(self, monitored);
            }
        }
    }

    /// 当前配置源数量
    pub fn source_count(&self) -> usize {
        self.inner.sources.read().len()
    }

    /// 查询字符串属性，值去除首尾空白
    ///
    /// 按配置源顺序查询，直到找到该属性。
    pub fn get_string(&self, name: &str) -> Result<String, ConfigError> {
        let sources = self.inner.sources.read();
        for src in sources.iter() {
            if let Some(value) = src.get_prop(name) {
                trace!("属性命中: {}", name);
                return Ok(value.trim().to_string());
            }
        }
        trace!("属性不存在: {}", name);
        Err(ConfigError::NotFound {
            name: name.to_string(),
        })
    }

    /// 查询字符串属性，失败时返回默认值 `def`
    pub fn string(&self, name: &str, def: &str) -> Resolved<String> {
        Resolved::from_result(self.get_string(name), def.to_string())
    }

    /// 查询 32 位整数属性
    pub fn get_int(&self, name: &str) -> Result<i32, ConfigError> {
        parse_int(&self.get_string(name)?)
    }

    /// 查询 32 位整数属性，失败时返回默认值 `def`
    pub fn int(&self, name: &str, def: i32) -> Resolved<i32> {
        Resolved::from_result(self.get_int(name), def)
    }

    /// 查询 64 位整数属性
    pub fn get_int64(&self, name: &str) -> Result<i64, ConfigError> {
        parse_int64(&self.get_string(name)?)
    }

    /// 查询 64 位整数属性，失败时返回默认值 `def`
    pub fn int64(&self, name: &str, def: i64) -> Resolved<i64> {
        Resolved::from_result(self.get_int64(name), def)
    }

    /// 查询浮点数属性
    pub fn get_float64(&self, name: &str) -> Result<f64, ConfigError> {
        parse_float(&self.get_string(name)?)
    }

    /// 查询浮点数属性，失败时返回默认值 `def`
    pub fn float64(&self, name: &str, def: f64) -> Resolved<f64> {
        Resolved::from_result(self.get_float64(name), def)
    }

    /// 查询布尔属性
    ///
    /// 支持 (t, true, 1, y, yes) 为真，(f, false, 0, n, no) 为假，大小写不敏感。
    pub fn get_bool(&self, name: &str) -> Result<bool, ConfigError> {
        parse_bool(&self.get_string(name)?)
    }

    /// 查询布尔属性，失败时返回默认值 `def`
    pub fn bool(&self, name: &str, def: bool) -> Resolved<bool> {
        Resolved::from_result(self.get_bool(name), def)
    }

    /// 查询时长属性
    ///
    /// 支持的单位: ms, sec, min, hour, day, week, year，
    /// 完整列表见 [`crate::timeconv::units_to_millis`]。
    pub fn get_duration(&self, name: &str) -> Result<TimeDelta, ConfigError> {
        parse_duration(&self.get_string(name)?)
    }

    /// 查询时长属性，失败时返回默认值 `def`
    pub fn duration(&self, name: &str, def: TimeDelta) -> Resolved<TimeDelta> {
        Resolved::from_result(self.get_duration(name), def)
    }

    /// 添加变更监听器，同一监听器可重复添加，每次添加都会收到通知
    pub fn add_changed_listener(&self, listener: Arc<dyn ChangedListener>) {
        self.inner.listeners.write().changed.push(listener);
    }

    /// 移除变更监听器的所有实例
    ///
    /// 监听器未注册时返回 `ConfigError::ListenerNotFound`。
    pub fn remove_changed_listener(
        &self,
        listener: &Arc<dyn ChangedListener>,
    ) -> Result<(), ConfigError> {
        if remove_all(&mut self.inner.listeners.write().changed, listener) {
            Ok(())
        } else {
            Err(ConfigError::ListenerNotFound)
        }
    }

    /// 添加逐属性变更监听器
    pub fn add_changed_prop_listener(&self, listener: Arc<dyn ChangedPropListener>) {
        self.inner.listeners.write().prop.push(listener);
    }

    /// 移除逐属性变更监听器的所有实例
    pub fn remove_changed_prop_listener(
        &self,
        listener: &Arc<dyn ChangedPropListener>,
    ) -> Result<(), ConfigError> {
        if remove_all(&mut self.inner.listeners.write().prop, listener) {
            Ok(())
        } else {
            Err(ConfigError::ListenerNotFound)
        }
    }

    /// 已注册的变更监听器数量（含重复注册）
    pub fn changed_listener_count(&self) -> usize {
        self.inner.listeners.read().changed.len()
    }

    /// 已注册的逐属性监听器数量（含重复注册）
    pub fn changed_prop_listener_count(&self) -> usize {
        self.inner.listeners.read().prop.len()
    }

    /// 当前监听器列表的快照，回调期间不持有锁
    pub(crate) fn listener_snapshot(
        &self,
    ) -> (Vec<Arc<dyn ChangedListener>>, Vec<Arc<dyn ChangedPropListener>>) {
        let listeners = self.inner.listeners.read();
        (listeners.changed.clone(), listeners.prop.clone())
    }

    /// 停止所有配置源的监控，可重复调用
    ///
    /// 只发出停止信号，不等待监控任务退出。
    pub fn shutdown(&self) {
        if !self.inner.shutdown_tx.send_replace(true) {
            info!("配置监控已停止");
        } else {
            debug!("配置监控已处于停止状态");
        }
    }

    /// 是否已调用 [`Config::shutdown`]
    pub fn is_shutdown(&self) -> bool {
        *self.inner.shutdown_tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::map_source::SrcMap;
    use crate::config::source::MonitoredSource;
    use crate::error::ValueKind;

    struct TestListener;

    impl ChangedListener for TestListener {
        fn on_config_changed(&self, _config: &Config, _src: &dyn MonitoredSource) {}
    }

    fn three_sources() -> (Arc<SrcMap>, Arc<SrcMap>, Arc<SrcMap>) {
        (
            Arc::new(SrcMap::from_map([("prop1", "1")])),
            Arc::new(SrcMap::from_map([("prop2", "2"), ("prop1", "2")])),
            Arc::new(SrcMap::from_map([("prop3", "3"), ("prop2", "3"), ("prop1", "3")])),
        )
    }

    #[test]
    fn test_prepend_source() {
        let (src1, src2, src3) = three_sources();
        let cfg = Config::new();

        cfg.prepend_source(src1);
        assert_eq!(cfg.source_count(), 1);
        assert_eq!(cfg.get_string("prop1").unwrap(), "1");
        assert!(cfg.get_string("blap").unwrap_err().is_not_found());

        cfg.prepend_source(src2);
        assert_eq!(cfg.source_count(), 2);
        assert_eq!(cfg.get_string("prop1").unwrap(), "2");
        assert_eq!(cfg.get_string("prop2").unwrap(), "2");

        cfg.prepend_source(src3);
        assert_eq!(cfg.source_count(), 3);
        assert_eq!(cfg.get_string("prop1").unwrap(), "3");
        assert_eq!(cfg.get_string("prop2").unwrap(), "3");
        assert_eq!(cfg.get_string("prop3").unwrap(), "3");
        assert!(cfg.get_string("blap").is_err());
        cfg.shutdown();
    }

    #[test]
    fn test_append_source() {
        let (src1, src2, src3) = three_sources();
        let cfg = Config::new();

        cfg.append_source(src1);
        assert_eq!(cfg.get_string("prop1").unwrap(), "1");

        cfg.append_source(src2);
        assert_eq!(cfg.get_string("prop1").unwrap(), "1");
        assert_eq!(cfg.get_string("prop2").unwrap(), "2");

        cfg.append_source(src3);
        assert_eq!(cfg.source_count(), 3);
        assert_eq!(cfg.get_string("prop1").unwrap(), "1");
        assert_eq!(cfg.get_string("prop2").unwrap(), "2");
        assert_eq!(cfg.get_string("prop3").unwrap(), "3");
        cfg.shutdown();
    }

    #[test]
    fn test_prepend_many_keeps_given_order() {
        let (src1, src2, src3) = three_sources();
        let cfg = Config::new();
        cfg.append_source(src3);
        cfg.prepend_sources([src1 as Arc<dyn Source>, src2 as Arc<dyn Source>]);
        assert_eq!(cfg.get_string("prop1").unwrap(), "1");
        assert_eq!(cfg.get_string("prop2").unwrap(), "2");
        assert_eq!(cfg.get_string("prop3").unwrap(), "3");
    }

    #[test]
    fn test_string_trims_and_defaults() {
        let cfg = Config::new();
        cfg.append_source(Arc::new(SrcMap::from_map([("name", "  demo \t")])));

        assert_eq!(cfg.string("name", "x").value, "demo");
        let missing = cfg.string("", "x");
        assert_eq!(missing.value, "x");
        assert!(matches!(missing.error, Some(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_typed_getters_return_default_on_error() {
        let cfg = Config::new();
        cfg.append_source(Arc::new(SrcMap::from_map([
            ("int", "42"),
            ("bad_int", "0x11"),
            ("big", "4294967294"),
            ("float", "1.85"),
            ("flag", " YES "),
            ("delay", "1 minute"),
        ])));

        let r = cfg.int("missing", -1);
        assert_eq!(r.value, -1);
        assert!(matches!(r.error, Some(ConfigError::NotFound { .. })));

        assert_eq!(cfg.int("int", -1).value, 42);

        let r = cfg.int("bad_int", -1);
        assert_eq!(r.value, -1);
        assert!(matches!(
            r.error,
            Some(ConfigError::InvalidSyntax { kind: ValueKind::Int, .. })
        ));

        let r = cfg.int("big", -1);
        assert_eq!(r.value, -1);
        assert!(matches!(r.error, Some(ConfigError::OutOfRange { .. })));
        assert_eq!(cfg.int64("big", -1).value, 4_294_967_294);

        assert_eq!(cfg.float64("float", -1.0).value, 1.85);
        assert!(cfg.bool("flag", false).value);
        assert_eq!(
            cfg.duration("delay", TimeDelta::zero()).value,
            TimeDelta::milliseconds(60_000)
        );

        let r = cfg.bool("int", true);
        assert!(r.value);
        assert!(matches!(r.error, Some(ConfigError::InvalidSyntax { .. })));
    }

    #[test]
    fn test_add_remove_changed_listener() {
        let cfg = Config::new();
        let tl1: Arc<dyn ChangedListener> = Arc::new(TestListener);
        let tl2: Arc<dyn ChangedListener> = Arc::new(TestListener);
        let tl3: Arc<dyn ChangedListener> = Arc::new(TestListener);

        cfg.add_changed_listener(Arc::clone(&tl1));
        assert_eq!(cfg.changed_listener_count(), 1);
        cfg.add_changed_listener(Arc::clone(&tl2));
        assert_eq!(cfg.changed_listener_count(), 2);
        cfg.add_changed_listener(Arc::clone(&tl3));
        cfg.add_changed_listener(Arc::clone(&tl1));
        assert_eq!(cfg.changed_listener_count(), 4);

        // 移除会删除所有重复注册的实例
        cfg.remove_changed_listener(&tl1).unwrap();
        assert_eq!(cfg.changed_listener_count(), 2);
        cfg.remove_changed_listener(&tl2).unwrap();
        assert_eq!(cfg.changed_listener_count(), 1);
        cfg.remove_changed_listener(&tl3).unwrap();
        assert_eq!(cfg.changed_listener_count(), 0);

        assert_eq!(
            cfg.remove_changed_listener(&tl1),
            Err(ConfigError::ListenerNotFound)
        );
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let cfg = Config::new();
        assert!(!cfg.is_shutdown());
        cfg.shutdown();
        cfg.shutdown();
        assert!(cfg.is_shutdown());
        assert!(cfg.clone().is_shutdown());
    }
}
