//! 配置变更监听器

use crate::config::resolver::Config;
use crate::config::source::MonitoredSource;
use std::sync::Arc;

/// 配置源中一个或多个属性变更时接收通知
pub trait ChangedListener: Send + Sync {
    /// 配置源 `src` 中有属性值发生变化
    fn on_config_changed(&self, config: &Config, src: &dyn MonitoredSource);
}

/// 按属性接收变更通知
pub trait ChangedPropListener: Send + Sync {
    /// 每个值发生变化（新增、修改或删除）的属性调用一次
    fn on_prop_changed(&self, config: &Config, src: &dyn MonitoredSource, name: &str);
}

/// 按指针判断两个监听器是否为同一实例
pub(crate) fn same_listener<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// 从列表中移除所有与 `target` 相同的实例，返回是否有移除
pub(crate) fn remove_all<T: ?Sized>(list: &mut Vec<Arc<T>>, target: &Arc<T>) -> bool {
    let before = list.len();
    list.retain(|l| !same_listener(l, target));
    list.len() != before
}
