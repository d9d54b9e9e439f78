//! 配置源变更监控
//!
//! 每个支持监控的配置源对应一个独立的轮询任务：按配置源给出的间隔检查
//! 最后修改时间，发现更新后通知所有监听器。间隔为零时进入暂停状态，
//! 每 10 秒重新读取一次间隔。

use crate::config::resolver::{Config, ConfigInner};
use crate::config::source::MonitoredSource;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 暂停状态下重新读取监控间隔的周期
pub const PAUSED_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// 监控任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorState {
    /// 暂停检查，只轮询监控间隔
    Paused,
    /// 按给定间隔检查变更
    Active(Duration),
}

impl MonitorState {
    fn from_freq(freq: Duration) -> Self {
        if freq.is_zero() {
            MonitorState::Paused
        } else {
            MonitorState::Active(freq)
        }
    }

    /// 下一次唤醒前的等待时间
    fn wait(self) -> Duration {
        match self {
            MonitorState::Paused => PAUSED_POLL_INTERVAL,
            MonitorState::Active(freq) => freq,
        }
    }
}

/// 为配置源启动监控任务
///
/// 任务运行在当前 tokio 运行时上；没有运行时时记录警告并跳过监控。
/// 任务只持有解析器的弱引用，解析器释放或调用 `shutdown` 后退出。
pub(crate) fn spawn_monitor(
    config: &Config,
    src: Arc<dyn MonitoredSource>,
) -> Option<JoinHandle<()>> {
    let handle = match Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            warn!("当前没有tokio运行时，跳过配置源变更监控");
            return None;
        }
    };

    // 基线在注册时读取，注册之后的任何修改都会被发现
    let baseline = Baseline {
        last_modified: src.last_modified(),
        properties: src.properties(),
    };
    let shutdown = config.inner.shutdown_tx.subscribe();
    let weak = Arc::downgrade(&config.inner);
    Some(handle.spawn(run_monitor(weak, src, baseline, shutdown)))
}

/// 注册时记录的配置源状态
struct Baseline {
    last_modified: DateTime<Utc>,
    properties: Option<HashMap<String, String>>,
}

/// 单个配置源的监控循环
async fn run_monitor(
    config: Weak<ConfigInner>,
    src: Arc<dyn MonitoredSource>,
    baseline: Baseline,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut state = MonitorState::from_freq(src.monitor_freq());
    let mut last = baseline.last_modified;
    let mut snapshot = baseline.properties;

    debug!("配置源监控任务已启动: {:?}", state);

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(state.wait()) => {}
        }

        if let MonitorState::Active(_) = state {
            let latest = src.last_modified();
            if latest > last {
                last = latest;

                let Some(inner) = config.upgrade() else {
                    break;
                };
                let config = Config { inner };

                let changed_props = match (snapshot.take(), src.properties()) {
                    (Some(old), Some(new)) => {
                        let names = changed_properties(&old, &new);
                        snapshot = Some(new);
                        names
                    }
                    (_, new) => {
                        snapshot = new;
                        Vec::new()
                    }
                };

                debug!("检测到配置源变更，变更属性数量: {}", changed_props.len());
                notify_listeners(&config, &src, &changed_props, &shutdown);
            }
        }

        let next = MonitorState::from_freq(src.monitor_freq());
        if next != state {
            match next {
                MonitorState::Paused => info!("配置源监控已暂停"),
                MonitorState::Active(freq) => info!("配置源监控间隔: {:?}", freq),
            }
        }
        state = next;
    }

    debug!("配置源监控任务已退出");
}

/// 依次通知所有监听器
///
/// 监听器中的 panic 被捕获并记录，不影响其他监听器和监控循环。
/// 通知过程中收到停止信号时立即返回。
fn notify_listeners(
    config: &Config,
    src: &Arc<dyn MonitoredSource>,
    changed_props: &[String],
    shutdown: &watch::Receiver<bool>,
) {
    let (changed, prop) = config.listener_snapshot();

    for listener in changed {
        if *shutdown.borrow() {
            return;
        }
        let result = catch_unwind(AssertUnwindSafe(|| {
            listener.on_config_changed(config, src.as_ref());
        }));
        if let Err(panic) = result {
            error!("配置变更监听器执行失败: {}", panic_message(panic.as_ref()));
        }
    }

    for name in changed_props {
        for listener in &prop {
            if *shutdown.borrow() {
                return;
            }
            let result = catch_unwind(AssertUnwindSafe(|| {
                listener.on_prop_changed(config, src.as_ref(), name);
            }));
            if let Err(panic) = result {
                error!("属性变更监听器执行失败 ({}): {}", name, panic_message(panic.as_ref()));
            }
        }
    }
}

/// 计算新增、修改或删除的属性名，按名称排序
pub(crate) fn changed_properties(
    old: &HashMap<String, String>,
    new: &HashMap<String, String>,
) -> Vec<String> {
    let mut names: Vec<String> = new
        .iter()
        .filter(|(name, value)| old.get(*name) != Some(*value))
        .map(|(name, _)| name.clone())
        .chain(old.keys().filter(|name| !new.contains_key(*name)).cloned())
        .collect();
    names.sort();
    names
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知错误".to_string()
    }
}
