//! 基于 INI 文件的配置源

use crate::config::source::{MonitorFreq, MonitoredSource, Source};
use crate::error::{IniError, Result};
use crate::ini::Ini;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 由 INI 文件支撑的配置源
///
/// 属性名使用扁平化约定：默认节的属性为 `key`，其他节为 `section.key`。
/// 文件只在创建时加载一次，最后修改时间固定为加载时间，因此不会产生变更通知。
#[derive(Debug)]
pub struct SrcFile {
    ini: Ini,
    path: Option<PathBuf>,
    loaded_at: DateTime<Utc>,
    freq: MonitorFreq,
}

impl SrcFile {
    /// 从文件路径创建配置源
    ///
    /// 文件中存在无法解析的行时返回错误，不会创建部分加载的配置源。
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load_from_file(path)?;
        info!("INI配置源已加载: {}", path.display());
        Ok(Self::with_ini(ini, Some(path.to_path_buf())))
    }

    /// 从文件路径创建配置源，允许部分解析成功
    ///
    /// 无法解析的行作为诊断信息返回，其余属性照常可用；
    /// 只有读取文件失败时返回错误。
    ///
    /// # 返回
    /// * `Result<(Self, Option<IniError>)>` - 配置源与解析诊断
    pub fn from_path_lossy<P: AsRef<Path>>(path: P) -> Result<(Self, Option<IniError>)> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        let diagnostics = match ini.load_from_file(path) {
            Ok(()) => None,
            Err(IniError::Parse(errors)) => {
                warn!("INI配置源部分解析失败 {}: {}", path.display(), errors);
                Some(IniError::Parse(errors))
            }
            Err(e) => return Err(e.into()),
        };
        info!("INI配置源已加载: {}", path.display());
        Ok((Self::with_ini(ini, Some(path.to_path_buf())), diagnostics))
    }

    /// 从读取器创建配置源
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut ini = Ini::new();
        ini.load_from_reader(reader)?;
        Ok(Self::with_ini(ini, None))
    }

    /// 从字符串创建配置源，允许部分解析成功
    ///
    /// # 返回
    /// * `(Self, Option<IniError>)` - 配置源与解析诊断
    pub fn from_str_lossy(text: &str) -> (Self, Option<IniError>) {
        let mut ini = Ini::new();
        let err = ini.load_from_str(text).err();
        if let Some(ref e) = err {
            warn!("INI配置源部分解析失败: {}", e);
        }
        (Self::with_ini(ini, None), err)
    }

    fn with_ini(ini: Ini, path: Option<PathBuf>) -> Self {
        Self {
            ini,
            path,
            loaded_at: Utc::now(),
            freq: MonitorFreq::new(Duration::from_secs(60)),
        }
    }

    /// 解析后的文档
    pub fn ini(&self) -> &Ini {
        &self.ini
    }

    /// 文件路径（从文件创建时）
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 设置监控间隔，零表示暂停
    pub fn set_monitor_freq(&self, freq: Duration) {
        self.freq.set(freq);
    }
}

impl Source for SrcFile {
    fn get_prop(&self, name: &str) -> Option<String> {
        // 先按默认节查找，再按 `section.key` 拆分查找；节名本身可能包含 '.'
        if let Some(value) = self.ini.get_prop("", name) {
            return Some(value.to_string());
        }
        name.match_indices('.').find_map(|(idx, _)| {
            let (section, key) = (&name[..idx], &name[idx + 1..]);
            self.ini.get_prop(section, key).map(str::to_string)
        })
    }

    fn monitored(self: Arc<Self>) -> Option<Arc<dyn MonitoredSource>> {
        Some(self)
    }
}

impl MonitoredSource for SrcFile {
    fn last_modified(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    fn monitor_freq(&self) -> Duration {
        self.freq.get()
    }

    fn properties(&self) -> Option<HashMap<String, String>> {
        Some(self.ini.to_map().into_iter().collect())
    }
}
