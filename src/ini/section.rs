//! 节与 INI 文档
//!
//! [`Section`] 保存单个节的属性，[`Ini`] 保存一次解析得到的全部节，
//! 并提供扁平化的读取视图。

use super::parser::{get_sections, DEFAULT_MAX_ERRORS};
use crate::error::IniError;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// INI 节
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    /// 节名，`""` 表示第一个节头之前的默认节
    name: String,
    /// 属性
    props: HashMap<String, String>,
}

impl Section {
    /// 创建空节
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 插入或覆盖属性
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.props.insert(key.into(), value.into());
    }

    /// 获取属性值
    pub fn get_prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// 节内所有键，顺序不确定
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.props.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// 扁平化键名：默认节为 `key`，其他节为 `section.key`
    fn flatten_key(&self, key: &str) -> String {
        if self.name.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.name, key)
        }
    }
}

/// 解析后的 INI 文档
#[derive(Debug, Clone, Default)]
pub struct Ini {
    sections: HashMap<String, Section>,
    max_errors: Option<usize>,
}

impl Ini {
    /// 创建空文档
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置单次解析最多保留的错误数量
    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = Some(max_errors);
        self
    }

    /// 从字符串加载
    ///
    /// 之前加载的内容被整体替换。存在行错误时仍会保存成功解析的节，
    /// 并返回 `IniError::Parse`。
    pub fn load_from_str(&mut self, text: &str) -> Result<(), IniError> {
        let (sections, err) = get_sections(text, self.max_errors.unwrap_or(DEFAULT_MAX_ERRORS));
        self.sections = sections;

        match err {
            Some(merr) => {
                warn!("INI解析存在 {} 个错误，已保留可解析的部分", merr.len() + merr.overflow());
                Err(IniError::Parse(merr))
            }
            None => Ok(()),
        }
    }

    /// 从任意读取器加载
    pub fn load_from_reader<R: Read>(&mut self, mut reader: R) -> Result<(), IniError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.load_from_str(&text)
    }

    /// 从文件加载
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), IniError> {
        let path = path.as_ref();
        debug!("加载INI文件: {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let result = self.load_from_str(&text);
        if result.is_ok() {
            info!("成功加载INI文件: {}", path.display());
        }
        result
    }

    /// 获取指定节中的属性值
    pub fn get_prop(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get_prop(key)
    }

    /// 获取指定节
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// 获取指定节中的所有键，顺序不确定
    pub fn get_keys(&self, section: &str) -> Result<Vec<String>, IniError> {
        let section = self
            .sections
            .get(section)
            .ok_or_else(|| IniError::SectionNotFound {
                section: section.to_string(),
            })?;
        Ok(section.keys().map(str::to_string).collect())
    }

    /// 所有节名，包括默认节 `""`（如果存在），顺序不确定
    pub fn get_section_names(&self) -> Vec<String> {
        self.sections.keys().cloned().collect()
    }

    /// 所有扁平化键名，顺序不确定
    pub fn get_flattened_keys(&self) -> Vec<String> {
        self.sections
            .values()
            .flat_map(|section| section.keys().map(|key| section.flatten_key(key)))
            .collect()
    }

    /// 转换为扁平化的键值映射
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.sections
            .values()
            .flat_map(|section| {
                section
                    .iter()
                    .map(|(key, value)| (section.flatten_key(key), value.to_string()))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
