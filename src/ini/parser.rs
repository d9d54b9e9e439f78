//! INI 文本解析器
//!
//! 逐行解析文本：`[节名]` 开启新节，`key = value` 为属性，
//! 以 `;` 或 `#` 开头的行为注释。第一个节头之前的属性归入名为 `""` 的节，
//! 以支持不分节的 Linux 风格配置文件。

use super::section::Section;
use crate::common::MultiError;
use crate::error::LineError;
use std::collections::HashMap;
use tracing::debug;

/// 一次解析默认最多保留的错误数量
pub const DEFAULT_MAX_ERRORS: usize = 100;

/// 单行属性的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropLine {
    /// 键值对
    KeyValue { key: String, value: String },
    /// 恰好包含 '=' 的注释行
    Comment,
}

/// 解析文本并返回按名称索引的节
///
/// 遇到错误不会中止：所有行错误被聚合到 [`MultiError`] 中返回，
/// 同时返回已成功解析的节。
///
/// 同名节重复出现时，后出现的节整体替换先出现的节。
///
/// # 参数
/// * `text` - INI 文本
/// * `max_errors` - 最多保留的错误数量
///
/// # 返回
/// * `(HashMap<String, Section>, Option<MultiError>)` - 节映射与可能的聚合错误
pub fn get_sections(text: &str, max_errors: usize) -> (HashMap<String, Section>, Option<MultiError>) {
    let mut merr = MultiError::new(max_errors);
    let mut sections = HashMap::new();
    let mut current = Section::new("");

    for line in build_line_array(text) {
        if let Some(name) = parse_section(line) {
            store_section(&mut sections, current);
            current = Section::new(name);
            continue;
        }

        match parse_prop(line) {
            Ok(PropLine::KeyValue { key, value }) => current.insert(key, value),
            Ok(PropLine::Comment) => {}
            Err(e) => merr.append(e),
        }
    }
    store_section(&mut sections, current);

    debug!("INI解析完成: {} 个节, {} 个错误", sections.len(), merr.len() + merr.overflow());

    let err = if merr.is_empty() && merr.overflow() == 0 {
        None
    } else {
        Some(merr)
    };
    (sections, err)
}

/// 保存已完成的节；未命名且没有属性的节被丢弃
fn store_section(sections: &mut HashMap<String, Section>, section: Section) {
    if section.name().is_empty() && section.is_empty() {
        return;
    }
    if sections.contains_key(section.name()) {
        debug!("节 '{}' 重复出现，以后出现的为准", section.name());
    }
    sections.insert(section.name().to_string(), section);
}

/// 将文本拆分为逻辑行
///
/// 行以 LF、CR 或 CRLF 结尾。每行去除首尾空白，
/// 空行以及以 ';' 或 '#' 开头的注释行被跳过。
pub fn build_line_array(text: &str) -> Vec<&str> {
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';') && !line.starts_with('#'))
        .collect()
}

/// 解析节头 `[name]`
///
/// 返回方括号内去除空白后的节名；不是节头时返回 `None`。
pub fn parse_section(line: &str) -> Option<&str> {
    let line = line.trim();
    let rest = line.strip_prefix('[')?;
    let closer = rest.find(']')?;
    Some(rest[..closer].trim())
}

/// 解析 `key = value` 行
///
/// 以第一个 '=' 分割，键与值各自去除空白，值可以为空。
/// 键以 ';' 或 '#' 开头时视为注释。
pub fn parse_prop(line: &str) -> Result<PropLine, LineError> {
    let (key, value) = line
        .split_once('=')
        .ok_or_else(|| LineError::NotKeyValue(line.to_string()))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(LineError::EmptyKey(line.to_string()));
    }
    if key.starts_with(';') || key.starts_with('#') {
        return Ok(PropLine::Comment);
    }

    Ok(PropLine::KeyValue {
        key: key.to_string(),
        value: value.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_line_array() {
        let cases: &[(&str, &[&str])] = &[
            (" line 1 \n line 2 \nline 3", &["line 1", "line 2", "line 3"]),
            (" line 1 \r\n line 2 \r\nline 3", &["line 1", "line 2", "line 3"]),
            (" line 1 \r line 2 \rline 3\r", &["line 1", "line 2", "line 3"]),
            (" line 1 \n ;line 2 \n#line 3", &["line 1"]),
            ("", &[]),
            ("\n\n\n  \n", &[]),
            ("#hello", &[]),
        ];
        for (input, expected) in cases {
            assert_eq!(build_line_array(input), *expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_parse_section() {
        assert_eq!(parse_section("[sec1]"), Some("sec1"));
        assert_eq!(parse_section("  []  "), Some(""));
        assert_eq!(parse_section(" [   ]  "), Some(""));
        assert_eq!(parse_section("[  sec1  ]"), Some("sec1"));
        assert_eq!(parse_section("[sec1"), None);
        assert_eq!(parse_section("sec1]"), None);
        assert_eq!(parse_section("blap"), None);
        assert_eq!(parse_section(""), None);
    }

    #[test]
    fn test_parse_prop() {
        let kv = |k: &str, v: &str| PropLine::KeyValue {
            key: k.to_string(),
            value: v.to_string(),
        };

        assert_eq!(parse_prop(" num = 77 "), Ok(kv("num", "77")));
        assert_eq!(parse_prop("#num = 77 "), Ok(PropLine::Comment));
        assert_eq!(parse_prop(" num =   "), Ok(kv("num", "")));
        assert_eq!(parse_prop(" num = 77 77"), Ok(kv("num", "77 77")));
        assert_eq!(parse_prop("url = a=b"), Ok(kv("url", "a=b")));
        assert!(matches!(parse_prop(" blap! "), Err(LineError::NotKeyValue(_))));
        assert!(matches!(parse_prop("  = 77 "), Err(LineError::EmptyKey(_))));
    }

    #[test]
    fn test_get_sections_aggregates_errors() {
        let text = "key0=val0\nbad line\n[sec1]\nkey1=val1\n= nokey\nalso bad\n[sec2]\nkey2=val2";
        let (sections, err) = get_sections(text, DEFAULT_MAX_ERRORS);

        let err = err.expect("应返回聚合错误");
        assert_eq!(err.len(), 3);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[""].get_prop("key0"), Some("val0"));
        assert_eq!(sections["sec1"].get_prop("key1"), Some("val1"));
        assert_eq!(sections["sec2"].get_prop("key2"), Some("val2"));
    }

    #[test]
    fn test_get_sections_error_cap() {
        let text = "a\nb\nc\nd\n[sec]\nk=v";
        let (sections, err) = get_sections(text, 2);
        let err = err.expect("应返回聚合错误");
        assert_eq!(err.len(), 2);
        assert_eq!(err.overflow(), 2);
        assert_eq!(sections["sec"].get_prop("k"), Some("v"));
    }

    #[test]
    fn test_empty_default_section_dropped() {
        let (sections, err) = get_sections("[sec1]\nkey=val", DEFAULT_MAX_ERRORS);
        assert!(err.is_none());
        assert!(!sections.contains_key(""));

        // 显式的空节名但没有属性同样被丢弃
        let (sections, _) = get_sections("[]\n[sec1]\nkey=val", DEFAULT_MAX_ERRORS);
        assert!(!sections.contains_key(""));
    }

    #[test]
    fn test_named_empty_section_kept() {
        let (sections, err) = get_sections("[sec1]\n[sec2]\nkey=val", DEFAULT_MAX_ERRORS);
        assert!(err.is_none());
        assert!(sections["sec1"].is_empty());
        assert_eq!(sections["sec2"].len(), 1);
    }

    #[test]
    fn test_duplicate_section_replaces() {
        let text = "[sec1]\nkey1=a\nkey2=b\n[sec2]\nx=y\n[sec1]\nkey1=c";
        let (sections, _) = get_sections(text, DEFAULT_MAX_ERRORS);
        assert_eq!(sections["sec1"].get_prop("key1"), Some("c"));
        assert_eq!(sections["sec1"].get_prop("key2"), None);
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let (sections, _) = get_sections("k=1\nk=2", DEFAULT_MAX_ERRORS);
        assert_eq!(sections[""].get_prop("k"), Some("2"));
    }
}
