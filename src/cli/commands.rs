//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, DumpFormat, ValueType};
use crate::config::{Config, MonitoredSource, Source, SrcFile, SrcMap};
use crate::timeconv::parse_milliseconds;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "config.ini";

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 生成命令输出
    async fn render(&self, args: &Args) -> Result<String>;

    /// 执行命令并将结果写到标准输出
    async fn execute(&self, args: &Args) -> Result<()> {
        let output = self.render(args).await?;
        if !output.is_empty() {
            println!("{}", output);
        }
        Ok(())
    }
}

/// 已加载的配置文件与组合后的解析器
pub struct LoadedConfig {
    /// 组合后的解析器
    pub config: Config,
    /// 按优先级排列的文件配置源
    pub files: Vec<Arc<SrcFile>>,
    /// 命令行覆盖属性
    pub overrides: Arc<SrcMap>,
}

impl LoadedConfig {
    /// 按命令行参数加载全部配置源
    ///
    /// 覆盖属性最先查询，其后按指定顺序查询各文件。文件中无法解析的行
    /// 记录警告后跳过，无法读取的文件返回错误。
    pub fn from_args(args: &Args) -> Result<Self> {
        let paths = resolve_config_paths(&args.files);

        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            let (src, diagnostics) = SrcFile::from_path_lossy(path)
                .with_context(|| format!("加载配置文件失败: {}", path.display()))?;
            if let Some(e) = diagnostics {
                warn!("配置文件 {} 中有无法解析的行，已忽略: {}", path.display(), e);
            }
            files.push(Arc::new(src));
        }

        let overrides = Arc::new(SrcMap::from_map(args.overrides.iter().cloned()));

        let config = Config::new();
        config.append_sources(files.iter().map(|f| f.clone() as Arc<dyn Source>));
        if !overrides.is_empty() {
            config.prepend_source(overrides.clone());
        }
        info!(
            "已加载 {} 个配置文件，{} 个覆盖属性",
            files.len(),
            overrides.len()
        );

        Ok(Self {
            config,
            files,
            overrides,
        })
    }

    /// 合并后的扁平属性表，高优先级的值覆盖低优先级的值
    pub fn merged(&self) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        for file in self.files.iter().rev() {
            merged.extend(file.ini().to_map());
        }
        if let Some(props) = self.overrides.properties() {
            merged.extend(props);
        }
        merged
    }

    /// 按节合并全部文件，高优先级的值覆盖低优先级的值
    ///
    /// 覆盖属性放入扁平化名称对应的节中；找不到对应的键时放入默认节。
    pub fn sectioned(&self) -> SectionMap {
        let mut out = SectionMap::new();
        for file in self.files.iter().rev() {
            let ini = file.ini();
            for name in ini.get_section_names() {
                let Some(section) = ini.section(&name) else {
                    continue;
                };
                let entry = out.entry(name).or_default();
                for (k, v) in section.iter() {
                    entry.insert(k.to_string(), v.to_string());
                }
            }
        }

        if let Some(props) = self.overrides.properties() {
            for (name, value) in props {
                let (section, key) = locate_flattened(&out, &name)
                    .unwrap_or_else(|| (String::new(), name.clone()));
                out.entry(section).or_default().insert(key, value);
            }
        }
        out
    }
}

/// 按节分组的属性表：节名 -> (键 -> 值)
pub type SectionMap = BTreeMap<String, BTreeMap<String, String>>;

/// 查找扁平化名称 `name` 已存在于哪个节的哪个键，默认节优先
fn locate_flattened(sections: &SectionMap, name: &str) -> Option<(String, String)> {
    sections.iter().find_map(|(section, keys)| {
        let key = if section.is_empty() {
            name
        } else {
            name.strip_prefix(section.as_str())?.strip_prefix('.')?
        };
        keys.contains_key(key)
            .then(|| (section.clone(), key.to_string()))
    })
}

/// 渲染为 INI 文本：默认节的属性在最前，其后每个节一个 `[节名]` 块
pub fn render_ini(sections: &SectionMap) -> String {
    let mut blocks = Vec::new();
    for (name, keys) in sections {
        let mut lines = Vec::with_capacity(keys.len() + 1);
        if !name.is_empty() {
            lines.push(format!("[{}]", name));
        } else if keys.is_empty() {
            continue;
        }
        lines.extend(keys.iter().map(|(k, v)| format!("{} = {}", k, v)));
        blocks.push(lines.join("\n"));
    }
    blocks.join("\n\n")
}

/// 确定要加载的配置文件
///
/// 显式指定的文件全部加载；未指定时依次尝试当前目录和用户配置目录下的
/// `config.ini`，都不存在则不加载任何文件。
pub fn resolve_config_paths(explicit: &[PathBuf]) -> Vec<PathBuf> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }

    let candidates = [
        Some(PathBuf::from(DEFAULT_CONFIG_FILE)),
        dirs::config_dir().map(|dir| dir.join("layercfg").join(DEFAULT_CONFIG_FILE)),
    ];

    match candidates.into_iter().flatten().find(|p| p.is_file()) {
        Some(path) => {
            debug!("使用默认配置文件: {}", path.display());
            vec![path]
        }
        None => {
            debug!("未找到默认配置文件");
            Vec::new()
        }
    }
}

/// 查询命令
pub struct GetCommand;

#[async_trait]
impl Command for GetCommand {
    async fn render(&self, args: &Args) -> Result<String> {
        let Commands::Get {
            name,
            value_type,
            default,
        } = &args.command
        else {
            return Ok(String::new());
        };

        let loaded = LoadedConfig::from_args(args)?;
        let value = match default {
            Some(def) => self.resolve_with_default(&loaded.config, name, *value_type, def)?,
            None => self
                .resolve_strict(&loaded.config, name, *value_type)
                .with_context(|| format!("查询属性 '{}' 失败", name))?,
        };
        loaded.config.shutdown();
        Ok(value)
    }
}

impl GetCommand {
    /// 查询属性，不存在或转换失败时返回错误
    fn resolve_strict(
        &self,
        config: &Config,
        name: &str,
        value_type: ValueType,
    ) -> std::result::Result<String, crate::ConfigError> {
        Ok(match value_type {
            ValueType::String => config.get_string(name)?,
            ValueType::Int => config.get_int(name)?.to_string(),
            ValueType::Int64 => config.get_int64(name)?.to_string(),
            ValueType::Float => config.get_float64(name)?.to_string(),
            ValueType::Bool => config.get_bool(name)?.to_string(),
            ValueType::Duration => config.get_duration(name)?.num_milliseconds().to_string(),
        })
    }

    /// 查询属性，失败时回退到默认值
    ///
    /// 默认值本身必须能转换为目标类型。
    fn resolve_with_default(
        &self,
        config: &Config,
        name: &str,
        value_type: ValueType,
        def: &str,
    ) -> Result<String> {
        use crate::config::value;

        let invalid_default = || format!("默认值 '{}' 无法转换为 {:?}", def, value_type);
        let (output, error) = match value_type {
            ValueType::String => {
                let r = config.string(name, def);
                (r.value, r.error)
            }
            ValueType::Int => {
                let r = config.int(name, value::parse_int(def).with_context(invalid_default)?);
                (r.value.to_string(), r.error)
            }
            ValueType::Int64 => {
                let r = config.int64(name, value::parse_int64(def).with_context(invalid_default)?);
                (r.value.to_string(), r.error)
            }
            ValueType::Float => {
                let r =
                    config.float64(name, value::parse_float(def).with_context(invalid_default)?);
                (r.value.to_string(), r.error)
            }
            ValueType::Bool => {
                let r = config.bool(name, value::parse_bool(def).with_context(invalid_default)?);
                (r.value.to_string(), r.error)
            }
            ValueType::Duration => {
                let r = config.duration(
                    name,
                    value::parse_duration(def).with_context(invalid_default)?,
                );
                (r.value.num_milliseconds().to_string(), r.error)
            }
        };

        if let Some(err) = error {
            if !err.is_not_found() {
                warn!("属性 '{}' 使用默认值: {}", name, err);
            }
        }
        Ok(output)
    }
}

/// 导出命令
pub struct DumpCommand;

#[async_trait]
impl Command for DumpCommand {
    async fn render(&self, args: &Args) -> Result<String> {
        let Commands::Dump { format } = &args.command else {
            return Ok(String::new());
        };

        let loaded = LoadedConfig::from_args(args)?;
        let merged = loaded.merged();
        loaded.config.shutdown();

        match *format {
            DumpFormat::Ini => Ok(render_ini(&loaded.sectioned())),
            DumpFormat::Json => {
                serde_json::to_string_pretty(&merged).context("序列化为JSON失败")
            }
            DumpFormat::Toml => toml::to_string(&merged)
                .map(|s| s.trim_end().to_string())
                .context("序列化为TOML失败"),
        }
    }
}

/// 列出节命令
pub struct SectionsCommand;

#[async_trait]
impl Command for SectionsCommand {
    async fn render(&self, args: &Args) -> Result<String> {
        let loaded = LoadedConfig::from_args(args)?;
        let mut lines = Vec::new();
        for file in &loaded.files {
            if let Some(path) = file.path() {
                lines.push(format!("# {}", path.display()));
            }
            let mut names = file.ini().get_section_names();
            names.sort();
            lines.extend(names.into_iter().map(|name| format!("[{}]", name)));
        }
        loaded.config.shutdown();
        Ok(lines.join("\n"))
    }
}

/// 时长换算命令
pub struct DurationCommand;

#[async_trait]
impl Command for DurationCommand {
    async fn render(&self, args: &Args) -> Result<String> {
        let Commands::Duration { text } = &args.command else {
            return Ok(String::new());
        };
        let millis =
            parse_milliseconds(text).with_context(|| format!("无法解析时长 '{}'", text))?;
        Ok(millis.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ini_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("layercfg").chain(argv.iter().copied())).unwrap()
    }

    #[tokio::test]
    async fn test_get_respects_file_order_and_overrides() {
        let first = ini_file("name = first\n[server]\nport = 8080\n");
        let second = ini_file("name = second\nextra = yes\n");
        let f1 = first.path().to_str().unwrap();
        let f2 = second.path().to_str().unwrap();

        let out = GetCommand
            .render(&parse(&["-f", f1, "-f", f2, "get", "name"]))
            .await
            .unwrap();
        assert_eq!(out, "first");

        let out = GetCommand
            .render(&parse(&["-f", f1, "-f", f2, "get", "extra", "--type", "bool"]))
            .await
            .unwrap();
        assert_eq!(out, "true");

        let out = GetCommand
            .render(&parse(&[
                "-f", f1, "--set", "server.port=9090", "get", "server.port", "--type", "int",
            ]))
            .await
            .unwrap();
        assert_eq!(out, "9090");
    }

    #[tokio::test]
    async fn test_get_missing_property() {
        let file = ini_file("a = 1\n");
        let f = file.path().to_str().unwrap();

        let err = GetCommand
            .render(&parse(&["-f", f, "get", "missing"]))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("not found"));

        let out = GetCommand
            .render(&parse(&["-f", f, "get", "missing", "--type", "duration", "--default", "2s"]))
            .await
            .unwrap();
        assert_eq!(out, "2000");

        assert!(GetCommand
            .render(&parse(&["-f", f, "get", "a", "--type", "int", "--default", "abc"]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_dump_formats() {
        let file = ini_file("top = 1\n[db]\nhost = localhost\n");
        let f = file.path().to_str().unwrap();

        let out = DumpCommand
            .render(&parse(&["-f", f, "--set", "top=2", "dump"]))
            .await
            .unwrap();
        assert_eq!(out, "top = 2\n\n[db]\nhost = localhost");

        let out = DumpCommand
            .render(&parse(&["-f", f, "dump", "--format", "json"]))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["db.host"], "localhost");

        let out = DumpCommand
            .render(&parse(&["-f", f, "dump", "--format", "toml"]))
            .await
            .unwrap();
        let table: BTreeMap<String, String> = toml::from_str(&out).unwrap();
        assert_eq!(table.get("top").map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn test_sections_and_duration() {
        let file = ini_file("[b]\nx = 1\n[a]\n");
        let f = file.path().to_str().unwrap();

        let out = SectionsCommand
            .render(&parse(&["-f", f, "sections"]))
            .await
            .unwrap();
        assert!(out.contains("[a]"));
        assert!(out.contains("[b]"));

        let out = DurationCommand
            .render(&parse(&["duration", "1.5 minutes"]))
            .await
            .unwrap();
        assert_eq!(out, "90000");

        assert!(DurationCommand
            .render(&parse(&["duration", "27px"]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_dump_ini_groups_sections_and_reloads() {
        let first = ini_file("top = 1\n[db]\nhost = localhost\nport = 5432\n[empty]\n");
        let second = ini_file("[db]\nhost = ignored\nuser = admin\n");
        let f1 = first.path().to_str().unwrap();
        let f2 = second.path().to_str().unwrap();
        let args = parse(&[
            "-f", f1, "-f", f2, "--set", "top=2", "--set", "db.host=remote", "--set",
            "extra.flag=on", "dump",
        ]);

        let out = DumpCommand.render(&args).await.unwrap();
        assert_eq!(
            out,
            "extra.flag = on\ntop = 2\n\n[db]\nhost = remote\nport = 5432\nuser = admin\n\n[empty]"
        );

        // 输出重新解析后与合并结果一致
        let (reloaded, diagnostics) = SrcFile::from_str_lossy(&out);
        assert!(diagnostics.is_none());
        let loaded = LoadedConfig::from_args(&args).unwrap();
        assert_eq!(reloaded.ini().to_map(), loaded.merged());
        assert!(reloaded.ini().section("empty").is_some());
        loaded.config.shutdown();
    }

    #[tokio::test]
    async fn test_partially_valid_file_still_loads() {
        let file = ini_file("[server]\nport = 8080\nthis line is broken\n");
        let f = file.path().to_str().unwrap();

        let out = GetCommand
            .render(&parse(&["-f", f, "get", "server.port", "--type", "int"]))
            .await
            .unwrap();
        assert_eq!(out, "8080");
    }

    #[test]
    fn test_render_ini_skips_empty_default_section() {
        let mut sections = SectionMap::new();
        sections.insert(String::new(), BTreeMap::new());
        sections
            .entry("a".to_string())
            .or_default()
            .insert("k".to_string(), "v".to_string());
        assert_eq!(render_ini(&sections), "[a]\nk = v");
    }

    #[tokio::test]
    async fn test_missing_explicit_file_fails() {
        let result = GetCommand
            .render(&parse(&["-f", "/nonexistent/layercfg.ini", "get", "a"]))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_config_paths_keeps_explicit_order() {
        let explicit = vec![PathBuf::from("b.ini"), PathBuf::from("a.ini")];
        assert_eq!(resolve_config_paths(&explicit), explicit);
    }
}
