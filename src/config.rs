//! 配置
//!
//! YAML 配置文件结构：视图、JSON 视图、绑定命名空间、消息资源包、
//! 服务器中间件与全局设置。

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use xweb_core::constants::{DEFAULT_AUXILIARY_EXCLUDED_PREFIXES, REFERENCE_DATA_OBJECT};
use xweb_core::{Locale, NamespacePrefixMapper};
use xweb_server::{ServerConfig, StatusResolverConfig};

/// 顶层配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XwebConfig {
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub json: JsonViewConfig,
    /// 绑定上下文 ID → 该上下文识别的命名空间
    #[serde(default)]
    pub bindings: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub status: StatusResolverConfig,
    /// 全局设置，按声明顺序输出
    #[serde(default)]
    pub settings: IndexMap<String, String>,
}

impl XwebConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("解析 YAML 配置失败")
    }
}

/// 从文件加载配置
pub fn load_config(path: &Path) -> Result<XwebConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
    let config = XwebConfig::from_yaml_str(&text)
        .with_context(|| format!("配置文件格式错误: {}", path.display()))?;
    info!(path = %path.display(), bindings = config.bindings.len(), "已加载配置");
    Ok(config)
}

/// 视图配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// 绑定上下文 ID
    #[serde(default = "default_binding_context")]
    pub binding_context: String,
    /// 序列化遇到非法内容时是否忽略
    #[serde(default = "default_true")]
    pub ignore_marshal_errors: bool,
    /// 调试输出文档时是否包含消息目录
    #[serde(default)]
    pub debug_message_resource: bool,
    /// 是否输出消息目录
    #[serde(default = "default_true")]
    pub include_messages: bool,
    /// 是否输出会话区块
    #[serde(default = "default_true")]
    pub include_session: bool,
    /// 是否允许通过查询参数直接返回 XML 文档
    #[serde(default = "default_true")]
    pub enable_xml_source_response: bool,
    /// 直接返回 XML 文档的查询参数名
    #[serde(default = "default_xml_source_param")]
    pub xml_source_param: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// 缩进空格数
    #[serde(default = "default_indent")]
    pub indent: usize,
    /// 命名空间 URI → 前缀
    #[serde(default)]
    pub namespace_prefixes: IndexMap<String, String>,
    #[serde(default)]
    pub predeclared_namespaces: Vec<String>,
    /// 传给绑定序列化器的附加属性
    #[serde(default)]
    pub writer_properties: IndexMap<String, String>,
    /// 不进入辅助区块的键前缀
    #[serde(default = "default_auxiliary_excluded_prefixes")]
    pub auxiliary_excluded_prefixes: Vec<String>,
    /// 即使匹配排除前缀也进入辅助区块的键
    #[serde(default = "default_auxiliary_included_keys")]
    pub auxiliary_included_keys: Vec<String>,
    /// 请求区域设置无法确定时使用，未设置时为进程默认区域设置
    #[serde(default)]
    pub default_locale: Option<String>,
    /// 按 `Accept` 头选择 XHTML 系列内容类型
    #[serde(default)]
    pub use_xhtml_content_type: bool,
}

fn default_true() -> bool {
    true
}

fn default_binding_context() -> String {
    "default".to_string()
}

fn default_xml_source_param() -> String {
    "xml".to_string()
}

fn default_content_type() -> String {
    "text/html".to_string()
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

fn default_indent() -> usize {
    2
}

fn default_auxiliary_excluded_prefixes() -> Vec<String> {
    DEFAULT_AUXILIARY_EXCLUDED_PREFIXES
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_auxiliary_included_keys() -> Vec<String> {
    vec![REFERENCE_DATA_OBJECT.to_string()]
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            binding_context: default_binding_context(),
            ignore_marshal_errors: true,
            debug_message_resource: false,
            include_messages: true,
            include_session: true,
            enable_xml_source_response: true,
            xml_source_param: default_xml_source_param(),
            content_type: default_content_type(),
            encoding: default_encoding(),
            indent: default_indent(),
            namespace_prefixes: IndexMap::new(),
            predeclared_namespaces: Vec::new(),
            writer_properties: IndexMap::new(),
            auxiliary_excluded_prefixes: default_auxiliary_excluded_prefixes(),
            auxiliary_included_keys: default_auxiliary_included_keys(),
            default_locale: None,
            use_xhtml_content_type: false,
        }
    }
}

impl ViewConfig {
    /// 服务视图：不输出会话与消息目录
    pub fn service() -> Self {
        Self {
            include_session: false,
            include_messages: false,
            ..Self::default()
        }
    }

    pub fn prefix_mapper(&self) -> NamespacePrefixMapper {
        NamespacePrefixMapper {
            mapping: self.namespace_prefixes.clone(),
            predeclared: self.predeclared_namespaces.clone(),
        }
    }

    /// 回退区域设置；配置值无效时使用进程默认区域设置
    pub fn fallback_locale(&self) -> Locale {
        match self.default_locale.as_deref().map(Locale::parse) {
            Some(Ok(locale)) => locale,
            Some(Err(e)) => {
                warn!(error = %e, "默认区域设置配置无效");
                Locale::process_default()
            }
            None => Locale::process_default(),
        }
    }

    /// 键是否进入辅助区块
    pub fn is_auxiliary_key(&self, key: &str) -> bool {
        self.auxiliary_included_keys.iter().any(|k| k == key)
            || !self
                .auxiliary_excluded_prefixes
                .iter()
                .any(|prefix| key.starts_with(prefix.as_str()))
    }
}

/// JSON 视图配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonViewConfig {
    /// 缩进空格数，0 为紧凑输出
    #[serde(default)]
    pub indent_amount: usize,
    /// 输出是否包裹在括号中
    #[serde(default = "default_true")]
    pub include_parentheses: bool,
    /// 忽略的属性名
    #[serde(default = "default_ignore_properties")]
    pub ignore_properties: Vec<String>,
    #[serde(default = "default_json_content_type")]
    pub content_type: String,
}

fn default_ignore_properties() -> Vec<String> {
    vec!["class".to_string()]
}

fn default_json_content_type() -> String {
    "application/json".to_string()
}

impl Default for JsonViewConfig {
    fn default() -> Self {
        Self {
            indent_amount: 0,
            include_parentheses: true,
            ignore_properties: default_ignore_properties(),
            content_type: default_json_content_type(),
        }
    }
}

/// 消息资源包配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesConfig {
    /// properties 资源包目录；未设置时不启用消息目录
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// 资源包基础名，按查找顺序
    #[serde(default)]
    pub basenames: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_view_defaults() {
        let config = ViewConfig::default();
        assert!(config.ignore_marshal_errors);
        assert!(config.include_messages);
        assert!(config.include_session);
        assert_eq!(config.xml_source_param, "xml");
        assert_eq!(config.content_type, "text/html");
        assert_eq!(config.indent, 2);
        assert_eq!(config.auxiliary_excluded_prefixes, vec!["xweb.", "framework."]);
    }

    #[test]
    fn test_service_preset() {
        let config = ViewConfig::service();
        assert!(!config.include_session);
        assert!(!config.include_messages);
        assert!(config.enable_xml_source_response);
    }

    #[test]
    fn test_auxiliary_key_filter() {
        let config = ViewConfig::default();
        assert!(config.is_auxiliary_key("user"));
        assert!(!config.is_auxiliary_key("xweb.ALERT"));
        assert!(!config.is_auxiliary_key("framework.binding"));
        assert!(config.is_auxiliary_key(REFERENCE_DATA_OBJECT));
    }

    #[test]
    fn test_yaml_partial_config() {
        let yaml = r#"
view:
  binding_context: app
  include_session: false
  namespace_prefixes:
    "http://msqr.us/xsd/jaxb-web": x
bindings:
  app:
    - urn:app
settings:
  site.name: Demo
  site.theme: dark
json:
  include_parentheses: false
"#;
        let config = XwebConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.view.binding_context, "app");
        assert!(!config.view.include_session);
        assert!(config.view.include_messages);
        assert_eq!(
            config.view.prefix_mapper().preferred_prefix("http://msqr.us/xsd/jaxb-web", "ns1"),
            "x"
        );
        assert_eq!(config.bindings["app"], vec!["urn:app"]);
        let keys: Vec<_> = config.settings.keys().cloned().collect();
        assert_eq!(keys, vec!["site.name", "site.theme"]);
        assert!(!config.json.include_parentheses);
        assert_eq!(config.json.ignore_properties, vec!["class"]);
        assert_eq!(config.server.max_body_size, 2 * 1024 * 1024);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "view:\n  content_type: application/xhtml+xml").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.view.content_type, "application/xhtml+xml");

        assert!(load_config(Path::new("/nonexistent/xweb.yaml")).is_err());
    }

    #[test]
    fn test_fallback_locale() {
        let config = ViewConfig {
            default_locale: Some("fr_CA".to_string()),
            ..ViewConfig::default()
        };
        assert_eq!(config.fallback_locale().to_string(), "fr_CA");
    }
}
