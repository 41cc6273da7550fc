//! 绑定
//!
//! 绑定上下文决定哪些模型值属于可渲染的领域对象，并把文档序列化为 XML。
//! 默认实现按命名空间识别领域元素。

use crate::error::BindingError;
use indexmap::IndexMap;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;
use xweb_core::xml::{write_element, WriteOptions};
use xweb_core::{Document, ErrorPolicy, ModelValue, NamespacePrefixMapper};

/// 序列化属性名：缩进空格数
pub const PROPERTY_INDENT: &str = "indent";
/// 序列化属性名：是否格式化输出（关闭时不缩进）
pub const PROPERTY_FORMATTED_OUTPUT: &str = "formatted_output";
/// 序列化属性名：输出编码
pub const PROPERTY_ENCODING: &str = "encoding";
/// 序列化属性名：是否输出 XML 声明
pub const PROPERTY_DECLARATION: &str = "declaration";
/// 序列化属性名：命名空间前缀映射
pub const PROPERTY_PREFIX_MAPPER: &str = "namespace_prefix_mapper";

/// 序列化属性值
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Text(String),
    PrefixMapper(NamespacePrefixMapper),
}

impl PropertyValue {
    /// 由配置文件中的字符串推断类型
    pub fn parse(raw: &str) -> Self {
        if let Ok(b) = raw.parse::<bool>() {
            PropertyValue::Bool(b)
        } else if let Ok(i) = raw.parse::<i64>() {
            PropertyValue::Int(i)
        } else {
            PropertyValue::Text(raw.to_string())
        }
    }
}

/// 绑定上下文查找结果
pub enum ContextLookup {
    Found(Arc<dyn BindingContext>),
    NotConfigured,
}

/// 绑定提供者
pub trait BindingProvider: Send + Sync {
    fn new_context(&self, context_id: &str) -> ContextLookup;
}

/// 绑定上下文
pub trait BindingContext: Send + Sync + Debug {
    fn id(&self) -> &str;

    /// 模型值是否属于本上下文的绑定命名空间
    fn belongs_to_namespace(&self, value: &ModelValue) -> bool;

    fn create_writer(&self) -> Box<dyn BindingWriter>;
}

/// 文档序列化器
pub trait BindingWriter: Send {
    fn set_error_policy(&mut self, policy: ErrorPolicy);

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), BindingError>;

    fn write(&self, document: &Document) -> Result<Vec<u8>, BindingError>;
}

/// 按命名空间识别领域元素的绑定提供者
#[derive(Debug, Clone, Default)]
pub struct NamespaceBindingProvider {
    contexts: IndexMap<String, Vec<String>>,
}

impl NamespaceBindingProvider {
    pub fn new(contexts: IndexMap<String, Vec<String>>) -> Self {
        Self { contexts }
    }

    pub fn with_context<I, S>(mut self, context_id: impl Into<String>, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contexts.insert(
            context_id.into(),
            namespaces.into_iter().map(Into::into).collect(),
        );
        self
    }
}

impl BindingProvider for NamespaceBindingProvider {
    fn new_context(&self, context_id: &str) -> ContextLookup {
        match self.contexts.get(context_id) {
            Some(namespaces) => {
                debug!(context = %context_id, namespaces = ?namespaces, "创建绑定上下文");
                ContextLookup::Found(Arc::new(NamespaceBindingContext {
                    id: context_id.to_string(),
                    namespaces: namespaces.clone(),
                }))
            }
            None => ContextLookup::NotConfigured,
        }
    }
}

/// 命名空间绑定上下文
#[derive(Debug, Clone)]
pub struct NamespaceBindingContext {
    id: String,
    namespaces: Vec<String>,
}

impl BindingContext for NamespaceBindingContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn belongs_to_namespace(&self, value: &ModelValue) -> bool {
        value
            .as_element()
            .and_then(|element| element.namespace.as_deref())
            .map(|ns| self.namespaces.iter().any(|known| known == ns))
            .unwrap_or(false)
    }

    fn create_writer(&self) -> Box<dyn BindingWriter> {
        Box::new(XmlBindingWriter::default())
    }
}

/// XML 文档序列化器
#[derive(Debug, Clone, Default)]
pub struct XmlBindingWriter {
    options: WriteOptions,
}

impl BindingWriter for XmlBindingWriter {
    fn set_error_policy(&mut self, policy: ErrorPolicy) {
        self.options.policy = policy;
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), BindingError> {
        let invalid = |reason: &str| BindingError::InvalidProperty {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        match (name, value) {
            (PROPERTY_INDENT, PropertyValue::Int(n)) => {
                self.options.indent = usize::try_from(n).map_err(|_| invalid("缩进不能为负数"))?;
            }
            (PROPERTY_FORMATTED_OUTPUT, PropertyValue::Bool(formatted)) => {
                if !formatted {
                    self.options.indent = 0;
                } else if self.options.indent == 0 {
                    self.options.indent = 2;
                }
            }
            (PROPERTY_ENCODING, PropertyValue::Text(encoding)) => {
                if !encoding.eq_ignore_ascii_case("UTF-8") {
                    return Err(invalid("仅支持 UTF-8 输出"));
                }
                self.options.encoding = encoding;
            }
            (PROPERTY_DECLARATION, PropertyValue::Bool(declaration)) => {
                self.options.declaration = declaration;
            }
            (PROPERTY_PREFIX_MAPPER, PropertyValue::PrefixMapper(mapper)) => {
                self.options.prefix_mapper = mapper;
            }
            (PROPERTY_INDENT, _)
            | (PROPERTY_FORMATTED_OUTPUT, _)
            | (PROPERTY_ENCODING, _)
            | (PROPERTY_DECLARATION, _)
            | (PROPERTY_PREFIX_MAPPER, _) => return Err(invalid("类型不匹配")),
            (other, _) => return Err(BindingError::UnsupportedProperty(other.to_string())),
        }
        Ok(())
    }

    fn write(&self, document: &Document) -> Result<Vec<u8>, BindingError> {
        Ok(write_element(&document.to_element(), &self.options)?)
    }
}
