//! 视图文档
//!
//! 每个请求组装一棵文档树，交给转换阶段后不再修改。
//! 区块顺序固定：模型、上下文、辅助、消息、错误、会话、请求参数、请求头、消息目录。

use crate::constants::{NO_MODEL_KEY, NO_MODEL_VALUE, XWEB_NAMESPACE};
use crate::model::Element;
use std::sync::Arc;

/// 根元素名称
pub const ROOT_ELEMENT: &str = "x-data";

/// 键值参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub key: String,
    pub value: String,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    fn to_element(&self) -> Element {
        xweb_element("param")
            .with_attribute("key", self.key.as_str())
            .with_text_if_any(&self.value)
    }
}

/// 全局设置，与请求无关
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub params: Vec<Parameter>,
}

impl Settings {
    pub fn new(params: Vec<Parameter>) -> Self {
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }
}

/// 请求上下文
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub server_name: String,
    pub server_port: u16,
    pub user_agent: Option<String>,
    pub user_locale: String,
    /// 应用基础路径
    pub web_context: String,
    pub path: String,
    pub settings: Option<Settings>,
}

/// 任意内容：绑定命名空间内的元素原样保留，其余扁平化为参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyContent {
    Element(Element),
    Param(Parameter),
}

impl AnyContent {
    fn to_element(&self) -> Element {
        match self {
            AnyContent::Element(element) => element.clone(),
            AnyContent::Param(param) => param.to_element(),
        }
    }
}

/// 模型区块
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Model {
    Bound(Element),
    /// 没有可渲染的模型对象
    NoModel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Auxiliary {
    pub entries: Vec<AnyContent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBlock {
    pub session_id: String,
    pub entries: Vec<AnyContent>,
}

/// 已解析的提示消息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Messages {
    pub messages: Vec<String>,
}

/// 已解析的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    /// 字段级错误的字段名
    pub field: Option<String>,
    pub message: String,
}

impl ErrorEntry {
    pub fn global(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    pub entries: Vec<ErrorEntry>,
}

/// 当前区域设置的完整消息目录
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageCatalog {
    pub entries: Vec<Parameter>,
}

/// 视图文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub model: Model,
    pub context: Context,
    pub auxiliary: Option<Auxiliary>,
    pub messages: Option<Messages>,
    pub errors: Option<Errors>,
    pub session: Option<SessionBlock>,
    pub request: Vec<Parameter>,
    pub request_headers: Vec<Parameter>,
    /// 缓存中的目录实例，多个请求共享
    pub message_catalog: Option<Arc<MessageCatalog>>,
}

impl Document {
    pub fn new(context: Context) -> Self {
        Self {
            model: Model::NoModel,
            context,
            auxiliary: None,
            messages: None,
            errors: None,
            session: None,
            request: Vec::new(),
            request_headers: Vec::new(),
            message_catalog: None,
        }
    }

    /// 辅助区块，不存在时创建
    pub fn auxiliary_mut(&mut self) -> &mut Auxiliary {
        self.auxiliary.get_or_insert_with(Auxiliary::default)
    }

    /// 转换为元素树
    pub fn to_element(&self) -> Element {
        let mut root = xweb_element(ROOT_ELEMENT);

        let model = xweb_element("x-model");
        root = root.with_child(match self.model {
            Model::Bound(ref element) => model.with_child(element.clone()),
            Model::NoModel => {
                model.with_child(Parameter::new(NO_MODEL_KEY, NO_MODEL_VALUE).to_element())
            }
        });

        root = root.with_child(context_element(&self.context));

        if let Some(ref aux) = self.auxiliary {
            root = root.with_child(any_block("x-auxillary", &aux.entries));
        }

        if let Some(ref messages) = self.messages {
            let mut block = xweb_element("x-messages");
            for message in &messages.messages {
                block = block.with_child(xweb_element("msg").with_text_if_any(message));
            }
            root = root.with_child(block);
        }

        if let Some(ref errors) = self.errors {
            let mut block = xweb_element("x-errors");
            for entry in &errors.entries {
                let mut error = xweb_element("error");
                if let Some(ref field) = entry.field {
                    error = error.with_attribute("field", field.as_str());
                }
                block = block.with_child(error.with_text_if_any(&entry.message));
            }
            root = root.with_child(block);
        }

        if let Some(ref session) = self.session {
            root = root.with_child(
                any_block("x-session", &session.entries)
                    .with_attribute("session-id", session.session_id.as_str()),
            );
        }

        root = root.with_child(param_block("x-request", &self.request));
        root = root.with_child(param_block("x-request-headers", &self.request_headers));

        if let Some(ref catalog) = self.message_catalog {
            let mut block = xweb_element("x-msg");
            for entry in &catalog.entries {
                block = block.with_child(
                    xweb_element("msg")
                        .with_attribute("key", entry.key.as_str())
                        .with_text_if_any(&entry.value),
                );
            }
            root = root.with_child(block);
        }

        root
    }

    /// 区块元素名称，按文档顺序
    pub fn section_names(&self) -> Vec<String> {
        self.to_element()
            .child_elements()
            .map(|child| child.name.clone())
            .collect()
    }
}

fn xweb_element(name: &str) -> Element {
    Element::in_namespace(XWEB_NAMESPACE, name)
}

fn context_element(context: &Context) -> Element {
    let mut element = xweb_element("x-context")
        .with_text_child("server-name", context.server_name.as_str())
        .with_text_child("server-port", context.server_port.to_string());
    if let Some(ref agent) = context.user_agent {
        element = element.with_text_child("user-agent", agent.as_str());
    }
    element = element
        .with_text_child("user-locale", context.user_locale.as_str())
        .with_child(xweb_element("web-context").with_text_if_any(&context.web_context))
        .with_child(xweb_element("path").with_text_if_any(&context.path));
    if let Some(ref settings) = context.settings {
        element = element.with_child(param_block("x-settings", &settings.params));
    }
    element
}

fn param_block(name: &str, params: &[Parameter]) -> Element {
    params
        .iter()
        .fold(xweb_element(name), |block, param| {
            block.with_child(param.to_element())
        })
}

fn any_block(name: &str, entries: &[AnyContent]) -> Element {
    entries
        .iter()
        .fold(xweb_element(name), |block, entry| {
            block.with_child(entry.to_element())
        })
}

trait TextIfAny {
    fn with_text_if_any(self, text: &str) -> Self;
}

impl TextIfAny for Element {
    /// 空文本不产生文本节点
    fn with_text_if_any(self, text: &str) -> Self {
        if text.is_empty() {
            self
        } else {
            self.with_text(text)
        }
    }
}
