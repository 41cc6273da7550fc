//! 模型值
//!
//! 控制器交给视图的模型 Map，以及可直接渲染为结构化内容的领域元素。

use crate::message::{AlertMessage, ValidationErrors};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 有序的模型 Map
pub type ModelMap = IndexMap<String, ModelValue>;

/// 结构化节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// 结构化元素
///
/// 领域对象以元素树表示；`namespace` 决定它是否属于绑定命名空间。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub namespace: Option<String>,
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn in_namespace(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::new(name)
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// 子元素，命名空间与父元素相同，只包含文本
    pub fn with_text_child(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        let child = Element {
            namespace: self.namespace.clone(),
            ..Element::new(name)
        }
        .with_text(text);
        self.with_child(child)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// 第一个指定本地名称的子元素
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|child| child.name == name)
    }

    /// 直接文本内容（不含子元素文本）
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// 所有后代文本按文档顺序拼接
    pub fn deep_text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in &element.children {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(child) => collect_text(child, out),
        }
    }
}

/// 模型 Map / 会话属性中的值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelValue {
    /// 领域元素
    Element(Element),
    /// 普通数据
    Value(serde_json::Value),
    /// 提示消息
    Alert(AlertMessage),
    /// 按对象名称分组的校验错误
    Errors(ValidationErrors),
}

impl ModelValue {
    pub fn text(value: impl Into<String>) -> Self {
        ModelValue::Value(serde_json::Value::String(value.into()))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            ModelValue::Element(element) => Some(element),
            _ => None,
        }
    }

    /// 扁平化为字符串，用于非绑定命名空间的键值对
    pub fn display_string(&self) -> String {
        match self {
            ModelValue::Element(element) => element.deep_text(),
            ModelValue::Value(serde_json::Value::String(s)) => s.clone(),
            ModelValue::Value(value) => value.to_string(),
            ModelValue::Alert(alert) => alert
                .resolvables()
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            ModelValue::Errors(errors) => format!("{} errors", errors.error_count()),
        }
    }
}

impl From<Element> for ModelValue {
    fn from(element: Element) -> Self {
        ModelValue::Element(element)
    }
}

impl From<serde_json::Value> for ModelValue {
    fn from(value: serde_json::Value) -> Self {
        ModelValue::Value(value)
    }
}

impl From<&str> for ModelValue {
    fn from(value: &str) -> Self {
        ModelValue::text(value)
    }
}

impl From<String> for ModelValue {
    fn from(value: String) -> Self {
        ModelValue::text(value)
    }
}

impl From<AlertMessage> for ModelValue {
    fn from(alert: AlertMessage) -> Self {
        ModelValue::Alert(alert)
    }
}

impl From<ValidationErrors> for ModelValue {
    fn from(errors: ValidationErrors) -> Self {
        ModelValue::Errors(errors)
    }
}
