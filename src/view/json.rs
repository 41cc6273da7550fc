//! JSON 视图
//!
//! 把模型 Map 输出为一个 JSON 对象，键顺序与模型一致。

use crate::config::JsonViewConfig;
use crate::error::ViewError;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::debug;
use xweb_core::{Element, ModelMap, ModelValue, Node, ViewResponse};

/// 元素同时含文本与子元素时，文本所在的键
const TEXT_KEY: &str = "value";

/// JSON 视图
#[derive(Debug, Clone, Default)]
pub struct JsonView {
    config: JsonViewConfig,
}

impl JsonView {
    pub fn new(config: JsonViewConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, model: &ModelMap) -> Result<ViewResponse, ViewError> {
        let mut json = Map::new();
        for (key, value) in model {
            if let Some(value) = self.model_value(value) {
                json.insert(key.clone(), value);
            }
        }
        debug!(keys = json.len(), "输出 JSON 视图");

        let mut body = Vec::new();
        if self.config.include_parentheses {
            body.push(b'(');
        }
        let json = Value::Object(json);
        if self.config.indent_amount > 0 {
            let indent = vec![b' '; self.config.indent_amount];
            let mut serializer = serde_json::Serializer::with_formatter(
                &mut body,
                PrettyFormatter::with_indent(&indent),
            );
            json.serialize(&mut serializer)?;
        } else {
            serde_json::to_writer(&mut body, &json)?;
        }
        if self.config.include_parentheses {
            body.push(b')');
        }
        Ok(ViewResponse::new(self.config.content_type.clone(), body))
    }

    fn model_value(&self, value: &ModelValue) -> Option<Value> {
        match value {
            ModelValue::Element(element) => Some(self.element(element)),
            ModelValue::Value(Value::Null) => None,
            ModelValue::Value(value) => Some(self.plain(value)),
            ModelValue::Alert(_) | ModelValue::Errors(_) => None,
        }
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.config.ignore_properties.iter().any(|p| p == name)
    }

    /// 普通数据：对象中去掉忽略的属性与空值
    fn plain(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(name, value)| !self.is_ignored(name) && !value.is_null())
                    .map(|(name, value)| (name.clone(), self.plain(value)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.plain(v)).collect()),
            other => other.clone(),
        }
    }

    /// 元素：属性与子元素成为对象的键，同名子元素合并为数组，只有文本的元素成为字符串
    fn element(&self, element: &Element) -> Value {
        let has_children = element.child_elements().next().is_some();
        if element.attributes.is_empty() && !has_children {
            return Value::String(element.text());
        }

        let mut object = Map::new();
        for (name, value) in &element.attributes {
            if !self.is_ignored(name) {
                object.insert(name.clone(), Value::String(value.clone()));
            }
        }
        for node in &element.children {
            let Node::Element(child) = node else {
                continue;
            };
            if self.is_ignored(&child.name) {
                continue;
            }
            let value = self.element(child);
            match object.get_mut(&child.name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    object.insert(child.name.clone(), value);
                }
            }
        }
        let text = element.text();
        if !text.trim().is_empty() {
            object.insert(TEXT_KEY.to_string(), Value::String(text));
        }
        Value::Object(object)
    }
}
