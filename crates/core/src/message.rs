//! 可解析消息与校验错误
//!
//! 消息本身不含文本，只携带消息码、参数与默认消息，由消息目录按区域设置解析。

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 可解析消息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResolvable {
    /// 候选消息码，按顺序尝试
    pub codes: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub default_message: Option<String>,
}

impl MessageResolvable {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            codes: vec![code.into()],
            arguments: Vec::new(),
            default_message: None,
        }
    }

    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_message(mut self, message: impl Into<String>) -> Self {
        self.default_message = Some(message.into());
        self
    }

    /// 首个消息码
    pub fn code(&self) -> Option<&str> {
        self.codes.first().map(String::as_str)
    }
}

impl fmt::Display for MessageResolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "codes [{}]", self.codes.join(","))?;
        if !self.arguments.is_empty() {
            write!(f, "; arguments [{}]", self.arguments.join(","))?;
        }
        if let Some(ref message) = self.default_message {
            write!(f, "; default message [{}]", message)?;
        }
        Ok(())
    }
}

/// 提示消息：单条或多条
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertMessage {
    Single(MessageResolvable),
    Multiple(Vec<MessageResolvable>),
}

impl AlertMessage {
    pub fn resolvables(&self) -> Vec<&MessageResolvable> {
        match self {
            AlertMessage::Single(message) => vec![message],
            AlertMessage::Multiple(messages) => messages.iter().collect(),
        }
    }
}

impl From<MessageResolvable> for AlertMessage {
    fn from(message: MessageResolvable) -> Self {
        AlertMessage::Single(message)
    }
}

/// 对象级错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectError {
    pub object_name: String,
    pub message: MessageResolvable,
}

/// 字段级错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub object_name: String,
    pub field: String,
    pub message: MessageResolvable,
    #[serde(default)]
    pub rejected_value: Option<String>,
}

impl FieldError {
    pub fn new(
        object_name: impl Into<String>,
        field: impl Into<String>,
        message: MessageResolvable,
    ) -> Self {
        Self {
            object_name: object_name.into(),
            field: field.into(),
            message,
            rejected_value: None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.message.code()
    }
}

/// 校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    Object(ObjectError),
    Field(FieldError),
}

impl ValidationError {
    pub fn message(&self) -> &MessageResolvable {
        match self {
            ValidationError::Object(error) => &error.message,
            ValidationError::Field(error) => &error.message,
        }
    }

    pub fn object_name(&self) -> &str {
        match self {
            ValidationError::Object(error) => &error.object_name,
            ValidationError::Field(error) => &error.object_name,
        }
    }
}

/// 按绑定对象名称分组的校验错误
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    by_name: IndexMap<String, Vec<ValidationError>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个绑定目标（可以没有错误）
    pub fn register(&mut self, object_name: impl Into<String>) {
        self.by_name.entry(object_name.into()).or_default();
    }

    pub fn add(&mut self, error: ValidationError) {
        self.by_name
            .entry(error.object_name().to_string())
            .or_default()
            .push(error);
    }

    pub fn reject(&mut self, object_name: impl Into<String>, message: MessageResolvable) {
        self.add(ValidationError::Object(ObjectError {
            object_name: object_name.into(),
            message,
        }));
    }

    pub fn reject_value(
        &mut self,
        object_name: impl Into<String>,
        field: impl Into<String>,
        message: MessageResolvable,
    ) {
        self.add(ValidationError::Field(FieldError::new(
            object_name,
            field,
            message,
        )));
    }

    /// 指定绑定目标的错误；目标未登记时为 `None`
    pub fn errors_for(&self, object_name: &str) -> Option<&[ValidationError]> {
        self.by_name.get(object_name).map(Vec::as_slice)
    }

    pub fn has_errors(&self, object_name: &str) -> bool {
        self.errors_for(object_name)
            .map(|errors| !errors.is_empty())
            .unwrap_or(false)
    }

    pub fn error_count(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_by_name() {
        let mut errors = ValidationErrors::new();
        errors.register("command");
        errors.reject_value("user", "login", MessageResolvable::new("error.required"));
        errors.reject("user", MessageResolvable::new("error.general"));

        assert!(errors.errors_for("command").unwrap().is_empty());
        assert!(!errors.has_errors("command"));
        assert!(errors.has_errors("user"));
        assert!(errors.errors_for("missing").is_none());
        assert_eq!(errors.error_count(), 2);
    }

    #[test]
    fn test_resolvable_display() {
        let message = MessageResolvable::new("a.b")
            .with_arguments(["1"])
            .with_default_message("oops");
        assert_eq!(
            message.to_string(),
            "codes [a.b]; arguments [1]; default message [oops]"
        );
    }
}
