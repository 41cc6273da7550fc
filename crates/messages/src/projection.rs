//! 错误与提示消息投影
//!
//! 把校验错误、提示消息解析为文档中的错误/消息条目。

use crate::source::MessagesSource;
use tracing::{debug, warn};
use xweb_core::constants::{ERROR_CODE_REQUIRED, ERROR_CODE_TYPE_MISMATCH};
use xweb_core::{AlertMessage, ErrorEntry, Locale, MessageResolvable, ValidationError};

/// 解析可解析消息；解析失败或找不到消息时返回 `None`
pub fn resolve_message(
    source: &dyn MessagesSource,
    resolvable: &MessageResolvable,
    locale: &Locale,
) -> Option<String> {
    match source.resolve(resolvable, locale) {
        Ok(Some(message)) => Some(message),
        Ok(None) => {
            debug!(message = %resolvable, locale = %locale, "未找到消息");
            None
        }
        Err(e) => {
            warn!(message = %resolvable, locale = %locale, error = %e, "解析消息失败");
            None
        }
    }
}

/// 解析提示消息中的全部条目
pub fn resolve_alert(
    source: &dyn MessagesSource,
    alert: &AlertMessage,
    locale: &Locale,
) -> Vec<String> {
    alert
        .resolvables()
        .into_iter()
        .filter_map(|resolvable| resolve_message(source, resolvable, locale))
        .collect()
}

/// 把一条校验错误投影为错误条目
///
/// - 字段级错误带字段名
/// - `error.required` 先按默认消息查找字段显示名称，作为消息参数
/// - `typeMismatch` 不输出
pub fn project_error(
    source: &dyn MessagesSource,
    error: &ValidationError,
    locale: &Locale,
) -> Option<ErrorEntry> {
    let message = error.message();
    if is_type_mismatch(message) {
        debug!(object = %error.object_name(), "忽略类型转换错误");
        return None;
    }

    let text = if is_required(message) {
        let display_name = required_display_name(source, error, locale);
        let required = MessageResolvable {
            arguments: vec![display_name],
            ..message.clone()
        };
        resolve_message(source, &required, locale)?
    } else {
        resolve_message(source, message, locale)?
    };

    Some(match error {
        ValidationError::Field(field) => ErrorEntry::field(field.field.as_str(), text),
        ValidationError::Object(_) => ErrorEntry::global(text),
    })
}

/// 任一代码等于 `base` 或以 `base.` 开头
fn has_code(message: &MessageResolvable, base: &str) -> bool {
    message.codes.iter().any(|code| {
        code == base
            || code
                .strip_prefix(base)
                .map(|rest| rest.starts_with('.'))
                .unwrap_or(false)
    })
}

fn is_type_mismatch(message: &MessageResolvable) -> bool {
    has_code(message, ERROR_CODE_TYPE_MISMATCH)
}

fn is_required(message: &MessageResolvable) -> bool {
    has_code(message, ERROR_CODE_REQUIRED)
}

fn required_display_name(
    source: &dyn MessagesSource,
    error: &ValidationError,
    locale: &Locale,
) -> String {
    let fallback = match error {
        ValidationError::Field(field) => field.field.clone(),
        ValidationError::Object(object) => object.object_name.clone(),
    };
    let Some(name_code) = error.message().default_message.as_deref() else {
        return fallback;
    };
    match source.message(name_code, &[], locale) {
        Ok(Some(display)) => display,
        Ok(None) => name_code.to_string(),
        Err(e) => {
            warn!(code = %name_code, error = %e, "查找字段显示名称失败");
            name_code.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BundleMessagesSource;
    use xweb_core::{FieldError, ObjectError};

    fn source() -> BundleMessagesSource {
        let source = BundleMessagesSource::new();
        source.add_bundle(
            "messages",
            None,
            "error.required={0} is required.\nuser.login.displayName=Login\nerror.general=Something broke.\nsaved=Saved {0}.\n",
        );
        source
    }

    fn locale() -> Locale {
        Locale::language_only("en")
    }

    #[test]
    fn test_required_uses_display_name() {
        let error = ValidationError::Field(FieldError::new(
            "user",
            "login",
            MessageResolvable::new(ERROR_CODE_REQUIRED).with_default_message("user.login.displayName"),
        ));
        let entry = project_error(&source(), &error, &locale()).unwrap();
        assert_eq!(entry, ErrorEntry::field("login", "Login is required."));
    }

    #[test]
    fn test_required_with_qualified_codes() {
        let source = source();
        source.add_bundle("labels", None, "user.login=Login\n");
        let error = ValidationError::Field(FieldError::new(
            "user",
            "login",
            MessageResolvable {
                codes: vec![
                    "error.required.user.login".to_string(),
                    "error.required".to_string(),
                ],
                arguments: Vec::new(),
                default_message: Some("user.login".to_string()),
            },
        ));
        let entry = project_error(&source, &error, &locale()).unwrap();
        assert_eq!(entry, ErrorEntry::field("login", "Login is required."));
    }

    #[test]
    fn test_required_prefix_needs_segment_boundary() {
        let message = MessageResolvable::new("error.requiredness");
        assert!(!is_required(&message));
        assert!(is_required(&MessageResolvable::new("error.required.user")));
    }

    #[test]
    fn test_required_without_display_name_uses_field() {
        let error = ValidationError::Field(FieldError::new(
            "user",
            "email",
            MessageResolvable::new(ERROR_CODE_REQUIRED),
        ));
        let entry = project_error(&source(), &error, &locale()).unwrap();
        assert_eq!(entry.message, "email is required.");
    }

    #[test]
    fn test_type_mismatch_suppressed() {
        let error = ValidationError::Field(FieldError::new(
            "user",
            "age",
            MessageResolvable {
                codes: vec!["typeMismatch.user.age".to_string(), "typeMismatch".to_string()],
                arguments: Vec::new(),
                default_message: Some("bad".to_string()),
            },
        ));
        assert!(project_error(&source(), &error, &locale()).is_none());
    }

    #[test]
    fn test_object_error_and_unresolvable() {
        let error = ValidationError::Object(ObjectError {
            object_name: "user".to_string(),
            message: MessageResolvable::new("error.general"),
        });
        assert_eq!(
            project_error(&source(), &error, &locale()),
            Some(ErrorEntry::global("Something broke."))
        );

        let unknown = ValidationError::Object(ObjectError {
            object_name: "user".to_string(),
            message: MessageResolvable::new("error.unknown"),
        });
        assert!(project_error(&source(), &unknown, &locale()).is_none());
    }

    #[test]
    fn test_resolve_alert_multiple() {
        let alert = AlertMessage::Multiple(vec![
            MessageResolvable::new("saved").with_arguments(["a"]),
            MessageResolvable::new("missing"),
            MessageResolvable::new("saved").with_arguments(["b"]),
        ]);
        assert_eq!(
            resolve_alert(&source(), &alert, &locale()),
            vec!["Saved a.", "Saved b."]
        );
    }
}
