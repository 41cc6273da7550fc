//! 会话辅助
//!
//! 一次性提示消息与请求 URL 的会话存取。

use crate::constants::{SES_KEY_SAVED_MESSAGE, SES_KEY_SAVED_URL};
use crate::message::{AlertMessage, MessageResolvable};
use crate::model::{Element, ModelValue};
use crate::request::{HttpSession, RequestData};

/// 会话辅助
#[derive(Debug, Clone, Default)]
pub struct WebHelper {
    /// 应用上下文元素，渲染时追加到辅助块
    app_context: Option<Element>,
}

impl WebHelper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app_context(app_context: Element) -> Self {
        Self {
            app_context: Some(app_context),
        }
    }

    pub fn app_context(&self) -> Option<&Element> {
        self.app_context.as_ref()
    }

    /// 保存一次性提示消息
    pub fn save_message(&self, session: &dyn HttpSession, message: MessageResolvable) {
        session.set_attribute(
            SES_KEY_SAVED_MESSAGE,
            ModelValue::Alert(AlertMessage::Single(message)),
        );
    }

    /// 查看已保存的提示消息（不清除）
    pub fn saved_message(&self, session: &dyn HttpSession) -> Option<MessageResolvable> {
        match session.attribute(SES_KEY_SAVED_MESSAGE) {
            Some(ModelValue::Alert(AlertMessage::Single(message))) => Some(message),
            _ => None,
        }
    }

    /// 取出并清除已保存的提示消息
    ///
    /// 并发请求共享同一会话时只有一个请求能取到消息。
    pub fn take_saved_message(&self, session: &dyn HttpSession) -> Option<MessageResolvable> {
        match session.remove_attribute(SES_KEY_SAVED_MESSAGE) {
            Some(ModelValue::Alert(AlertMessage::Single(message))) => Some(message),
            Some(other) => {
                // 不是提示消息的值放回原处
                session.set_attribute(SES_KEY_SAVED_MESSAGE, other);
                None
            }
            None => None,
        }
    }

    pub fn clear_saved_message(&self, session: &dyn HttpSession) {
        session.remove_attribute(SES_KEY_SAVED_MESSAGE);
    }

    /// 把当前请求 URL（含查询串）保存到会话；没有会话时返回 `false`
    pub fn save_request_url(&self, request: &RequestData) -> bool {
        match request.session() {
            Some(session) => {
                session.set_attribute(SES_KEY_SAVED_URL, ModelValue::text(request.request_url()));
                true
            }
            None => false,
        }
    }

    pub fn saved_request_url(&self, session: &dyn HttpSession) -> Option<String> {
        session
            .attribute(SES_KEY_SAVED_URL)
            .map(|value| value.display_string())
    }
}
