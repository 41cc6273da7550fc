//! 重定向视图
//!
//! 重定向前把请求中的提示消息存入会话，下一次渲染时输出一次。

use tracing::{debug, warn};
use url::form_urlencoded::byte_serialize;
use xweb_core::constants::ALERT_MESSAGES_OBJECT;
use xweb_core::{AlertMessage, ModelMap, ModelValue, RedirectResponse, RequestData, WebHelper};

/// 重定向视图
#[derive(Debug, Clone)]
pub struct RedirectView {
    url: String,
    context_relative: bool,
    http10_compatible: bool,
    model_query_parameters: Vec<String>,
    web_helper: WebHelper,
}

impl RedirectView {
    pub fn new(url: impl Into<String>, web_helper: WebHelper) -> Self {
        Self {
            url: url.into(),
            context_relative: false,
            http10_compatible: true,
            model_query_parameters: Vec::new(),
            web_helper,
        }
    }

    /// 以 `/` 开头的地址相对于应用上下文路径
    pub fn with_context_relative(mut self, context_relative: bool) -> Self {
        self.context_relative = context_relative;
        self
    }

    /// 关闭后使用 303
    pub fn with_http10_compatible(mut self, http10_compatible: bool) -> Self {
        self.http10_compatible = http10_compatible;
        self
    }

    /// 作为查询参数附加到目标地址的模型键
    pub fn with_model_query_parameters<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model_query_parameters = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 保存提示消息并计算重定向目标
    pub fn render(&self, request: &RequestData, model: &ModelMap) -> RedirectResponse {
        self.save_alert(request, model);
        let location = self.target_url(request, model);
        debug!(location = %location, "重定向");
        if self.http10_compatible {
            RedirectResponse::found(location)
        } else {
            RedirectResponse::see_other(location)
        }
    }

    fn save_alert(&self, request: &RequestData, model: &ModelMap) {
        let message = match model.get(ALERT_MESSAGES_OBJECT) {
            Some(ModelValue::Alert(AlertMessage::Single(message))) => message,
            Some(ModelValue::Alert(AlertMessage::Multiple(_))) => {
                debug!("多条提示消息不保存到会话");
                return;
            }
            _ => return,
        };
        match request.session() {
            Some(session) => self.web_helper.save_message(session.as_ref(), message.clone()),
            None => warn!(message = %message, "没有会话，提示消息丢失"),
        }
    }

    fn target_url(&self, request: &RequestData, model: &ModelMap) -> String {
        let mut target = if self.context_relative {
            request.context_url(&self.url)
        } else {
            self.url.clone()
        };

        let query: Vec<String> = self
            .model_query_parameters
            .iter()
            .filter_map(|key| {
                model.get(key).map(|value| {
                    format!(
                        "{}={}",
                        key,
                        byte_serialize(value.display_string().as_bytes()).collect::<String>()
                    )
                })
            })
            .collect();
        if !query.is_empty() {
            if !target.contains('?') {
                target.push('?');
            } else if !target.ends_with('?') && !target.ends_with('&') {
                target.push('&');
            }
            target.push_str(&query.join("&"));
        }
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use xweb_core::{MemorySession, MessageResolvable};

    fn alert_model() -> ModelMap {
        let mut model = ModelMap::new();
        model.insert(
            ALERT_MESSAGES_OBJECT.to_string(),
            AlertMessage::from(MessageResolvable::new("saved")).into(),
        );
        model.insert("id".to_string(), "42".into());
        model.insert("name".to_string(), "a b&c".into());
        model
    }

    #[test]
    fn test_alert_saved_to_session() {
        let helper = WebHelper::new();
        let session = Arc::new(MemorySession::new("s1"));
        let request = RequestData::default().with_session(session.clone());

        let view = RedirectView::new("/home.do", helper.clone());
        let redirect = view.render(&request, &alert_model());
        assert_eq!(redirect, RedirectResponse::found("/home.do"));
        assert_eq!(
            helper.saved_message(session.as_ref()),
            Some(MessageResolvable::new("saved"))
        );
    }

    #[test]
    fn test_without_session_still_redirects() {
        let view = RedirectView::new("/home.do", WebHelper::new());
        let redirect = view.render(&RequestData::default(), &alert_model());
        assert_eq!(redirect.location, "/home.do");
    }

    #[test]
    fn test_context_relative_and_status() {
        let request = RequestData::default().with_paths("/app", "/save.do");
        let view = RedirectView::new("/home.do", WebHelper::new())
            .with_context_relative(true)
            .with_http10_compatible(false);
        assert_eq!(
            view.render(&request, &ModelMap::new()),
            RedirectResponse::see_other("/app/home.do")
        );

        let absolute = RedirectView::new("http://example.com/x", WebHelper::new())
            .with_context_relative(true);
        assert_eq!(
            absolute.render(&request, &ModelMap::new()).location,
            "http://example.com/x"
        );
    }

    #[test]
    fn test_model_query_parameters() {
        let view = RedirectView::new("/view.do", WebHelper::new())
            .with_model_query_parameters(["id", "missing", "name"]);
        assert_eq!(
            view.render(&RequestData::default(), &alert_model()).location,
            "/view.do?id=42&name=a+b%26c"
        );

        let existing = RedirectView::new("/view.do?mode=edit", WebHelper::new())
            .with_model_query_parameters(["id"]);
        assert_eq!(
            existing.render(&RequestData::default(), &alert_model()).location,
            "/view.do?mode=edit&id=42"
        );

        let nothing = RedirectView::new("/view.do", WebHelper::new())
            .with_model_query_parameters(["missing"]);
        assert_eq!(
            nothing.render(&RequestData::default(), &alert_model()).location,
            "/view.do"
        );
    }
}
