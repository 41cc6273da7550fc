//! 错误到提示消息的重定向
//!
//! 已映射的错误种类保存一条提示消息（可选同时保存请求 URL），然后重定向，
//! 提示消息在下一次渲染时输出一次。

use crate::response::RedirectBody;
use crate::status::StatusKind;
use axum::response::{IntoResponse, Response};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use xweb_core::{MessageResolvable, RedirectResponse, RequestData, WebHelper};

/// 单个错误种类的处理方式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertMapping {
    /// 提示消息代码
    pub message_key: String,
    /// 找不到消息时的默认文本
    #[serde(default = "default_error_message")]
    pub default_message: String,
    /// 重定向地址，以 `/` 开头时相对于应用上下文路径
    pub redirect_url: String,
    /// 是否保存请求 URL，便于处理完成后返回
    #[serde(default)]
    pub save_request_url: bool,
}

fn default_error_message() -> String {
    "An error has occured.".to_string()
}

impl AlertMapping {
    pub fn new(message_key: impl Into<String>, redirect_url: impl Into<String>) -> Self {
        Self {
            message_key: message_key.into(),
            default_message: default_error_message(),
            redirect_url: redirect_url.into(),
            save_request_url: false,
        }
    }

    pub fn with_save_request_url(mut self, save_request_url: bool) -> Self {
        self.save_request_url = save_request_url;
        self
    }
}

/// 提示消息重定向配置：错误种类 → 处理方式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertResolverConfig {
    #[serde(default)]
    pub mappings: IndexMap<String, AlertMapping>,
}

/// 错误到提示消息的重定向解析器
#[derive(Debug, Clone, Default)]
pub struct AlertResolver {
    config: AlertResolverConfig,
    web_helper: WebHelper,
}

impl AlertResolver {
    pub fn new(config: AlertResolverConfig, web_helper: WebHelper) -> Self {
        Self { config, web_helper }
    }

    /// 保存提示消息并返回重定向目标；未映射的错误返回 `None`
    pub fn redirect_for<E: StatusKind>(
        &self,
        error: &E,
        request: &RequestData,
    ) -> Option<RedirectResponse> {
        let mapping = self.config.mappings.get(error.kind())?;
        let location = request.context_url(&mapping.redirect_url);
        match request.session() {
            Some(session) => {
                if mapping.save_request_url {
                    self.web_helper.save_request_url(request);
                }
                let message = MessageResolvable::new(mapping.message_key.as_str())
                    .with_default_message(mapping.default_message.as_str());
                self.web_helper.save_message(session.as_ref(), message);
                info!(kind = error.kind(), location = %location, error = %error, "错误转为提示消息");
            }
            None => warn!(kind = error.kind(), error = %error, "没有会话，无法保存提示消息"),
        }
        Some(RedirectResponse::found(location))
    }

    /// 把已映射的错误转换为重定向响应
    pub fn resolve<E: StatusKind>(&self, error: &E, request: &RequestData) -> Option<Response> {
        self.redirect_for(error, request)
            .map(|redirect| RedirectBody(redirect).into_response())
    }
}
