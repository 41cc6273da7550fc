//! 路由中间件
//!
//! 请求体大小限制、请求超时、应用基础路径注入与固定响应头。

use crate::request::ContextPath;
use axum::http::{HeaderName, HeaderValue};
use axum::{Extension, Router};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::debug;

/// 服务器中间件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 应用基础路径
    #[serde(default)]
    pub context_path: String,
    /// 最大请求体大小（字节），默认 2MB
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    /// 请求超时（秒），默认 30 秒
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 每个响应都设置的响应头，覆盖处理器设置的同名头
    #[serde(default)]
    pub response_headers: IndexMap<String, String>,
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            context_path: String::new(),
            max_body_size: default_max_body_size(),
            request_timeout_secs: default_request_timeout_secs(),
            response_headers: IndexMap::new(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 中间件配置错误
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("无效的响应头名称: {0}")]
    InvalidHeaderName(String),

    #[error("无效的响应头值 {name}: {value}")]
    InvalidHeaderValue { name: String, value: String },
}

/// 解析配置中的响应头
pub fn response_headers(
    headers: &IndexMap<String, String>,
) -> Result<Vec<(HeaderName, HeaderValue)>, LayerError> {
    headers
        .iter()
        .map(|(name, value)| {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| LayerError::InvalidHeaderName(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| LayerError::InvalidHeaderValue {
                    name: name.clone(),
                    value: value.clone(),
                })?;
            Ok((header_name, header_value))
        })
        .collect()
}

/// 为路由套上全部中间件
pub fn apply_layers<S>(router: Router<S>, config: &ServerConfig) -> Result<Router<S>, LayerError>
where
    S: Clone + Send + Sync + 'static,
{
    let mut router = router;
    for (name, value) in response_headers(&config.response_headers)? {
        debug!(header = %name, "添加固定响应头");
        router = router.layer(SetResponseHeaderLayer::overriding(name, value));
    }
    Ok(router
        .layer(Extension(ContextPath(config.context_path.clone())))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(RequestBodyLimitLayer::new(config.max_body_size)))
}
