//! 错误状态码映射
//!
//! 视图错误按种类映射为 HTTP 状态码，可选在响应体中带上错误信息。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 可映射状态码的错误
pub trait StatusKind: std::error::Error {
    /// 错误种类名称，用于查找映射
    fn kind(&self) -> &'static str;
}

/// 状态码映射配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResolverConfig {
    /// 未映射错误的状态码
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    /// 是否在响应体中输出错误信息
    #[serde(default)]
    pub include_message: bool,
    /// 错误种类 → 状态码
    #[serde(default)]
    pub mappings: IndexMap<String, u16>,
}

fn default_status_code() -> u16 {
    500
}

impl Default for StatusResolverConfig {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            include_message: false,
            mappings: IndexMap::new(),
        }
    }
}

/// 错误状态码解析器
#[derive(Debug, Clone, Default)]
pub struct StatusResolver {
    config: StatusResolverConfig,
}

impl StatusResolver {
    pub fn new(config: StatusResolverConfig) -> Self {
        Self { config }
    }

    pub fn status_for(&self, kind: &str) -> StatusCode {
        let code = self
            .config
            .mappings
            .get(kind)
            .copied()
            .unwrap_or(self.config.status_code);
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// 把错误转换为响应
    pub fn resolve<E: StatusKind>(&self, error: &E) -> Response {
        let status = self.status_for(error.kind());
        warn!(kind = error.kind(), status = status.as_u16(), error = %error, "视图渲染失败");
        if self.config.include_message {
            (status, error.to_string()).into_response()
        } else {
            status.into_response()
        }
    }
}
