//! 请求数据提取
//!
//! 从 HTTP 请求构建 `RequestData`：查询串与表单参数、请求头、会话。

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{header, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::debug;
use xweb_core::{HttpSession, RequestData};

/// 应用基础路径，作为请求扩展注入
#[derive(Debug, Clone, Default)]
pub struct ContextPath(pub String);

/// 会话句柄，由会话存储中间件作为请求扩展注入
#[derive(Debug, Clone)]
pub struct SessionHandle(pub Arc<dyn HttpSession>);

/// 表单请求体的最大读取长度
const MAX_FORM_BODY: usize = 2 * 1024 * 1024;

/// 请求数据提取失败
#[derive(Debug, thiserror::Error)]
pub enum RequestDataRejection {
    #[error("读取请求体失败: {0}")]
    Body(String),
}

impl IntoResponse for RequestDataRejection {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// 请求数据提取器
#[derive(Debug, Clone)]
pub struct XwebRequest(pub RequestData);

#[async_trait]
impl<S> FromRequest<S> for XwebRequest
where
    S: Send + Sync,
{
    type Rejection = RequestDataRejection;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let form = if is_form(&parts) {
            let bytes = axum::body::to_bytes(body, MAX_FORM_BODY)
                .await
                .map_err(|e| RequestDataRejection::Body(e.to_string()))?;
            Some(bytes)
        } else {
            None
        };
        Ok(XwebRequest(request_data(&parts, form.as_ref())))
    }
}

fn is_form(parts: &Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
        .unwrap_or(false)
}

/// 由请求头部与可选的表单请求体构建请求数据
///
/// 参数先取查询串再取表单，同名参数保持提交顺序。
pub fn request_data(parts: &Parts, form: Option<&Bytes>) -> RequestData {
    let (server_name, server_port) = host_and_port(parts);
    let context_path = parts
        .extensions
        .get::<ContextPath>()
        .map(|c| c.0.clone())
        .unwrap_or_default();
    let full_path = parts.uri.path();
    let path = strip_context_path(full_path, &context_path).to_string();

    let mut data = RequestData::new(server_name, server_port)
        .with_method(parts.method.as_str())
        .with_paths(context_path, path);
    data.scheme = parts.uri.scheme_str().unwrap_or("http").to_string();

    if let Some(query) = parts.uri.query() {
        data.query_string = Some(query.to_string());
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            data.add_param(key, value);
        }
    }
    if let Some(body) = form {
        for (key, value) in url::form_urlencoded::parse(body) {
            data.add_param(key, value);
        }
    }

    for (name, value) in parts.headers.iter() {
        match value.to_str() {
            Ok(value) => data.add_header(name.as_str(), value),
            Err(_) => debug!(header = %name, "忽略非 ASCII 请求头"),
        }
    }

    if let Some(session) = parts.extensions.get::<SessionHandle>() {
        data = data.with_session(session.0.clone());
    }
    data
}

fn host_and_port(parts: &Parts) -> (String, u16) {
    let default_port = if parts.uri.scheme_str() == Some("https") {
        443
    } else {
        80
    };
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()));

    match host {
        Some(host) => match host
            .rsplit_once(':')
            .and_then(|(name, port)| port.parse::<u16>().ok().map(|port| (name, port)))
        {
            Some((name, port)) => (name.to_string(), port),
            None => (host, default_port),
        },
        None => ("localhost".to_string(), default_port),
    }
}

/// 只在路径段边界处去掉上下文路径
fn strip_context_path<'a>(full_path: &'a str, context_path: &str) -> &'a str {
    match full_path.strip_prefix(context_path) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => full_path,
    }
}
