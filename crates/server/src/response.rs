//! 渲染结果到 HTTP 响应

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;
use xweb_core::{RedirectResponse, ViewResponse};

/// 视图渲染结果响应
#[derive(Debug, Clone)]
pub struct ViewBody(pub ViewResponse);

impl IntoResponse for ViewBody {
    fn into_response(self) -> Response {
        let content_type = self.0.content_type_header();
        match HeaderValue::from_str(&content_type) {
            Ok(value) => {
                let mut res = Response::new(Body::from(self.0.body));
                res.headers_mut().insert(header::CONTENT_TYPE, value);
                res
            }
            Err(e) => {
                warn!(content_type = %content_type, error = %e, "无效的内容类型");
                (StatusCode::INTERNAL_SERVER_ERROR, "无效的内容类型").into_response()
            }
        }
    }
}

impl From<ViewResponse> for ViewBody {
    fn from(response: ViewResponse) -> Self {
        ViewBody(response)
    }
}

/// 重定向响应
#[derive(Debug, Clone)]
pub struct RedirectBody(pub RedirectResponse);

impl IntoResponse for RedirectBody {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status)
            .ok()
            .filter(StatusCode::is_redirection)
            .unwrap_or(StatusCode::FOUND);
        match HeaderValue::from_str(&self.0.location) {
            Ok(location) => {
                let mut res = status.into_response();
                res.headers_mut().insert(header::LOCATION, location);
                res
            }
            Err(e) => {
                warn!(location = %self.0.location, error = %e, "无效的重定向地址");
                (StatusCode::INTERNAL_SERVER_ERROR, "无效的重定向地址").into_response()
            }
        }
    }
}

impl From<RedirectResponse> for RedirectBody {
    fn from(redirect: RedirectResponse) -> Self {
        RedirectBody(redirect)
    }
}
