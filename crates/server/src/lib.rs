//! Xweb HTTP 适配 crate
//!
//! 在 axum 与视图渲染之间转换请求与响应
//!
//! ## 模块结构
//!
//! - `alert` - 错误转为会话提示消息并重定向
//! - `layers` - 请求体限制、超时、基础路径与固定响应头
//! - `request` - 从 HTTP 请求构建请求数据
//! - `response` - 渲染结果与重定向转换为 HTTP 响应
//! - `status` - 视图错误到 HTTP 状态码的映射

mod alert;
mod layers;
mod request;
mod response;
mod status;

// 重新导出
pub use alert::{AlertMapping, AlertResolver, AlertResolverConfig};
pub use layers::{apply_layers, response_headers, LayerError, ServerConfig};
pub use request::{request_data, ContextPath, RequestDataRejection, SessionHandle, XwebRequest};
pub use response::{RedirectBody, ViewBody};
pub use status::{StatusKind, StatusResolver, StatusResolverConfig};
