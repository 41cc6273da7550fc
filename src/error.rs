//! 错误类型

use xweb_core::XmlError;
use xweb_server::StatusKind;

/// 绑定错误
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// 绑定上下文未配置，视图无法初始化
    #[error("绑定上下文未配置: {0}")]
    NotConfigured(String),

    #[error("序列化失败: {0}")]
    Marshal(#[from] XmlError),

    #[error("不支持的序列化属性: {0}")]
    UnsupportedProperty(String),

    #[error("序列化属性 {name} 的值无效: {reason}")]
    InvalidProperty { name: String, reason: String },
}

/// 设置读取错误
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("设置不可用: {0}")]
    Unavailable(String),
}

/// 缓存后端错误
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("缓存后端错误: {0}")]
    Backend(String),
}

/// 转换错误
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("转换失败: {0}")]
    Failed(String),

    #[error("转换资源不存在: {0}")]
    ResourceNotFound(String),
}

/// 视图渲染错误
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}

impl StatusKind for ViewError {
    fn kind(&self) -> &'static str {
        match self {
            ViewError::Binding(BindingError::Marshal(_)) => "marshal",
            ViewError::Binding(_) => "binding",
            ViewError::Transform(TransformError::ResourceNotFound(_)) => "not_found",
            ViewError::Transform(_) => "transform",
            ViewError::Json(_) => "json",
        }
    }
}
