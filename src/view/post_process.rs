//! 文档后处理器

use xweb_core::{Document, RequestData};

/// 文档后处理器
///
/// 在文档组装完成、输出之前调整文档，只作用于声明支持的视图。
pub trait DocumentPostProcessor: Send + Sync {
    fn supports_view(&self, view_name: &str) -> bool;

    fn process(&self, document: &mut Document, request: &RequestData);
}
