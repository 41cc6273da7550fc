//! 转换阶段的外部协作者
//!
//! 转换引擎把文档转换为响应体；内容类型解析器按请求选择输出类型；
//! 模板加载器按名称提供转换引擎。

use crate::error::TransformError;
use indexmap::IndexMap;
use std::sync::Arc;
use xweb_core::{Document, Locale, ModelMap, RequestData};

/// 转换输入：文档及其 XML 序列化结果
#[derive(Debug, Clone, Copy)]
pub struct TransformSource<'a> {
    pub document: &'a Document,
    pub xml: &'a [u8],
}

/// 输出参数
#[derive(Debug, Clone)]
pub struct OutputParams {
    pub content_type: String,
    pub encoding: String,
    pub indent: usize,
    pub locale: Locale,
    /// 传给转换引擎的附加参数
    pub parameters: IndexMap<String, String>,
}

/// 转换引擎
pub trait TransformEngine: Send + Sync {
    fn transform(
        &self,
        source: &TransformSource<'_>,
        params: &OutputParams,
    ) -> Result<Vec<u8>, TransformError>;

    /// 转换资源在指定区域设置下是否存在
    fn check_resource_exists(&self, _locale: &Locale) -> bool {
        true
    }
}

/// 原样输出序列化后的 XML
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl TransformEngine for IdentityTransform {
    fn transform(
        &self,
        source: &TransformSource<'_>,
        _params: &OutputParams,
    ) -> Result<Vec<u8>, TransformError> {
        Ok(source.xml.to_vec())
    }
}

/// 内容类型解析器
pub trait ContentTypeResolver: Send + Sync {
    fn resolve(&self, request: &RequestData, model: &ModelMap) -> String;
}

/// 按 `Accept` 头选择 XHTML 系列内容类型
#[derive(Debug, Clone, Copy, Default)]
pub struct XhtmlContentTypeResolver;

const XHTML_CONTENT_TYPES: &[&str] = &["application/xhtml+xml", "application/xml", "text/xml"];

impl ContentTypeResolver for XhtmlContentTypeResolver {
    fn resolve(&self, request: &RequestData, _model: &ModelMap) -> String {
        let accept = request
            .header("accept")
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        XHTML_CONTENT_TYPES
            .iter()
            .find(|content_type| accept.contains(*content_type))
            .copied()
            .unwrap_or("text/html")
            .to_string()
    }
}

/// 模板加载器
pub trait TemplateLoader: Send + Sync {
    /// 按资源路径加载转换引擎；资源不存在时返回 `None`
    fn load(&self, path: &str) -> Option<Arc<dyn TransformEngine>>;
}
