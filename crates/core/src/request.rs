//! 请求与会话
//!
//! HTTP 容器之外的请求数据快照，以及会话存储接口。

use crate::constants::SES_KEY_LOCALE;
use crate::locale::{Locale, LocaleError};
use crate::model::ModelValue;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;

/// 会话存储接口
///
/// 由外部会话存储实现；同一会话可能被多个并发请求同时访问。
pub trait HttpSession: Send + Sync + Debug {
    fn id(&self) -> &str;

    /// 属性名称，按会话自身的迭代顺序
    fn attribute_names(&self) -> Vec<String>;

    fn attribute(&self, name: &str) -> Option<ModelValue>;

    fn set_attribute(&self, name: &str, value: ModelValue);

    /// 移除并返回属性，读取与删除是一个原子操作
    fn remove_attribute(&self, name: &str) -> Option<ModelValue>;
}

/// 内存会话
#[derive(Debug)]
pub struct MemorySession {
    id: String,
    attributes: RwLock<IndexMap<String, ModelValue>>,
}

impl MemorySession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: RwLock::new(IndexMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.attributes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.read().is_empty()
    }
}

impl HttpSession for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes.read().keys().cloned().collect()
    }

    fn attribute(&self, name: &str) -> Option<ModelValue> {
        self.attributes.read().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: ModelValue) {
        self.attributes.write().insert(name.to_string(), value);
    }

    fn remove_attribute(&self, name: &str) -> Option<ModelValue> {
        self.attributes.write().shift_remove(name)
    }
}

/// 请求数据快照
///
/// 参数与请求头都是多值的：同名键按首次出现的顺序分组，组内保持提交顺序。
#[derive(Debug, Clone)]
pub struct RequestData {
    pub method: String,
    pub scheme: String,
    pub server_name: String,
    pub server_port: u16,
    /// 应用基础路径
    pub context_path: String,
    /// 当前路径（相对应用基础路径）
    pub path: String,
    pub query_string: Option<String>,
    pub parameters: IndexMap<String, Vec<String>>,
    pub headers: IndexMap<String, Vec<String>>,
    session: Option<Arc<dyn HttpSession>>,
}

impl Default for RequestData {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            scheme: "http".to_string(),
            server_name: "localhost".to_string(),
            server_port: 80,
            context_path: String::new(),
            path: String::new(),
            query_string: None,
            parameters: IndexMap::new(),
            headers: IndexMap::new(),
            session: None,
        }
    }
}

impl RequestData {
    pub fn new(server_name: impl Into<String>, server_port: u16) -> Self {
        Self {
            server_name: server_name.into(),
            server_port,
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_paths(mut self, context_path: impl Into<String>, path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self.path = path.into();
        self
    }

    pub fn with_query_string(mut self, query: impl Into<String>) -> Self {
        self.query_string = Some(query.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_param(key, value);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(key, value);
        self
    }

    pub fn with_session(mut self, session: Arc<dyn HttpSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.parameters
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.entry(key.into()).or_default().push(value.into());
    }

    /// 参数的第一个值
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// 请求头的第一个值（名称不区分大小写）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header("user-agent")
    }

    /// 当前会话；不存在时返回 `None`，不会创建会话
    pub fn session(&self) -> Option<&Arc<dyn HttpSession>> {
        self.session.as_ref()
    }

    /// 完整请求 URL（含查询串）
    pub fn request_url(&self) -> String {
        let default_port = matches!(
            (self.scheme.as_str(), self.server_port),
            ("http", 80) | ("https", 443)
        );
        let mut url = format!("{}://{}", self.scheme, self.server_name);
        if !default_port {
            url.push_str(&format!(":{}", self.server_port));
        }
        url.push_str(&self.context_path);
        url.push_str(&self.path);
        if let Some(ref query) = self.query_string {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// 以 `/` 开头的地址加上应用上下文路径，其余地址原样返回
    pub fn context_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.context_path, url)
        } else {
            url.to_string()
        }
    }
}

/// 请求区域设置解析
pub trait LocaleResolver: Send + Sync {
    fn resolve_locale(&self, request: &RequestData) -> Result<Locale, LocaleError>;
}

/// 默认区域设置解析：会话中保存的区域设置优先，其次 `Accept-Language`
#[derive(Debug, Clone, Default)]
pub struct SessionLocaleResolver;

impl LocaleResolver for SessionLocaleResolver {
    fn resolve_locale(&self, request: &RequestData) -> Result<Locale, LocaleError> {
        if let Some(value) = request
            .session()
            .and_then(|session| session.attribute(SES_KEY_LOCALE))
        {
            return Locale::parse(&value.display_string());
        }
        request
            .header("accept-language")
            .and_then(Locale::from_accept_language)
            .ok_or_else(|| LocaleError::Unavailable("请求未携带区域设置".to_string()))
    }
}
