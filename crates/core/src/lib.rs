//! Xweb 核心类型 crate
//!
//! 视图文档、模型值、请求与会话抽象，以及 XML 序列化
//!
//! ## 模块结构
//!
//! - `constants` - 模型 Map 与会话中的保留键
//! - `document` - 每个请求组装的视图文档
//! - `locale` - 区域设置解析与回退链
//! - `message` - 可解析消息与校验错误
//! - `model` - 模型值与结构化元素
//! - `request` - 请求数据快照与会话接口
//! - `response` - 渲染结果
//! - `web_helper` - 一次性提示消息与请求 URL 的会话存取
//! - `xml` - 元素树的写出与解析

pub mod constants;
pub mod document;
pub mod locale;
pub mod message;
pub mod model;
pub mod request;
mod response;
mod web_helper;
pub mod xml;

// 重新导出
pub use document::{
    AnyContent, Auxiliary, Context, Document, ErrorEntry, Errors, MessageCatalog, Messages,
    Model, Parameter, SessionBlock, Settings,
};
pub use locale::{Locale, LocaleError};
pub use message::{
    AlertMessage, FieldError, MessageResolvable, ObjectError, ValidationError, ValidationErrors,
};
pub use model::{Element, ModelMap, ModelValue, Node};
pub use request::{HttpSession, LocaleResolver, MemorySession, RequestData, SessionLocaleResolver};
pub use response::{RedirectResponse, ViewResponse};
pub use web_helper::WebHelper;
pub use xml::{ErrorPolicy, NamespacePrefixMapper, WriteOptions, XmlError};
