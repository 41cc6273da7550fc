//! Xweb 视图渲染
//!
//! 把控制器的模型 Map、请求数据、会话、提示消息、校验错误、全局设置与消息目录
//! 组装为一棵 XML 视图文档，再交给转换引擎输出响应。
//!
//! ## 模块结构
//!
//! - `binding` - 绑定上下文与文档序列化器
//! - `cache` - 绑定上下文、消息目录与全局设置缓存
//! - `config` - YAML 配置
//! - `error` - 错误类型
//! - `settings` - 全局设置提供者
//! - `view` - 文档组装、输出阶段与视图解析

pub mod binding;
pub mod cache;
pub mod config;
pub mod error;
pub mod settings;
pub mod view;

pub use binding::{
    BindingContext, BindingProvider, BindingWriter, ContextLookup, NamespaceBindingProvider,
    PropertyValue,
};
pub use cache::{
    BindingContextCache, MemorySettingsCache, MessageCatalogCache, SettingsCacheBackend,
    SettingsLoader,
};
pub use config::{load_config, JsonViewConfig, MessagesConfig, ViewConfig, XwebConfig};
pub use error::{BindingError, CacheError, SettingsError, TransformError, ViewError};
pub use settings::{SettingsProvider, StaticSettingsProvider};
pub use view::{
    ContentTypeResolver, DocumentAssembler, DocumentPostProcessor, IdentityTransform, JsonView,
    OutputParams, RedirectView, TemplateLoader, TransformEngine, TransformSource, ViewContext,
    ViewResolver, XhtmlContentTypeResolver, XwebView,
};
