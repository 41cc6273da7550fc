//! 视图渲染
//!
//! 组装视图文档并交给转换引擎输出响应。
//!
//! ## 模块结构
//!
//! - `assembler` - 文档组装
//! - `json` - 模型 Map 的 JSON 视图
//! - `output` - 原始 XML 输出、内容类型选择、转换调用与调试输出
//! - `post_process` - 文档后处理器
//! - `redirect` - 保存提示消息后重定向
//! - `resolver` - 按名称解析视图
//! - `transform` - 转换引擎、内容类型解析器与模板加载器接口

mod assembler;
mod json;
mod output;
mod post_process;
mod redirect;
mod resolver;
mod transform;

pub use assembler::{effective_model_key, DocumentAssembler};
pub use json::JsonView;
pub use output::{is_xml_source_request, DEBUG_FOOTER, DEBUG_HEADER, XML_SOURCE_CONTENT_TYPE};
pub use post_process::DocumentPostProcessor;
pub use redirect::RedirectView;
pub use resolver::ViewResolver;
pub use transform::{
    ContentTypeResolver, IdentityTransform, OutputParams, TemplateLoader, TransformEngine,
    TransformSource, XhtmlContentTypeResolver,
};

use crate::binding::{
    BindingContext, BindingWriter, NamespaceBindingProvider, PropertyValue, PROPERTY_ENCODING,
    PROPERTY_INDENT, PROPERTY_PREFIX_MAPPER,
};
use crate::cache::{BindingContextCache, MemorySettingsCache, MessageCatalogCache, SettingsLoader};
use crate::config::{ViewConfig, XwebConfig};
use crate::error::{BindingError, ViewError};
use crate::settings::StaticSettingsProvider;
use anyhow::Context as _;
use std::sync::Arc;
use tracing::{info, Level};
use xweb_core::{
    ErrorPolicy, LocaleResolver, ModelMap, RequestData, SessionLocaleResolver, ViewResponse,
    WebHelper,
};
use xweb_messages::{BundleMessagesSource, MessagesSource};

/// 视图共享环境
///
/// 启动时构建一次，由所有视图共享。
pub struct ViewContext {
    config: ViewConfig,
    binding: Arc<dyn BindingContext>,
    messages: Option<Arc<dyn MessagesSource>>,
    catalogs: Arc<MessageCatalogCache>,
    settings: Option<Arc<SettingsLoader>>,
    locale_resolver: Arc<dyn LocaleResolver>,
    web_helper: WebHelper,
    post_processors: Vec<Arc<dyn DocumentPostProcessor>>,
    content_type_resolver: Option<Arc<dyn ContentTypeResolver>>,
}

impl ViewContext {
    /// 创建视图环境
    ///
    /// 绑定上下文未配置或序列化属性无效时返回错误，视图不可用。
    pub fn new(config: ViewConfig, bindings: &BindingContextCache) -> Result<Self, BindingError> {
        let binding = bindings.get(&config.binding_context)?;
        let content_type_resolver: Option<Arc<dyn ContentTypeResolver>> =
            if config.use_xhtml_content_type {
                Some(Arc::new(XhtmlContentTypeResolver))
            } else {
                None
            };
        let ctx = Self {
            config,
            binding,
            messages: None,
            catalogs: Arc::new(MessageCatalogCache::new()),
            settings: None,
            locale_resolver: Arc::new(SessionLocaleResolver),
            web_helper: WebHelper::new(),
            post_processors: Vec::new(),
            content_type_resolver,
        };
        // 提前校验序列化属性
        ctx.writer(None)?;
        info!(context = %ctx.binding.id(), "视图环境已初始化");
        Ok(ctx)
    }

    /// 按配置文件构建视图环境：命名空间绑定、properties 资源包与固定全局设置
    pub fn from_config(config: &XwebConfig) -> anyhow::Result<Self> {
        let bindings = BindingContextCache::new(Arc::new(NamespaceBindingProvider::new(
            config.bindings.clone(),
        )));
        let mut ctx = Self::new(config.view.clone(), &bindings)
            .with_context(|| format!("初始化视图环境失败: {}", config.view.binding_context))?;

        if let Some(ref directory) = config.messages.directory {
            let source = config
                .messages
                .basenames
                .iter()
                .fold(BundleMessagesSource::from_directory(directory), |source, basename| {
                    source.with_basename(basename.as_str())
                });
            ctx = ctx.with_messages(Arc::new(source));
        }

        if !config.settings.is_empty() {
            let provider = StaticSettingsProvider::new(config.settings.clone());
            let loader = SettingsLoader::new(Arc::new(provider))
                .with_cache(Arc::new(MemorySettingsCache::new()));
            ctx = ctx.with_settings(Arc::new(loader));
        }
        Ok(ctx)
    }

    pub fn with_messages(mut self, messages: Arc<dyn MessagesSource>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// 共享消息目录缓存（多个视图环境使用同一缓存）
    pub fn with_catalog_cache(mut self, catalogs: Arc<MessageCatalogCache>) -> Self {
        self.catalogs = catalogs;
        self
    }

    pub fn with_settings(mut self, settings: Arc<SettingsLoader>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_locale_resolver(mut self, resolver: Arc<dyn LocaleResolver>) -> Self {
        self.locale_resolver = resolver;
        self
    }

    pub fn with_web_helper(mut self, helper: WebHelper) -> Self {
        self.web_helper = helper;
        self
    }

    pub fn with_post_processor(mut self, processor: Arc<dyn DocumentPostProcessor>) -> Self {
        self.post_processors.push(processor);
        self
    }

    pub fn with_content_type_resolver(mut self, resolver: Arc<dyn ContentTypeResolver>) -> Self {
        self.content_type_resolver = Some(resolver);
        self
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn catalogs(&self) -> &Arc<MessageCatalogCache> {
        &self.catalogs
    }

    pub fn web_helper(&self) -> &WebHelper {
        &self.web_helper
    }

    pub fn assembler(&self) -> DocumentAssembler<'_> {
        DocumentAssembler::new(self)
    }

    /// 按配置创建文档序列化器，`indent` 覆盖配置的缩进
    fn writer(&self, indent: Option<usize>) -> Result<Box<dyn BindingWriter>, BindingError> {
        let mut writer = self.binding.create_writer();
        writer.set_error_policy(if self.config.ignore_marshal_errors {
            ErrorPolicy::Ignore
        } else {
            ErrorPolicy::Fail
        });
        writer.set_property(
            PROPERTY_PREFIX_MAPPER,
            PropertyValue::PrefixMapper(self.config.prefix_mapper()),
        )?;
        writer.set_property(
            PROPERTY_ENCODING,
            PropertyValue::Text(self.config.encoding.clone()),
        )?;
        writer.set_property(
            PROPERTY_INDENT,
            PropertyValue::Int(self.config.indent as i64),
        )?;
        // 配置的序列化器属性可以覆盖缩进（如 formatted_output: false）
        for (name, raw) in &self.config.writer_properties {
            writer.set_property(name, PropertyValue::parse(raw))?;
        }
        if let Some(indent) = indent {
            writer.set_property(PROPERTY_INDENT, PropertyValue::Int(indent as i64))?;
        }
        Ok(writer)
    }
}

/// Xweb 视图
///
/// 视图名称用于选择后处理器；转换引擎决定最终输出。
#[derive(Clone)]
pub struct XwebView {
    name: String,
    ctx: Arc<ViewContext>,
    transform: Arc<dyn TransformEngine>,
}

impl XwebView {
    pub fn new(
        name: impl Into<String>,
        ctx: Arc<ViewContext>,
        transform: Arc<dyn TransformEngine>,
    ) -> Self {
        Self {
            name: name.into(),
            ctx,
            transform,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 渲染视图
    ///
    /// 只有在禁止忽略序列化错误时，非法内容才会导致渲染失败。
    pub fn render(
        &self,
        request: &RequestData,
        model: &ModelMap,
        root_name: &str,
    ) -> Result<ViewResponse, ViewError> {
        let assembler = self.ctx.assembler();
        let locale = assembler.resolve_locale(request);
        let mut document = assembler.assemble_base(request, model, root_name, &locale);

        for processor in &self.ctx.post_processors {
            if processor.supports_view(&self.name) {
                processor.process(&mut document, request);
            }
        }

        let debug = tracing::enabled!(Level::DEBUG);
        if debug && !self.ctx.config.debug_message_resource {
            output::debug_echo(&self.ctx, &document);
        }
        assembler.attach_message_catalog(&mut document, &locale);
        if debug && self.ctx.config.debug_message_resource {
            output::debug_echo(&self.ctx, &document);
        }

        output::write_response(
            &self.ctx,
            &document,
            request,
            model,
            &locale,
            self.transform.as_ref(),
        )
    }
}

impl std::fmt::Debug for XwebView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XwebView").field("name", &self.name).finish()
    }
}
