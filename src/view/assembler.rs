//! 文档组装
//!
//! 把请求参数、请求头、会话、模型、提示消息、校验错误、全局设置与消息目录
//! 合并为一棵视图文档。组装过程不会失败：任何一步出错都记录日志并省略对应区块。

use super::ViewContext;
use indexmap::IndexMap;
use tracing::{debug, warn};
use xweb_core::constants::{ALERT_MESSAGES_OBJECT, DEFAULT_MODEL_OBJECT, ERRORS_OBJECT};
use xweb_core::{
    AlertMessage, AnyContent, Context, Document, ErrorEntry, Errors, HttpSession, Locale,
    MessageResolvable, Messages, Model, ModelMap, ModelValue, Parameter, RequestData,
    SessionBlock,
};
use xweb_messages::{project_error, resolve_alert, resolve_message, MessagesSource};

/// 文档组装器
pub struct DocumentAssembler<'a> {
    ctx: &'a ViewContext,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(ctx: &'a ViewContext) -> Self {
        Self { ctx }
    }

    /// 请求区域设置；无法确定时回退到默认区域设置
    pub fn resolve_locale(&self, request: &RequestData) -> Locale {
        match self.ctx.locale_resolver.resolve_locale(request) {
            Ok(locale) => locale,
            Err(e) => {
                let fallback = self.ctx.config.fallback_locale();
                warn!(error = %e, fallback = %fallback, "无法确定请求区域设置，使用默认区域设置");
                fallback
            }
        }
    }

    /// 组装完整文档
    pub fn assemble(
        &self,
        request: &RequestData,
        model: &ModelMap,
        root_key: &str,
        locale: &Locale,
    ) -> Document {
        let mut document = self.assemble_base(request, model, root_key, locale);
        self.attach_message_catalog(&mut document, locale);
        document
    }

    /// 组装除消息目录外的全部区块
    pub(crate) fn assemble_base(
        &self,
        request: &RequestData,
        model: &ModelMap,
        root_key: &str,
        locale: &Locale,
    ) -> Document {
        // 会话提示消息只取一次，取出即清除；没有消息目录时留在会话中
        let session_alert = match self.ctx.messages {
            Some(_) => request
                .session()
                .and_then(|session| self.ctx.web_helper.take_saved_message(session.as_ref())),
            None => None,
        };
        let request_alert = match model.get(ALERT_MESSAGES_OBJECT) {
            Some(ModelValue::Alert(alert)) => Some(alert),
            _ => None,
        };

        let model_key = effective_model_key(model, root_key);
        let mut document = Document::new(self.context(request, locale));
        document.model = self.model(model, model_key);
        self.fill_auxiliary(&mut document, model, model_key);

        if let Some(source) = self.ctx.messages.as_deref() {
            document.messages = messages_block(source, request_alert, session_alert.as_ref(), locale);
            document.errors = errors_block(
                source,
                model,
                model_key,
                root_key,
                request_alert,
                session_alert.as_ref(),
                locale,
            );
        } else if request_alert.is_some() {
            debug!("未配置消息目录，忽略提示消息");
        }

        if self.ctx.config.include_session {
            document.session = request
                .session()
                .map(|session| self.session_block(session.as_ref()));
        }

        document.request = flatten(&request.parameters);
        document.request_headers = flatten(&request.headers);
        document
    }

    /// 附加当前区域设置的消息目录
    pub(crate) fn attach_message_catalog(&self, document: &mut Document, locale: &Locale) {
        if !self.ctx.config.include_messages {
            return;
        }
        let Some(source) = self.ctx.messages.as_deref() else {
            return;
        };
        match self.ctx.catalogs.get_message_catalog(source, locale) {
            Ok(catalog) => document.message_catalog = Some(catalog),
            Err(e) => warn!(locale = %locale, error = %e, "构建消息目录失败"),
        }
    }

    fn context(&self, request: &RequestData, locale: &Locale) -> Context {
        Context {
            server_name: request.server_name.clone(),
            server_port: request.server_port,
            user_agent: request.user_agent().map(str::to_string),
            user_locale: locale.to_string(),
            web_context: request.context_path.clone(),
            path: request.path.clone(),
            settings: self
                .ctx
                .settings
                .as_ref()
                .and_then(|loader| loader.load())
                .map(|settings| settings.as_ref().clone()),
        }
    }

    fn model(&self, model: &ModelMap, model_key: &str) -> Model {
        let Some(value) = model.get(model_key) else {
            return Model::NoModel;
        };
        match value.as_element() {
            Some(element) if self.ctx.binding.belongs_to_namespace(value) => {
                Model::Bound(element.clone())
            }
            _ => {
                debug!(key = %model_key, "模型值不在绑定命名空间内");
                Model::NoModel
            }
        }
    }

    fn fill_auxiliary(&self, document: &mut Document, model: &ModelMap, model_key: &str) {
        if model.len() > 2 {
            for (key, value) in model {
                if key == model_key || !self.ctx.config.is_auxiliary_key(key) {
                    continue;
                }
                document.auxiliary_mut().entries.push(self.any_content(key, value));
            }
        }
        if let Some(app_context) = self.ctx.web_helper.app_context() {
            document
                .auxiliary_mut()
                .entries
                .push(AnyContent::Element(app_context.clone()));
        }
    }

    fn session_block(&self, session: &dyn HttpSession) -> SessionBlock {
        let entries = session
            .attribute_names()
            .into_iter()
            .filter_map(|name| {
                session
                    .attribute(&name)
                    .map(|value| self.any_content(&name, &value))
            })
            .collect();
        SessionBlock {
            session_id: session.id().to_string(),
            entries,
        }
    }

    /// 绑定命名空间内的元素原样保留，其余转为字符串参数
    fn any_content(&self, key: &str, value: &ModelValue) -> AnyContent {
        match value {
            ModelValue::Element(element) if self.ctx.binding.belongs_to_namespace(value) => {
                AnyContent::Element(element.clone())
            }
            _ => AnyContent::Param(Parameter::new(key, value.display_string())),
        }
    }
}

/// 首选模型键存在时使用它，否则使用调用方传入的根名称
pub fn effective_model_key<'m>(model: &'m ModelMap, root_key: &'m str) -> &'m str {
    if model.contains_key(DEFAULT_MODEL_OBJECT) {
        DEFAULT_MODEL_OBJECT
    } else {
        root_key
    }
}

fn messages_block(
    source: &dyn MessagesSource,
    request_alert: Option<&AlertMessage>,
    session_alert: Option<&MessageResolvable>,
    locale: &Locale,
) -> Option<Messages> {
    let messages = match (request_alert, session_alert) {
        (Some(alert), _) => resolve_alert(source, alert, locale),
        (None, Some(saved)) => resolve_message(source, saved, locale).into_iter().collect(),
        (None, None) => return None,
    };
    if messages.is_empty() {
        None
    } else {
        Some(Messages { messages })
    }
}

fn errors_block(
    source: &dyn MessagesSource,
    model: &ModelMap,
    model_key: &str,
    root_key: &str,
    request_alert: Option<&AlertMessage>,
    session_alert: Option<&MessageResolvable>,
    locale: &Locale,
) -> Option<Errors> {
    let mut entries = Vec::new();

    if let Some(saved) = session_alert {
        entries.extend(resolve_message(source, saved, locale).map(ErrorEntry::global));
    }
    if let Some(AlertMessage::Single(alert)) = request_alert {
        entries.extend(resolve_message(source, alert, locale).map(ErrorEntry::global));
    }

    if let Some(ModelValue::Errors(by_name)) = model.get(ERRORS_OBJECT) {
        let errors = by_name
            .errors_for(model_key)
            .filter(|errors| !errors.is_empty())
            .or_else(|| {
                if root_key == model_key {
                    None
                } else {
                    by_name.errors_for(root_key)
                }
            })
            .unwrap_or_default();
        entries.extend(
            errors
                .iter()
                .filter_map(|error| project_error(source, error, locale)),
        );
    }

    if entries.is_empty() {
        None
    } else {
        Some(Errors { entries })
    }
}

fn flatten(values: &IndexMap<String, Vec<String>>) -> Vec<Parameter> {
    values
        .iter()
        .flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| Parameter::new(key.as_str(), value.as_str()))
        })
        .collect()
}
