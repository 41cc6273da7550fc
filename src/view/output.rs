//! 输出阶段
//!
//! 调试参数存在时直接返回序列化后的文档，否则交给转换引擎。

use super::transform::{OutputParams, TransformEngine, TransformSource};
use super::ViewContext;
use crate::config::ViewConfig;
use crate::error::ViewError;
use indexmap::IndexMap;
use tracing::{debug, warn};
use xweb_core::{Document, ErrorPolicy, Locale, ModelMap, RequestData, ViewResponse};

pub const DEBUG_HEADER: &str = "---- START DOM -----\n";
pub const DEBUG_FOOTER: &str = "----- END DOM ------\n";

/// 直接返回文档时的内容类型
pub const XML_SOURCE_CONTENT_TYPE: &str = "text/xml";

/// 直接返回文档时固定的缩进
const XML_SOURCE_INDENT: usize = 2;

/// 请求是否要求直接返回 XML 文档
pub fn is_xml_source_request(config: &ViewConfig, request: &RequestData) -> bool {
    config.enable_xml_source_response
        && request.parameter(&config.xml_source_param) == Some("true")
}

/// 以调试级别输出文档，失败只记录警告
pub(crate) fn debug_echo(ctx: &ViewContext, document: &Document) {
    let result = ctx.writer(Some(XML_SOURCE_INDENT)).and_then(|mut writer| {
        writer.set_error_policy(ErrorPolicy::Ignore);
        writer.write(document)
    });
    match result {
        Ok(xml) => debug!(
            "{}{}\n{}",
            DEBUG_HEADER,
            String::from_utf8_lossy(&xml),
            DEBUG_FOOTER
        ),
        Err(e) => warn!(error = %e, "调试输出文档失败"),
    }
}

pub(crate) fn write_response(
    ctx: &ViewContext,
    document: &Document,
    request: &RequestData,
    model: &ModelMap,
    locale: &Locale,
    transform: &dyn TransformEngine,
) -> Result<ViewResponse, ViewError> {
    let config = &ctx.config;

    if is_xml_source_request(config, request) {
        debug!(path = %request.path, "直接返回 XML 文档");
        let xml = ctx.writer(Some(XML_SOURCE_INDENT))?.write(document)?;
        return Ok(ViewResponse {
            content_type: XML_SOURCE_CONTENT_TYPE.to_string(),
            character_encoding: config.encoding.clone(),
            body: xml,
        });
    }

    let content_type = match ctx.content_type_resolver {
        Some(ref resolver) => resolver.resolve(request, model),
        None => config.content_type.clone(),
    };
    let xml = ctx.writer(None)?.write(document)?;
    let params = OutputParams {
        content_type: content_type.clone(),
        encoding: config.encoding.clone(),
        indent: config.indent,
        locale: locale.clone(),
        parameters: IndexMap::new(),
    };
    let body = transform.transform(
        &TransformSource {
            document,
            xml: &xml,
        },
        &params,
    )?;
    Ok(ViewResponse {
        content_type,
        character_encoding: config.encoding.clone(),
        body,
    })
}
