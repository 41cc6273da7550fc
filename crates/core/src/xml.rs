//! XML 序列化与解析
//!
//! 元素树与 XML 文本之间的转换。写出时处理命名空间前缀分配、
//! 名称与字符合法性校验；解析时按命名空间还原元素树。

use crate::model::{Element, Node};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Writer};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

/// XML 错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlError {
    #[error("非法的 XML 名称: {0}")]
    InvalidName(String),

    #[error("非法的 XML 字符 U+{code:04X} 位于 {context}")]
    InvalidChar { code: u32, context: String },

    #[error("XML 写出失败: {0}")]
    Write(String),

    #[error("XML 解析失败: {0}")]
    Parse(String),
}

/// 写出时遇到非法名称或字符的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// 丢弃非法内容并继续
    #[default]
    Ignore,
    /// 立即失败
    Fail,
}

/// 命名空间前缀映射
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespacePrefixMapper {
    /// 命名空间 URI → 前缀，空字符串表示默认命名空间
    #[serde(default)]
    pub mapping: IndexMap<String, String>,
    /// 在根元素上预先声明的命名空间
    #[serde(default)]
    pub predeclared: Vec<String>,
}

impl NamespacePrefixMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, uri: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.mapping.insert(uri.into(), prefix.into());
        self
    }

    pub fn with_predeclared(mut self, uri: impl Into<String>) -> Self {
        self.predeclared.push(uri.into());
        self
    }

    pub fn preferred_prefix<'a>(&'a self, uri: &str, suggestion: &'a str) -> &'a str {
        self.mapping
            .get(uri)
            .map(String::as_str)
            .unwrap_or(suggestion)
    }

    pub fn pre_declared_namespaces(&self) -> &[String] {
        &self.predeclared
    }
}

/// 写出选项
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// 缩进空格数，0 为不缩进
    pub indent: usize,
    pub declaration: bool,
    pub encoding: String,
    pub policy: ErrorPolicy,
    pub prefix_mapper: NamespacePrefixMapper,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            declaration: true,
            encoding: "UTF-8".to_string(),
            policy: ErrorPolicy::Ignore,
            prefix_mapper: NamespacePrefixMapper::default(),
        }
    }
}

/// 把元素树写为 XML 字节
pub fn write_element(root: &Element, options: &WriteOptions) -> Result<Vec<u8>, XmlError> {
    let writer = if options.indent > 0 {
        Writer::new_with_indent(Vec::new(), b' ', options.indent)
    } else {
        Writer::new(Vec::new())
    };
    let mut state = WriteState {
        writer,
        options,
        scopes: Vec::new(),
        generated: 0,
    };

    if options.declaration {
        state
            .writer
            .write_event(Event::Decl(BytesDecl::new(
                "1.0",
                Some(options.encoding.as_str()),
                None,
            )))
            .map_err(|e| XmlError::Write(e.to_string()))?;
    }

    if !state.write(root, true)? {
        return Err(XmlError::InvalidName(root.name.clone()));
    }
    Ok(state.writer.into_inner())
}

/// 把元素树写为 XML 字符串
pub fn to_xml_string(root: &Element, options: &WriteOptions) -> Result<String, XmlError> {
    let bytes = write_element(root, options)?;
    String::from_utf8(bytes).map_err(|e| XmlError::Write(e.to_string()))
}

struct WriteState<'o> {
    writer: Writer<Vec<u8>>,
    options: &'o WriteOptions,
    /// 每层元素声明的 (前缀, URI)
    scopes: Vec<Vec<(String, String)>>,
    generated: usize,
}

impl<'o> WriteState<'o> {
    /// 写出一个元素；按忽略策略丢弃时返回 `false`
    fn write(&mut self, element: &Element, is_root: bool) -> Result<bool, XmlError> {
        if !is_valid_name(&element.name) {
            match self.options.policy {
                ErrorPolicy::Fail => return Err(XmlError::InvalidName(element.name.clone())),
                ErrorPolicy::Ignore => {
                    debug!(name = %element.name, "丢弃非法名称的元素");
                    return Ok(false);
                }
            }
        }

        let mut declarations: Vec<(String, String)> = Vec::new();
        if is_root {
            for uri in self.options.prefix_mapper.pre_declared_namespaces() {
                let suggestion = self.next_suggestion();
                let prefix = self
                    .options
                    .prefix_mapper
                    .preferred_prefix(uri, &suggestion)
                    .to_string();
                if !declarations.iter().any(|(p, _)| *p == prefix) {
                    declarations.push((prefix, uri.clone()));
                }
            }
        }

        let prefix = match element.namespace {
            Some(ref uri) => match self.prefix_in_scope(uri, &declarations) {
                Some(prefix) => prefix,
                None => {
                    let suggestion = self.next_suggestion();
                    let prefix = self
                        .options
                        .prefix_mapper
                        .preferred_prefix(uri, &suggestion)
                        .to_string();
                    declarations.retain(|(p, _)| *p != prefix);
                    declarations.push((prefix.clone(), uri.clone()));
                    prefix
                }
            },
            None => {
                // 无命名空间元素需要取消外层默认命名空间
                let default_bound = self
                    .resolve_prefix("", &declarations)
                    .map(|uri| !uri.is_empty())
                    .unwrap_or(false);
                if default_bound {
                    declarations.retain(|(p, _)| !p.is_empty());
                    declarations.push((String::new(), String::new()));
                }
                String::new()
            }
        };

        let qname = if prefix.is_empty() {
            element.name.clone()
        } else {
            format!("{}:{}", prefix, element.name)
        };

        let mut start = BytesStart::new(qname.as_str());
        for (p, uri) in &declarations {
            let key = if p.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{}", p)
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }
        for (name, value) in &element.attributes {
            if !is_valid_name(name) {
                match self.options.policy {
                    ErrorPolicy::Fail => return Err(XmlError::InvalidName(name.clone())),
                    ErrorPolicy::Ignore => {
                        debug!(element = %element.name, attribute = %name, "丢弃非法名称的属性");
                        continue;
                    }
                }
            }
            let value = self.clean_chars(value, name)?;
            start.push_attribute((name.as_str(), value.as_ref()));
        }

        self.scopes.push(declarations);

        if element.children.is_empty() {
            self.emit(Event::Empty(start))?;
        } else {
            self.emit(Event::Start(start))?;
            for child in &element.children {
                match child {
                    Node::Element(child) => {
                        self.write(child, false)?;
                    }
                    Node::Text(text) => {
                        let text = self.clean_chars(text, &element.name)?;
                        if !text.is_empty() {
                            self.emit(Event::Text(BytesText::new(text.as_ref())))?;
                        }
                    }
                }
            }
            self.emit(Event::End(BytesEnd::new(qname.as_str())))?;
        }

        self.scopes.pop();
        Ok(true)
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), XmlError> {
        self.writer
            .write_event(event)
            .map_err(|e| XmlError::Write(e.to_string()))
    }

    fn next_suggestion(&mut self) -> String {
        self.generated += 1;
        format!("ns{}", self.generated)
    }

    /// 当前作用域内前缀绑定的 URI（含即将在本元素上声明的）
    fn resolve_prefix(&self, prefix: &str, pending: &[(String, String)]) -> Option<String> {
        pending
            .iter()
            .rev()
            .chain(self.scopes.iter().rev().flat_map(|scope| scope.iter().rev()))
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.clone())
    }

    /// 已绑定到 URI 且未被内层遮蔽的前缀
    fn prefix_in_scope(&self, uri: &str, pending: &[(String, String)]) -> Option<String> {
        pending
            .iter()
            .rev()
            .chain(self.scopes.iter().rev().flat_map(|scope| scope.iter().rev()))
            .filter(|(_, u)| u == uri)
            .map(|(p, _)| p.clone())
            .find(|p| self.resolve_prefix(p, pending).as_deref() == Some(uri))
    }

    fn clean_chars<'s>(&self, text: &'s str, context: &str) -> Result<Cow<'s, str>, XmlError> {
        match text.chars().find(|c| !is_xml_char(*c)) {
            None => Ok(Cow::Borrowed(text)),
            Some(bad) => match self.options.policy {
                ErrorPolicy::Fail => Err(XmlError::InvalidChar {
                    code: bad as u32,
                    context: context.to_string(),
                }),
                ErrorPolicy::Ignore => {
                    debug!(context = %context, code = bad as u32, "丢弃非法 XML 字符");
                    Ok(Cow::Owned(text.chars().filter(|c| is_xml_char(*c)).collect()))
                }
            },
        }
    }
}

/// XML 1.0 合法字符
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// 不带前缀的 XML 名称
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

/// 解析 XML 为元素树
///
/// 忽略声明、注释与处理指令；元素间的空白文本被丢弃。
pub fn parse_element(xml: &str) -> Result<Element, XmlError> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (resolved, event) = reader
            .read_resolved_event()
            .map_err(|e| XmlError::Parse(e.to_string()))?;
        match event {
            Event::Start(ref start) | Event::Empty(ref start) => {
                let is_empty = matches!(event, Event::Empty(_));
                let element = start_to_element(resolved, start)?;
                if is_empty {
                    attach(&mut stack, &mut root, element)?;
                } else {
                    stack.push(element);
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::Parse("多余的结束标签".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| XmlError::Parse(e.to_string()))?;
                push_text(&mut stack, text.into_owned());
            }
            Event::CData(data) => {
                push_text(&mut stack, String::from_utf8_lossy(&data).into_owned());
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Parse("元素未闭合".to_string()));
    }
    root.ok_or_else(|| XmlError::Parse("缺少根元素".to_string()))
}

fn start_to_element(resolved: ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let namespace = match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unbound => None,
        ResolveResult::Unknown(prefix) => {
            return Err(XmlError::Parse(format!(
                "未声明的命名空间前缀: {}",
                String::from_utf8_lossy(&prefix)
            )))
        }
    };
    let local_name = start.local_name();
    let name = std::str::from_utf8(local_name.as_ref())
        .map_err(|e| XmlError::Parse(e.to_string()))?
        .to_string();

    let mut element = Element {
        namespace,
        ..Element::new(name)
    };
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Parse(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| XmlError::Parse(e.to_string()))?;
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::Parse(e.to_string()))?;
        element.attributes.push((key.to_string(), value.into_owned()));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlError::Parse("存在多个根元素".to_string())),
    }
}

fn push_text(stack: &mut [Element], text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        // 相邻文本合并为一个节点
        if let Some(Node::Text(last)) = parent.children.last_mut() {
            last.push_str(&text);
        } else {
            parent.children.push(Node::Text(text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NS: &str = "urn:test";

    fn sample() -> Element {
        Element::in_namespace(NS, "root")
            .with_child(
                Element::in_namespace(NS, "user")
                    .with_attribute("id", "7")
                    .with_text_child("name", "a < b & c"),
            )
            .with_child(Element::new("plain").with_text("x"))
            .with_child(Element::in_namespace("urn:other", "extra"))
    }

    #[test]
    fn test_write_and_parse_round_trip() {
        let root = sample();
        let xml = to_xml_string(&root, &WriteOptions::default()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("\n  <"));
        assert_eq!(parse_element(&xml).unwrap(), root);
    }

    #[test]
    fn test_prefix_mapper_and_predeclared() {
        let options = WriteOptions {
            indent: 0,
            declaration: false,
            prefix_mapper: NamespacePrefixMapper::new()
                .with_prefix(NS, "t")
                .with_prefix("urn:other", "o")
                .with_predeclared("urn:other"),
            ..WriteOptions::default()
        };
        let xml = to_xml_string(&sample(), &options).unwrap();
        assert!(xml.starts_with("<t:root xmlns:o=\"urn:other\" xmlns:t=\"urn:test\">"));
        assert!(xml.contains("<o:extra/>"));
        assert_eq!(xml.matches("xmlns:o=").count(), 1);
        assert_eq!(parse_element(&xml).unwrap(), sample());
    }

    #[test]
    fn test_default_namespace_undeclared_for_plain_child() {
        let options = WriteOptions {
            indent: 0,
            declaration: false,
            prefix_mapper: NamespacePrefixMapper::new().with_prefix(NS, ""),
            ..WriteOptions::default()
        };
        let xml = to_xml_string(&sample(), &options).unwrap();
        assert!(xml.contains("<plain xmlns=\"\">x</plain>"));
        let parsed = parse_element(&xml).unwrap();
        assert_eq!(parsed.child("plain").unwrap().namespace, None);
    }

    #[test]
    fn test_ignore_policy_drops_invalid_content() {
        let root = Element::new("root")
            .with_child(Element::new("1bad"))
            .with_child(Element::new("ok").with_attribute("bad name", "v").with_text("a\u{1}b"));
        let options = WriteOptions {
            indent: 0,
            declaration: false,
            ..WriteOptions::default()
        };
        let xml = to_xml_string(&root, &options).unwrap();
        assert_eq!(xml, "<root><ok>ab</ok></root>");
    }

    #[test]
    fn test_fail_policy_reports_error() {
        let options = WriteOptions {
            policy: ErrorPolicy::Fail,
            ..WriteOptions::default()
        };
        let bad_name = Element::new("root").with_child(Element::new("a b"));
        assert_eq!(
            write_element(&bad_name, &options),
            Err(XmlError::InvalidName("a b".to_string()))
        );

        let bad_char = Element::new("root").with_text("x\u{0}");
        assert!(matches!(
            write_element(&bad_char, &options),
            Err(XmlError::InvalidChar { code: 0, .. })
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_element("").is_err());
        assert!(parse_element("<a><b></a>").is_err());
        assert!(parse_element("<p:a/>").is_err());
    }

    fn arb_element() -> impl Strategy<Value = Element> {
        let leaf = ("[a-z][a-z0-9-]{0,6}", "[A-Za-z0-9]([A-Za-z0-9 <>&]{0,10}[A-Za-z0-9])?")
            .prop_map(|(name, text)| Element::in_namespace(NS, name).with_text(text));
        leaf.prop_recursive(3, 24, 4, |inner| {
            ("[a-z][a-z0-9]{0,6}", prop::collection::vec(inner, 1..4)).prop_map(|(name, kids)| {
                kids.into_iter()
                    .fold(Element::in_namespace(NS, name), |el, kid| el.with_child(kid))
            })
        })
    }

    proptest! {
        #[test]
        fn test_round_trip_preserves_structure(root in arb_element()) {
            let xml = to_xml_string(&root, &WriteOptions::default()).unwrap();
            prop_assert_eq!(parse_element(&xml).unwrap(), root);
        }
    }
}
