//! 消息目录
//!
//! 按区域设置查找本地化消息。`BundleMessagesSource` 以 properties 资源包为后端，
//! 资源包可以在内存中注册，也可以从目录按需加载。

use crate::format::format_message;
use crate::properties::parse_properties;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use xweb_core::{Locale, MessageResolvable};

/// 消息目录错误
#[derive(Debug, thiserror::Error)]
pub enum MessagesError {
    #[error("读取资源包失败 {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("资源包不存在: {0}")]
    BundleNotFound(String),

    #[error("消息目录不支持注册资源: {0}")]
    Unsupported(String),
}

/// 消息目录接口
pub trait MessagesSource: Send + Sync {
    /// 当前区域设置下可枚举的全部消息键
    fn keys(&self, locale: &Locale) -> Result<Vec<String>, MessagesError>;

    /// 查找并格式化消息；找不到时返回 `None`
    fn message(
        &self,
        code: &str,
        args: &[String],
        locale: &Locale,
    ) -> Result<Option<String>, MessagesError>;

    /// 运行时注册资源包
    fn register_message_resource(&self, basename: &str) -> Result<(), MessagesError> {
        Err(MessagesError::Unsupported(basename.to_string()))
    }

    /// 解析可解析消息：依次尝试每个消息码，最后使用默认消息
    fn resolve(
        &self,
        resolvable: &MessageResolvable,
        locale: &Locale,
    ) -> Result<Option<String>, MessagesError> {
        for code in &resolvable.codes {
            if let Some(message) = self.message(code, &resolvable.arguments, locale)? {
                return Ok(Some(message));
            }
        }
        Ok(resolvable
            .default_message
            .as_deref()
            .map(|message| format_message(message, &resolvable.arguments)))
    }
}

type Bundle = Arc<IndexMap<String, String>>;

/// properties 资源包消息目录
///
/// 查找顺序：每个基础名下按区域设置回退链（`messages_en_US` → `messages_en` →
/// `messages`）查找，基础名按注册顺序尝试，最后交给父目录。
pub struct BundleMessagesSource {
    basenames: RwLock<Vec<String>>,
    directory: Option<PathBuf>,
    /// 资源包名称 → 内容；`None` 表示已确认不存在
    bundles: RwLock<HashMap<String, Option<Bundle>>>,
    parent: Option<Arc<dyn MessagesSource>>,
}

impl BundleMessagesSource {
    /// 仅使用内存资源包
    pub fn new() -> Self {
        Self {
            basenames: RwLock::new(Vec::new()),
            directory: None,
            bundles: RwLock::new(HashMap::new()),
            parent: None,
        }
    }

    /// 从目录加载 `{basename}[_{lang}[_{COUNTRY}]].properties`
    pub fn from_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            ..Self::new()
        }
    }

    pub fn with_parent(mut self, parent: Arc<dyn MessagesSource>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_basename(self, basename: impl Into<String>) -> Self {
        self.add_basename(basename.into());
        self
    }

    /// 注册内存资源包
    ///
    /// `locale` 为 `None` 时是基础资源包。
    pub fn add_bundle(&self, basename: &str, locale: Option<&Locale>, content: &str) {
        let name = bundle_name(basename, locale.map(|l| l.to_string()).as_deref());
        self.bundles
            .write()
            .insert(name, Some(Arc::new(parse_properties(content))));
        self.add_basename(basename.to_string());
    }

    pub fn basenames(&self) -> Vec<String> {
        self.basenames.read().clone()
    }

    fn add_basename(&self, basename: String) {
        let mut basenames = self.basenames.write();
        if !basenames.contains(&basename) {
            basenames.push(basename);
        }
    }

    fn bundle(&self, name: &str) -> Result<Option<Bundle>, MessagesError> {
        if let Some(cached) = self.bundles.read().get(name) {
            return Ok(cached.clone());
        }

        let loaded = match self.directory {
            Some(ref dir) => {
                let path = dir.join(format!("{}.properties", name));
                match std::fs::read_to_string(&path) {
                    Ok(content) => {
                        debug!(bundle = %name, path = %path.display(), "加载资源包");
                        Some(Arc::new(parse_properties(&content)))
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => {
                        return Err(MessagesError::Io {
                            path: path.display().to_string(),
                            source: e,
                        })
                    }
                }
            }
            None => None,
        };

        let mut bundles = self.bundles.write();
        Ok(bundles.entry(name.to_string()).or_insert(loaded).clone())
    }

    /// 指定基础名下由具体到一般的资源包
    fn chain(&self, basename: &str, locale: &Locale) -> Result<Vec<Bundle>, MessagesError> {
        let mut names: Vec<String> = locale
            .fallback_chain()
            .iter()
            .map(|suffix| bundle_name(basename, Some(suffix)))
            .collect();
        names.push(bundle_name(basename, None));

        let mut chain = Vec::with_capacity(names.len());
        for name in names {
            if let Some(bundle) = self.bundle(&name)? {
                chain.push(bundle);
            }
        }
        Ok(chain)
    }
}

impl Default for BundleMessagesSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BundleMessagesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleMessagesSource")
            .field("basenames", &*self.basenames.read())
            .field("directory", &self.directory)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl MessagesSource for BundleMessagesSource {
    fn keys(&self, locale: &Locale) -> Result<Vec<String>, MessagesError> {
        let mut keys = IndexSet::new();
        if let Some(ref parent) = self.parent {
            keys.extend(parent.keys(locale)?);
        }
        for basename in self.basenames() {
            // 由一般到具体，保持基础资源包的键顺序在前
            for bundle in self.chain(&basename, locale)?.iter().rev() {
                keys.extend(bundle.keys().cloned());
            }
        }
        Ok(keys.into_iter().collect())
    }

    fn message(
        &self,
        code: &str,
        args: &[String],
        locale: &Locale,
    ) -> Result<Option<String>, MessagesError> {
        for basename in self.basenames() {
            for bundle in self.chain(&basename, locale)? {
                if let Some(pattern) = bundle.get(code) {
                    return Ok(Some(format_message(pattern, args)));
                }
            }
        }
        match self.parent {
            Some(ref parent) => parent.message(code, args, locale),
            None => Ok(None),
        }
    }

    fn register_message_resource(&self, basename: &str) -> Result<(), MessagesError> {
        let known = self.basenames.read().iter().any(|b| b == basename);
        if !known {
            // 目录模式下至少需要基础资源包存在
            if self.directory.is_some() && self.bundle(&bundle_name(basename, None))?.is_none() {
                return Err(MessagesError::BundleNotFound(basename.to_string()));
            }
            info!(basename = %basename, "注册消息资源包");
            self.add_basename(basename.to_string());
        }
        Ok(())
    }
}

fn bundle_name(basename: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) if !suffix.is_empty() => format!("{}_{}", basename, suffix),
        _ => basename.to_string(),
    }
}
