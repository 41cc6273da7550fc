//! 消息目录缓存

use super::PublishOnceCache;
use std::sync::Arc;
use tracing::debug;
use xweb_core::{Locale, MessageCatalog, Parameter};
use xweb_messages::{MessagesError, MessagesSource};

/// 按区域设置缓存的完整消息目录
///
/// 同一区域设置的目录只构建一次，之后所有请求共享同一实例。
#[derive(Default)]
pub struct MessageCatalogCache {
    catalogs: PublishOnceCache<String, Arc<MessageCatalog>>,
}

impl MessageCatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_message_catalog(
        &self,
        source: &dyn MessagesSource,
        locale: &Locale,
    ) -> Result<Arc<MessageCatalog>, MessagesError> {
        self.catalogs
            .get_or_try_build(&locale.to_string(), || build_catalog(source, locale))
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}

fn build_catalog(
    source: &dyn MessagesSource,
    locale: &Locale,
) -> Result<Arc<MessageCatalog>, MessagesError> {
    let mut entries = Vec::new();
    for key in source.keys(locale)? {
        if let Some(value) = source.message(&key, &[], locale)? {
            entries.push(Parameter::new(key, value));
        }
    }
    debug!(locale = %locale, count = entries.len(), "构建消息目录");
    Ok(Arc::new(MessageCatalog { entries }))
}
