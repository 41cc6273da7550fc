//! 绑定上下文缓存

use super::PublishOnceCache;
use crate::binding::{BindingContext, BindingProvider, ContextLookup};
use crate::error::BindingError;
use std::sync::Arc;
use tracing::{error, info};

/// 绑定上下文缓存
///
/// 每个上下文 ID 只向提供者请求一次。未配置的上下文是初始化错误。
pub struct BindingContextCache {
    provider: Arc<dyn BindingProvider>,
    contexts: PublishOnceCache<String, Arc<dyn BindingContext>>,
}

impl BindingContextCache {
    pub fn new(provider: Arc<dyn BindingProvider>) -> Self {
        Self {
            provider,
            contexts: PublishOnceCache::new(),
        }
    }

    pub fn get(&self, context_id: &str) -> Result<Arc<dyn BindingContext>, BindingError> {
        self.contexts
            .get_or_try_build(&context_id.to_string(), || {
                match self.provider.new_context(context_id) {
                    ContextLookup::Found(context) => {
                        info!(context = %context_id, "绑定上下文已缓存");
                        Ok(context)
                    }
                    ContextLookup::NotConfigured => {
                        error!(context = %context_id, "绑定上下文未配置");
                        Err(BindingError::NotConfigured(context_id.to_string()))
                    }
                }
            })
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
