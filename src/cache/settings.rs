//! 设置缓存
//!
//! 缓存后端由调用方提供；后端出错时直接从设置提供者重新计算，不影响请求。

use crate::error::CacheError;
use crate::settings::SettingsProvider;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};
use xweb_core::{Parameter, Settings};

/// 设置在缓存后端中的键
pub const SETTINGS_CACHE_KEY: &str = "xweb.settings";

/// 设置缓存后端
pub trait SettingsCacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Arc<Settings>>, CacheError>;

    fn put(&self, key: &str, value: Arc<Settings>) -> Result<(), CacheError>;
}

/// 内存缓存后端
#[derive(Debug, Default)]
pub struct MemorySettingsCache {
    entries: DashMap<String, Arc<Settings>>,
}

impl MemorySettingsCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsCacheBackend for MemorySettingsCache {
    fn get(&self, key: &str) -> Result<Option<Arc<Settings>>, CacheError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: &str, value: Arc<Settings>) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// 设置加载器
pub struct SettingsLoader {
    provider: Arc<dyn SettingsProvider>,
    cache: Option<Arc<dyn SettingsCacheBackend>>,
    build_lock: Mutex<()>,
}

impl SettingsLoader {
    pub fn new(provider: Arc<dyn SettingsProvider>) -> Self {
        Self {
            provider,
            cache: None,
            build_lock: Mutex::new(()),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn SettingsCacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 读取设置；提供者失败时返回 `None`
    pub fn load(&self) -> Option<Arc<Settings>> {
        let Some(ref cache) = self.cache else {
            return self.compute();
        };

        match cache.get(SETTINGS_CACHE_KEY) {
            Ok(Some(settings)) => return Some(settings),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "读取设置缓存失败，直接计算设置");
                return self.compute();
            }
        }

        let _guard = self.build_lock.lock();
        if let Ok(Some(settings)) = cache.get(SETTINGS_CACHE_KEY) {
            return Some(settings);
        }
        let settings = self.compute()?;
        if let Err(e) = cache.put(SETTINGS_CACHE_KEY, settings.clone()) {
            warn!(error = %e, "写入设置缓存失败");
        }
        Some(settings)
    }

    fn compute(&self) -> Option<Arc<Settings>> {
        match self.provider.get_all_settings() {
            Ok(all) => {
                debug!(count = all.len(), "计算全局设置");
                Some(Arc::new(Settings::new(
                    all.into_iter().map(|(k, v)| Parameter::new(k, v)).collect(),
                )))
            }
            Err(e) => {
                warn!(error = %e, "读取全局设置失败");
                None
            }
        }
    }
}
