//! 进程级缓存
//!
//! 三个缓存各自独立：绑定上下文、按区域设置的消息目录、全局设置。
//! 条目一经写入在进程生命周期内一直有效，不做失效处理。
//!
//! ## 模块结构
//!
//! - `binding` - 绑定上下文缓存
//! - `catalog` - 消息目录缓存
//! - `settings` - 可插拔后端的设置缓存

mod binding;
mod catalog;
mod settings;

pub use binding::BindingContextCache;
pub use catalog::MessageCatalogCache;
pub use settings::{MemorySettingsCache, SettingsCacheBackend, SettingsLoader, SETTINGS_CACHE_KEY};

use dashmap::DashMap;
use parking_lot::Mutex;
use std::hash::Hash;

/// 只写一次的缓存
///
/// 读取不加锁；构建时持有锁完成“检查、构建、写入”，同一键只构建一次。
pub struct PublishOnceCache<K, V> {
    entries: DashMap<K, V>,
    build_lock: Mutex<()>,
}

impl<K, V> PublishOnceCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            build_lock: Mutex::new(()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// 获取或构建条目；构建失败时不写入
    pub fn get_or_try_build<E>(
        &self,
        key: &K,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let _guard = self.build_lock.lock();
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = build()?;
        self.entries.insert(key.clone(), value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for PublishOnceCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
