//! 全局设置提供者

use crate::error::SettingsError;
use indexmap::IndexMap;

/// 设置提供者
pub trait SettingsProvider: Send + Sync {
    /// 全部设置，按提供者的顺序
    fn get_all_settings(&self) -> Result<Vec<(String, String)>, SettingsError>;
}

/// 固定设置，来自配置文件的 `settings` 区块
#[derive(Debug, Clone, Default)]
pub struct StaticSettingsProvider {
    settings: IndexMap<String, String>,
}

impl StaticSettingsProvider {
    pub fn new(settings: IndexMap<String, String>) -> Self {
        Self { settings }
    }
}

impl SettingsProvider for StaticSettingsProvider {
    fn get_all_settings(&self) -> Result<Vec<(String, String)>, SettingsError> {
        Ok(self
            .settings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
