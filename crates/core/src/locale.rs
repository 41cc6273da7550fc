//! 区域设置
//!
//! 语言/国家/变体三段式区域设置，字符串形式为 `en`、`en_US`、`en_US_POSIX`。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 区域设置错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocaleError {
    #[error("无效的区域设置: {0}")]
    Invalid(String),

    #[error("无法获取请求区域设置: {0}")]
    Unavailable(String),
}

/// 区域设置
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    language: String,
    country: String,
    variant: String,
}

impl Locale {
    pub fn new(language: impl AsRef<str>, country: impl AsRef<str>) -> Self {
        Self {
            language: language.as_ref().to_ascii_lowercase(),
            country: country.as_ref().to_ascii_uppercase(),
            variant: String::new(),
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    /// 仅语言
    pub fn language_only(language: impl AsRef<str>) -> Self {
        Self::new(language, "")
    }

    /// 解析区域设置标记
    ///
    /// 支持 `_` 与 `-` 分隔，忽略 POSIX 形式的 `.UTF-8` 与 `@modifier` 后缀。
    pub fn parse(tag: &str) -> Result<Self, LocaleError> {
        let trimmed = tag.trim();
        let base = trimmed
            .split(|c: char| c == '.' || c == '@')
            .next()
            .unwrap_or_default()
            .trim();
        if base.is_empty() {
            return Err(LocaleError::Invalid(tag.to_string()));
        }

        let mut parts = base.split(|c: char| c == '_' || c == '-');
        let language = parts.next().unwrap_or_default();
        let country = parts.next().unwrap_or_default();
        let variant: Vec<&str> = parts.collect();

        let valid = |s: &str| s.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid(language) || !valid(country) || language.len() > 8 {
            return Err(LocaleError::Invalid(tag.to_string()));
        }

        Ok(Self::new(language, country).with_variant(variant.join("_")))
    }

    /// 进程默认区域设置
    ///
    /// 依次读取 `LC_ALL`、`LC_MESSAGES`、`LANG`，`C`/`POSIX` 或无法解析时为 `en`。
    pub fn process_default() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.is_empty())
            .filter(|value| value != "C" && value != "POSIX" && !value.starts_with("C."))
            .and_then(|value| Self::parse(&value).ok())
            .unwrap_or_else(|| Self::language_only("en"))
    }

    /// 从 `Accept-Language` 头选取权重最高的区域设置
    pub fn from_accept_language(header: &str) -> Option<Self> {
        let mut best: Option<(f32, Locale)> = None;
        for item in header.split(',') {
            let mut pieces = item.split(';');
            let tag = pieces.next().unwrap_or_default().trim();
            if tag.is_empty() || tag == "*" {
                continue;
            }
            let quality = pieces
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            if let Ok(locale) = Self::parse(tag) {
                // 同权重时保留先出现的
                if best.as_ref().map(|(q, _)| quality > *q).unwrap_or(true) {
                    best = Some((quality, locale));
                }
            }
        }
        best.map(|(_, locale)| locale)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// 由具体到一般的候选后缀，例如 `en_US_POSIX`、`en_US`、`en`
    pub fn fallback_chain(&self) -> Vec<String> {
        let mut chain = Vec::with_capacity(3);
        if !self.variant.is_empty() {
            chain.push(self.to_string());
        }
        if !self.country.is_empty() {
            chain.push(format!("{}_{}", self.language, self.country));
        }
        if !self.language.is_empty() {
            chain.push(self.language.clone());
        }
        chain
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::process_default()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;
        if !self.country.is_empty() || !self.variant.is_empty() {
            write!(f, "_{}", self.country)?;
        }
        if !self.variant.is_empty() {
            write!(f, "_{}", self.variant)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Locale {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.to_string()
    }
}
