//! 视图解析
//!
//! 视图名称加上前缀、后缀得到转换资源路径，由模板加载器提供转换引擎。

use super::transform::TemplateLoader;
use super::{ViewContext, XwebView};
use crate::cache::PublishOnceCache;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;
use xweb_core::Locale;

/// 按名称解析视图
///
/// 同一名称只加载一次；资源不存在的结果也会被缓存。
pub struct ViewResolver {
    prefix: String,
    suffix: String,
    loader: Arc<dyn TemplateLoader>,
    ctx: Arc<ViewContext>,
    views: PublishOnceCache<String, Option<XwebView>>,
}

impl ViewResolver {
    pub fn new(loader: Arc<dyn TemplateLoader>, ctx: Arc<ViewContext>) -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            loader,
            ctx,
            views: PublishOnceCache::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn resource_path(&self, view_name: &str) -> String {
        format!("{}{}{}", self.prefix, view_name, self.suffix)
    }

    /// 解析视图；转换资源在该区域设置下不存在时返回 `None`
    pub fn resolve_view(&self, view_name: &str, locale: &Locale) -> Option<XwebView> {
        let view = self
            .views
            .get_or_try_build(&view_name.to_string(), || {
                let path = self.resource_path(view_name);
                let view = self.loader.load(&path).map(|transform| {
                    XwebView::new(view_name, self.ctx.clone(), transform)
                });
                if view.is_none() {
                    debug!(view = %view_name, path = %path, "转换资源不存在");
                }
                Ok::<_, Infallible>(view)
            })
            .ok()
            .flatten()?;

        if view.transform.check_resource_exists(locale) {
            Some(view)
        } else {
            debug!(view = %view_name, locale = %locale, "转换资源在该区域设置下不存在");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::NamespaceBindingProvider;
    use crate::cache::BindingContextCache;
    use crate::config::ViewConfig;
    use crate::error::TransformError;
    use crate::view::transform::{IdentityTransform, OutputParams, TransformEngine, TransformSource};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EnglishOnly;

    impl TransformEngine for EnglishOnly {
        fn transform(
            &self,
            source: &TransformSource<'_>,
            _params: &OutputParams,
        ) -> Result<Vec<u8>, TransformError> {
            Ok(source.xml.to_vec())
        }

        fn check_resource_exists(&self, locale: &Locale) -> bool {
            locale.language() == "en"
        }
    }

    #[derive(Default)]
    struct Loader {
        loads: AtomicUsize,
    }

    impl TemplateLoader for Loader {
        fn load(&self, path: &str) -> Option<Arc<dyn TransformEngine>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            match path {
                "/xsl/home.xsl" => Some(Arc::new(IdentityTransform)),
                "/xsl/en.xsl" => Some(Arc::new(EnglishOnly)),
                _ => None,
            }
        }
    }

    fn ctx() -> Arc<ViewContext> {
        let bindings = BindingContextCache::new(Arc::new(
            NamespaceBindingProvider::default().with_context("default", ["urn:app"]),
        ));
        Arc::new(ViewContext::new(ViewConfig::default(), &bindings).unwrap())
    }

    #[test]
    fn test_resolve_view() {
        let loader = Arc::new(Loader::default());
        let resolver = ViewResolver::new(loader.clone(), ctx())
            .with_prefix("/xsl/")
            .with_suffix(".xsl");
        let en = Locale::language_only("en");

        assert_eq!(resolver.resource_path("home"), "/xsl/home.xsl");
        assert_eq!(resolver.resolve_view("home", &en).unwrap().name(), "home");
        assert!(resolver.resolve_view("home", &en).is_some());
        assert!(resolver.resolve_view("missing", &en).is_none());
        assert!(resolver.resolve_view("missing", &en).is_none());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resource_missing_for_locale() {
        let resolver = ViewResolver::new(Arc::new(Loader::default()), ctx())
            .with_prefix("/xsl/")
            .with_suffix(".xsl");
        assert!(resolver.resolve_view("en", &Locale::language_only("en")).is_some());
        assert!(resolver.resolve_view("en", &Locale::language_only("fr")).is_none());
    }
}
