//! Markdown plugin: page loader plus the `md` and `mdAsync` filters.

use std::sync::Arc;

use serde_json::Value;

use crate::config::{ConfigError, Options, UserOptions};
use crate::engine::{Engine, MarkdownEngine};
use crate::loader;
use crate::pipeline::Data;
use crate::site::{Filter, FilterError, FilterValue, SharedData, Site, lock_data};

use super::Plugin;

/// Name of the blocking filter.
pub const MD_FILTER: &str = "md";
/// Name of the non-blocking filter.
pub const MD_ASYNC_FILTER: &str = "mdAsync";

/// Renders markdown pages and exposes the renderer to templates.
#[derive(Debug, Clone)]
pub struct Markdown {
    options: Options,
}

impl Markdown {
    /// Resolve `user` over fresh defaults.
    pub fn new(user: Option<UserOptions>) -> Self {
        Self {
            options: Options::resolve(user),
        }
    }

    pub fn with_options(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

impl Default for Markdown {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Plugin for Markdown {
    fn name(&self) -> &str {
        "markdown"
    }

    fn install(&self, site: &mut dyn Site) -> Result<(), ConfigError> {
        let engine = Arc::new(MarkdownEngine::from_options(&self.options)?);

        site.load_pages(&self.options.source_extensions, loader::text, engine.clone());
        site.filter(MD_FILTER, md_filter(Arc::clone(&engine)));
        site.filter(MD_ASYNC_FILTER, md_async_filter(engine));

        tracing::debug!(
            extensions = ?self.options.source_extensions,
            sanitize = self.options.sanitize,
            "markdown plugin installed"
        );
        Ok(())
    }
}

/// What a filter call renders, and where the result goes.
enum Call {
    Text(String),
    Object {
        target: SharedData,
        content: String,
        data: Data,
    },
}

impl Call {
    fn from_value(value: FilterValue) -> Result<Self, FilterError> {
        match value {
            FilterValue::Text(text) => Ok(Call::Text(text)),
            FilterValue::Data(target) => {
                let (content, data) = {
                    let data = lock_data(&target);
                    let content = data
                        .get("content")
                        .and_then(Value::as_str)
                        .ok_or(FilterError::MissingContent)?
                        .to_string();
                    (content, data.clone())
                };
                Ok(Call::Object {
                    target,
                    content,
                    data,
                })
            }
            FilterValue::Number(_) => Err(FilterError::InvalidInput(
                "text or an object with a `content` field",
            )),
        }
    }

    fn content(&self) -> &str {
        match self {
            Call::Text(text) => text,
            Call::Object { content, .. } => content,
        }
    }

    fn data(&self) -> Option<&Data> {
        match self {
            Call::Text(_) => None,
            Call::Object { data, .. } => Some(data),
        }
    }

    /// Store the trimmed output. Objects are updated in place and returned
    /// as the same object.
    fn finish(self, html: String) -> FilterValue {
        let html = html.trim().to_string();
        match self {
            Call::Text(_) => FilterValue::Text(html),
            Call::Object { target, .. } => {
                lock_data(&target).insert("content".to_string(), Value::String(html));
                FilterValue::Data(target)
            }
        }
    }
}

fn md_filter(engine: Arc<MarkdownEngine>) -> Filter {
    Filter::sync(move |value, _args| {
        let call = Call::from_value(value)?;
        let html = engine.render_sync(call.content(), call.data(), None)?;
        Ok(call.finish(html))
    })
}

fn md_async_filter(engine: Arc<MarkdownEngine>) -> Filter {
    Filter::asynchronous(move |value, _args| {
        let engine = Arc::clone(&engine);
        async move {
            let call = Call::from_value(value)?;
            let html = engine.render(call.content(), call.data(), None).await?;
            Ok::<_, FilterError>(call.finish(html))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageSpec;
    use crate::mdast::Mdast;
    use crate::pipeline::{Document, Execution, RenderError, Transformer};
    use crate::site::{FilterArgs, LocalSite};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn site(plugin: Markdown) -> LocalSite {
        let mut site = LocalSite::new();
        site.use_plugin(&plugin).unwrap();
        site
    }

    fn object(content: &str) -> FilterValue {
        let mut data = Data::new();
        data.insert("content".into(), content.into());
        data.insert("title".into(), "Page".into());
        FilterValue::data(data)
    }

    #[test]
    fn test_filters_registered_on_install() {
        let site = site(Markdown::default());
        assert!(!site.get_filter(MD_FILTER).unwrap().is_async());
        assert!(site.get_filter(MD_ASYNC_FILTER).unwrap().is_async());
        assert!(site.handles(Path::new("docs/index.md")));
        assert!(!site.handles(Path::new("docs/index.html")));
    }

    #[test]
    fn test_custom_extensions() {
        let site = site(Markdown::new(Some(UserOptions {
            source_extensions: Some(vec![".markdown".into()]),
            ..Default::default()
        })));
        assert!(site.handles(Path::new("a.markdown")));
        assert!(!site.handles(Path::new("a.md")));
    }

    #[test]
    fn test_md_text_is_trimmed() {
        let site = site(Markdown::default());
        let out = site
            .apply_filter_sync(MD_FILTER, "\n# Hello\n\nWorld\n".into(), &FilterArgs::new())
            .unwrap();
        assert_eq!(out.as_text(), Some("<h1>Hello</h1>\n<p>World</p>"));
    }

    #[test]
    fn test_md_object_preserves_identity() {
        let site = site(Markdown::default());
        let input = object("*hi*");

        let out = site
            .apply_filter_sync(MD_FILTER, input.clone(), &FilterArgs::new())
            .unwrap();
        assert!(out.same_object(&input));

        let FilterValue::Data(data) = out else {
            panic!("expected object");
        };
        let data = lock_data(&data);
        assert_eq!(data["content"], "<p><em>hi</em></p>");
        assert_eq!(data["title"], "Page");
    }

    #[tokio::test]
    async fn test_md_async_matches_sync() {
        let site = site(Markdown::default());
        let source = "- a\n- b\n\n| x |\n|---|\n| 1 |\n";

        let sync = site
            .apply_filter_sync(MD_FILTER, source.into(), &FilterArgs::new())
            .unwrap();
        let async_ = site
            .apply_filter(MD_ASYNC_FILTER, source.into(), FilterArgs::new())
            .await
            .unwrap();
        assert_eq!(sync.as_text(), async_.as_text());

        let input = object("text");
        let out = site
            .apply_filter(MD_ASYNC_FILTER, input.clone(), FilterArgs::new())
            .await
            .unwrap();
        assert!(out.same_object(&input));
    }

    #[test]
    fn test_object_without_content() {
        let site = site(Markdown::default());
        let err = site
            .apply_filter_sync(MD_FILTER, FilterValue::data(Data::new()), &FilterArgs::new())
            .unwrap_err();
        assert!(matches!(err, FilterError::MissingContent));
    }

    #[test]
    fn test_sanitize_option() {
        let site = site(Markdown::new(Some(UserOptions {
            sanitize: Some(true),
            ..Default::default()
        })));
        let out = site
            .apply_filter_sync(MD_FILTER, "a <script>x()</script>".into(), &FilterArgs::new())
            .unwrap();
        assert!(!out.as_text().unwrap().contains("script"));
    }

    #[test]
    fn test_invalid_config_fails_install() {
        let plugin = Markdown::new(Some(UserOptions {
            pre_stages: Some(vec![StageSpec::named("no-such-stage")]),
            ..Default::default()
        }));
        let mut site = LocalSite::new();
        assert!(matches!(
            site.use_plugin(&plugin),
            Err(ConfigError::UnknownStage(_))
        ));
        assert!(site.get_filter(MD_FILTER).is_none());
    }

    struct Remote;

    #[async_trait]
    impl Transformer<Mdast> for Remote {
        fn name(&self) -> &str {
            "remote"
        }

        fn execution(&self) -> Execution {
            Execution::Async
        }

        async fn transform_async(&self, _tree: &mut Mdast, _doc: &mut Document) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_async_only_stage() {
        let site = site(Markdown::new(Some(UserOptions {
            pre_stages: Some(vec![StageSpec::mdast(Remote)]),
            ..Default::default()
        })));

        let err = site
            .apply_filter_sync(MD_FILTER, "x".into(), &FilterArgs::new())
            .unwrap_err();
        assert!(matches!(
            err,
            FilterError::Render(RenderError::AsyncOnlyStage { .. })
        ));

        let out = site
            .apply_filter(MD_ASYNC_FILTER, "x".into(), FilterArgs::new())
            .await
            .unwrap();
        assert_eq!(out.as_text(), Some("<p>x</p>"));
    }
}
