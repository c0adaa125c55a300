//! Rendering engine: the host-facing wrapper around a pipeline.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ConfigError, Options};
use crate::pipeline::{self, Data, Document, Pipeline, RenderError};
use crate::site::Filter;

/// A converter from page content to HTML, as a host sees it.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Render without blocking, awaiting async stages.
    async fn render(
        &self,
        content: &str,
        data: Option<&Data>,
        path: Option<&Path>,
    ) -> Result<String, RenderError>;

    /// Render in the calling thread.
    fn render_sync(
        &self,
        content: &str,
        data: Option<&Data>,
        path: Option<&Path>,
    ) -> Result<String, RenderError>;

    /// Drop cached results, if the engine keeps any.
    fn delete_cache(&self);

    /// Make a site helper available to the engine.
    fn add_helper(&self, name: &str, helper: &Filter);
}

/// Markdown engine backed by an immutable pipeline.
///
/// Output is returned exactly as stringified; trimming is up to the caller.
#[derive(Debug, Clone)]
pub struct MarkdownEngine {
    pipeline: Arc<Pipeline>,
}

impl MarkdownEngine {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Build the pipeline for `options` and wrap it.
    pub fn from_options(options: &Options) -> Result<Self, ConfigError> {
        Ok(Self::new(pipeline::build(options)?))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

fn document(content: &str, data: Option<&Data>, path: Option<&Path>) -> Document {
    let mut doc = Document::new(content);
    if let Some(data) = data {
        doc = doc.with_data(data.clone());
    }
    if let Some(path) = path {
        doc = doc.with_path(path);
    }
    doc
}

#[async_trait]
impl Engine for MarkdownEngine {
    async fn render(
        &self,
        content: &str,
        data: Option<&Data>,
        path: Option<&Path>,
    ) -> Result<String, RenderError> {
        self.pipeline.run(document(content, data, path)).await
    }

    fn render_sync(
        &self,
        content: &str,
        data: Option<&Data>,
        path: Option<&Path>,
    ) -> Result<String, RenderError> {
        self.pipeline.run_sync(document(content, data, path))
    }

    /// No-op: the engine holds no result cache.
    fn delete_cache(&self) {}

    /// No-op: markdown has no helper namespace.
    fn add_helper(&self, _name: &str, _helper: &Filter) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageSpec;
    use crate::hast::{Hast, Node};
    use crate::mdast::Mdast;
    use crate::pipeline::{Execution, Transformer};
    use pretty_assertions::assert_eq;

    fn engine(options: Options) -> MarkdownEngine {
        MarkdownEngine::from_options(&options).unwrap()
    }

    fn sanitized() -> MarkdownEngine {
        engine(Options {
            sanitize: true,
            ..Default::default()
        })
    }

    const CLEAN: &str = "# Title\n\nSome *emphasis*, `code` and a [link](https://example.com).\n\n\
        - one\n- two\n\n> quoted\n\n```rust\nfn main() {}\n```\n";

    /// Every construct the default `gfm` stage enables, and no raw markup.
    const GFM: &str = "Tables, tasks and notes[^note], see https://example.com or \
        <me@example.com>.\n\n\
        | left | right |\n|:-----|------:|\n| 1 | ~~2~~ |\n\n\
        - [x] done\n- [ ] todo\n\n\
        ![a cat](cat.png \"Cat\")\n\n\
        Again[^note].\n\n[^note]: A *note*.\n";

    #[test]
    fn test_heading_and_paragraph() {
        let html = engine(Options::default())
            .render_sync("# Hello\n\nWorld", None, None)
            .unwrap();
        assert_eq!(html.trim(), "<h1>Hello</h1>\n<p>World</p>");
    }

    #[test]
    fn test_script_dropped_only_when_sanitizing() {
        let source = "Text <script>evil()</script>";

        let unsafe_html = engine(Options::default()).render_sync(source, None, None).unwrap();
        assert!(unsafe_html.contains("<script>evil()</script>"));

        let safe_html = sanitized().render_sync(source, None, None).unwrap();
        assert!(!safe_html.contains("<script"));
        assert!(!safe_html.contains("evil()"));
        assert!(safe_html.contains("Text"));
    }

    #[test]
    fn test_sanitize_is_identity_without_raw_markup() {
        for source in [CLEAN, GFM] {
            let plain = engine(Options::default()).render_sync(source, None, None).unwrap();
            let safe = sanitized().render_sync(source, None, None).unwrap();
            assert_eq!(plain, safe);
        }
    }

    #[test]
    fn test_gfm_document_renders_every_extension() {
        let html = engine(Options::default()).render_sync(GFM, None, None).unwrap();
        assert!(html.contains("<th align=\"left\">left</th>"));
        assert!(html.contains("<del>2</del>"));
        assert!(html.contains("<a href=\"https://example.com\">https://example.com</a>"));
        assert!(html.contains("<input type=\"checkbox\" checked disabled>"));
        assert!(html.contains("id=\"user-content-fnref-note-2\""));
        assert!(html.contains("<section data-footnotes class=\"footnotes\">"));
    }

    #[test]
    fn test_sanitize_keeps_raw_block_inside_paragraph() {
        let source = "Text <div>x</div> tail";
        let plain = engine(Options::default()).render_sync(source, None, None).unwrap();
        let safe = sanitized().render_sync(source, None, None).unwrap();
        assert_eq!(plain, "<p>Text <div>x</div> tail</p>");
        assert_eq!(safe, plain);
    }

    #[test]
    fn test_sanitize_prefixes_generated_heading_ids() {
        let post_stages = vec![StageSpec::named("slug")];
        let plain = engine(Options {
            post_stages: post_stages.clone(),
            ..Default::default()
        })
        .render_sync("# Hello", None, None)
        .unwrap();
        let safe = engine(Options {
            post_stages,
            sanitize: true,
            ..Default::default()
        })
        .render_sync("# Hello", None, None)
        .unwrap();

        assert_eq!(plain, "<h1 id=\"hello\">Hello</h1>");
        assert_eq!(safe, "<h1 id=\"user-content-hello\">Hello</h1>");
    }

    #[test]
    fn test_deeply_nested_document_renders() {
        let source = format!("{}x", "> ".repeat(20_000));
        for engine in [engine(Options::default()), sanitized()] {
            let html = engine.render_sync(&source, None, None).unwrap();
            assert!(html.contains('x'));
            assert!(html.matches("<blockquote>").count() <= crate::hast::MAX_DEPTH);
        }
    }

    #[tokio::test]
    async fn test_sync_and_async_agree() {
        for engine in [engine(Options::default()), sanitized()] {
            let sync = engine.render_sync(CLEAN, None, None).unwrap();
            let async_ = engine.render(CLEAN, None, None).await.unwrap();
            assert_eq!(sync, async_);
        }
    }

    #[test]
    fn test_override_defaults_disables_extensions() {
        let source = "| a |\n|---|\n| 1 |\n\n~~gone~~";

        let with_defaults = engine(Options::default()).render_sync(source, None, None).unwrap();
        assert!(with_defaults.contains("<table>"));
        assert!(with_defaults.contains("<del>"));

        let baseline = engine(Options {
            override_defaults: true,
            ..Default::default()
        })
        .render_sync(source, None, None)
        .unwrap();
        assert!(!baseline.contains("<table>"));
        assert!(!baseline.contains("<del>"));
    }

    struct Stamp;

    impl Transformer<Hast> for Stamp {
        fn name(&self) -> &str {
            "stamp"
        }

        fn transform(&self, tree: &mut Hast, doc: &mut Document) -> anyhow::Result<()> {
            let title = doc.data.get("title").and_then(|v| v.as_str()).unwrap_or("");
            let path = doc.label();
            tree.children.push(Node::text(format!("[{} {}]", title, path)));
            Ok(())
        }
    }

    #[test]
    fn test_data_and_path_reach_stages() {
        let engine = engine(Options {
            post_stages: vec![StageSpec::hast(Stamp)],
            ..Default::default()
        });
        let mut data = Data::new();
        data.insert("title".into(), "T".into());

        let html = engine
            .render_sync("x", Some(&data), Some(Path::new("a.md")))
            .unwrap();
        assert!(html.ends_with("[T a.md]"));
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
    async fn test_async_only_stage_rejected_by_sync_render() {
        let engine = engine(Options {
            pre_stages: vec![StageSpec::mdast(Remote)],
            ..Default::default()
        });

        assert!(matches!(
            engine.render_sync("# x", None, None),
            Err(RenderError::AsyncOnlyStage { stage }) if stage == "remote"
        ));
        assert_eq!(engine.render("# x", None, None).await.unwrap(), "<h1>x</h1>");
    }

    #[test]
    fn test_lifecycle_hooks_are_no_ops() {
        let engine = engine(Options::default());
        engine.delete_cache();
        let before = engine.render_sync("a", None, None).unwrap();
        engine.delete_cache();
        assert_eq!(engine.render_sync("a", None, None).unwrap(), before);
    }
}
