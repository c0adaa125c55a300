//! Capability contract for user-suppliable transform stages.

use async_trait::async_trait;
use pulldown_cmark::Options as ParseOptions;

use super::Document;

/// How a stage may be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Runs in both blocking and non-blocking renders.
    Sync,
    /// Only runs in non-blocking renders; a blocking render against a
    /// pipeline containing it fails before any stage runs.
    Async,
}

/// A transform over one intermediate representation.
///
/// `T` is either [`crate::mdast::Mdast`] (pre-bridge stages) or
/// [`crate::hast::Hast`] (post-bridge stages). Implementors override
/// [`Transformer::transform`] for synchronous stages, or
/// [`Transformer::transform_async`] together with
/// [`Transformer::execution`] for async-only stages.
///
/// Transformers must not keep mutable state between calls: one pipeline is
/// shared by every concurrent render of a build.
///
/// # Example
///
/// ```ignore
/// struct Shout;
///
/// impl Transformer<Hast> for Shout {
///     fn name(&self) -> &str { "shout" }
///
///     fn transform(&self, tree: &mut Hast, _doc: &mut Document) -> anyhow::Result<()> {
///         tree.visit_elements_mut(&mut |el| el.add_class("loud"));
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Transformer<T: Send>: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    fn execution(&self) -> Execution {
        Execution::Sync
    }

    /// Parser syntax extensions this stage needs.
    ///
    /// Only consulted for pre-bridge stages: the builder unions the options of
    /// every pre-bridge stage into the parse stage before any document runs.
    fn parse_options(&self) -> ParseOptions {
        ParseOptions::empty()
    }

    fn transform(&self, _tree: &mut T, _doc: &mut Document) -> anyhow::Result<()> {
        anyhow::bail!("stage '{}' does not support synchronous execution", self.name())
    }

    async fn transform_async(&self, tree: &mut T, doc: &mut Document) -> anyhow::Result<()> {
        self.transform(tree, doc)
    }
}
