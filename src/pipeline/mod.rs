//! Render pipeline for markdown documents.
//!
//! A pipeline is an immutable, validated sequence of stages:
//!
//! 1. **Parse** - raw text to the markdown event tree ([`Mdast`])
//! 2. **Pre-bridge transforms** - built-in and user stages over [`Mdast`]
//! 3. **Bridge** - [`Mdast`] to the HTML tree ([`Hast`]), retaining raw markup
//! 4. **Post-bridge transforms** - raw normalization, user stages, sanitizer
//! 5. **Stringify** - [`Hast`] to the final HTML string
//!
//! The same stage list backs both the blocking ([`Pipeline::run_sync`]) and
//! the non-blocking ([`Pipeline::run`]) render. Assembly from configuration
//! lives in [`builder`].

pub mod builder;
mod document;
mod error;
mod plugin;
pub mod stages;

use std::fmt;
use std::sync::Arc;

pub use builder::build;
pub use document::{Data, Document};
pub use error::{PipelineValidationError, RenderError};
pub use plugin::{Execution, Transformer};

use crate::hast::Hast;
use crate::mdast::Mdast;
use stages::{Bridge, Parse, Stringify};

/// Representation flowing between two stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr {
    /// Raw document text
    Source,
    /// Markdown event tree
    Mdast,
    /// HTML tree
    Hast,
    /// Final HTML string
    Html,
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repr::Source => write!(f, "source text"),
            Repr::Mdast => write!(f, "markdown tree"),
            Repr::Hast => write!(f, "HTML tree"),
            Repr::Html => write!(f, "HTML string"),
        }
    }
}

/// Position of a stage in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Parse,
    PreTransform,
    Bridge,
    PostTransform,
    Stringify,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Parse => write!(f, "parse"),
            Role::PreTransform => write!(f, "pre-bridge transform"),
            Role::Bridge => write!(f, "bridge"),
            Role::PostTransform => write!(f, "post-bridge transform"),
            Role::Stringify => write!(f, "stringify"),
        }
    }
}

/// One step of the pipeline.
///
/// The variant fixes the stage's role; transformer variants wrap user or
/// built-in implementations of [`Transformer`].
#[derive(Clone)]
pub enum Stage {
    Parse(Parse),
    Mdast(Arc<dyn Transformer<Mdast>>),
    Bridge(Bridge),
    Hast(Arc<dyn Transformer<Hast>>),
    Stringify(Stringify),
}

impl Stage {
    pub fn name(&self) -> &str {
        match self {
            Stage::Parse(_) => "parse",
            Stage::Mdast(t) => t.name(),
            Stage::Bridge(_) => "bridge",
            Stage::Hast(t) => t.name(),
            Stage::Stringify(s) => s.name(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Stage::Parse(_) => Role::Parse,
            Stage::Mdast(_) => Role::PreTransform,
            Stage::Bridge(_) => Role::Bridge,
            Stage::Hast(_) => Role::PostTransform,
            Stage::Stringify(_) => Role::Stringify,
        }
    }

    pub fn input(&self) -> Repr {
        match self {
            Stage::Parse(_) => Repr::Source,
            Stage::Mdast(_) | Stage::Bridge(_) => Repr::Mdast,
            Stage::Hast(_) | Stage::Stringify(_) => Repr::Hast,
        }
    }

    pub fn output(&self) -> Repr {
        match self {
            Stage::Parse(_) | Stage::Mdast(_) => Repr::Mdast,
            Stage::Bridge(_) | Stage::Hast(_) => Repr::Hast,
            Stage::Stringify(_) => Repr::Html,
        }
    }

    pub fn execution(&self) -> Execution {
        match self {
            Stage::Mdast(t) => t.execution(),
            Stage::Hast(t) => t.execution(),
            _ => Execution::Sync,
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name())
            .field("role", &self.role())
            .field("execution", &self.execution())
            .finish()
    }
}

/// Intermediate value threaded through a render.
enum Tree {
    Source,
    Mdast(Mdast),
    Hast(Hast),
    Html(String),
}

impl Tree {
    fn repr(&self) -> Repr {
        match self {
            Tree::Source => Repr::Source,
            Tree::Mdast(_) => Repr::Mdast,
            Tree::Hast(_) => Repr::Hast,
            Tree::Html(_) => Repr::Html,
        }
    }
}

/// A validated, immutable sequence of stages.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Create a pipeline, validating that the stages compose.
    ///
    /// The first stage must be the parse stage, the last a stringify stage,
    /// and each stage's input must match the previous stage's output. This
    /// pins exactly one bridge between the two transform groups.
    pub fn new(stages: Vec<Stage>) -> Result<Self, PipelineValidationError> {
        let (Some(first), Some(last)) = (stages.first(), stages.last()) else {
            return Err(PipelineValidationError::Empty);
        };
        if !matches!(first, Stage::Parse(_)) {
            return Err(PipelineValidationError::MissingParse(first.name().to_string()));
        }
        if !matches!(last, Stage::Stringify(_)) {
            return Err(PipelineValidationError::MissingStringify(
                last.name().to_string(),
            ));
        }

        for window in stages.windows(2) {
            let got = window[0].output();
            let expected = window[1].input();
            if got != expected {
                return Err(PipelineValidationError::Misplaced {
                    stage: window[1].name().to_string(),
                    expected,
                    got,
                });
            }
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Get the names of all stages in order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false for a validated pipeline.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The first async-only stage, if any.
    pub fn async_only_stage(&self) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|s| s.execution() == Execution::Async)
    }

    /// Render a document without suspending.
    ///
    /// Fails with [`RenderError::AsyncOnlyStage`] before running anything if
    /// the pipeline contains an async-only stage.
    pub fn run_sync(&self, mut doc: Document) -> Result<String, RenderError> {
        if let Some(stage) = self.async_only_stage() {
            return Err(RenderError::AsyncOnlyStage {
                stage: stage.name().to_string(),
            });
        }

        let mut tree = Tree::Source;
        for stage in &self.stages {
            tracing::trace!(stage = stage.name(), doc = %doc.label(), "running stage");
            tree = match (stage, tree) {
                (Stage::Mdast(t), Tree::Mdast(mut mdast)) => {
                    t.transform(&mut mdast, &mut doc)?;
                    Tree::Mdast(mdast)
                }
                (Stage::Hast(t), Tree::Hast(mut hast)) => {
                    t.transform(&mut hast, &mut doc)?;
                    Tree::Hast(hast)
                }
                (stage, tree) => advance(stage, tree, &doc)?,
            };
        }

        finish(tree)
    }

    /// Render a document, awaiting stages that are themselves asynchronous.
    pub async fn run(&self, mut doc: Document) -> Result<String, RenderError> {
        let mut tree = Tree::Source;
        for stage in &self.stages {
            tracing::trace!(stage = stage.name(), doc = %doc.label(), "running stage");
            tree = match (stage, tree) {
                (Stage::Mdast(t), Tree::Mdast(mut mdast)) => {
                    t.transform_async(&mut mdast, &mut doc).await?;
                    Tree::Mdast(mdast)
                }
                (Stage::Hast(t), Tree::Hast(mut hast)) => {
                    t.transform_async(&mut hast, &mut doc).await?;
                    Tree::Hast(hast)
                }
                (stage, tree) => advance(stage, tree, &doc)?,
            };
        }

        finish(tree)
    }
}

/// Run one of the fixed structural stages.
fn advance(stage: &Stage, tree: Tree, doc: &Document) -> Result<Tree, RenderError> {
    match (stage, tree) {
        (Stage::Parse(parse), Tree::Source) => Ok(Tree::Mdast(parse.run(&doc.value))),
        (Stage::Bridge(bridge), Tree::Mdast(mdast)) => Ok(Tree::Hast(bridge.run(mdast))),
        (Stage::Stringify(stringify), Tree::Hast(hast)) => {
            Ok(Tree::Html(stringify.run(&hast)))
        }
        (stage, tree) => Err(RenderError::UnexpectedInput {
            stage: stage.name().to_string(),
            expected: stage.input(),
            got: tree.repr(),
        }),
    }
}

fn finish(tree: Tree) -> Result<String, RenderError> {
    match tree {
        Tree::Html(html) => Ok(html),
        other => Err(RenderError::UnexpectedInput {
            stage: "output".to_string(),
            expected: Repr::Html,
            got: other.repr(),
        }),
    }
}
