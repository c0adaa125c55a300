//! Pipeline error types.

use super::Repr;

/// Errors in pipeline composition, detected when the pipeline is built.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineValidationError {
    #[error("pipeline has no stages")]
    Empty,

    #[error("pipeline must start with the parse stage, found '{0}'")]
    MissingParse(String),

    #[error("pipeline must end with a stringify stage, found '{0}'")]
    MissingStringify(String),

    #[error("stage '{stage}' expects {expected} but would receive {got}")]
    Misplaced {
        stage: String,
        expected: Repr,
        got: Repr,
    },
}

/// Errors that abort the render of a single document.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// A synchronous render was requested against a pipeline containing an
    /// async-only stage. Raised before any stage runs.
    #[error("stage '{stage}' is async-only and cannot run in a synchronous render")]
    AsyncOnlyStage { stage: String },

    #[error("stage '{stage}' expects {expected} but received {got}")]
    UnexpectedInput {
        stage: String,
        expected: Repr,
        got: Repr,
    },

    /// A stage failed; the stage's own error is carried unmodified.
    #[error(transparent)]
    Stage(#[from] anyhow::Error),
}
