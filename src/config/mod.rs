//! Configuration loading, types and resolution.
//!
//! This module handles all aspects of configuration:
//! - Type definitions for options and stage descriptors (`types`)
//! - Merging caller overrides over defaults (`resolve`)
//! - Loading `markflow.yaml` and `MARKFLOW_*` variables (`load`)

mod load;
mod resolve;
mod types;

use std::path::PathBuf;

use crate::pipeline::{PipelineValidationError, Role};

// Re-export all types for convenient access
pub use load::{CONFIG_FILE, FileConfig};
pub use resolve::resolve;
pub use types::{Options, ReadingTimeOptions, StageSpec, UserOptions};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to deserialize config: {0}")]
    Deserialize(#[from] config::ConfigError),

    #[error("failed to encode config file path as a unicode string: {}", .0.display())]
    EncodePath(PathBuf),

    #[error("failed to get current working directory: {0}")]
    CwdFailure(std::io::Error),

    #[error("unknown stage '{0}'")]
    UnknownStage(String),

    #[error("stage '{stage}' is a {role} and cannot be listed in {list}")]
    MisplacedStage {
        stage: String,
        role: Role,
        list: &'static str,
    },

    #[error("invalid options for stage '{stage}': {source}")]
    StageOptions {
        stage: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid pipeline: {0}")]
    Validation(#[from] PipelineValidationError),
}
