//! Configuration type definitions.
//!
//! These types are pure data - no I/O and no pipeline assembly. Keys accept
//! both the snake_case spelling and the camelCase spelling used by host
//! configuration objects.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::hast::Hast;
use crate::mdast::Mdast;
use crate::pipeline::Transformer;

// =============================================================================
// Stage descriptors
// =============================================================================

/// A stage descriptor from configuration.
///
/// YAML formats:
/// ```yaml
/// pre_stages:
///   # Bare name
///   - math
///   # Name with options
///   - name: external-links
///     options:
///       target: _blank
/// ```
///
/// Programmatic callers may also hand over a transformer directly.
#[derive(Clone, Deserialize)]
#[serde(from = "RawStageSpec")]
pub enum StageSpec {
    /// A built-in stage referenced by name.
    Named {
        name: String,
        options: serde_json::Value,
    },
    /// A pre-bridge transformer supplied in code.
    Mdast(Arc<dyn Transformer<Mdast>>),
    /// A post-bridge transformer supplied in code.
    Hast(Arc<dyn Transformer<Hast>>),
}

impl StageSpec {
    /// A named stage without options.
    pub fn named(name: impl Into<String>) -> Self {
        StageSpec::Named {
            name: name.into(),
            options: serde_json::Value::Null,
        }
    }

    /// A named stage with options.
    pub fn with_options(name: impl Into<String>, options: serde_json::Value) -> Self {
        StageSpec::Named {
            name: name.into(),
            options,
        }
    }

    pub fn mdast(transformer: impl Transformer<Mdast> + 'static) -> Self {
        StageSpec::Mdast(Arc::new(transformer))
    }

    pub fn hast(transformer: impl Transformer<Hast> + 'static) -> Self {
        StageSpec::Hast(Arc::new(transformer))
    }

    pub fn name(&self) -> &str {
        match self {
            StageSpec::Named { name, .. } => name,
            StageSpec::Mdast(t) => t.name(),
            StageSpec::Hast(t) => t.name(),
        }
    }
}

impl fmt::Debug for StageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageSpec::Named { name, options } => f
                .debug_struct("Named")
                .field("name", name)
                .field("options", options)
                .finish(),
            StageSpec::Mdast(t) => f.debug_tuple("Mdast").field(&t.name()).finish(),
            StageSpec::Hast(t) => f.debug_tuple("Hast").field(&t.name()).finish(),
        }
    }
}

/// Serialized forms of a stage descriptor.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawStageSpec {
    Name(String),
    Configured {
        name: String,
        #[serde(default)]
        options: serde_json::Value,
    },
}

impl From<RawStageSpec> for StageSpec {
    fn from(raw: RawStageSpec) -> Self {
        match raw {
            RawStageSpec::Name(name) => StageSpec::named(name),
            RawStageSpec::Configured { name, options } => StageSpec::Named { name, options },
        }
    }
}

// =============================================================================
// Markdown pipeline options
// =============================================================================

/// Fully resolved markdown pipeline configuration.
#[derive(Debug, Clone)]
pub struct Options {
    /// File suffixes the markdown loader claims.
    pub source_extensions: Vec<String>,

    /// User stages run after the built-in pre-stages and before the bridge.
    pub pre_stages: Vec<StageSpec>,

    /// User stages run after the bridge.
    pub post_stages: Vec<StageSpec>,

    /// Normalize, sanitize and stringify strictly.
    pub sanitize: bool,

    /// Skip the built-in pre-stages entirely.
    pub override_defaults: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            source_extensions: vec![".md".to_string()],
            pre_stages: Vec::new(),
            post_stages: Vec::new(),
            sanitize: false,
            override_defaults: false,
        }
    }
}

/// Caller-supplied overrides; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserOptions {
    #[serde(alias = "sourceExtensions", alias = "extensions")]
    pub source_extensions: Option<Vec<String>>,

    #[serde(alias = "preStages")]
    pub pre_stages: Option<Vec<StageSpec>>,

    #[serde(alias = "postStages")]
    pub post_stages: Option<Vec<StageSpec>>,

    pub sanitize: Option<bool>,

    #[serde(alias = "overrideDefaults")]
    pub override_defaults: Option<bool>,
}

// =============================================================================
// Reading time options
// =============================================================================

/// Reading time plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadingTimeOptions {
    /// Words read per minute.
    pub wpm: u32,

    /// Filter name.
    pub name: String,

    /// Output template; `{minutes}` is replaced by the estimate. Without a
    /// template the filter returns the bare number.
    pub format: Option<String>,
}

impl Default for ReadingTimeOptions {
    fn default() -> Self {
        Self {
            wpm: 250,
            name: "readingTime".to_string(),
            format: None,
        }
    }
}
