//! Document passed through a render.

use std::path::PathBuf;

use serde_json::{Map, Value};

/// Metadata attached to a document (front matter, page data).
pub type Data = Map<String, Value>;

/// A document being rendered.
///
/// Created per render call and owned by the caller for its duration; the
/// pipeline never retains it. Stages may read and annotate `data` (for
/// example to record extracted headings), but the raw `value` is only
/// consumed by the parse stage.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Raw markup text.
    pub value: String,

    /// Metadata context (the page data when rendered by a host).
    pub data: Data,

    /// Source path, if the document came from a file.
    pub path: Option<PathBuf>,
}

impl Document {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            data: Data::new(),
            path: None,
        }
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Human-readable label for log messages.
    pub fn label(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<inline>".to_string())
    }
}
