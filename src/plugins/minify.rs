//! CSS minification plugin.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use serde_json::Value;

use crate::config::ConfigError;
use crate::site::{Page, ProcessError, Site};

use super::Plugin;

#[derive(thiserror::Error, Debug)]
pub enum MinifyError {
    #[error("failed to parse stylesheet: {0}")]
    Parse(String),

    #[error("failed to minify stylesheet: {0}")]
    Minify(String),

    #[error("failed to print stylesheet: {0}")]
    Print(String),
}

/// Loads stylesheets as assets and minifies them.
#[derive(Debug, Clone)]
pub struct Minify {
    extensions: Vec<String>,
}

impl Minify {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }
}

impl Default for Minify {
    fn default() -> Self {
        Self::new(vec![".css".to_string()])
    }
}

impl Plugin for Minify {
    fn name(&self) -> &str {
        "minify"
    }

    fn install(&self, site: &mut dyn Site) -> Result<(), ConfigError> {
        site.load_assets(&self.extensions);
        site.process(&self.extensions, minify_page);
        Ok(())
    }
}

/// Minify a page whose content is a string; other pages are left alone.
fn minify_page(page: &mut Page) -> Result<(), ProcessError> {
    let Some(css) = page.data.get("content").and_then(Value::as_str) else {
        return Ok(());
    };
    let minified = minify_css(css)?;
    page.set_content(minified);
    Ok(())
}

pub fn minify_css(css: &str) -> Result<String, MinifyError> {
    let mut sheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| MinifyError::Parse(e.to_string()))?;
    sheet
        .minify(MinifyOptions::default())
        .map_err(|e| MinifyError::Minify(e.to_string()))?;
    let output = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| MinifyError::Print(e.to_string()))?;
    Ok(output.code)
}
