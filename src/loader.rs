//! Text loader: reads a page file into page data.
//!
//! Leading `---` YAML front matter becomes top-level data keys; the rest of
//! the file is stored under `content`.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::pipeline::Data;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load a text file with optional front matter.
pub fn text(path: &Path) -> Result<Data, LoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_front_matter(&raw, path))
}

/// Split front matter from `content`.
///
/// Malformed front matter is logged and ignored; the body is still returned.
/// A `content` key in the front matter is overwritten by the body.
pub fn parse_front_matter(content: &str, path: &Path) -> Data {
    // Leading whitespace only matters for finding the opening delimiter;
    // without front matter the body is kept as written.
    let (yaml, body) = match split_front_matter(content.trim_start()) {
        Some(parts) => parts,
        None => ("", content),
    };

    let mut data = if yaml.trim().is_empty() {
        Data::new()
    } else {
        match serde_yaml::from_str::<Data>(yaml) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to parse front matter: {}", e);
                Data::new()
            }
        }
    };

    data.insert("content".to_string(), Value::String(body.to_string()));
    data
}

/// Returns `(yaml, body)` if `content` opens with a closed `---` block.
fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let after_opening = content.strip_prefix("---")?;
    let closing_pos = after_opening.find("\n---")?;

    let yaml = after_opening[..closing_pos].trim_start_matches('\n');
    // Skip "\n---" and the rest of the delimiter line
    let rest = &after_opening[closing_pos + 4..];
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => "",
    };
    Some((yaml, body.trim_start_matches('\n')))
}
