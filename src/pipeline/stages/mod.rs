//! Built-in pipeline stages.
//!
//! The fixed structural stages are:
//!
//! 1. **Parse** - pulldown-cmark parsing into the markdown tree
//! 2. **Bridge** - markdown tree to HTML tree, retaining raw markup
//! 3. **Stringify** - HTML tree to string, permissive or strict
//!
//! The sanitize branch adds **RawStage** (lift raw markup into nodes) and
//! **Sanitize** (allow-list filtering). Everything else here is a named
//! transformer that configuration can reference by name.

mod bridge;
mod external_links;
mod gfm;
mod highlight;
mod parse;
mod raw;
mod sanitize;
mod slug;
mod stringify;

use std::sync::Arc;

use pulldown_cmark::Options;
use serde::de::DeserializeOwned;

pub use bridge::{Bridge, CLOBBER_PREFIX};
pub use external_links::{ExternalLinks, ExternalLinksOptions};
pub use gfm::{Gfm, SyntaxExtension};
pub use highlight::Highlight;
pub use parse::Parse;
pub use raw::{RawStage, parse_html_fragment};
pub use sanitize::{AttributeRule, Sanitize, Schema};
pub use slug::{Slug, slugify};
pub use stringify::{Stringify, to_html};

use crate::hast::Hast;
use crate::mdast::Mdast;

use super::Transformer;

/// A transformer resolved from a stage name.
#[derive(Clone)]
pub enum NamedStage {
    Mdast(Arc<dyn Transformer<Mdast>>),
    Hast(Arc<dyn Transformer<Hast>>),
}

/// Names of all stages that can be referenced from configuration.
pub const STAGE_NAMES: &[&str] = &[
    "gfm",
    "tables",
    "strikethrough",
    "tasklists",
    "footnotes",
    "definition-lists",
    "heading-attributes",
    "smart-punctuation",
    "math",
    "slug",
    "external-links",
    "highlight",
];

/// Look up a built-in stage by name.
///
/// Returns `Ok(None)` for unknown names, and an error if the options do not
/// fit the stage.
pub fn named(
    name: &str,
    options: &serde_json::Value,
) -> Result<Option<NamedStage>, serde_json::Error> {
    let extension = |name: &'static str, options: Options| {
        NamedStage::Mdast(Arc::new(SyntaxExtension::new(name, options)))
    };

    let stage = match name {
        "gfm" => NamedStage::Mdast(Arc::new(Gfm)),
        "tables" => extension("tables", Options::ENABLE_TABLES),
        "strikethrough" => extension("strikethrough", Options::ENABLE_STRIKETHROUGH),
        "tasklists" => extension("tasklists", Options::ENABLE_TASKLISTS),
        "footnotes" => extension("footnotes", Options::ENABLE_FOOTNOTES),
        "definition-lists" => extension("definition-lists", Options::ENABLE_DEFINITION_LIST),
        "heading-attributes" => {
            extension("heading-attributes", Options::ENABLE_HEADING_ATTRIBUTES)
        }
        "smart-punctuation" => {
            extension("smart-punctuation", Options::ENABLE_SMART_PUNCTUATION)
        }
        "math" => extension("math", Options::ENABLE_MATH),
        "slug" => NamedStage::Hast(Arc::new(Slug)),
        "external-links" => {
            NamedStage::Hast(Arc::new(ExternalLinks::new(stage_options(options)?)))
        }
        "highlight" => NamedStage::Hast(Arc::new(Highlight)),
        _ => return Ok(None),
    };
    Ok(Some(stage))
}

/// Deserialize stage options, treating `null` as "all defaults".
fn stage_options<T: DeserializeOwned + Default>(
    options: &serde_json::Value,
) -> Result<T, serde_json::Error> {
    if options.is_null() {
        Ok(T::default())
    } else {
        serde_json::from_value(options.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_names_resolve() {
        for name in STAGE_NAMES {
            let stage = named(name, &serde_json::Value::Null).unwrap();
            assert!(stage.is_some(), "stage '{}' should resolve", name);
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(named("nope", &serde_json::Value::Null).unwrap().is_none());
    }

    #[test]
    fn test_bad_options_rejected() {
        let options = serde_json::json!({ "bogus": true });
        assert!(named("external-links", &options).is_err());
    }

    #[test]
    fn test_roles() {
        assert!(matches!(
            named("gfm", &serde_json::Value::Null).unwrap(),
            Some(NamedStage::Mdast(_))
        ));
        assert!(matches!(
            named("slug", &serde_json::Value::Null).unwrap(),
            Some(NamedStage::Hast(_))
        ));
    }
}
