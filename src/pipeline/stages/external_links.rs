//! External link attributes stage.

use serde::Deserialize;

use crate::hast::Hast;
use crate::pipeline::{Document, Transformer};

/// Options for [`ExternalLinks`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ExternalLinksOptions {
    /// Value for the `target` attribute; omitted when unset.
    pub target: Option<String>,
    /// Value for the `rel` attribute.
    pub rel: String,
}

impl Default for ExternalLinksOptions {
    fn default() -> Self {
        Self {
            target: None,
            rel: "nofollow".to_string(),
        }
    }
}

/// Stage that marks links to absolute http(s) URLs as external.
#[derive(Debug, Clone, Default)]
pub struct ExternalLinks {
    options: ExternalLinksOptions,
}

impl ExternalLinks {
    pub fn new(options: ExternalLinksOptions) -> Self {
        Self { options }
    }
}

impl Transformer<Hast> for ExternalLinks {
    fn name(&self) -> &str {
        "external-links"
    }

    fn transform(&self, tree: &mut Hast, _doc: &mut Document) -> anyhow::Result<()> {
        tree.visit_elements_mut(&mut |el| {
            let external = el.tag == "a"
                && el
                    .attr("href")
                    .is_some_and(|href| href.starts_with("http://") || href.starts_with("https://"));
            if !external {
                return;
            }
            if let Some(target) = &self.options.target {
                el.set_attr("target", target.as_str());
            }
            if !self.options.rel.is_empty() {
                el.set_attr("rel", self.options.rel.as_str());
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hast::{Element, Node};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_only_absolute_links_marked() {
        let mut tree = Hast::new(vec![
            Element::new("a").with_attr("href", "https://example.com").into(),
            Element::new("a").with_attr("href", "/local").into(),
        ]);
        let stage = ExternalLinks::new(ExternalLinksOptions {
            target: Some("_blank".into()),
            rel: "noopener".into(),
        });
        stage.transform(&mut tree, &mut Document::default()).unwrap();

        let external = tree.children[0].as_element().unwrap();
        assert_eq!(external.attr("target"), Some("_blank"));
        assert_eq!(external.attr("rel"), Some("noopener"));
        assert_eq!(tree.children[1], Node::Element(Element::new("a").with_attr("href", "/local")));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ExternalLinksOptions =
            serde_json::from_value(serde_json::json!({ "target": "_blank" })).unwrap();
        assert_eq!(options.target.as_deref(), Some("_blank"));
        assert_eq!(options.rel, "nofollow");
    }
}
