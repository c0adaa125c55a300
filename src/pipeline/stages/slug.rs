//! Heading id stage.

use std::collections::HashSet;

use crate::hast::Hast;
use crate::pipeline::{Document, Transformer};

/// Stage that gives every heading without an id a unique slug id.
///
/// The sanitizer runs after post-bridge stages, so with sanitizing enabled
/// these ids are prefixed with `user-content-` like any other id.
#[derive(Debug, Clone, Copy, Default)]
pub struct Slug;

impl Transformer<Hast> for Slug {
    fn name(&self) -> &str {
        "slug"
    }

    fn transform(&self, tree: &mut Hast, _doc: &mut Document) -> anyhow::Result<()> {
        let mut used: HashSet<String> = HashSet::new();

        // Existing ids are reserved first so generated ones never collide.
        tree.visit_elements_mut(&mut |el| {
            if is_heading(&el.tag)
                && let Some(id) = el.attr("id")
            {
                used.insert(id.to_string());
            }
        });

        tree.visit_elements_mut(&mut |el| {
            if !is_heading(&el.tag) || el.attr("id").is_some() {
                return;
            }
            let base_id = slugify(&el.text_content());
            let mut id = base_id.clone();
            let mut suffix = 1;
            while used.contains(&id) {
                id = format!("{}-{}", base_id, suffix);
                suffix += 1;
            }
            used.insert(id.clone());
            el.set_attr("id", id);
        });

        Ok(())
    }
}

fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Convert a string to a slug suitable for use as an HTML id.
pub fn slugify(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .replace(' ', "-")
        .replace(|c: char| !c.is_alphanumeric() && c != '-' && c != '_', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hast::{Element, Node};

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("What's New?"), "whats-new");
        assert_eq!(slugify("API Reference"), "api-reference");
    }

    #[test]
    fn test_duplicate_headings_get_suffix() {
        let heading = |text: &str| -> Node {
            Element::new("h2")
                .with_children(vec![Node::text(text)])
                .into()
        };
        let mut tree = Hast::new(vec![heading("Setup"), heading("Setup"), heading("Other")]);
        Slug.transform(&mut tree, &mut Document::default()).unwrap();

        let ids: Vec<_> = tree
            .children
            .iter()
            .filter_map(|n| n.as_element().and_then(|el| el.attr("id")))
            .collect();
        assert_eq!(ids, vec!["setup", "setup-1", "other"]);
    }

    #[test]
    fn test_existing_ids_kept_and_reserved() {
        let mut tree = Hast::new(vec![
            Element::new("h1")
                .with_children(vec![Node::text("Intro")])
                .into(),
            Element::new("h1")
                .with_attr("id", "intro")
                .with_children(vec![Node::text("Custom")])
                .into(),
        ]);
        Slug.transform(&mut tree, &mut Document::default()).unwrap();
        assert_eq!(tree.children[0].as_element().unwrap().attr("id"), Some("intro-1"));
        assert_eq!(tree.children[1].as_element().unwrap().attr("id"), Some("intro"));
    }
}
