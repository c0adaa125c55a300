//! Raw markup normalization stage.
//!
//! The bridge keeps embedded HTML as opaque [`Node::Raw`] strings. This stage
//! reparses them with html5ever so that embedded markup becomes ordinary
//! elements a sanitizer can inspect. Each run of raw markup is parsed in the
//! context of the element that contains it, and unbalanced fragments are
//! repaired the way a browser would repair them.

use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, ParseOpts, QualName, local_name, namespace_url, ns, parse_fragment};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::hast::{Element, Hast, MAX_DEPTH, Node};
use crate::pipeline::{Document, Transformer};

use super::stringify::to_html;

/// Stage that lifts retained raw markup into tree nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawStage;

impl Transformer<Hast> for RawStage {
    fn name(&self) -> &str {
        "raw"
    }

    fn transform(&self, tree: &mut Hast, _doc: &mut Document) -> anyhow::Result<()> {
        if tree.contains_raw() {
            normalize(&mut tree.children, "body", 0);
        }
        Ok(())
    }
}

/// Reparse the raw markup among `children`, whose parent is `context`.
fn normalize(children: &mut Vec<Node>, context: &str, depth: usize) {
    for node in children.iter_mut() {
        if let Node::Element(el) = node {
            normalize(&mut el.children, &el.tag, depth + 1);
        }
    }

    // Everything from the first raw node to the last is reparsed as one run
    // so that tags split across siblings pair up again.
    let is_raw = |node: &Node| matches!(node, Node::Raw(_));
    let (Some(first), Some(last)) = (
        children.iter().position(is_raw),
        children.iter().rposition(is_raw),
    ) else {
        return;
    };

    let rest = children.split_off(last + 1);
    let run = Hast::new(children.split_off(first));
    let html = to_html(&run, true);
    children.extend(parse_in_context(
        &html,
        context,
        MAX_DEPTH.saturating_sub(depth),
    ));
    children.extend(rest);
}

/// Parse an HTML fragment (in a `<body>` context) into tree nodes.
pub fn parse_html_fragment(html: &str) -> Vec<Node> {
    parse_in_context(html, "body", MAX_DEPTH)
}

/// Parse `html` as the content of a `context` element, keeping at most
/// `budget` levels of element nesting.
fn parse_in_context(html: &str, context: &str, budget: usize) -> Vec<Node> {
    let dom = parse_fragment(
        RcDom::default(),
        ParseOpts::default(),
        QualName::new(None, ns!(html), LocalName::from(context)),
        vec![],
    )
    .one(html);

    // Fragment parsing places the result under a synthetic <html> element.
    let document = dom.document.children.borrow();
    match document.first() {
        Some(root) => convert_children(root, budget),
        None => Vec::new(),
    }
}

fn convert_children(handle: &Handle, budget: usize) -> Vec<Node> {
    handle
        .children
        .borrow()
        .iter()
        .filter_map(|child| convert(child, budget))
        .collect()
}

fn convert(handle: &Handle, budget: usize) -> Option<Node> {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            if budget == 0 {
                return Some(Node::Text(flatten_text(handle)));
            }
            let attrs: Vec<(String, String)> = attrs
                .borrow()
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect();
            let children = convert_children(handle, budget - 1);
            // Stray closing tags make the parser invent empty paragraphs.
            if name.local == local_name!("p") && attrs.is_empty() && children.is_empty() {
                return None;
            }
            Some(Node::Element(Element {
                tag: name.local.to_string(),
                attrs,
                children,
            }))
        }
        NodeData::Text { contents } => Some(Node::Text(contents.borrow().to_string())),
        NodeData::Comment { contents } => Some(Node::Comment(contents.to_string())),
        _ => None,
    }
}

/// Text of every descendant, gathered without recursion.
fn flatten_text(handle: &Handle) -> String {
    let mut out = String::new();
    let mut stack = vec![handle.clone()];
    while let Some(node) = stack.pop() {
        if let NodeData::Text { contents } = &node.data {
            out.push_str(&contents.borrow());
        }
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stages::Stringify;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_fragment_elements() {
        let nodes = parse_html_fragment("<p class=\"x\">hi <b>there</b></p>");
        assert_eq!(
            nodes,
            vec![Node::Element(
                Element::new("p")
                    .with_attr("class", "x")
                    .with_children(vec![
                        Node::text("hi "),
                        Element::new("b")
                            .with_children(vec![Node::text("there")])
                            .into(),
                    ])
            )]
        );
    }

    #[test]
    fn test_split_raw_tags_are_joined() {
        let mut tree = Hast::new(vec![
            Element::new("p")
                .with_children(vec![
                    Node::text("Text "),
                    Node::Raw("<script>".into()),
                    Node::text("evil()"),
                    Node::Raw("</script>".into()),
                ])
                .into(),
        ]);
        RawStage
            .transform(&mut tree, &mut Document::default())
            .unwrap();

        assert!(!tree.contains_raw());
        let p = tree.children[0].as_element().unwrap();
        let script = p.children[1].as_element().unwrap();
        assert_eq!(script.tag, "script");
        assert_eq!(script.text_content(), "evil()");
    }

    #[test]
    fn test_raw_block_stays_inside_its_paragraph() {
        let mut tree = Hast::new(vec![
            Element::new("p")
                .with_children(vec![
                    Node::text("Text "),
                    Node::Raw("<div>".into()),
                    Node::text("x"),
                    Node::Raw("</div>".into()),
                    Node::text(" tail"),
                ])
                .into(),
        ]);
        RawStage
            .transform(&mut tree, &mut Document::default())
            .unwrap();
        assert_eq!(
            Stringify::strict().run(&tree),
            "<p>Text <div>x</div> tail</p>"
        );
    }

    #[test]
    fn test_stray_closing_tag_adds_nothing() {
        let mut tree = Hast::new(vec![
            Element::new("p")
                .with_children(vec![
                    Node::text("a"),
                    Node::Raw("</p>".into()),
                    Node::text("b"),
                ])
                .into(),
        ]);
        RawStage
            .transform(&mut tree, &mut Document::default())
            .unwrap();
        assert_eq!(Stringify::strict().run(&tree), "<p>ab</p>");
    }

    #[test]
    fn test_deep_markup_is_flattened() {
        let nodes = parse_html_fragment(&format!("{}x", "<span>".repeat(2 * MAX_DEPTH)));

        let mut depth = 0;
        let mut nodes = &nodes;
        while let Some(el) = nodes.iter().find_map(Node::as_element) {
            depth += 1;
            nodes = &el.children;
        }
        assert_eq!(depth, MAX_DEPTH);
        assert_eq!(nodes, &vec![Node::text("x")]);
    }

    #[test]
    fn test_tree_without_raw_is_untouched() {
        let original = Hast::new(vec![
            Element::new("p")
                .with_children(vec![Node::text("a < b")])
                .into(),
        ]);
        let mut tree = original.clone();
        RawStage
            .transform(&mut tree, &mut Document::default())
            .unwrap();
        assert_eq!(tree, original);
    }

    #[test]
    fn test_comments_survive_reparse() {
        let mut tree = Hast::new(vec![Node::Raw("<!-- note -->".into())]);
        RawStage
            .transform(&mut tree, &mut Document::default())
            .unwrap();
        assert_eq!(Stringify::permissive().run(&tree), "<!-- note -->");
    }
}
