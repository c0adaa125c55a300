//! HTML tree serialization stage.

use crate::hast::{Element, Hast, Node};

/// Attributes serialized without a value when their value is empty.
const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "async",
    "autofocus",
    "checked",
    "compact",
    "controls",
    "data-footnote-backref",
    "data-footnote-ref",
    "data-footnotes",
    "default",
    "defer",
    "disabled",
    "hidden",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "nohref",
    "noshade",
    "nowrap",
    "open",
    "readonly",
    "required",
    "reversed",
    "selected",
];

/// Elements whose text content is emitted without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Stage that serializes the HTML tree into the final string.
///
/// The permissive variant re-emits retained raw markup verbatim. The strict
/// variant, used when sanitizing, silently drops any raw node that is still
/// in the tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stringify {
    allow_dangerous_html: bool,
}

impl Stringify {
    pub fn permissive() -> Self {
        Self {
            allow_dangerous_html: true,
        }
    }

    pub fn strict() -> Self {
        Self {
            allow_dangerous_html: false,
        }
    }

    pub fn name(&self) -> &'static str {
        "stringify"
    }

    pub fn allows_dangerous_html(&self) -> bool {
        self.allow_dangerous_html
    }

    pub fn run(&self, tree: &Hast) -> String {
        to_html(tree, self.allow_dangerous_html)
    }
}

/// Serialize a tree to HTML.
pub fn to_html(tree: &Hast, allow_dangerous_html: bool) -> String {
    let mut out = String::new();
    write_nodes(&mut out, &tree.children, allow_dangerous_html, false);
    out
}

fn write_nodes(out: &mut String, nodes: &[Node], allow_raw: bool, raw_text: bool) {
    for node in nodes {
        match node {
            Node::Element(el) => write_element(out, el, allow_raw),
            Node::Text(text) if raw_text => out.push_str(text),
            Node::Text(text) => escape_text(out, text),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::Raw(raw) if allow_raw => out.push_str(raw),
            Node::Raw(_) => {}
        }
    }
}

fn write_element(out: &mut String, el: &Element, allow_raw: bool) {
    out.push('<');
    out.push_str(&el.tag);
    for (name, value) in &el.attrs {
        out.push(' ');
        out.push_str(name);
        if value.is_empty() && BOOLEAN_ATTRIBUTES.contains(&name.as_str()) {
            continue;
        }
        out.push_str("=\"");
        escape_attr(out, value);
        out.push('"');
    }
    out.push('>');

    if el.is_void() {
        return;
    }

    let raw_text = RAW_TEXT_ELEMENTS.contains(&el.tag.as_str());
    write_nodes(out, &el.children, allow_raw, raw_text);
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Hast {
        Hast::new(vec![
            Element::new("p")
                .with_children(vec![
                    Node::text("a < b & "),
                    Node::Raw("<b>bold</b>".into()),
                ])
                .into(),
        ])
    }

    #[test]
    fn test_permissive_keeps_raw() {
        assert_eq!(
            Stringify::permissive().run(&sample()),
            "<p>a &lt; b &amp; <b>bold</b></p>"
        );
    }

    #[test]
    fn test_strict_drops_raw() {
        assert_eq!(Stringify::strict().run(&sample()), "<p>a &lt; b &amp; </p>");
    }

    #[test]
    fn test_void_and_boolean_attributes() {
        let tree = Hast::new(vec![
            Element::new("input")
                .with_attr("type", "checkbox")
                .with_attr("disabled", "")
                .into(),
            Element::new("img")
                .with_attr("src", "x.png")
                .with_attr("alt", "")
                .into(),
        ]);
        assert_eq!(
            Stringify::strict().run(&tree),
            "<input type=\"checkbox\" disabled><img src=\"x.png\" alt=\"\">"
        );
    }

    #[test]
    fn test_attribute_escaping() {
        let tree = Hast::new(vec![
            Element::new("a")
                .with_attr("title", "say \"hi\" & bye")
                .into(),
        ]);
        assert_eq!(
            Stringify::strict().run(&tree),
            "<a title=\"say &quot;hi&quot; &amp; bye\"></a>"
        );
    }

    #[test]
    fn test_script_text_not_escaped() {
        let tree = Hast::new(vec![
            Element::new("script")
                .with_children(vec![Node::text("if (a < b) {}")])
                .into(),
        ]);
        assert_eq!(
            Stringify::permissive().run(&tree),
            "<script>if (a < b) {}</script>"
        );
    }
}
