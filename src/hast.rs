//! HTML-oriented intermediate tree.
//!
//! Produced by the bridge stage and consumed by post-bridge transformers,
//! the sanitizer and the stringifier. `Raw` nodes carry embedded markup
//! retained verbatim from the source; they only become addressable elements
//! once the raw normalization stage reparses them.

/// Deepest element nesting a tree may have.
///
/// Tree walks recurse, so deeper markup is flattened into its ancestor
/// when the tree is built.
pub const MAX_DEPTH: usize = 512;

/// Root of an HTML-oriented tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hast {
    pub children: Vec<Node>,
}

/// A node in the HTML-oriented tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    /// Embedded markup kept verbatim.
    Raw(String),
}

/// An HTML element with ordered attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Elements that never have content or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements the bridge treats as block level when laying out newlines.
pub const BLOCK_ELEMENTS: &[&str] = &[
    "blockquote",
    "dd",
    "div",
    "dl",
    "dt",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "li",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tbody",
    "td",
    "th",
    "thead",
    "tr",
    "ul",
];

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Append a class name to the `class` attribute.
    pub fn add_class(&mut self, class: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == "class") {
            Some((_, existing)) if existing.split_whitespace().any(|c| c == class) => {}
            Some((_, existing)) if existing.is_empty() => *existing = class.to_string(),
            Some((_, existing)) => {
                existing.push(' ');
                existing.push_str(class);
            }
            None => self.attrs.push(("class".to_string(), class.to_string())),
        }
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }

    pub fn is_block(&self) -> bool {
        BLOCK_ELEMENTS.contains(&self.tag.as_str())
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Node::Element(el) if el.is_block())
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl Hast {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Returns true if any node in the tree is retained raw markup.
    pub fn contains_raw(&self) -> bool {
        fn walk(nodes: &[Node]) -> bool {
            nodes.iter().any(|node| match node {
                Node::Raw(_) => true,
                Node::Element(el) => walk(&el.children),
                _ => false,
            })
        }
        walk(&self.children)
    }

    /// Visit every element depth-first, parents before children.
    pub fn visit_elements_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        fn walk(nodes: &mut [Node], f: &mut dyn FnMut(&mut Element)) {
            for node in nodes {
                if let Node::Element(el) = node {
                    f(el);
                    walk(&mut el.children, f);
                }
            }
        }
        walk(&mut self.children, f);
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) => collect_text(&el.children, out),
            _ => {}
        }
    }
}
