//! HTML sanitization stage.
//!
//! Walks the HTML tree and keeps only what an allow-list [`Schema`] permits.
//! Disallowed elements are unwrapped (their children are kept), elements in
//! the schema's strip list are removed together with their content, and
//! comments and raw nodes are always dropped. The default schema follows
//! GitHub's comment rendering rules.

use std::collections::{HashMap, HashSet};

use crate::hast::{Element, Hast, Node};
use crate::pipeline::{Document, Transformer};

use super::bridge::CLOBBER_PREFIX;

/// Allow-list describing which elements and attributes survive sanitization.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Elements that are kept.
    pub tag_names: HashSet<String>,
    /// Elements removed together with their content.
    pub strip: HashSet<String>,
    /// Attributes allowed on every element.
    pub global_attributes: HashSet<String>,
    /// Additional attributes allowed per element.
    pub attributes: HashMap<String, Vec<AttributeRule>>,
    /// Allowed URL schemes per attribute. Relative URLs are always allowed.
    pub protocols: HashMap<String, Vec<String>>,
    /// Attributes whose values are prefixed to avoid DOM clobbering.
    pub clobber: HashSet<String>,
    pub clobber_prefix: String,
}

/// A per-element attribute permission.
#[derive(Debug, Clone)]
pub enum AttributeRule {
    /// Any value is allowed.
    Any(String),
    /// Only the listed values are allowed.
    Values(String, Vec<String>),
    /// Class attribute values matching a prefix are kept; the rest dropped.
    ClassPrefix(String),
}

impl AttributeRule {
    fn name(&self) -> &str {
        match self {
            AttributeRule::Any(name) | AttributeRule::Values(name, _) => name,
            AttributeRule::ClassPrefix(_) => "class",
        }
    }
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn values(name: &str, allowed: &[&str]) -> AttributeRule {
    AttributeRule::Values(
        name.to_string(),
        allowed.iter().map(|s| s.to_string()).collect(),
    )
}

fn any(name: &str) -> AttributeRule {
    AttributeRule::Any(name.to_string())
}

impl Schema {
    /// The GitHub-flavored default schema.
    pub fn github() -> Self {
        let tag_names = set(&[
            "h1", "h2", "h3", "h4", "h5", "h6", "br", "b", "i", "strong", "em", "a", "pre", "code",
            "img", "tt", "div", "ins", "del", "sup", "sub", "p", "ol", "ul", "table", "thead",
            "tbody", "tfoot", "blockquote", "dl", "dt", "dd", "kbd", "q", "samp", "var", "hr",
            "ruby", "rt", "rp", "li", "tr", "td", "th", "s", "strike", "summary", "details",
            "caption", "figure", "figcaption", "abbr", "bdo", "cite", "dfn", "mark", "small",
            "span", "time", "wbr", "input", "section",
        ]);

        let global_attributes = set(&[
            "abbr",
            "accept",
            "accept-charset",
            "accesskey",
            "action",
            "align",
            "alt",
            "aria-describedby",
            "aria-hidden",
            "aria-label",
            "aria-labelledby",
            "axis",
            "border",
            "cellpadding",
            "cellspacing",
            "char",
            "charoff",
            "charset",
            "checked",
            "clear",
            "color",
            "cols",
            "colspan",
            "compact",
            "coords",
            "datetime",
            "dir",
            "disabled",
            "enctype",
            "for",
            "frame",
            "headers",
            "height",
            "hreflang",
            "hspace",
            "id",
            "ismap",
            "itemprop",
            "label",
            "lang",
            "maxlength",
            "media",
            "method",
            "multiple",
            "name",
            "nohref",
            "noshade",
            "nowrap",
            "open",
            "prompt",
            "readonly",
            "rel",
            "rev",
            "rows",
            "rowspan",
            "rules",
            "scope",
            "selected",
            "shape",
            "size",
            "span",
            "start",
            "summary",
            "tabindex",
            "target",
            "title",
            "usemap",
            "valign",
            "value",
            "vspace",
            "width",
        ]);

        let mut attributes: HashMap<String, Vec<AttributeRule>> = HashMap::new();
        attributes.insert(
            "a".into(),
            vec![
                any("href"),
                any("data-footnote-backref"),
                any("data-footnote-ref"),
                values("class", &["data-footnote-backref"]),
            ],
        );
        attributes.insert("blockquote".into(), vec![any("cite")]);
        attributes.insert("code".into(), vec![AttributeRule::ClassPrefix("language-".into())]);
        attributes.insert("del".into(), vec![any("cite")]);
        attributes.insert("div".into(), vec![any("itemscope"), any("itemtype")]);
        attributes.insert("h2".into(), vec![values("class", &["sr-only"])]);
        attributes.insert("img".into(), vec![any("src"), any("longdesc")]);
        attributes.insert("input".into(), vec![values("type", &["checkbox"])]);
        attributes.insert("ins".into(), vec![any("cite")]);
        attributes.insert("li".into(), vec![values("class", &["task-list-item"])]);
        attributes.insert("ol".into(), vec![values("class", &["contains-task-list"])]);
        attributes.insert("q".into(), vec![any("cite")]);
        attributes.insert(
            "section".into(),
            vec![any("data-footnotes"), values("class", &["footnotes"])],
        );
        attributes.insert("ul".into(), vec![values("class", &["contains-task-list"])]);

        let mut protocols = HashMap::new();
        protocols.insert("href".into(), vec!["http".into(), "https".into(), "mailto".into()]);
        protocols.insert("cite".into(), vec!["http".into(), "https".into()]);
        protocols.insert("src".into(), vec!["http".into(), "https".into()]);
        protocols.insert("longdesc".into(), vec!["http".into(), "https".into()]);

        Self {
            tag_names,
            strip: set(&["script"]),
            global_attributes,
            attributes,
            protocols,
            clobber: set(&["aria-describedby", "aria-labelledby", "id", "name"]),
            clobber_prefix: CLOBBER_PREFIX.to_string(),
        }
    }

    /// Filter an element's attributes in place.
    fn clean_attributes(&self, el: &mut Element) {
        let rules = self.attributes.get(&el.tag);
        let attrs = std::mem::take(&mut el.attrs);
        for (name, value) in attrs {
            let name = name.to_ascii_lowercase();
            let rule = rules.and_then(|rules| rules.iter().find(|r| r.name() == name));

            let value = match rule {
                Some(AttributeRule::Any(_)) => Some(value),
                Some(AttributeRule::Values(_, allowed)) => allowed
                    .iter()
                    .any(|v| v.eq_ignore_ascii_case(&value))
                    .then_some(value),
                Some(AttributeRule::ClassPrefix(prefix)) => {
                    let kept: Vec<&str> = value
                        .split_whitespace()
                        .filter(|class| class.starts_with(prefix.as_str()))
                        .collect();
                    (!kept.is_empty()).then(|| kept.join(" "))
                }
                None if self.global_attributes.contains(&name) => Some(value),
                None => None,
            };
            let Some(mut value) = value else {
                continue;
            };

            if let Some(allowed) = self.protocols.get(&name)
                && !url_allowed(&value, allowed)
            {
                continue;
            }
            if self.clobber.contains(&name) && !value.starts_with(&self.clobber_prefix) {
                value = format!("{}{}", self.clobber_prefix, value);
            }
            el.attrs.push((name, value));
        }
    }

    fn clean_nodes(&self, nodes: Vec<Node>) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Text(text) => out.push(Node::Text(text)),
                Node::Comment(_) | Node::Raw(_) => {}
                Node::Element(mut el) => {
                    el.tag = el.tag.to_ascii_lowercase();
                    if self.strip.contains(&el.tag) {
                        continue;
                    }
                    let children = self.clean_nodes(std::mem::take(&mut el.children));
                    if self.tag_names.contains(&el.tag) {
                        self.clean_attributes(&mut el);
                        if el.tag == "input" && !self.input_allowed(&el) {
                            continue;
                        }
                        el.children = children;
                        out.push(Node::Element(el));
                    } else {
                        out.extend(children);
                    }
                }
            }
        }
        out
    }

    /// Inputs are only kept as disabled checkboxes.
    fn input_allowed(&self, el: &Element) -> bool {
        el.attr("type") == Some("checkbox") && el.attr("disabled").is_some()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::github()
    }
}

/// Returns true if the URL is relative or uses an allowed scheme.
fn url_allowed(url: &str, allowed: &[String]) -> bool {
    let url = url.trim();
    let colon = url.find(':');
    let boundary = url.find(['/', '?', '#']);
    match (colon, boundary) {
        // A colon after the first path, query or fragment delimiter is not a scheme.
        (Some(c), Some(b)) if b < c => true,
        (Some(c), _) => {
            let scheme = &url[..c];
            allowed.iter().any(|p| p.eq_ignore_ascii_case(scheme))
        }
        (None, _) => true,
    }
}

/// Stage that sanitizes the HTML tree against a [`Schema`].
#[derive(Debug, Clone, Default)]
pub struct Sanitize {
    schema: Schema,
}

impl Sanitize {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn sanitize(&self, tree: &mut Hast) {
        let children = std::mem::take(&mut tree.children);
        tree.children = self.schema.clean_nodes(children);
    }
}

impl Transformer<Hast> for Sanitize {
    fn name(&self) -> &str {
        "sanitize"
    }

    fn transform(&self, tree: &mut Hast, _doc: &mut Document) -> anyhow::Result<()> {
        self.sanitize(tree);
        Ok(())
    }
}
