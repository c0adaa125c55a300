//! Markdown tree to HTML tree bridge.
//!
//! Converts the pulldown-cmark event stream into [`Hast`]. Embedded HTML is
//! always kept as [`Node::Raw`]: deciding its fate is left to the raw
//! normalization, sanitize and stringify stages further down.

use std::collections::HashMap;

use pulldown_cmark::{Alignment, CodeBlockKind, CowStr, Event, LinkType, Tag, TagEnd};

use crate::hast::{Element, Hast, MAX_DEPTH, Node};
use crate::mdast::Mdast;

/// Prefix applied to generated footnote ids so they cannot clobber globals.
pub const CLOBBER_PREFIX: &str = "user-content-";

/// Id of the footnotes heading, referenced by every footnote call.
fn footnote_label_id() -> String {
    format!("{}footnote-label", CLOBBER_PREFIX)
}

/// Stage that converts the markdown tree into the HTML tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bridge;

impl Bridge {
    pub fn run(&self, mdast: Mdast) -> Hast {
        let mut builder = TreeBuilder::default();
        for event in mdast.events {
            builder.push(event);
        }
        builder.finish()
    }
}

/// What an open frame turns into when its end event arrives.
enum FrameKind {
    Element,
    CodeBlock,
    Image,
    HtmlBlock,
    FootnoteDefinition(String),
    /// Nested past [`MAX_DEPTH`]: children are hoisted into the parent.
    Flattened,
    Discard,
}

struct Frame {
    element: Element,
    kind: FrameKind,
}

struct TableState {
    alignments: Vec<Alignment>,
    in_head: bool,
    column: usize,
    body_open: bool,
}

#[derive(Default)]
struct Footnotes {
    /// Labels in order of first reference.
    order: Vec<String>,
    /// Number of references seen per label.
    references: HashMap<String, usize>,
    definitions: HashMap<String, Vec<Node>>,
}

#[derive(Default)]
struct TreeBuilder {
    root: Vec<Node>,
    stack: Vec<Frame>,
    tables: Vec<TableState>,
    footnotes: Footnotes,
}

impl TreeBuilder {
    fn push(&mut self, event: Event<'static>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.append(Node::Text(text.into_string())),
            Event::Code(code) => self.append(
                Element::new("code")
                    .with_children(vec![Node::Text(code.into_string())])
                    .into(),
            ),
            Event::InlineMath(math) => self.append(
                Element::new("code")
                    .with_attr("class", "language-math math-inline")
                    .with_children(vec![Node::Text(math.into_string())])
                    .into(),
            ),
            Event::DisplayMath(math) => self.append(
                Element::new("pre")
                    .with_children(vec![
                        Element::new("code")
                            .with_attr("class", "language-math math-display")
                            .with_children(vec![Node::Text(math.into_string())])
                            .into(),
                    ])
                    .into(),
            ),
            Event::Html(html) | Event::InlineHtml(html) => self.append_raw(html),
            Event::FootnoteReference(label) => self.footnote_reference(label.into_string()),
            Event::SoftBreak => self.append(Node::text("\n")),
            Event::HardBreak => {
                self.append(Element::new("br").into());
                self.append(Node::text("\n"));
            }
            Event::Rule => self.append(Element::new("hr").into()),
            Event::TaskListMarker(checked) => self.task_list_marker(checked),
        }
    }

    fn start(&mut self, tag: Tag<'static>) {
        let (element, kind) = match tag {
            Tag::Paragraph => (Element::new("p"), FrameKind::Element),
            Tag::Heading {
                level,
                id,
                classes,
                attrs,
            } => {
                let mut el = Element::new(format!("h{}", level as usize));
                if let Some(id) = id {
                    el.set_attr("id", id.into_string());
                }
                for class in classes {
                    el.add_class(&class);
                }
                for (name, value) in attrs {
                    el.set_attr(
                        name.into_string(),
                        value.map(CowStr::into_string).unwrap_or_default(),
                    );
                }
                (el, FrameKind::Element)
            }
            Tag::BlockQuote(_) => (Element::new("blockquote"), FrameKind::Element),
            Tag::CodeBlock(kind) => {
                let mut code = Element::new("code");
                if let CodeBlockKind::Fenced(info) = kind
                    && let Some(lang) = info.split_whitespace().next()
                {
                    code.set_attr("class", format!("language-{}", lang));
                }
                (code, FrameKind::CodeBlock)
            }
            Tag::HtmlBlock => (Element::default(), FrameKind::HtmlBlock),
            Tag::List(Some(start)) => {
                let mut el = Element::new("ol");
                if start != 1 {
                    el.set_attr("start", start.to_string());
                }
                (el, FrameKind::Element)
            }
            Tag::List(None) => (Element::new("ul"), FrameKind::Element),
            Tag::Item => (Element::new("li"), FrameKind::Element),
            Tag::FootnoteDefinition(label) => (
                Element::new("li"),
                FrameKind::FootnoteDefinition(label.into_string()),
            ),
            Tag::DefinitionList => (Element::new("dl"), FrameKind::Element),
            Tag::DefinitionListTitle => (Element::new("dt"), FrameKind::Element),
            Tag::DefinitionListDefinition => (Element::new("dd"), FrameKind::Element),
            Tag::Table(alignments) => {
                self.tables.push(TableState {
                    alignments,
                    in_head: false,
                    column: 0,
                    body_open: false,
                });
                (Element::new("table"), FrameKind::Element)
            }
            Tag::TableHead => {
                if let Some(table) = self.tables.last_mut() {
                    table.in_head = true;
                    table.column = 0;
                }
                self.open(Element::new("thead"), FrameKind::Element);
                (Element::new("tr"), FrameKind::Element)
            }
            Tag::TableRow => {
                if let Some(table) = self.tables.last_mut() {
                    table.column = 0;
                    if !table.body_open {
                        table.body_open = true;
                        self.open(Element::new("tbody"), FrameKind::Element);
                    }
                }
                (Element::new("tr"), FrameKind::Element)
            }
            Tag::TableCell => {
                let mut cell = Element::new("td");
                if let Some(table) = self.tables.last_mut() {
                    if table.in_head {
                        cell.tag = "th".to_string();
                    }
                    let align = match table.alignments.get(table.column) {
                        Some(Alignment::Left) => Some("left"),
                        Some(Alignment::Center) => Some("center"),
                        Some(Alignment::Right) => Some("right"),
                        _ => None,
                    };
                    if let Some(align) = align {
                        cell.set_attr("align", align);
                    }
                    table.column += 1;
                }
                (cell, FrameKind::Element)
            }
            Tag::Emphasis => (Element::new("em"), FrameKind::Element),
            Tag::Strong => (Element::new("strong"), FrameKind::Element),
            Tag::Strikethrough => (Element::new("del"), FrameKind::Element),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let href = match link_type {
                    LinkType::Email => format!("mailto:{}", dest_url),
                    _ => dest_url.into_string(),
                };
                let mut el = Element::new("a").with_attr("href", href);
                if !title.is_empty() {
                    el.set_attr("title", title.into_string());
                }
                (el, FrameKind::Element)
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let mut el = Element::new("img").with_attr("src", dest_url.into_string());
                if !title.is_empty() {
                    el.set_attr("title", title.into_string());
                }
                (el, FrameKind::Image)
            }
            Tag::MetadataBlock(_) => (Element::default(), FrameKind::Discard),
            #[allow(unreachable_patterns)]
            _ => (Element::new("span"), FrameKind::Element),
        };
        self.open(element, kind);
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::TableHead => {
                self.close();
                self.close();
                if let Some(table) = self.tables.last_mut() {
                    table.in_head = false;
                }
            }
            TagEnd::Table => {
                if self.tables.pop().is_some_and(|t| t.body_open) {
                    self.close();
                }
                self.close();
            }
            _ => self.close(),
        }
    }

    fn open(&mut self, element: Element, mut kind: FrameKind) {
        if self.stack.len() >= MAX_DEPTH && matches!(kind, FrameKind::Element) {
            kind = FrameKind::Flattened;
        }
        self.stack.push(Frame { element, kind });
    }

    /// Close the innermost frame and attach its result to the parent.
    fn close(&mut self) {
        let Some(Frame { mut element, kind }) = self.stack.pop() else {
            return;
        };
        match kind {
            FrameKind::Element => {
                layout_blocks(&mut element.children, true);
                self.append(element.into());
            }
            FrameKind::CodeBlock => {
                let pre = Element::new("pre").with_children(vec![element.into()]);
                self.append(pre.into());
            }
            FrameKind::Image => {
                let alt = element.text_content();
                let mut attrs = vec![];
                attrs.extend(element.attrs.iter().filter(|(k, _)| k == "src").cloned());
                attrs.push(("alt".to_string(), alt));
                attrs.extend(element.attrs.iter().filter(|(k, _)| k != "src").cloned());
                element.attrs = attrs;
                element.children.clear();
                self.append(element.into());
            }
            FrameKind::HtmlBlock => {
                let raw = element.text_content();
                let raw = raw.trim_end_matches('\n');
                if !raw.is_empty() {
                    self.append(Node::Raw(raw.to_string()));
                }
            }
            FrameKind::FootnoteDefinition(label) => {
                self.footnotes.definitions.insert(label, element.children);
            }
            FrameKind::Flattened => {
                for node in element.children {
                    self.append(node);
                }
            }
            FrameKind::Discard => {}
        }
    }

    /// Append a node to the innermost open frame, merging adjacent text.
    fn append(&mut self, node: Node) {
        let children = match self.stack.last_mut() {
            Some(frame) => &mut frame.element.children,
            None => &mut self.root,
        };
        if let Node::Text(next) = &node
            && let Some(Node::Text(prev)) = children.last_mut()
        {
            prev.push_str(next);
            return;
        }
        children.push(node);
    }

    fn append_raw(&mut self, html: CowStr<'static>) {
        match self.stack.last_mut() {
            // Html blocks arrive line by line; collect them as text and emit
            // a single raw node when the block closes.
            Some(Frame {
                kind: FrameKind::HtmlBlock,
                ..
            }) => self.append(Node::Text(html.into_string())),
            _ => self.append(Node::Raw(html.into_string())),
        }
    }

    fn task_list_marker(&mut self, checked: bool) {
        let item = self.stack.iter().rposition(|f| f.element.tag == "li");
        if let Some(index) = item {
            self.stack[index].element.add_class("task-list-item");
            if let Some(list) = self.stack[..index]
                .iter_mut()
                .rev()
                .find(|f| f.element.tag == "ul" || f.element.tag == "ol")
            {
                list.element.add_class("contains-task-list");
            }
        }

        let mut input = Element::new("input").with_attr("type", "checkbox");
        if checked {
            input.set_attr("checked", "");
        }
        input.set_attr("disabled", "");
        self.append(input.into());
        self.append(Node::text(" "));
    }

    fn footnote_reference(&mut self, label: String) {
        let count = self.footnotes.references.entry(label.clone()).or_insert(0);
        *count += 1;
        let count = *count;
        if count == 1 {
            self.footnotes.order.push(label.clone());
        }
        let number = self
            .footnotes
            .order
            .iter()
            .position(|l| *l == label)
            .map_or(0, |i| i + 1);

        let id = footnote_id(&label);
        let ref_id = if count == 1 {
            format!("{}fnref-{}", CLOBBER_PREFIX, id)
        } else {
            format!("{}fnref-{}-{}", CLOBBER_PREFIX, id, count)
        };
        let link = Element::new("a")
            .with_attr("href", format!("#{}fn-{}", CLOBBER_PREFIX, id))
            .with_attr("id", ref_id)
            .with_attr("data-footnote-ref", "")
            .with_attr("aria-describedby", footnote_label_id())
            .with_children(vec![Node::Text(number.to_string())]);
        self.append(Element::new("sup").with_children(vec![link.into()]).into());
    }

    fn finish(mut self) -> Hast {
        while !self.stack.is_empty() {
            self.close();
        }

        if let Some(section) = self.footnote_section() {
            self.root.push(section.into());
        }

        let mut children = Vec::with_capacity(self.root.len() * 2);
        for (i, node) in self.root.into_iter().enumerate() {
            if i > 0 {
                children.push(Node::text("\n"));
            }
            children.push(node);
        }
        Hast::new(children)
    }

    fn footnote_section(&mut self) -> Option<Element> {
        let mut items = Vec::new();
        let order = std::mem::take(&mut self.footnotes.order);
        for label in &order {
            let Some(mut content) = self.footnotes.definitions.remove(label) else {
                continue;
            };
            let id = footnote_id(label);
            let references = self.footnotes.references.get(label).copied().unwrap_or(1);

            let mut backrefs = Vec::new();
            for n in 1..=references {
                let (href, label_text) = if n == 1 {
                    (
                        format!("#{}fnref-{}", CLOBBER_PREFIX, id),
                        format!("Back to reference {}", items.len() + 1),
                    )
                } else {
                    (
                        format!("#{}fnref-{}-{}", CLOBBER_PREFIX, id, n),
                        format!("Back to reference {}-{}", items.len() + 1, n),
                    )
                };
                if !backrefs.is_empty() {
                    backrefs.push(Node::text(" "));
                }
                backrefs.push(
                    Element::new("a")
                        .with_attr("href", href)
                        .with_attr("data-footnote-backref", "")
                        .with_attr("class", "data-footnote-backref")
                        .with_attr("aria-label", label_text)
                        .with_children(vec![Node::text("↩")])
                        .into(),
                );
            }

            // Backreferences go at the end of the last paragraph when there is one.
            let last = content
                .iter_mut()
                .rev()
                .find(|node| !matches!(node, Node::Text(t) if t.trim().is_empty()));
            match last {
                Some(Node::Element(p)) if p.tag == "p" => {
                    p.children.push(Node::text(" "));
                    p.children.extend(backrefs);
                }
                _ => content.extend(backrefs),
            }

            let mut li = Element::new("li")
                .with_attr("id", format!("{}fn-{}", CLOBBER_PREFIX, id))
                .with_children(content);
            layout_blocks(&mut li.children, true);
            items.push(Node::Element(li));
        }

        if items.is_empty() {
            return None;
        }

        let mut ol = Element::new("ol").with_children(items);
        layout_blocks(&mut ol.children, true);
        let heading = Element::new("h2")
            .with_attr("class", "sr-only")
            .with_attr("id", footnote_label_id())
            .with_children(vec![Node::text("Footnotes")]);
        let mut section = Element::new("section")
            .with_attr("data-footnotes", "")
            .with_attr("class", "footnotes")
            .with_children(vec![heading.into(), ol.into()]);
        layout_blocks(&mut section.children, true);
        Some(section)
    }
}

/// Separate block-level children with newline text nodes.
///
/// Mirrors the way markdown-to-HTML converters lay out block content so the
/// stringified output has one block per line.
fn layout_blocks(children: &mut Vec<Node>, wrap_edges: bool) {
    if !children.iter().any(Node::is_block) {
        return;
    }

    let old = std::mem::take(children);
    let mut previous_block = false;
    for (i, node) in old.into_iter().enumerate() {
        let block = node.is_block();
        if i == 0 {
            if block && wrap_edges {
                children.push(Node::text("\n"));
            }
        } else if block || previous_block {
            children.push(Node::text("\n"));
        }
        previous_block = block;
        children.push(node);
    }
    if previous_block && wrap_edges {
        children.push(Node::text("\n"));
    }
}

fn footnote_id(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
