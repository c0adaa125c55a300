use autumnus::{HtmlLinkedBuilder, formatter::Formatter, languages::Language};

use crate::hast::{Element, Hast, Node};
use crate::pipeline::{Document, Transformer};

use super::raw::parse_html_fragment;

/// Stage that syntax-highlights fenced code blocks using autumnus (tree-sitter based).
///
/// Highlighted blocks are emitted as elements with CSS classes, so a
/// sanitizer later in the pipeline still sees ordinary nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Highlight;

impl Transformer<Hast> for Highlight {
    fn name(&self) -> &str {
        "highlight"
    }

    fn transform(&self, tree: &mut Hast, _doc: &mut Document) -> anyhow::Result<()> {
        highlight_nodes(&mut tree.children);
        Ok(())
    }
}

fn highlight_nodes(nodes: &mut Vec<Node>) {
    let mut i = 0;
    while i < nodes.len() {
        let replacement = match &nodes[i] {
            Node::Element(pre) if pre.tag == "pre" => code_block(pre).and_then(|(code, lang)| {
                highlight(&code, &lang).map(|html| parse_html_fragment(&html))
            }),
            _ => None,
        };
        match replacement {
            Some(highlighted) => {
                let count = highlighted.len();
                nodes.splice(i..=i, highlighted);
                i += count;
            }
            None => {
                if let Node::Element(el) = &mut nodes[i] {
                    highlight_nodes(&mut el.children);
                }
                i += 1;
            }
        }
    }
}

/// Extract the code and language of a `<pre><code class="language-x">` block.
fn code_block(pre: &Element) -> Option<(String, String)> {
    let [Node::Element(code)] = pre.children.as_slice() else {
        return None;
    };
    if code.tag != "code" {
        return None;
    }
    let lang = code
        .attr("class")?
        .split_whitespace()
        .find_map(|class| class.strip_prefix("language-"))?
        .to_string();
    Some((code.text_content(), lang))
}

/// Highlight code and return HTML with CSS classes.
///
/// Returns `None` if the language is not recognized or formatting fails, in
/// which case the block is left as is.
fn highlight(code: &str, language: &str) -> Option<String> {
    // Language::guess handles detection from a name or an extension
    let lang = Language::guess(language, code);
    if matches!(lang, Language::PlainText) {
        return None;
    }

    let formatter = HtmlLinkedBuilder::new().source(code).lang(lang).build().ok()?;
    let mut output: Vec<u8> = Vec::new();
    formatter.format(&mut output).ok()?;
    String::from_utf8(output).ok()
}
