//! GitHub-flavored markdown and single syntax extension stages.

use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, LinkType, Options, Tag, TagEnd};
use regex::Regex;

use crate::mdast::Mdast;
use crate::pipeline::{Document, Transformer};

/// Bare URLs (`https://...`, `www....`) and email addresses.
static AUTOLINK_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        (?P<url>(?:https?://|www\.)[^\s<]*[^\s<?!.,:*_~'")\]])
        |
        (?P<email>[A-Za-z0-9._+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,})
        "#,
    )
    .expect("autolink literal pattern is valid")
});

/// Stage that enables one parser syntax extension and nothing else.
#[derive(Debug, Clone, Copy)]
pub struct SyntaxExtension {
    name: &'static str,
    options: Options,
}

impl SyntaxExtension {
    pub fn new(name: &'static str, options: Options) -> Self {
        Self { name, options }
    }
}

impl Transformer<Mdast> for SyntaxExtension {
    fn name(&self) -> &str {
        self.name
    }

    fn parse_options(&self) -> Options {
        self.options
    }

    fn transform(&self, _tree: &mut Mdast, _doc: &mut Document) -> anyhow::Result<()> {
        Ok(())
    }
}

/// GitHub-flavored markdown: tables, strikethrough, task lists, footnotes
/// and autolink literals.
///
/// This is the built-in pre-bridge stage installed unless defaults are
/// overridden.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gfm;

impl Transformer<Mdast> for Gfm {
    fn name(&self) -> &str {
        "gfm"
    }

    fn parse_options(&self) -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES
    }

    fn transform(&self, tree: &mut Mdast, _doc: &mut Document) -> anyhow::Result<()> {
        link_literals(tree);
        Ok(())
    }
}

/// Turn bare URLs and email addresses in plain text into links.
fn link_literals(tree: &mut Mdast) {
    tree.coalesce_text();

    let mut out = Vec::with_capacity(tree.events.len());
    // Links, images and code blocks never get nested autolinks.
    let mut opaque_depth = 0usize;
    for event in tree.events.drain(..) {
        match &event {
            Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => {
                opaque_depth += 1;
            }
            Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                opaque_depth = opaque_depth.saturating_sub(1);
            }
            Event::Text(text) if opaque_depth == 0 && AUTOLINK_LITERAL.is_match(text) => {
                split_literals(text, &mut out);
                continue;
            }
            _ => {}
        }
        out.push(event);
    }
    tree.events = out;
}

fn split_literals(text: &str, out: &mut Vec<Event<'static>>) {
    let mut last = 0;
    for caps in AUTOLINK_LITERAL.captures_iter(text) {
        let (m, link_type, dest) = if let Some(url) = caps.name("url") {
            let dest = if url.as_str().starts_with("www.") {
                format!("http://{}", url.as_str())
            } else {
                url.as_str().to_string()
            };
            (url, LinkType::Autolink, dest)
        } else if let Some(email) = caps.name("email") {
            (email, LinkType::Email, email.as_str().to_string())
        } else {
            continue;
        };

        if m.start() > last {
            out.push(Event::Text(CowStr::from(text[last..m.start()].to_string())));
        }
        out.push(Event::Start(Tag::Link {
            link_type,
            dest_url: CowStr::from(dest),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }));
        out.push(Event::Text(CowStr::from(m.as_str().to_string())));
        out.push(Event::End(TagEnd::Link));
        last = m.end();
    }
    if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stages::{Bridge, Parse, Stringify};
    use pretty_assertions::assert_eq;

    fn render(source: &str) -> String {
        let mut tree = Parse::new(Gfm.parse_options()).run(source);
        Gfm.transform(&mut tree, &mut Document::default()).unwrap();
        Stringify::permissive().run(&Bridge.run(tree))
    }

    #[test]
    fn test_bare_url_is_linked() {
        assert_eq!(
            render("visit https://example.com/a_b."),
            "<p>visit <a href=\"https://example.com/a_b\">https://example.com/a_b</a>.</p>"
        );
    }

    #[test]
    fn test_www_gets_scheme() {
        assert_eq!(
            render("see www.example.com"),
            "<p>see <a href=\"http://www.example.com\">www.example.com</a></p>"
        );
    }

    #[test]
    fn test_email_literal() {
        assert_eq!(
            render("mail me@example.org"),
            "<p>mail <a href=\"mailto:me@example.org\">me@example.org</a></p>"
        );
    }

    #[test]
    fn test_existing_links_untouched() {
        assert_eq!(
            render("[https://a.example](https://b.example)"),
            "<p><a href=\"https://b.example\">https://a.example</a></p>"
        );
    }

    #[test]
    fn test_code_untouched() {
        assert_eq!(
            render("`https://example.com`"),
            "<p><code>https://example.com</code></p>"
        );
    }

    #[test]
    fn test_strikethrough_and_tables_enabled() {
        assert_eq!(render("~~gone~~"), "<p><del>gone</del></p>");
        assert!(render("| a |\n|---|\n| 1 |").starts_with("<table>"));
    }
}
