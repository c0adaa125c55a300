//! Markdown-oriented intermediate representation.
//!
//! The parse stage hands pre-bridge transformers an owned pulldown-cmark
//! event stream. Transformers may rewrite, insert or drop events freely; the
//! bridge stage only requires that `Start`/`End` events stay balanced.

use pulldown_cmark::{CowStr, Event};

/// Owned markdown event stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mdast {
    pub events: Vec<Event<'static>>,
}

impl Mdast {
    pub fn new(events: Vec<Event<'static>>) -> Self {
        Self { events }
    }

    /// Merge runs of adjacent `Text` events into one.
    ///
    /// The parser splits text at every potential delimiter, which makes
    /// pattern matching across a run of plain text awkward.
    pub fn coalesce_text(&mut self) {
        let mut merged: Vec<Event<'static>> = Vec::with_capacity(self.events.len());
        for event in self.events.drain(..) {
            if let Event::Text(next) = &event
                && let Some(Event::Text(prev)) = merged.last_mut()
            {
                *prev = CowStr::from(format!("{prev}{next}"));
                continue;
            }
            merged.push(event);
        }
        self.events = merged;
    }
}

impl From<Vec<Event<'static>>> for Mdast {
    fn from(events: Vec<Event<'static>>) -> Self {
        Self::new(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulldown_cmark::{Tag, TagEnd};

    #[test]
    fn test_coalesce_text() {
        let mut tree = Mdast::new(vec![
            Event::Start(Tag::Paragraph),
            Event::Text("see ".into()),
            Event::Text("www".into()),
            Event::Text(".example.com".into()),
            Event::End(TagEnd::Paragraph),
        ]);
        tree.coalesce_text();
        assert_eq!(
            tree.events,
            vec![
                Event::Start(Tag::Paragraph),
                Event::Text("see www.example.com".into()),
                Event::End(TagEnd::Paragraph),
            ]
        );
    }
}
