//! Markdown parsing stage.

use pulldown_cmark::{Event, Options, Parser};

use crate::mdast::Mdast;

/// Stage that parses raw text into the markdown event tree.
///
/// The grammar itself is pulldown-cmark's. Syntax extensions are not
/// configured directly: the builder collects them from the pre-bridge
/// stages that request them (see
/// [`Transformer::parse_options`](crate::pipeline::Transformer::parse_options)).
#[derive(Debug, Clone, Copy)]
pub struct Parse {
    options: Options,
}

impl Default for Parse {
    fn default() -> Self {
        Self::new(Options::empty())
    }
}

impl Parse {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn run(&self, source: &str) -> Mdast {
        Parser::new_ext(source, self.options)
            .map(Event::into_static)
            .collect::<Vec<_>>()
            .into()
    }
}
