//! Markdown to HTML through a configurable, ordered stage pipeline.
//!
//! Configuration ([`config::Options`]) is resolved once per plugin
//! installation and assembled into an immutable [`pipeline::Pipeline`]. A
//! [`engine::MarkdownEngine`] wraps the pipeline with a blocking and a
//! non-blocking render; [`plugins::Markdown`] installs it into a
//! [`site::Site`] as a page loader and as the `md` / `mdAsync` filters.
//!
//! ```ignore
//! use markflow::plugins::{Markdown, ReadingTime};
//! use markflow::site::LocalSite;
//!
//! let mut site = LocalSite::new();
//! site.use_plugin(&Markdown::default())?
//!     .use_plugin(&ReadingTime::default())?;
//! ```

pub mod config;
pub mod engine;
pub mod hast;
pub mod loader;
pub mod mdast;
pub mod pipeline;
pub mod plugins;
pub mod site;

pub use config::{ConfigError, Options, UserOptions};
pub use engine::{Engine, MarkdownEngine};
pub use pipeline::{Pipeline, RenderError};
