//! Site plugins.
//!
//! Each plugin resolves its configuration when it is constructed and
//! installs loaders, filters or listeners into a [`Site`].
//!
//! Registration timing differs between plugins and is part of their
//! contract:
//!
//! - [`Markdown`] registers its loader and filters immediately on install.
//!   Its configuration is fixed from then on.
//! - [`ReadingTime`] registers its filter from a `BeforeBuild` listener, so
//!   the filter is re-bound at the start of every build.
//! - [`Minify`] claims stylesheets as assets and registers a processor on
//!   install.

mod markdown;
mod minify;
mod reading_time;

pub use markdown::Markdown;
pub use minify::{Minify, MinifyError, minify_css};
pub use reading_time::{ReadingTime, reading_time};

use crate::config::ConfigError;
use crate::site::Site;

pub trait Plugin {
    fn name(&self) -> &str;

    /// Install into `site`. Fails before any page renders if the plugin's
    /// configuration is invalid.
    fn install(&self, site: &mut dyn Site) -> Result<(), ConfigError>;
}
