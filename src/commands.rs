pub mod build;
pub mod render;

use std::path::Path;

use markflow::config::FileConfig;
use markflow::plugins::{Markdown, Minify, ReadingTime};
use markflow::site::{LocalSite, SiteEvent};

/// Set up a site from the configuration file and fire `BeforeBuild`.
pub fn site(config_file: Option<&Path>, force_sanitize: bool) -> Result<LocalSite, anyhow::Error> {
    let mut config = FileConfig::load_from_arg(config_file)?;
    if force_sanitize {
        config.markdown.get_or_insert_default().sanitize = Some(true);
    }

    let mut site = LocalSite::new();
    site.use_plugin(&Markdown::new(config.markdown))?
        .use_plugin(&ReadingTime::new(config.reading_time))?
        .use_plugin(&Minify::default())?;
    site.dispatch(SiteEvent::BeforeBuild)?;

    Ok(site)
}
