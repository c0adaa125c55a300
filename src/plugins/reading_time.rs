//! Reading time estimate filter.

use std::sync::Arc;

use crate::config::{ConfigError, ReadingTimeOptions};
use crate::site::{Filter, FilterArgs, FilterError, FilterValue, Site, SiteError, SiteEvent};

use super::Plugin;

/// How the estimate is returned. Chosen once, from the options.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    /// The number of minutes.
    Minutes,
    /// A template with `{minutes}` replaced by the estimate.
    Template(String),
}

impl Output {
    fn value(&self, minutes: u64) -> FilterValue {
        match self {
            Output::Minutes => FilterValue::Number(minutes),
            Output::Template(template) => {
                FilterValue::Text(template.replace("{minutes}", &minutes.to_string()))
            }
        }
    }
}

/// Registers a filter estimating how long a text takes to read.
#[derive(Debug, Clone)]
pub struct ReadingTime {
    name: String,
    wpm: u32,
    output: Output,
}

impl ReadingTime {
    pub fn new(options: ReadingTimeOptions) -> Self {
        let output = match options.format {
            Some(template) => Output::Template(template),
            None => Output::Minutes,
        };
        Self {
            name: options.name,
            wpm: options.wpm,
            output,
        }
    }

    fn filter(&self) -> Filter {
        let default_wpm = self.wpm;
        let output = self.output.clone();
        Filter::sync(move |value, args| {
            let text = value
                .as_text()
                .ok_or(FilterError::InvalidInput("text"))?;
            let wpm = wpm_arg(args)?.unwrap_or(default_wpm);
            Ok(output.value(reading_time(text, wpm)))
        })
    }
}

impl Default for ReadingTime {
    fn default() -> Self {
        Self::new(ReadingTimeOptions::default())
    }
}

impl Plugin for ReadingTime {
    fn name(&self) -> &str {
        "reading_time"
    }

    /// Registration is deferred to `BeforeBuild`, so the filter is bound
    /// again at the start of every build.
    fn install(&self, site: &mut dyn Site) -> Result<(), ConfigError> {
        let plugin = self.clone();
        site.add_event_listener(
            SiteEvent::BeforeBuild,
            Arc::new(move |site: &mut dyn Site| -> Result<(), SiteError> {
                site.filter(&plugin.name, plugin.filter());
                Ok(())
            }),
        );
        Ok(())
    }
}

fn wpm_arg(args: &FilterArgs) -> Result<Option<u32>, FilterError> {
    let Some(value) = args.get("wpm") else {
        return Ok(None);
    };
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .map(Some)
        .ok_or_else(|| FilterError::InvalidArgument {
            name: "wpm".to_string(),
            message: format!("expected a positive integer, got {}", value),
        })
}

/// Estimated minutes to read `text` at `wpm` words per minute.
///
/// Anything under a minute counts as one minute. Longer estimates are
/// rounded to two decimals and then up to a whole minute.
pub fn reading_time(text: &str, wpm: u32) -> u64 {
    let words = text.split_whitespace().count();
    let minutes = words as f64 / f64::from(wpm.max(1));
    if minutes < 1.0 {
        return 1;
    }
    ((minutes * 100.0).round() / 100.0).ceil() as u64
}
