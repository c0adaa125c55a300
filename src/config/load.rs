//! Configuration loading from files and the environment.

use std::path::Path;

use serde::Deserialize;

use super::types::{ReadingTimeOptions, UserOptions};
use super::ConfigError;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "markflow.yaml";

/// Contents of a `markflow.yaml` file.
///
/// ```yaml
/// markdown:
///   sanitize: true
///   post_stages: [slug]
/// reading_time:
///   wpm: 200
/// ```
///
/// Environment variables override file values, e.g.
/// `MARKFLOW_MARKDOWN__SANITIZE=true`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub markdown: Option<UserOptions>,

    #[serde(alias = "readingTime")]
    pub reading_time: ReadingTimeOptions,
}

impl FileConfig {
    /// Load the config from the command line argument, defaulting to `markflow.yaml`.
    ///
    /// A missing file is not an error: defaults and environment overrides
    /// still apply.
    pub fn load_from_arg(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config_file = config_file.unwrap_or(Path::new(CONFIG_FILE));
        let config_file = if config_file.is_relative() {
            std::env::current_dir()
                .map_err(ConfigError::CwdFailure)?
                .join(config_file)
        } else {
            config_file.to_path_buf()
        };

        Self::load(&config_file, environment())
    }

    /// Load the config from a file path layered with the given environment source.
    pub(crate) fn load(path: &Path, env: config::Environment) -> Result<Self, ConfigError> {
        let path_str = path
            .as_os_str()
            .to_str()
            .ok_or_else(|| ConfigError::EncodePath(path.to_path_buf()))?;

        tracing::debug!(path = %path.display(), "loading configuration");

        Ok(config::Config::builder()
            .add_source(config::File::new(path_str, config::FileFormat::Yaml).required(false))
            .add_source(env)
            .build()?
            .try_deserialize::<FileConfig>()?)
    }
}

/// `MARKFLOW_*` environment variables, `__` separating nested keys.
fn environment() -> config::Environment {
    config::Environment::with_prefix("MARKFLOW")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<String, String>>();
        environment().source(Some(source))
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = FileConfig::load(&dir.path().join("markflow.yaml"), env(&[])).unwrap();
        assert!(config.markdown.is_none());
        assert_eq!(config.reading_time, ReadingTimeOptions::default());
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("markflow.yaml");
        std::fs::write(
            &path,
            "markdown:\n  sanitize: true\n  post_stages:\n    - slug\nreading_time:\n  wpm: 200\n",
        )
        .unwrap();

        let config = FileConfig::load(&path, env(&[])).unwrap();
        let markdown = config.markdown.unwrap();
        assert_eq!(markdown.sanitize, Some(true));
        assert_eq!(markdown.post_stages.unwrap()[0].name(), "slug");
        assert_eq!(config.reading_time.wpm, 200);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("markflow.yaml");
        std::fs::write(&path, "markdown:\n  sanitize: false\n").unwrap();

        let config = FileConfig::load(&path, env(&[("MARKFLOW_MARKDOWN__SANITIZE", "true")])).unwrap();
        assert_eq!(config.markdown.unwrap().sanitize, Some(true));
    }
}
