//! Pipeline assembly from resolved configuration.
//!
//! Stages are appended in a fixed order:
//!
//! 1. parse (syntax extensions contributed by every pre-bridge stage)
//! 2. built-in pre-stages, unless `override_defaults`
//! 3. user `pre_stages`
//! 4. bridge, always retaining raw markup
//! 5. raw normalization, if `sanitize`
//! 6. user `post_stages`
//! 7. sanitizer and strict stringify if `sanitize`, permissive stringify otherwise
//!
//! Raw markup survives the bridge unconditionally, so only the stages after
//! it decide its fate. Sanitizing can therefore only remove content.

use std::sync::Arc;

use pulldown_cmark::Options as ParseOptions;

use crate::config::{ConfigError, Options, StageSpec};
use crate::hast::Hast;
use crate::mdast::Mdast;

use super::stages::{self, Bridge, NamedStage, Parse, RawStage, Sanitize, Stringify};
use super::{Pipeline, Role, Stage, Transformer};

/// Built-in pre-bridge stages, installed unless defaults are overridden.
pub const DEFAULT_PRE_STAGES: &[&str] = &["gfm"];

/// Assemble the pipeline for `options`.
///
/// Fails before any document is rendered if a stage descriptor is unknown,
/// sits in the wrong list, or carries options the stage rejects.
pub fn build(options: &Options) -> Result<Pipeline, ConfigError> {
    let mut pre: Vec<Arc<dyn Transformer<Mdast>>> = Vec::new();
    if !options.override_defaults {
        for name in DEFAULT_PRE_STAGES {
            pre.push(pre_stage(&StageSpec::named(*name))?);
        }
    }
    for spec in &options.pre_stages {
        pre.push(pre_stage(spec)?);
    }

    let post = options
        .post_stages
        .iter()
        .map(post_stage)
        .collect::<Result<Vec<_>, _>>()?;

    let parse_options = pre
        .iter()
        .fold(ParseOptions::empty(), |acc, stage| acc | stage.parse_options());

    let mut stages = Vec::with_capacity(pre.len() + post.len() + 5);
    stages.push(Stage::Parse(Parse::new(parse_options)));
    stages.extend(pre.into_iter().map(Stage::Mdast));
    stages.push(Stage::Bridge(Bridge));

    if options.sanitize {
        stages.push(Stage::Hast(Arc::new(RawStage)));
    }

    stages.extend(post.into_iter().map(Stage::Hast));

    if options.sanitize {
        stages.push(Stage::Hast(Arc::new(Sanitize::default())));
        stages.push(Stage::Stringify(Stringify::strict()));
    } else {
        stages.push(Stage::Stringify(Stringify::permissive()));
    }

    let pipeline = Pipeline::new(stages)?;
    tracing::debug!(
        stages = ?pipeline.stage_names(),
        sanitize = options.sanitize,
        "assembled render pipeline"
    );
    Ok(pipeline)
}

fn pre_stage(spec: &StageSpec) -> Result<Arc<dyn Transformer<Mdast>>, ConfigError> {
    match spec {
        StageSpec::Mdast(t) => Ok(Arc::clone(t)),
        StageSpec::Hast(t) => Err(misplaced(t.name(), Role::PostTransform, "pre_stages")),
        StageSpec::Named { name, options } => match lookup(name, options)? {
            NamedStage::Mdast(t) => Ok(t),
            NamedStage::Hast(_) => Err(misplaced(name, Role::PostTransform, "pre_stages")),
        },
    }
}

fn post_stage(spec: &StageSpec) -> Result<Arc<dyn Transformer<Hast>>, ConfigError> {
    match spec {
        StageSpec::Hast(t) => Ok(Arc::clone(t)),
        StageSpec::Mdast(t) => Err(misplaced(t.name(), Role::PreTransform, "post_stages")),
        StageSpec::Named { name, options } => match lookup(name, options)? {
            NamedStage::Hast(t) => Ok(t),
            NamedStage::Mdast(_) => Err(misplaced(name, Role::PreTransform, "post_stages")),
        },
    }
}

fn lookup(name: &str, options: &serde_json::Value) -> Result<NamedStage, ConfigError> {
    stages::named(name, options)
        .map_err(|source| ConfigError::StageOptions {
            stage: name.to_string(),
            source,
        })?
        .ok_or_else(|| ConfigError::UnknownStage(name.to_string()))
}

fn misplaced(stage: &str, role: Role, list: &'static str) -> ConfigError {
    ConfigError::MisplacedStage {
        stage: stage.to_string(),
        role,
        list,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Document, Execution};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct Marker(&'static str);

    impl Transformer<Hast> for Marker {
        fn name(&self) -> &str {
            self.0
        }

        fn transform(&self, _tree: &mut Hast, _doc: &mut Document) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Fetch;

    #[async_trait]
    impl Transformer<Mdast> for Fetch {
        fn name(&self) -> &str {
            "fetch"
        }

        fn execution(&self) -> Execution {
            Execution::Async
        }

        async fn transform_async(&self, _tree: &mut Mdast, _doc: &mut Document) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_order() {
        let pipeline = build(&Options::default()).unwrap();
        assert_eq!(pipeline.stage_names(), vec!["parse", "gfm", "bridge", "stringify"]);
    }

    #[test]
    fn test_sanitize_order() {
        let options = Options {
            pre_stages: vec![StageSpec::named("math")],
            post_stages: vec![StageSpec::hast(Marker("a")), StageSpec::named("slug")],
            sanitize: true,
            ..Default::default()
        };
        let pipeline = build(&options).unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "parse", "gfm", "math", "bridge", "raw", "a", "slug", "sanitize", "stringify"
            ]
        );
        let Some(Stage::Stringify(stringify)) = pipeline.stages().last() else {
            panic!("pipeline must end with stringify");
        };
        assert!(!stringify.allows_dangerous_html());
    }

    #[test]
    fn test_override_defaults_skips_builtins() {
        let options = Options {
            override_defaults: true,
            pre_stages: vec![StageSpec::named("tables")],
            ..Default::default()
        };
        let pipeline = build(&options).unwrap();
        assert_eq!(pipeline.stage_names(), vec!["parse", "tables", "bridge", "stringify"]);

        let Stage::Parse(parse) = &pipeline.stages()[0] else {
            panic!("pipeline must start with parse");
        };
        assert_eq!(parse.options(), ParseOptions::ENABLE_TABLES);
    }

    #[test]
    fn test_parse_options_are_unioned() {
        let options = Options {
            pre_stages: vec![StageSpec::named("math")],
            ..Default::default()
        };
        let pipeline = build(&options).unwrap();
        let Stage::Parse(parse) = &pipeline.stages()[0] else {
            panic!("pipeline must start with parse");
        };
        assert!(parse.options().contains(ParseOptions::ENABLE_MATH));
        assert!(parse.options().contains(ParseOptions::ENABLE_TABLES));
    }

    #[test]
    fn test_unknown_stage() {
        let options = Options {
            post_stages: vec![StageSpec::named("nope")],
            ..Default::default()
        };
        assert!(matches!(
            build(&options),
            Err(ConfigError::UnknownStage(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_named_stage_in_wrong_list() {
        let options = Options {
            pre_stages: vec![StageSpec::named("slug")],
            ..Default::default()
        };
        assert!(matches!(
            build(&options),
            Err(ConfigError::MisplacedStage { stage, list: "pre_stages", .. }) if stage == "slug"
        ));
    }

    #[test]
    fn test_transformer_in_wrong_list() {
        let options = Options {
            post_stages: vec![StageSpec::mdast(Fetch)],
            ..Default::default()
        };
        assert!(matches!(
            build(&options),
            Err(ConfigError::MisplacedStage { role: Role::PreTransform, .. })
        ));
    }

    #[test]
    fn test_bad_stage_options() {
        let options = Options {
            post_stages: vec![StageSpec::with_options(
                "external-links",
                serde_json::json!({ "rell": "x" }),
            )],
            ..Default::default()
        };
        assert!(matches!(
            build(&options),
            Err(ConfigError::StageOptions { stage, .. }) if stage == "external-links"
        ));
    }

    #[test]
    fn test_async_stage_is_kept() {
        let options = Options {
            pre_stages: vec![StageSpec::mdast(Fetch)],
            ..Default::default()
        };
        let pipeline = build(&options).unwrap();
        assert_eq!(pipeline.async_only_stage().map(|s| s.name()), Some("fetch"));
    }
}
