//! Options resolution.
//!
//! Merges caller-supplied overrides over defaults. Every supplied field
//! replaces its default wholesale; list-valued fields are never appended.
//! Built-in pre-stages are not part of `pre_stages` at all, so they are only
//! skipped through `override_defaults`.

use super::types::{Options, UserOptions};

/// Merge `user` over `defaults`. Absent input means no overrides.
pub fn resolve(defaults: Options, user: Option<UserOptions>) -> Options {
    let Some(user) = user else {
        return defaults;
    };

    Options {
        source_extensions: user.source_extensions.unwrap_or(defaults.source_extensions),
        pre_stages: user.pre_stages.unwrap_or(defaults.pre_stages),
        post_stages: user.post_stages.unwrap_or(defaults.post_stages),
        sanitize: user.sanitize.unwrap_or(defaults.sanitize),
        override_defaults: user.override_defaults.unwrap_or(defaults.override_defaults),
    }
}

impl Options {
    /// Resolve `user` over a fresh set of defaults.
    pub fn resolve(user: Option<UserOptions>) -> Self {
        resolve(Options::default(), user)
    }
}
