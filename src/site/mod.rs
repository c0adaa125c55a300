//! Host contract: what plugins see of the site they are installed into.
//!
//! A [`Site`] accepts page loaders bound to an [`Engine`], assets, page
//! processors, named template filters and lifecycle listeners. [`LocalSite`] is the in-process host used
//! by the CLI.

mod host;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::engine::Engine;
use crate::loader::LoadError;
use crate::pipeline::{Data, RenderError};

pub use host::{LocalSite, Page};

// =============================================================================
// Filters
// =============================================================================

/// Page data shared between a template and a filter.
///
/// Object identity is pointer identity of the `Arc`.
pub type SharedData = Arc<Mutex<Data>>;

/// Named filter arguments, e.g. `{{ text | readingTime(wpm=200) }}`.
pub type FilterArgs = serde_json::Map<String, Value>;

/// Lock page data, recovering it if another holder panicked.
pub fn lock_data(data: &SharedData) -> MutexGuard<'_, Data> {
    data.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A value passed to or returned from a filter.
#[derive(Debug, Clone)]
pub enum FilterValue {
    Text(String),
    Number(u64),
    Data(SharedData),
}

impl FilterValue {
    /// Wrap page data in a new shared object.
    pub fn data(data: Data) -> Self {
        FilterValue::Data(Arc::new(Mutex::new(data)))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FilterValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// True if both values are the same shared object.
    pub fn same_object(&self, other: &FilterValue) -> bool {
        match (self, other) {
            (FilterValue::Data(a), FilterValue::Data(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Convert to a JSON value, snapshotting shared data.
    pub fn to_json(&self) -> Value {
        match self {
            FilterValue::Text(text) => Value::String(text.clone()),
            FilterValue::Number(n) => Value::from(*n),
            FilterValue::Data(data) => Value::Object(lock_data(data).clone()),
        }
    }

    /// Convert from a JSON value. Objects become new shared data.
    pub fn from_json(value: Value) -> Result<Self, FilterError> {
        match value {
            Value::String(text) => Ok(FilterValue::Text(text)),
            Value::Number(n) => n
                .as_u64()
                .map(FilterValue::Number)
                .ok_or(FilterError::InvalidInput("a non-negative integer")),
            Value::Object(map) => Ok(FilterValue::data(map)),
            _ => Err(FilterError::InvalidInput("text, a number or an object")),
        }
    }
}

impl From<String> for FilterValue {
    fn from(text: String) -> Self {
        FilterValue::Text(text)
    }
}

impl From<&str> for FilterValue {
    fn from(text: &str) -> Self {
        FilterValue::Text(text.to_string())
    }
}

pub type SyncFilterFn =
    dyn Fn(FilterValue, &FilterArgs) -> Result<FilterValue, FilterError> + Send + Sync;

pub type AsyncFilterFn = dyn Fn(FilterValue, FilterArgs) -> BoxFuture<'static, Result<FilterValue, FilterError>>
    + Send
    + Sync;

/// A template filter. The variant is the is-async flag.
#[derive(Clone)]
pub enum Filter {
    Sync(Arc<SyncFilterFn>),
    Async(Arc<AsyncFilterFn>),
}

impl Filter {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(FilterValue, &FilterArgs) -> Result<FilterValue, FilterError> + Send + Sync + 'static,
    {
        Filter::Sync(Arc::new(f))
    }

    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(FilterValue, FilterArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FilterValue, FilterError>> + Send + 'static,
    {
        Filter::Async(Arc::new(
            move |value: FilterValue, args: FilterArgs| -> BoxFuture<'static, Result<FilterValue, FilterError>> {
                Box::pin(f(value, args))
            },
        ))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Filter::Async(_))
    }

    /// Call the filter, awaiting it if it is async.
    pub async fn call(&self, value: FilterValue, args: FilterArgs) -> Result<FilterValue, FilterError> {
        match self {
            Filter::Sync(f) => f(value, &args),
            Filter::Async(f) => f(value, args).await,
        }
    }

    /// Call a sync filter. Async filters fail with [`FilterError::AsyncFilter`].
    pub fn call_sync(
        &self,
        name: &str,
        value: FilterValue,
        args: &FilterArgs,
    ) -> Result<FilterValue, FilterError> {
        match self {
            Filter::Sync(f) => f(value, args),
            Filter::Async(_) => Err(FilterError::AsyncFilter(name.to_string())),
        }
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::Sync(_) => write!(f, "Filter::Sync"),
            Filter::Async(_) => write!(f, "Filter::Async"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FilterError {
    #[error("filter input must be {0}")]
    InvalidInput(&'static str),

    #[error("object passed to filter has no string `content` field")]
    MissingContent,

    #[error("invalid filter argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    #[error("filter '{0}' is async and cannot be called synchronously")]
    AsyncFilter(String),

    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}

// =============================================================================
// Site
// =============================================================================

/// Reads a page file into page data.
pub type Loader = fn(&Path) -> Result<Data, LoadError>;

/// Error returned by a [`Processor`].
pub type ProcessError = Box<dyn std::error::Error + Send + Sync>;

/// Rewrites a loaded page or asset in place.
pub type Processor = fn(&mut Page) -> Result<(), ProcessError>;

/// Lifecycle events a plugin can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteEvent {
    /// Fired at the start of every build.
    BeforeBuild,
}

pub type Listener = Arc<dyn Fn(&mut dyn Site) -> Result<(), SiteError> + Send + Sync>;

/// The surface a plugin installs itself into.
pub trait Site {
    /// Claim files with the given suffixes: load them with `loader` and
    /// render their content with `engine`.
    fn load_pages(&mut self, extensions: &[String], loader: Loader, engine: Arc<dyn Engine>);

    /// Claim files with the given suffixes as assets. Assets are read as
    /// plain text and written out under their own name without rendering.
    fn load_assets(&mut self, extensions: &[String]);

    /// Run `processor` over every loaded page or asset with one of the
    /// given suffixes, in registration order.
    fn process(&mut self, extensions: &[String], processor: Processor);

    /// Register a template filter, replacing any filter with the same name.
    fn filter(&mut self, name: &str, filter: Filter);

    /// Subscribe to a lifecycle event.
    fn add_event_listener(&mut self, event: SiteEvent, listener: Listener);
}

#[derive(thiserror::Error, Debug)]
pub enum SiteError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("no engine handles {}", .0.display())]
    NoEngine(PathBuf),

    #[error("failed to render {}: {source}", path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: RenderError,
    },

    #[error("failed to process {}: {source}", path.display())]
    Process {
        path: PathBuf,
        #[source]
        source: ProcessError,
    },

    #[error("page {} has no string `content`", .0.display())]
    MissingContent(PathBuf),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_object_is_pointer_identity() {
        let a = FilterValue::data(Data::new());
        let b = a.clone();
        let c = FilterValue::data(Data::new());
        assert!(a.same_object(&b));
        assert!(!a.same_object(&c));
        assert!(!FilterValue::from("x").same_object(&FilterValue::from("x")));
    }

    #[test]
    fn test_json_conversion() {
        let value = FilterValue::from_json(serde_json::json!({ "content": "x" })).unwrap();
        assert_eq!(value.to_json(), serde_json::json!({ "content": "x" }));
        assert!(matches!(
            FilterValue::from_json(serde_json::json!(3)).unwrap(),
            FilterValue::Number(3)
        ));
        assert!(FilterValue::from_json(serde_json::json!(null)).is_err());
    }

    #[tokio::test]
    async fn test_sync_filter_callable_both_ways() {
        let upper = Filter::sync(|value, _args| {
            let text = value.as_text().ok_or(FilterError::InvalidInput("text"))?;
            Ok(FilterValue::Text(text.to_uppercase()))
        });
        let args = FilterArgs::new();
        assert_eq!(
            upper.call_sync("upper", "a".into(), &args).unwrap().as_text(),
            Some("A")
        );
        assert_eq!(upper.call("b".into(), args).await.unwrap().as_text(), Some("B"));
    }

    #[test]
    fn test_async_filter_rejected_synchronously() {
        let filter = Filter::asynchronous(|value, _args| async move { Ok(value) });
        assert!(filter.is_async());
        assert!(matches!(
            filter.call_sync("later", "x".into(), &FilterArgs::new()),
            Err(FilterError::AsyncFilter(name)) if name == "later"
        ));
    }
}
