//! In-process site host.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tera::{Context, Tera};

use crate::config::ConfigError;
use crate::engine::Engine;
use crate::loader::LoadError;
use crate::pipeline::Data;
use crate::plugins::Plugin;

use super::{
    Filter, FilterArgs, FilterError, FilterValue, Listener, Loader, Processor, Site, SiteError,
    SiteEvent,
};

/// Name of the layout template registered by [`LocalSite::render_layout`].
const LAYOUT_TEMPLATE: &str = "__layout__";

/// A rendered page or a loaded asset.
#[derive(Debug, Clone)]
pub struct Page {
    pub path: PathBuf,
    /// Page data; `content` holds the rendered HTML.
    pub data: Data,
}

impl Page {
    pub fn content(&self) -> &str {
        self.data
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.data
            .insert("content".to_string(), Value::String(content.into()));
    }
}

/// True if the file name of `path` ends with one of `extensions`.
fn has_suffix(path: &Path, extensions: &[String]) -> bool {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
}

struct PageLoader {
    extensions: Vec<String>,
    loader: Loader,
    engine: Arc<dyn Engine>,
}

impl PageLoader {
    fn handles(&self, path: &Path) -> bool {
        has_suffix(path, &self.extensions)
    }
}

/// A site that lives in the current process.
///
/// Pages are rendered on demand through the engine registered for their
/// suffix; the most recently registered loader wins. Files no loader claims
/// may still be assets.
#[derive(Default)]
pub struct LocalSite {
    loaders: Vec<PageLoader>,
    assets: Vec<String>,
    processors: Vec<(Vec<String>, Processor)>,
    filters: BTreeMap<String, Filter>,
    listeners: HashMap<SiteEvent, Vec<Listener>>,
}

impl LocalSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a plugin into this site.
    pub fn use_plugin(&mut self, plugin: &dyn Plugin) -> Result<&mut Self, ConfigError> {
        tracing::debug!(plugin = plugin.name(), "installing plugin");
        plugin.install(self)?;
        Ok(self)
    }

    /// Run every listener subscribed to `event`, in subscription order.
    pub fn dispatch(&mut self, event: SiteEvent) -> Result<(), SiteError> {
        let listeners = self.listeners.get(&event).cloned().unwrap_or_default();
        tracing::debug!(?event, listeners = listeners.len(), "dispatching event");
        for listener in listeners {
            listener(self)?;
        }
        Ok(())
    }

    fn loader_for(&self, path: &Path) -> Option<&PageLoader> {
        self.loaders.iter().rev().find(|l| l.handles(path))
    }

    /// True if some registered loader claims `path`, or it is an asset.
    pub fn handles(&self, path: &Path) -> bool {
        self.loader_for(path).is_some() || self.is_asset(path)
    }

    /// True if `path` is copied through rather than rendered.
    pub fn is_asset(&self, path: &Path) -> bool {
        self.loader_for(path).is_none() && has_suffix(path, &self.assets)
    }

    /// Load a page or asset, render it if it is a page, then run the
    /// processors registered for it.
    pub async fn render_page(&self, path: &Path) -> Result<Page, SiteError> {
        let mut page = match self.loader_for(path) {
            Some(page_loader) => Self::render_with(page_loader, path).await?,
            None if self.is_asset(path) => Self::load_asset(path).await?,
            None => return Err(SiteError::NoEngine(path.to_path_buf())),
        };
        self.run_processors(&mut page)?;
        Ok(page)
    }

    async fn load_asset(path: &Path) -> Result<Page, SiteError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LoadError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut data = Data::new();
        data.insert("content".to_string(), Value::String(content));
        Ok(Page {
            path: path.to_path_buf(),
            data,
        })
    }

    fn run_processors(&self, page: &mut Page) -> Result<(), SiteError> {
        for (extensions, processor) in &self.processors {
            if !has_suffix(&page.path, extensions) {
                continue;
            }
            processor(page).map_err(|source| SiteError::Process {
                path: page.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    async fn render_with(page_loader: &PageLoader, path: &Path) -> Result<Page, SiteError> {
        let mut data = (page_loader.loader)(path)?;
        let content = data
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| SiteError::MissingContent(path.to_path_buf()))?
            .to_string();

        let html = page_loader
            .engine
            .render(&content, Some(&data), Some(path))
            .await
            .map_err(|source| SiteError::Render {
                path: path.to_path_buf(),
                source,
            })?;
        data.insert("content".to_string(), Value::String(html));

        Ok(Page {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn get_filter(&self, name: &str) -> Option<&Filter> {
        self.filters.get(name)
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Call a filter by name, awaiting it if it is async.
    pub async fn apply_filter(
        &self,
        name: &str,
        value: FilterValue,
        args: FilterArgs,
    ) -> Result<FilterValue, FilterError> {
        let filter = self
            .get_filter(name)
            .ok_or_else(|| FilterError::UnknownFilter(name.to_string()))?;
        filter.call(value, args).await
    }

    /// Call a sync filter by name.
    pub fn apply_filter_sync(
        &self,
        name: &str,
        value: FilterValue,
        args: &FilterArgs,
    ) -> Result<FilterValue, FilterError> {
        let filter = self
            .get_filter(name)
            .ok_or_else(|| FilterError::UnknownFilter(name.to_string()))?;
        filter.call_sync(name, value, args)
    }

    /// A Tera instance with every sync filter registered.
    ///
    /// Async filters cannot run inside Tera and are left out.
    pub fn tera(&self) -> Tera {
        let mut tera = Tera::default();
        for (name, filter) in &self.filters {
            let Filter::Sync(f) = filter else {
                tracing::debug!(filter = %name, "skipping async filter for templates");
                continue;
            };
            let f = Arc::clone(f);
            tera.register_filter(
                name,
                move |value: &Value, args: &HashMap<String, Value>| -> tera::Result<Value> {
                    let input = FilterValue::from_json(value.clone())
                        .map_err(|e| tera::Error::msg(e.to_string()))?;
                    let args: FilterArgs =
                        args.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    f(input, &args)
                        .map(|output| output.to_json())
                        .map_err(|e| tera::Error::msg(e.to_string()))
                },
            );
        }
        tera
    }

    /// Render a page into a layout template.
    ///
    /// The template sees `content` (the rendered HTML) and `page` (all page
    /// data), plus the site's sync filters.
    pub fn render_layout(&self, layout: &str, page: &Page) -> Result<String, SiteError> {
        let mut tera = self.tera();
        tera.add_raw_template(LAYOUT_TEMPLATE, layout)?;

        let mut context = Context::new();
        context.insert("content", page.content());
        context.insert("page", &page.data);

        Ok(tera.render(LAYOUT_TEMPLATE, &context)?)
    }
}

impl Site for LocalSite {
    fn load_pages(&mut self, extensions: &[String], loader: Loader, engine: Arc<dyn Engine>) {
        tracing::debug!(?extensions, "registering page loader");
        for (name, filter) in &self.filters {
            engine.add_helper(name, filter);
        }
        self.loaders.push(PageLoader {
            extensions: extensions.to_vec(),
            loader,
            engine,
        });
    }

    fn load_assets(&mut self, extensions: &[String]) {
        tracing::debug!(?extensions, "registering assets");
        self.assets.extend_from_slice(extensions);
    }

    fn process(&mut self, extensions: &[String], processor: Processor) {
        tracing::debug!(?extensions, "registering processor");
        self.processors.push((extensions.to_vec(), processor));
    }

    fn filter(&mut self, name: &str, filter: Filter) {
        tracing::debug!(filter = name, is_async = filter.is_async(), "registering filter");
        for page_loader in &self.loaders {
            page_loader.engine.add_helper(name, &filter);
        }
        self.filters.insert(name.to_string(), filter);
    }

    fn add_event_listener(&mut self, event: SiteEvent, listener: Listener) {
        self.listeners.entry(event).or_default().push(listener);
    }
}
