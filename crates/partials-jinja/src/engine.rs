//! The minijinja engine.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use minijinja::{Environment, ErrorKind, Value};
use parking_lot::RwLock;
use partials_common_config::{RenderMode, TemplatesConfig};
use partials_core::{RenderFuture, RendererSlot, TemplateEngine};
use serde::Serialize;
use tracing::{debug, warn};

use crate::builder::JinjaEngineBuilder;
use crate::error::SourceError;
use crate::source::TemplateSource;

/// Hook applied to every render error before it reaches the caller.
pub type RenderErrorHook = Arc<dyn Fn(minijinja::Error) -> minijinja::Error + Send + Sync>;

type SourceCache = Arc<RwLock<HashMap<String, Arc<str>>>>;

pub(crate) struct EngineInner {
    env: RwLock<Arc<Environment<'static>>>,
    mode: RenderMode,
    source: Arc<dyn TemplateSource>,
    cache: SourceCache,
    error_hook: RenderErrorHook,
    renderers: RendererSlot,
}

impl EngineInner {
    fn snapshot(&self) -> Arc<Environment<'static>> {
        Arc::clone(&self.env.read())
    }

    fn render_now(&self, name: &str, ctx: Value) -> Result<String, minijinja::Error> {
        let env = self.snapshot();
        env.get_template(name).and_then(|template| template.render(ctx))
    }
}

/// A minijinja environment plus the state partials needs on it.
///
/// Cloning is cheap and clones share one environment. The rendering mode is
/// fixed at build time.
#[derive(Clone)]
pub struct JinjaEngine {
    inner: Arc<EngineInner>,
}

impl JinjaEngine {
    /// Start configuring an engine.
    pub fn builder() -> JinjaEngineBuilder {
        JinjaEngineBuilder::new()
    }

    /// Build an engine from the `templates` config section.
    pub fn from_config(config: &TemplatesConfig) -> Result<Self, SourceError> {
        let mut builder = Self::builder().mode(config.mode);
        if let Some(dir) = &config.directory {
            builder = builder.directory(dir);
        }
        builder.build()
    }

    pub(crate) fn assemble(
        mut env: Environment<'static>,
        mode: RenderMode,
        source: Arc<dyn TemplateSource>,
        error_hook: RenderErrorHook,
    ) -> Self {
        let cache: SourceCache = Arc::default();

        let loader_cache = Arc::clone(&cache);
        let loader_source = Arc::clone(&source);
        env.set_loader(move |name| {
            if let Some(cached) = loader_cache.read().get(name) {
                return Ok(Some(cached.to_string()));
            }
            Ok(loader_source.load_blocking(name)?)
        });

        Self {
            inner: Arc::new(EngineInner {
                env: RwLock::new(Arc::new(env)),
                mode,
                source,
                cache,
                error_hook,
                renderers: RendererSlot::new(),
            }),
        }
    }

    /// The mode fixed at build time.
    pub fn mode(&self) -> RenderMode {
        self.inner.mode
    }

    /// Current environment. Later global changes do not affect it.
    pub fn environment(&self) -> Arc<Environment<'static>> {
        self.inner.snapshot()
    }

    /// Add a template from source text, parsed now.
    pub fn add_template(&self, name: impl Into<String>, source: impl Into<String>) -> Result<(), minijinja::Error> {
        let mut env = self.inner.env.write();
        Arc::make_mut(&mut env).add_template_owned(name.into(), source.into())
    }

    /// Render synchronously. Fails on an async-mode engine.
    ///
    /// Errors pass through the render-error hook.
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, minijinja::Error> {
        self.render_template(name, Value::from_serialize(ctx))
            .map_err(|e| self.handle_render_error(e))
    }

    /// Render asynchronously. Works in either mode.
    pub async fn render_async<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, minijinja::Error> {
        let ctx = Value::from_serialize(ctx);
        let result = if self.inner.mode.is_async() {
            self.render_template_async(name, ctx).await
        } else {
            self.inner.render_now(name, ctx)
        };
        result.map_err(|e| self.handle_render_error(e))
    }

    /// A handle that does not keep the engine alive.
    pub fn downgrade(&self) -> WeakEngine {
        WeakEngine(Arc::downgrade(&self.inner))
    }

    /// Whether both handles point at the same engine.
    pub fn ptr_eq(&self, other: &JinjaEngine) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl TemplateEngine for JinjaEngine {
    fn is_async(&self) -> bool {
        self.inner.mode.is_async()
    }

    fn render_template(&self, name: &str, ctx: Value) -> Result<String, minijinja::Error> {
        if self.inner.mode.is_async() {
            return Err(minijinja::Error::new(
                ErrorKind::InvalidOperation,
                format!("cannot render `{}` synchronously on an async engine", name),
            ));
        }
        self.inner.render_now(name, ctx)
    }

    fn render_template_async(&self, name: &str, ctx: Value) -> RenderFuture {
        let inner = Arc::clone(&self.inner);
        let name = name.to_string();
        Box::pin(async move {
            let cached = inner.cache.read().contains_key(&name);
            if !cached {
                match inner.source.load(&name).await {
                    Ok(Some(source)) => {
                        inner.cache.write().insert(name.clone(), Arc::from(source));
                    }
                    Ok(None) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            inner.render_now(&name, ctx)
        })
    }

    fn handle_render_error(&self, err: minijinja::Error) -> minijinja::Error {
        (self.inner.error_hook)(err)
    }

    fn renderer_slot(&self) -> &RendererSlot {
        &self.inner.renderers
    }

    fn publish_global(&self, name: &str, value: Value) {
        let mut env = self.inner.env.write();
        Arc::make_mut(&mut env).add_global(name.to_string(), value);
        debug!(global = name, "published template global");
    }
}

impl fmt::Debug for JinjaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JinjaEngine")
            .field("mode", &self.inner.mode)
            .field("partials_registered", &self.inner.renderers.is_registered())
            .finish()
    }
}

/// Handle that does not keep the engine alive.
#[derive(Clone)]
pub struct WeakEngine(Weak<EngineInner>);

impl WeakEngine {
    /// `None` once every strong handle is dropped.
    pub fn upgrade(&self) -> Option<JinjaEngine> {
        self.0.upgrade().map(|inner| JinjaEngine { inner })
    }
}

impl fmt::Debug for WeakEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakEngine").field(&(self.0.strong_count() > 0)).finish()
    }
}

pub(crate) fn log_and_pass(err: minijinja::Error) -> minijinja::Error {
    warn!(kind = ?err.kind(), error = %err, "template render failed");
    err
}
