//! Registering partial rendering on an engine.

use std::sync::Arc;

use partials_common_config::{PartialsConfig, DEFAULT_GLOBAL_NAME, DEFAULT_MAX_WORKERS};
use partials_common_thread::WorkerPool;
use partials_core::{bind_renderer, PartialsError, Renderer, TemplateEngine};
use partials_jinja::JinjaEngine;
use partials_lifecycle::{bind_lifecycle, default_factory, HostApp};
use tracing::debug;

use crate::adapter::{default_pool, render_blocking};
use crate::registry::{CapabilityRegistry, Framework, Integration};

/// Registration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Whether partials render as safe markup unless a call says otherwise.
    pub markup: bool,
    /// Workers in a pool bound to an application.
    pub max_workers: usize,
    /// Global name templates call.
    pub global_name: String,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            markup: true,
            max_workers: DEFAULT_MAX_WORKERS,
            global_name: DEFAULT_GLOBAL_NAME.to_string(),
        }
    }
}

impl RegisterOptions {
    /// Options from the `render` and `pool` config sections.
    pub fn from_config(config: &PartialsConfig) -> Self {
        Self {
            markup: config.render.markup,
            max_workers: config.pool.max_workers,
            global_name: config.render.global_name.clone(),
        }
    }

    /// Default markup flag for partials rendered through this registration.
    pub fn markup(mut self, markup: bool) -> Self {
        self.markup = markup;
        self
    }

    /// Worker count for a lifecycle-bound pool.
    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Name the template global is published under.
    pub fn global_name(mut self, name: impl Into<String>) -> Self {
        self.global_name = name.into();
        self
    }
}

/// Registration against an explicit [`CapabilityRegistry`].
///
/// The free functions in this module use [`CapabilityRegistry::global`].
#[derive(Debug, Clone, Copy)]
pub struct Registrar<'a> {
    registry: &'a CapabilityRegistry,
}

impl<'a> Registrar<'a> {
    /// Register against the integrations in `registry`.
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self { registry }
    }

    /// Register on a bare engine. Async renders use the default pool.
    pub fn environment(&self, engine: &JinjaEngine, options: &RegisterOptions) -> Result<(), PartialsError> {
        let integration = self.registry.require(Framework::Environment)?;
        let pool = default_pool()?;
        install(engine, pool, options, &integration);
        Ok(())
    }

    /// Register on an application with a lifecycle.
    pub fn host(
        &self,
        app: &dyn HostApp,
        engine: &JinjaEngine,
        options: &RegisterOptions,
    ) -> Result<Arc<WorkerPool>, PartialsError> {
        let integration = self.registry.require(Framework::Host)?;
        self.bind_app(app, engine, options, integration)
    }

    /// Register on an axum application.
    pub fn axum(
        &self,
        app: &dyn HostApp,
        engine: &JinjaEngine,
        options: &RegisterOptions,
    ) -> Result<Arc<WorkerPool>, PartialsError> {
        let integration = self.registry.require(Framework::Axum)?;
        self.bind_app(app, engine, options, integration)
    }

    fn bind_app(
        &self,
        app: &dyn HostApp,
        engine: &JinjaEngine,
        options: &RegisterOptions,
        integration: Integration,
    ) -> Result<Arc<WorkerPool>, PartialsError> {
        let pool = bind_lifecycle(app, options.max_workers, default_factory).map_err(PartialsError::lifecycle)?;
        install(engine, Arc::clone(&pool), options, &integration);
        Ok(pool)
    }
}

// Replaces any earlier registration on the engine.
fn install(engine: &JinjaEngine, pool: Arc<WorkerPool>, options: &RegisterOptions, integration: &Integration) {
    let bound = bind_renderer(engine_renderer(engine, pool), options.markup);
    engine.renderer_slot().set(bound.clone());
    engine.publish_global(&options.global_name, bound.into_function());

    debug!(
        framework = %integration.framework,
        global = %options.global_name,
        markup = options.markup,
        mode = %engine.mode(),
        "registered partials"
    );
}

/// Renderer over `engine` that runs async renders on `pool`.
///
/// Holds the engine weakly: the renderer lives in the engine's own globals.
pub fn engine_renderer(engine: &JinjaEngine, pool: Arc<WorkerPool>) -> Renderer {
    let weak = engine.downgrade();
    Renderer::new(move |name, data| {
        let engine = weak.upgrade().ok_or(PartialsError::EngineDropped)?;
        render_blocking(&engine, &pool, name, data)
    })
}

/// Register partials on a bare engine.
pub fn register_environment(engine: &JinjaEngine, options: &RegisterOptions) -> Result<(), PartialsError> {
    Registrar::new(CapabilityRegistry::global()).environment(engine, options)
}

/// Register partials on an application with a lifecycle, binding a worker
/// pool that drains when the application shuts down.
pub fn register_host_extensions(
    app: &dyn HostApp,
    engine: &JinjaEngine,
    options: &RegisterOptions,
) -> Result<Arc<WorkerPool>, PartialsError> {
    Registrar::new(CapabilityRegistry::global()).host(app, engine, options)
}

/// Register partials on an axum application. Needs the `axum` feature.
pub fn register_axum_extensions(
    app: &dyn HostApp,
    engine: &JinjaEngine,
    options: &RegisterOptions,
) -> Result<Arc<WorkerPool>, PartialsError> {
    Registrar::new(CapabilityRegistry::global()).axum(app, engine, options)
}
