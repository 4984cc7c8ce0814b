//! Render partial templates from inside minijinja templates.
//!
//! After registration, templates call a global (by default `render_partial`)
//! to render another template with keyword arguments as its context:
//!
//! ```jinja
//! {% for video in videos %}
//!   {{ render_partial('shared/video_card.html', video=video) }}
//! {% endfor %}
//! ```
//!
//! The result is safe markup unless `markup=false` is passed or the engine
//! was registered with `markup` off. Engines built in async mode render each
//! partial on a worker pool thread with its own runtime, so the synchronous
//! template call still works. Pools bound to an application lifecycle drain
//! on shutdown.
//!
//! ```no_run
//! use partials::{register_environment, render_partial, RegisterOptions};
//! use partials_jinja::JinjaEngine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = JinjaEngine::builder().directory("templates").build()?;
//! register_environment(&engine, &RegisterOptions::default())?;
//! let html = render_partial(&engine, "render/with_data.html", minijinja::context! { name => "Sarah", age => 32 })?;
//! println!("{}", html);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
#[cfg(feature = "axum")]
pub mod axum;
pub mod ext;
pub mod register;
pub mod registry;

use serde::Serialize;

pub use adapter::{default_pool, render_blocking};
pub use ext::EngineBuilderExt;
pub use partials_core::{
    bind_renderer, BoundRenderer, Markup, Partial, PartialRequest, PartialsError, Renderer, RendererSlot,
    TemplateEngine, GLOBAL_NAME,
};
pub use partials_jinja::{JinjaEngine, RenderMode};
pub use partials_lifecycle::{HostApp, Lifecycle};
pub use register::{
    engine_renderer, register_axum_extensions, register_environment, register_host_extensions, RegisterOptions,
    Registrar,
};
pub use registry::{CapabilityRegistry, Framework, Integration};

/// Render a partial with the renderer registered on `engine`.
pub fn render_partial<E, S>(engine: &E, template_name: &str, data: S) -> Result<Partial, PartialsError>
where
    E: TemplateEngine + ?Sized,
    S: Serialize,
{
    render_partial_with(engine, PartialRequest::new(template_name).with_serialized(&data))
}

/// Render a fully specified request against `engine`'s registered renderer.
pub fn render_partial_with<E>(engine: &E, request: PartialRequest) -> Result<Partial, PartialsError>
where
    E: TemplateEngine + ?Sized,
{
    partials_core::render_partial(engine.renderer_slot(), request)
}
