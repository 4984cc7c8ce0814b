//! The seam between partial rendering and a template engine.

use futures::future::BoxFuture;
use minijinja::Value;

use crate::renderer::RendererSlot;

/// Future returned by [`TemplateEngine::render_template_async`].
pub type RenderFuture = BoxFuture<'static, Result<String, minijinja::Error>>;

/// A template engine partials can be registered on.
///
/// An engine is either synchronous or asynchronous, fixed at construction.
/// Synchronous engines render with [`render_template`]; asynchronous ones
/// produce a future from [`render_template_async`] that must be driven on a
/// runtime.
///
/// [`render_template`]: TemplateEngine::render_template
/// [`render_template_async`]: TemplateEngine::render_template_async
pub trait TemplateEngine: Send + Sync + 'static {
    /// Whether templates render as futures.
    fn is_async(&self) -> bool;

    /// Render `name` with `ctx` synchronously.
    fn render_template(&self, name: &str, ctx: Value) -> Result<String, minijinja::Error>;

    /// Render `name` with `ctx` as a future.
    fn render_template_async(&self, name: &str, ctx: Value) -> RenderFuture;

    /// Hook applied to a render error before it propagates.
    fn handle_render_error(&self, err: minijinja::Error) -> minijinja::Error {
        err
    }

    /// Slot holding the renderer registered on this engine.
    fn renderer_slot(&self) -> &RendererSlot;

    /// Expose `value` to every template under `name`, replacing any previous
    /// value of that name.
    fn publish_global(&self, name: &str, value: Value);
}
