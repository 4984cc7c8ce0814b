//! Core types for rendering partial templates.
//!
//! A [`Renderer`] turns a template name plus data into a string. The
//! [`render_partial`] bridge picks the renderer (per-call override or the
//! engine's registered one), calls it, and wraps the result as [`Markup`] or a
//! plain string. [`bind_renderer`] pre-fills the renderer and markup flag to
//! produce the template-callable global.

pub mod bridge;
pub mod engine;
pub mod error;
pub mod markup;
pub mod renderer;

pub use bridge::{render_partial, PartialRequest};
pub use engine::{RenderFuture, TemplateEngine};
pub use error::{PartialsError, Result};
pub use markup::{Markup, Partial};
pub use renderer::{bind_renderer, BoundRenderer, Renderer, RendererSlot, MARKUP_KWARG};

/// Name of the template global installed by registration.
pub const GLOBAL_NAME: &str = "render_partial";
