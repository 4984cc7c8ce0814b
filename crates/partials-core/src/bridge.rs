//! The render bridge: renderer resolution and markup wrapping.

use minijinja::Value;
use serde::Serialize;
use tracing::trace;

use crate::error::{PartialsError, Result};
use crate::markup::Partial;
use crate::renderer::{Renderer, RendererSlot};

/// A single partial render request.
#[derive(Debug, Clone)]
pub struct PartialRequest {
    template_name: String,
    renderer: Option<Renderer>,
    markup: Option<bool>,
    data: Value,
}

impl PartialRequest {
    /// Request `template_name` with no data, using the registered renderer
    /// and its markup default.
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            renderer: None,
            markup: None,
            data: Value::from_iter(std::iter::empty::<(String, Value)>()),
        }
    }

    /// Use `renderer` instead of the registered one.
    pub fn renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Force markup on or off for this call.
    pub fn markup(mut self, markup: bool) -> Self {
        self.markup = Some(markup);
        self
    }

    /// Template context, normally a map.
    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Template context from any serializable value.
    pub fn with_serialized<S: Serialize>(self, data: &S) -> Self {
        self.data(Value::from_serialize(data))
    }

    /// Name of the template to render.
    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    /// The per-call markup flag, if one was set.
    pub fn markup_override(&self) -> Option<bool> {
        self.markup
    }
}

/// Render one partial.
///
/// The renderer is the per-call override when present, else the one in
/// `slot`. With neither, fails with [`PartialsError::NotRegistered`] before
/// any rendering happens. Renderer errors propagate unchanged.
///
/// Markup follows the request's flag, then the slot's registered default,
/// then `true`.
pub fn render_partial(slot: &RendererSlot, request: PartialRequest) -> Result<Partial> {
    let PartialRequest {
        template_name,
        renderer,
        markup,
        data,
    } = request;

    let (renderer, markup) = match renderer {
        Some(renderer) => (renderer, markup.unwrap_or(true)),
        None => {
            let bound = slot.get().ok_or(PartialsError::NotRegistered)?;
            let markup = markup.unwrap_or_else(|| bound.markup());
            (bound.renderer().clone(), markup)
        }
    };

    trace!(template = %template_name, markup, "rendering partial");
    let html = renderer.render(&template_name, data)?;
    Ok(Partial::new(html, markup))
}
