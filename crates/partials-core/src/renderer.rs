//! Renderer handles and the bound render function.

use std::fmt;
use std::sync::Arc;

use minijinja::value::Kwargs;
use minijinja::Value;
use parking_lot::RwLock;

use crate::error::Result;
use crate::markup::Partial;

/// Keyword argument that overrides the markup flag from inside a template.
pub const MARKUP_KWARG: &str = "markup";

type RenderFn = dyn Fn(&str, Value) -> Result<String> + Send + Sync;

/// Callable that renders a template name with data to a string.
#[derive(Clone)]
pub struct Renderer {
    inner: Arc<RenderFn>,
}

impl Renderer {
    /// Wrap a render function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, Value) -> Result<String> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Render `template_name` with `data` as its context.
    pub fn render(&self, template_name: &str, data: Value) -> Result<String> {
        (self.inner)(template_name, data)
    }

    /// Whether both handles share the same callable.
    pub fn ptr_eq(&self, other: &Renderer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

/// The engine-held slot for the registered renderer and its markup default.
///
/// Registration replaces the content; it never accumulates. The slot is what
/// Rust callers render through. Templates call the global published at
/// registration, which holds its own copy of the bound renderer, so clearing
/// the slot does not remove that global.
#[derive(Debug, Default)]
pub struct RendererSlot {
    current: RwLock<Option<BoundRenderer>>,
}

impl RendererSlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `bound`, returning the one it replaced.
    pub fn set(&self, bound: BoundRenderer) -> Option<BoundRenderer> {
        self.current.write().replace(bound)
    }

    /// The registered renderer, if any.
    pub fn get(&self) -> Option<BoundRenderer> {
        self.current.read().clone()
    }

    /// Whether a renderer is registered.
    pub fn is_registered(&self) -> bool {
        self.current.read().is_some()
    }

    /// Clear the slot, returning the removed renderer.
    ///
    /// Only Rust-side registration state is cleared. A template global
    /// published earlier keeps rendering until the engine is registered again
    /// or dropped.
    pub fn reset(&self) -> Option<BoundRenderer> {
        self.current.write().take()
    }
}

/// A renderer with its markup default pre-filled.
///
/// This is what gets published as the template global.
#[derive(Debug, Clone)]
pub struct BoundRenderer {
    renderer: Renderer,
    markup: bool,
}

/// Pre-fill `renderer` and the `markup` default.
pub fn bind_renderer(renderer: Renderer, markup: bool) -> BoundRenderer {
    BoundRenderer { renderer, markup }
}

impl BoundRenderer {
    /// Markup default used when a call does not pass `markup=`.
    pub fn markup(&self) -> bool {
        self.markup
    }

    /// The underlying renderer.
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Render with the bound markup default.
    pub fn call(&self, template_name: &str, data: Value) -> Result<Partial> {
        self.call_with_markup(template_name, data, self.markup)
    }

    /// Render with an explicit markup flag.
    pub fn call_with_markup(&self, template_name: &str, data: Value, markup: bool) -> Result<Partial> {
        let html = self.renderer.render(template_name, data)?;
        Ok(Partial::new(html, markup))
    }

    /// Convert into a template function: `render_partial(name, **data)`.
    ///
    /// A `markup=` keyword overrides the bound default and is not passed on as
    /// template data.
    pub fn into_function(self) -> Value {
        Value::from_function(
            move |template_name: String, kwargs: Kwargs| -> std::result::Result<Value, minijinja::Error> {
                let markup = kwargs.get::<Option<bool>>(MARKUP_KWARG)?.unwrap_or(self.markup);
                let data = kwargs_to_context(&kwargs)?;
                let partial = self.call_with_markup(&template_name, data, markup)?;
                Ok(partial.into())
            },
        )
    }
}

// Reading every key marks it used, so minijinja does not reject the call
// for unknown keyword arguments.
fn kwargs_to_context(kwargs: &Kwargs) -> std::result::Result<Value, minijinja::Error> {
    let mut pairs = Vec::new();
    for key in kwargs.args() {
        if key == MARKUP_KWARG {
            continue;
        }
        pairs.push((key.to_string(), kwargs.get::<Value>(key)?));
    }
    Ok(Value::from_iter(pairs))
}
