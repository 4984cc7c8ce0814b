//! Error types for partial rendering.

use minijinja::ErrorKind;
use partials_common_async::RuntimeError;
use partials_common_thread::PoolError;
use thiserror::Error;

/// The error type for partial rendering and registration.
///
/// Only [`PartialsError::NotRegistered`] and
/// [`PartialsError::MissingIntegration`] originate here. Template engine
/// errors, including "template not found", are carried unchanged in
/// [`PartialsError::Template`].
#[derive(Error, Debug)]
pub enum PartialsError {
    /// No renderer was registered for the engine and none was passed.
    #[error("no partial renderer is registered; call one of the register_* functions before rendering partials")]
    NotRegistered,

    /// A registration function was called for an integration this build lacks.
    #[error("the `{framework}` integration is not available; enable the `{feature}` feature of the partials crate")]
    MissingIntegration {
        /// Integration name.
        framework: String,
        /// Cargo feature providing it.
        feature: String,
    },

    /// Error raised by the template engine.
    #[error(transparent)]
    Template(#[from] minijinja::Error),

    /// The worker pool rejected or lost a task.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The isolated runtime could not run the render.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Binding to the host application lifecycle failed.
    #[error("lifecycle error: {0}")]
    Lifecycle(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A renderer outlived the engine it renders with.
    #[error("the template engine was dropped while a renderer still referenced it")]
    EngineDropped,
}

impl PartialsError {
    /// Wrap a lifecycle error.
    pub fn lifecycle(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Lifecycle(Box::new(err))
    }

    /// Whether this is the engine's "template not found" error.
    pub fn is_template_not_found(&self) -> bool {
        matches!(self, Self::Template(e) if e.kind() == ErrorKind::TemplateNotFound)
    }

    /// The engine error, when this wraps one.
    pub fn template_error(&self) -> Option<&minijinja::Error> {
        match self {
            Self::Template(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PartialsError> for minijinja::Error {
    // Engine errors go back to the engine untouched so nested partials keep
    // the original kind (e.g. TemplateNotFound).
    fn from(err: PartialsError) -> Self {
        match err {
            PartialsError::Template(inner) => inner,
            other => minijinja::Error::new(ErrorKind::InvalidOperation, other.to_string()).with_source(other),
        }
    }
}

/// Result type alias using [`PartialsError`].
pub type Result<T> = std::result::Result<T, PartialsError>;
