//! Declarative registration on the engine builder.

use partials_core::PartialsError;
use partials_jinja::{JinjaEngine, JinjaEngineBuilder};

use crate::register::{register_environment, RegisterOptions};

/// Build an engine with partials already registered.
pub trait EngineBuilderExt {
    /// Build the engine, then register the render global on it.
    fn build_with_partials(self, options: &RegisterOptions) -> Result<JinjaEngine, PartialsError>;
}

impl EngineBuilderExt for JinjaEngineBuilder {
    fn build_with_partials(self, options: &RegisterOptions) -> Result<JinjaEngine, PartialsError> {
        let engine = self.build().map_err(|e| PartialsError::Template(e.into()))?;
        register_environment(&engine, options)?;
        Ok(engine)
    }
}
