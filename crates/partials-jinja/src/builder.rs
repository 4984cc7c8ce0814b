//! Engine builder.

use std::path::PathBuf;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment};
use partials_common_config::RenderMode;

use crate::engine::{log_and_pass, JinjaEngine, RenderErrorHook};
use crate::error::SourceError;
use crate::source::{ChainSource, FsSource, MemorySource, TemplateSource};

/// Builder for [`JinjaEngine`].
///
/// Templates are looked up in memory first, then in the custom source, then
/// in the directory.
pub struct JinjaEngineBuilder {
    mode: RenderMode,
    directory: Option<PathBuf>,
    memory: MemorySource,
    custom: Option<Arc<dyn TemplateSource>>,
    error_hook: Option<RenderErrorHook>,
    auto_escape: bool,
}

impl JinjaEngineBuilder {
    /// A sync-mode builder with no template source.
    pub fn new() -> Self {
        Self {
            mode: RenderMode::Sync,
            directory: None,
            memory: MemorySource::new(),
            custom: None,
            error_hook: None,
            auto_escape: true,
        }
    }

    /// Render synchronously or asynchronously. Defaults to [`RenderMode::Sync`].
    pub fn mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Load templates from `path`.
    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.directory = Some(path.into());
        self
    }

    /// Add an in-memory template.
    pub fn template(self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.memory.insert(name, source);
        self
    }

    /// Use an additional template source.
    pub fn source(mut self, source: Arc<dyn TemplateSource>) -> Self {
        self.custom = Some(source);
        self
    }

    /// Hook every render error passes through. The default logs a warning.
    pub fn on_render_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(minijinja::Error) -> minijinja::Error + Send + Sync + 'static,
    {
        self.error_hook = Some(Arc::new(hook));
        self
    }

    /// HTML auto-escaping by file extension (`.html`, `.htm`, `.xml`).
    /// On by default.
    pub fn auto_escape(mut self, enabled: bool) -> Self {
        self.auto_escape = enabled;
        self
    }

    /// Build the engine. Fails when the configured directory does not exist.
    pub fn build(self) -> Result<JinjaEngine, SourceError> {
        let mut chain = ChainSource::new();
        if !self.memory.is_empty() {
            chain = chain.push(Arc::new(self.memory));
        }
        if let Some(custom) = self.custom {
            chain = chain.push(custom);
        }
        if let Some(dir) = self.directory {
            chain = chain.push(Arc::new(FsSource::new(dir)?));
        }

        let mut env = Environment::new();
        if !self.auto_escape {
            env.set_auto_escape_callback(|_| AutoEscape::None);
        }

        let error_hook = self.error_hook.unwrap_or_else(|| Arc::new(log_and_pass) as RenderErrorHook);
        Ok(JinjaEngine::assemble(env, self.mode, Arc::new(chain), error_hook))
    }
}

impl Default for JinjaEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
