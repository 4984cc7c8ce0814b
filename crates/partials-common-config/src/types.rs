//! Configuration types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Name of the template global installed by registration.
pub const DEFAULT_GLOBAL_NAME: &str = "render_partial";

/// Default worker pool capacity.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialsConfig {
    /// Partial rendering options.
    pub render: RenderConfig,
    /// Worker pool options for lifecycle-bound registrations.
    pub pool: WorkerConfig,
    /// Template engine options.
    pub templates: TemplatesConfig,
}

/// Partial rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Wrap rendered partials as safe markup.
    pub markup: bool,
    /// Global name the render function is published under.
    pub global_name: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            markup: true,
            global_name: DEFAULT_GLOBAL_NAME.to_string(),
        }
    }
}

/// Worker pool options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker threads per bound application.
    pub max_workers: usize,
    /// Worker thread name prefix.
    pub thread_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            thread_name: "partials-worker".to_string(),
        }
    }
}

/// Template engine options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory templates are loaded from.
    pub directory: Option<PathBuf>,
    /// Whether the engine renders synchronously or asynchronously.
    pub mode: RenderMode,
}

/// Rendering mode of a template engine, fixed when the engine is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Templates render with a plain function call.
    #[default]
    Sync,
    /// Templates render as futures that need a runtime.
    Async,
}

impl RenderMode {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
        }
    }

    /// Whether this is [`RenderMode::Async`].
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async)
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            other => Err(format!("unknown render mode `{}` (expected sync or async)", other)),
        }
    }
}
