//! Environment variable handling.

use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{PartialsConfig, RenderMode};

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A variable is set but its value cannot be used.
    #[error("invalid value for {var}: {message}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// What was expected.
        message: String,
    },

    /// A `.env` file exists but could not be read or parsed.
    #[error("failed to load {}: {source}", path.display())]
    Dotenv {
        /// The offending file.
        path: PathBuf,
        /// Read or parse failure.
        #[source]
        source: dotenvy::Error,
    },
}

/// Environment variable names.
pub mod vars {
    /// Config file path, relative to the project directory.
    pub const PARTIALS_CONFIG_PATH: &str = "PARTIALS_CONFIG_PATH";
    /// Overrides `render.markup`.
    pub const PARTIALS_MARKUP: &str = "PARTIALS_MARKUP";
    /// Overrides `render.global_name`.
    pub const PARTIALS_GLOBAL_NAME: &str = "PARTIALS_GLOBAL_NAME";
    /// Overrides `pool.max_workers`.
    pub const PARTIALS_MAX_WORKERS: &str = "PARTIALS_MAX_WORKERS";
    /// Overrides `templates.directory`.
    pub const PARTIALS_TEMPLATE_DIR: &str = "PARTIALS_TEMPLATE_DIR";
    /// Overrides `templates.mode`.
    pub const PARTIALS_RENDER_MODE: &str = "PARTIALS_RENDER_MODE";
    /// Selects the extra `.env.{APP_ENV}` file.
    pub const APP_ENV: &str = "APP_ENV";
}

/// Load `.env`, `.env.local` and then `.env.{APP_ENV}` from `dir` into the
/// process environment.
///
/// Missing files are skipped. Variables that are already set keep their
/// value, so the process environment wins over every file and earlier files
/// win over later ones. `APP_ENV` may itself come from `.env`.
///
/// Returns the files that were loaded.
pub fn load_dotenv(dir: &Path) -> Result<Vec<PathBuf>, EnvError> {
    let mut loaded = Vec::new();
    for name in [".env", ".env.local"] {
        load_file(&dir.join(name), &mut loaded)?;
    }
    if let Ok(app_env) = env::var(vars::APP_ENV) {
        load_file(&dir.join(format!(".env.{}", app_env)), &mut loaded)?;
    }
    Ok(loaded)
}

fn load_file(path: &Path, loaded: &mut Vec<PathBuf>) -> Result<(), EnvError> {
    match dotenvy::from_path(path) {
        Ok(()) => {
            loaded.push(path.to_path_buf());
            Ok(())
        }
        Err(e) if e.not_found() => Ok(()),
        Err(source) => Err(EnvError::Dotenv {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Apply `PARTIALS_*` overrides from the process environment.
pub fn apply_env_overrides(config: &mut PartialsConfig) -> Result<(), EnvError> {
    apply_overrides_from(config, |var| env::var(var).ok())
}

/// Apply `PARTIALS_*` overrides read through `lookup`.
pub fn apply_overrides_from<F>(config: &mut PartialsConfig, lookup: F) -> Result<(), EnvError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(markup) = lookup(vars::PARTIALS_MARKUP) {
        config.render.markup = parse_bool(&markup);
    }

    if let Some(name) = lookup(vars::PARTIALS_GLOBAL_NAME) {
        config.render.global_name = name;
    }

    if let Some(workers) = lookup(vars::PARTIALS_MAX_WORKERS) {
        config.pool.max_workers = workers.trim().parse().map_err(|_| EnvError::InvalidValue {
            var: vars::PARTIALS_MAX_WORKERS.to_string(),
            message: format!("expected a positive integer, got `{}`", workers),
        })?;
    }

    if let Some(dir) = lookup(vars::PARTIALS_TEMPLATE_DIR) {
        config.templates.directory = Some(dir.into());
    }

    if let Some(mode) = lookup(vars::PARTIALS_RENDER_MODE) {
        config.templates.mode = mode
            .parse::<RenderMode>()
            .map_err(|message| EnvError::InvalidValue {
                var: vars::PARTIALS_RENDER_MODE.to_string(),
                message,
            })?;
    }

    Ok(())
}
