//! Configuration file loading and parsing.

use crate::env::{apply_env_overrides, load_dotenv, vars, EnvError};
use crate::types::PartialsConfig;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file location relative to the project directory.
pub const CONFIG_FILE: &str = ".partials/config.yaml";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read or written.
    #[error("failed to read config: {source}")]
    ReadError {
        /// Underlying I/O failure.
        #[from]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`PartialsConfig`].
    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError {
        /// 1-based line, when known.
        line: Option<usize>,
        /// Parser message.
        message: String,
    },

    /// A value is out of range.
    #[error("validation error: {message}")]
    ValidationError {
        /// Which value and why.
        message: String,
    },

    /// `${VAR}` without a default names an unset variable.
    #[error("environment variable not found: {var}")]
    EnvVarNotFound {
        /// Variable name.
        var: String,
    },

    /// A `.env` file or a `PARTIALS_*` override failed.
    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Configuration loader.
pub struct ConfigLoader {
    base_path: PathBuf,
    config_file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader for the given project directory.
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: project_dir.as_ref().to_path_buf(),
            config_file: None,
        }
    }

    /// Read this file instead of `.partials/config.yaml`. Relative paths are
    /// relative to the project directory.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Path of the config file this loader reads: the explicit file, then
    /// `PARTIALS_CONFIG_PATH`, then [`CONFIG_FILE`].
    pub fn config_path(&self) -> PathBuf {
        self.config_path_from(|var| std::env::var(var).ok())
    }

    fn config_path_from<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = self
            .config_file
            .clone()
            .or_else(|| lookup(vars::PARTIALS_CONFIG_PATH).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        self.base_path.join(file)
    }

    /// Load the project's `.env` files, then the config file, apply
    /// `PARTIALS_*` overrides and validate.
    ///
    /// A missing file yields the defaults.
    pub fn load(&self) -> Result<PartialsConfig, ConfigError> {
        load_dotenv(&self.base_path)?;
        let mut config = self.load_file()?;
        apply_env_overrides(&mut config)?;
        self.resolve_paths(&mut config);
        self.validate(&config)?;
        Ok(config)
    }

    /// Load only the file, without environment overrides or validation.
    pub fn load_file(&self) -> Result<PartialsConfig, ConfigError> {
        let config_path = self.config_path();

        if !config_path.exists() {
            return Ok(PartialsConfig::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let expanded = self.expand_env_vars(&contents)?;

        serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })
    }

    /// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
    fn expand_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let full_match = &cap[0];
            let var_name = &cap[1];
            let default = cap.get(2).map(|m| m.as_str());

            let value = match std::env::var(var_name) {
                Ok(v) => v,
                Err(_) => match default {
                    Some(d) => d.to_string(),
                    None => {
                        return Err(ConfigError::EnvVarNotFound {
                            var: var_name.to_string(),
                        })
                    }
                },
            };

            result = result.replace(full_match, &value);
        }

        Ok(result)
    }

    // Relative template directories are relative to the project directory.
    fn resolve_paths(&self, config: &mut PartialsConfig) {
        if let Some(dir) = &config.templates.directory {
            if dir.is_relative() {
                config.templates.directory = Some(self.base_path.join(dir));
            }
        }
    }

    /// Validate configuration values.
    pub fn validate(&self, config: &PartialsConfig) -> Result<(), ConfigError> {
        if config.pool.max_workers == 0 {
            return Err(ConfigError::ValidationError {
                message: "pool.max_workers must be greater than 0".to_string(),
            });
        }

        if !is_identifier(&config.render.global_name) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "render.global_name `{}` is not a valid template identifier",
                    config.render.global_name
                ),
            });
        }

        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, config: &PartialsConfig) -> Result<(), ConfigError> {
        let config_path = self.config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(config_path, yaml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RenderMode;
    use std::fs;
    use tempfile::tempdir;

    fn write_config(dir: &Path, contents: &str) {
        let config_dir = dir.join(".partials");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.yaml"), contents).unwrap();
    }

    #[test]
    fn test_load_defaults_when_no_file() {
        let dir = tempdir().unwrap();
        let config = ConfigLoader::new(dir.path()).load_file().unwrap();
        assert_eq!(config, PartialsConfig::default());
    }

    #[test]
    fn test_load_config_from_yaml_file() {
        let dir = tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
render:
  markup: false
pool:
  max_workers: 2
templates:
  directory: templates
  mode: async
"#,
        );

        let loader = ConfigLoader::new(dir.path());
        let mut config = loader.load_file().unwrap();
        loader.resolve_paths(&mut config);

        assert!(!config.render.markup);
        assert_eq!(config.render.global_name, "render_partial");
        assert_eq!(config.pool.max_workers, 2);
        assert_eq!(config.templates.mode, RenderMode::Async);
        assert_eq!(config.templates.directory, Some(dir.path().join("templates")));
    }

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("PARTIALS_LOADER_TEST_VAR", "test_value");
        let loader = ConfigLoader::new(".");
        let result = loader.expand_env_vars("key: ${PARTIALS_LOADER_TEST_VAR}").unwrap();
        assert_eq!(result, "key: test_value");
        std::env::remove_var("PARTIALS_LOADER_TEST_VAR");
    }

    #[test]
    fn test_env_var_default() {
        let loader = ConfigLoader::new(".");
        let result = loader.expand_env_vars("key: ${PARTIALS_NONEXISTENT:-default}").unwrap();
        assert_eq!(result, "key: default");
    }

    #[test]
    fn test_env_var_missing_error() {
        let loader = ConfigLoader::new(".");
        match loader.expand_env_vars("key: ${PARTIALS_MISSING_VAR}") {
            Err(ConfigError::EnvVarNotFound { var }) => assert_eq!(var, "PARTIALS_MISSING_VAR"),
            other => panic!("Expected EnvVarNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_errors() {
        let loader = ConfigLoader::new(".");

        let mut config = PartialsConfig::default();
        config.pool.max_workers = 0;
        match loader.validate(&config) {
            Err(ConfigError::ValidationError { message }) => assert!(message.contains("max_workers")),
            other => panic!("Expected ValidationError, got {:?}", other),
        }

        let mut config = PartialsConfig::default();
        config.render.global_name = "render-partial".to_string();
        match loader.validate(&config) {
            Err(ConfigError::ValidationError { message }) => assert!(message.contains("global_name")),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_with_line_number() {
        let dir = tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
pool:
  max_workers: 2
  thread_name: [unclosed
"#,
        );

        match ConfigLoader::new(dir.path()).load_file() {
            Err(ConfigError::ParseError { line, .. }) => assert!(line.is_some()),
            other => panic!("Expected ParseError with line number, got {:?}", other),
        }
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path());

        let mut config = PartialsConfig::default();
        config.pool.max_workers = 12;
        config.render.global_name = "partial".to_string();
        loader.save(&config).unwrap();

        assert!(loader.config_path().exists());
        assert_eq!(loader.load_file().unwrap(), config);
    }

    #[test]
    fn test_config_path_sources() {
        let loader = ConfigLoader::new("/project");
        assert_eq!(loader.config_path_from(|_| None), PathBuf::from("/project/.partials/config.yaml"));
        assert_eq!(
            loader.config_path_from(|var| (var == vars::PARTIALS_CONFIG_PATH).then(|| "conf/partials.yaml".to_string())),
            PathBuf::from("/project/conf/partials.yaml")
        );

        let explicit = ConfigLoader::new("/project").with_config_file("/etc/partials.yaml");
        assert_eq!(
            explicit.config_path_from(|_| Some("ignored.yaml".to_string())),
            PathBuf::from("/etc/partials.yaml")
        );
    }

    #[test]
    fn test_load_reads_dotenv_before_expanding() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".env"), "PARTIALS_LOADER_DOTENV_WORKERS=3\n").unwrap();
        fs::write(
            dir.path().join("partials.yaml"),
            "pool:\n  max_workers: ${PARTIALS_LOADER_DOTENV_WORKERS}\n",
        )
        .unwrap();

        let config = ConfigLoader::new(dir.path())
            .with_config_file("partials.yaml")
            .load()
            .unwrap();
        assert_eq!(config.pool.max_workers, 3);
        std::env::remove_var("PARTIALS_LOADER_DOTENV_WORKERS");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("render_partial"));
        assert!(is_identifier("_partial2"));
        assert!(!is_identifier("2partial"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("render.partial"));
    }
}
