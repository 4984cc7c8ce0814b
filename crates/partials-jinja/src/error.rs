//! Template source errors.

use std::path::PathBuf;

use minijinja::ErrorKind;
use thiserror::Error;

/// Failures while loading template source text.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The configured template directory is missing or not a directory.
    #[error("template directory does not exist: {0}")]
    NotADirectory(PathBuf),

    /// Reading an existing template failed.
    #[error("failed to read template `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<SourceError> for minijinja::Error {
    fn from(err: SourceError) -> Self {
        minijinja::Error::new(ErrorKind::InvalidOperation, err.to_string()).with_source(err)
    }
}
