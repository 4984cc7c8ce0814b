//! Template sources.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::error::SourceError;

/// Where template source text comes from.
///
/// `Ok(None)` means the template does not exist; the engine reports that as
/// minijinja's "template not found".
#[async_trait]
pub trait TemplateSource: Send + Sync + 'static {
    /// Load a template without blocking the runtime.
    async fn load(&self, name: &str) -> Result<Option<String>, SourceError>;

    /// Load a template from a plain thread.
    fn load_blocking(&self, name: &str) -> Result<Option<String>, SourceError>;
}

/// Templates read from a directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Read templates below `root`, which must be an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SourceError::NotADirectory(root));
        }
        Ok(Self { root })
    }

    /// Template directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a template name to a path under the root. `.` segments are
    /// skipped. Names that are empty, absolute, or climb out of the root
    /// map to nothing.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        let mut depth = 0usize;
        for component in Path::new(name).components() {
            match component {
                Component::Normal(segment) => {
                    path.push(segment);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        (depth > 0).then_some(path)
    }

    fn lookup_path(&self, name: &str) -> Option<PathBuf> {
        let path = self.resolve(name);
        match &path {
            Some(path) => trace!(template = name, path = %path.display(), "reading template"),
            None => trace!(template = name, "name outside the template directory"),
        }
        path
    }
}

fn not_found_as_none(name: &str, result: std::io::Result<String>) -> Result<Option<String>, SourceError> {
    match result {
        Ok(source) => Ok(Some(source)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SourceError::Io {
            name: name.to_string(),
            source,
        }),
    }
}

#[async_trait]
impl TemplateSource for FsSource {
    async fn load(&self, name: &str) -> Result<Option<String>, SourceError> {
        let Some(path) = self.lookup_path(name) else {
            return Ok(None);
        };
        not_found_as_none(name, tokio::fs::read_to_string(&path).await)
    }

    fn load_blocking(&self, name: &str) -> Result<Option<String>, SourceError> {
        let Some(path) = self.lookup_path(name) else {
            return Ok(None);
        };
        not_found_as_none(name, std::fs::read_to_string(&path))
    }
}

/// Templates held in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    templates: RwLock<HashMap<String, Arc<str>>>,
}

impl MemorySource {
    /// An empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    /// Add or replace a template.
    pub fn insert(&self, name: impl Into<String>, source: impl Into<String>) {
        let source: String = source.into();
        self.templates.write().insert(name.into(), Arc::from(source));
    }

    /// Whether a template with this name is held.
    pub fn contains(&self, name: &str) -> bool {
        self.templates.read().contains_key(name)
    }

    /// Number of templates held.
    pub fn len(&self) -> usize {
        self.templates.read().len()
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.templates.read().is_empty()
    }

    fn get(&self, name: &str) -> Option<String> {
        self.templates.read().get(name).map(|s| s.to_string())
    }
}

#[async_trait]
impl TemplateSource for MemorySource {
    async fn load(&self, name: &str) -> Result<Option<String>, SourceError> {
        Ok(self.get(name))
    }

    fn load_blocking(&self, name: &str) -> Result<Option<String>, SourceError> {
        Ok(self.get(name))
    }
}

/// Sources tried in order; the first one that has the template wins.
#[derive(Default)]
pub struct ChainSource {
    sources: Vec<Arc<dyn TemplateSource>>,
}

impl ChainSource {
    /// An empty chain that finds nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source. Earlier sources win.
    pub fn push(mut self, source: Arc<dyn TemplateSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Number of chained sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl TemplateSource for ChainSource {
    async fn load(&self, name: &str) -> Result<Option<String>, SourceError> {
        for source in &self.sources {
            if let Some(found) = source.load(name).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn load_blocking(&self, name: &str) -> Result<Option<String>, SourceError> {
        for source in &self.sources {
            if let Some(found) = source.load_blocking(name)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_fs_source_requires_directory() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            FsSource::new(dir.path().join("missing")),
            Err(SourceError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_fs_source_loads_nested_names() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("render")).unwrap();
        fs::write(dir.path().join("render/bare.html"), "<h1>bare</h1>").unwrap();

        let source = FsSource::new(dir.path()).unwrap();
        assert_eq!(source.load_blocking("render/bare.html").unwrap().as_deref(), Some("<h1>bare</h1>"));
        assert_eq!(source.load_blocking("render/nope.html").unwrap(), None);
    }

    #[test]
    fn test_fs_source_names_outside_root_are_missing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("secret.html"), "secret").unwrap();
        fs::create_dir(dir.path().join("templates")).unwrap();
        let source = FsSource::new(dir.path().join("templates")).unwrap();
        for name in ["../secret.html", "render/../../x.html", "/etc/passwd", "", "."] {
            assert_eq!(source.load_blocking(name).unwrap(), None, "{} should be missing", name);
        }
    }

    #[test]
    fn test_fs_source_skips_current_dir_segments() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("render")).unwrap();
        fs::write(dir.path().join("render/bare.html"), "<h1>bare</h1>").unwrap();

        let source = FsSource::new(dir.path()).unwrap();
        assert_eq!(source.resolve("./render/./bare.html"), Some(dir.path().join("render/bare.html")));
        assert_eq!(source.load_blocking("./render/bare.html").unwrap().as_deref(), Some("<h1>bare</h1>"));
    }

    #[test]
    fn test_fs_source_async_load() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("page.html"), "page").unwrap();
        let source = FsSource::new(dir.path()).unwrap();

        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let loaded = rt.block_on(source.load("page.html")).unwrap();
        assert_eq!(loaded.as_deref(), Some("page"));
    }

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new().with("a.html", "A");
        source.insert("b.html", "B");
        assert_eq!(source.len(), 2);
        assert_eq!(source.load_blocking("b.html").unwrap().as_deref(), Some("B"));
        assert_eq!(tokio_test::block_on(source.load("a.html")).unwrap().as_deref(), Some("A"));
        assert_eq!(source.load_blocking("c.html").unwrap(), None);
    }

    #[test]
    fn test_chain_source_order() {
        let first = Arc::new(MemorySource::new().with("shared.html", "first"));
        let second = Arc::new(MemorySource::new().with("shared.html", "second").with("only.html", "only"));
        let chain = ChainSource::new().push(first).push(second);

        assert_eq!(chain.load_blocking("shared.html").unwrap().as_deref(), Some("first"));
        assert_eq!(chain.load_blocking("only.html").unwrap().as_deref(), Some("only"));
        assert_eq!(chain.load_blocking("none.html").unwrap(), None);
    }
}
