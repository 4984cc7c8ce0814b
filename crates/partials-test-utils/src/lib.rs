//! Test utilities for partials crates.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fixture templates as `(name, source)` pairs.
///
/// `render/recursive.html` calls the `render_partial` global, so it needs a
/// registered engine.
pub const FIXTURES: &[(&str, &str)] = &[
    ("render/bare.html", "<h1>This is bare HTML fragment</h1>\n"),
    (
        "render/with_data.html",
        "<span>Your name is {{ name }} and age is {{ age }}</span>\n",
    ),
    (
        "render/layout.html",
        "<html>\n<head><title>Jinja Partials Test Template</title></head>\n<body>{% block main %}{% endblock %}</body>\n</html>\n",
    ),
    (
        "render/with_layout.html",
        "{% extends \"render/layout.html\" %}{% block main %}<p>{{ message }}</p>{% endblock %}",
    ),
    (
        "render/recursive.html",
        "<div>{{ message }}</div>\n{{ render_partial('render/inner.html', inner=inner) }}\n",
    ),
    ("render/inner.html", "<p class=\"inner\">{{ inner }}</p>"),
    (
        "render/plain_wrapper.html",
        "<div>{{ render_partial('render/bare.html', markup=false) }}</div>",
    ),
];

/// Creates a temporary directory that is cleaned up on drop.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Creates a temporary file with given content.
pub fn temp_file(content: &str) -> (TempDir, PathBuf) {
    let dir = temp_dir();
    let path = dir.path().join("test_file");
    std::fs::write(&path, content).expect("Failed to write temp file");
    (dir, path)
}

/// Write every fixture template into `root`.
pub fn write_fixtures(root: &Path) {
    for (name, source) in FIXTURES {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture dir");
        }
        std::fs::write(&path, source).expect("Failed to write fixture");
    }
}

/// A temporary template directory holding [`FIXTURES`].
pub fn fixture_dir() -> TempDir {
    let dir = temp_dir();
    write_fixtures(dir.path());
    dir
}

/// Macro for async tests with tokio runtime.
#[macro_export]
macro_rules! async_test {
    ($name:ident, $body:expr) => {
        #[tokio::test]
        async fn $name() {
            $body
        }
    };
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err and return the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}

/// Assert that rendered output contains a fragment.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {{
        let haystack = &$haystack;
        let haystack: &str = ::std::convert::AsRef::<str>::as_ref(haystack);
        let needle: &str = $needle;
        assert!(
            haystack.contains(needle),
            "expected output to contain {:?}\n--- output ---\n{}",
            needle,
            haystack
        );
    }};
}
