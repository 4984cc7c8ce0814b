//! minijinja-backed template engine for partials.
//!
//! [`JinjaEngine`] renders either synchronously or asynchronously, fixed when
//! it is built. Templates come from a [`TemplateSource`]: a directory, an
//! in-memory map, or a chain of both.

pub mod builder;
pub mod engine;
pub mod error;
pub mod source;

pub use builder::JinjaEngineBuilder;
pub use engine::{JinjaEngine, RenderErrorHook, WeakEngine};
pub use error::SourceError;
pub use partials_common_config::RenderMode;
pub use source::{ChainSource, FsSource, MemorySource, TemplateSource};
