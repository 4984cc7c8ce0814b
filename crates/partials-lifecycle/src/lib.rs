//! Host application lifecycle for partials.
//!
//! A [`Lifecycle`] holds ordered start and stop hooks plus a typed state map.
//! [`bind_lifecycle`] attaches a dedicated worker pool to it, drained when the
//! application shuts down.

pub mod binder;
pub mod hooks;
pub mod lifecycle;
pub mod state;

pub use binder::{bind_lifecycle, default_factory, BoundPool};
pub use hooks::{HookError, StartHook, StopHook};
pub use lifecycle::{AppId, HostApp, Lifecycle, LifecycleError, Phase};
pub use state::AppState;
