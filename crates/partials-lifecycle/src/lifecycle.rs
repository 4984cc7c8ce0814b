//! Application lifecycle: ordered hooks, shared state, phases.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use partials_common_log::spans::lifecycle_span;
use partials_common_thread::PoolError;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::hooks::{HookError, StartHook, StopHook};
use crate::state::AppState;

static NEXT_APP_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique application identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppId(u64);

impl AppId {
    fn next() -> Self {
        Self(NEXT_APP_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric id, unique within the process.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app-{}", self.0)
    }
}

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Built, not started. Hooks and bindings may be added.
    Created,
    /// Start hooks have run.
    Running,
    /// Stop hooks are running.
    Stopping,
    /// Every stop hook has run.
    Stopped,
}

impl Phase {
    /// Lowercase phase name, as logged.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The operation is not allowed in the current phase.
    #[error("cannot {operation} while the application is {phase}")]
    InvalidPhase {
        /// What was attempted.
        operation: &'static str,
        /// Phase at the time.
        phase: Phase,
    },

    /// A start hook failed; later start hooks did not run.
    #[error("start hook #{index} failed: {source}")]
    StartHook {
        /// Position of the hook in registration order.
        index: usize,
        /// The hook's error.
        #[source]
        source: HookError,
    },

    /// One or more stop hooks failed. Every stop hook still ran.
    #[error("{} stop hook(s) failed: {}", .0.len(), join_errors(.0))]
    StopHooks(Vec<HookError>),

    /// A worker pool error outside any hook.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

fn join_errors(errors: &[HookError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

pub(crate) struct Inner {
    pub(crate) phase: Phase,
    pub(crate) start_hooks: Vec<StartHook>,
    pub(crate) stop_hooks: Vec<StopHook>,
    pub(crate) state: AppState,
}

impl Inner {
    pub(crate) fn push_start(&mut self, hook: StartHook) -> Result<(), LifecycleError> {
        if self.phase != Phase::Created {
            return Err(LifecycleError::InvalidPhase {
                operation: "add a start hook",
                phase: self.phase,
            });
        }
        self.start_hooks.push(hook);
        Ok(())
    }

    pub(crate) fn push_stop(&mut self, hook: StopHook) -> Result<(), LifecycleError> {
        if matches!(self.phase, Phase::Stopping | Phase::Stopped) {
            return Err(LifecycleError::InvalidPhase {
                operation: "add a stop hook",
                phase: self.phase,
            });
        }
        self.stop_hooks.push(hook);
        Ok(())
    }
}

/// Handle to an application's lifecycle. Clones share the same lifecycle.
///
/// Hooks run while the lifecycle is locked; they receive the state map as an
/// argument and must not call back into the same `Lifecycle`.
#[derive(Clone)]
pub struct Lifecycle {
    id: AppId,
    inner: Arc<Mutex<Inner>>,
}

impl Lifecycle {
    /// A new application in [`Phase::Created`] with a fresh [`AppId`].
    pub fn new() -> Self {
        Self {
            id: AppId::next(),
            inner: Arc::new(Mutex::new(Inner {
                phase: Phase::Created,
                start_hooks: Vec::new(),
                stop_hooks: Vec::new(),
                state: AppState::new(),
            })),
        }
    }

    /// Identity of this application.
    pub fn id(&self) -> AppId {
        self.id
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    /// Append a start hook. Only allowed before startup.
    pub fn on_start<F>(&self, hook: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(&mut AppState) -> Result<(), HookError> + Send + 'static,
    {
        self.inner.lock().push_start(Box::new(hook))
    }

    /// Append a stop hook. Only allowed before shutdown begins.
    pub fn on_stop<F>(&self, hook: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(&AppState) -> Result<(), HookError> + Send + 'static,
    {
        self.inner.lock().push_stop(Box::new(hook))
    }

    /// Run start hooks in registration order.
    ///
    /// The first failing hook aborts startup and the phase stays `Created`.
    pub fn startup(&self) -> Result<(), LifecycleError> {
        let span = lifecycle_span(self.id.as_u64(), "startup");
        let _guard = span.enter();

        let mut inner = self.inner.lock();
        if inner.phase != Phase::Created {
            return Err(LifecycleError::InvalidPhase {
                operation: "start",
                phase: inner.phase,
            });
        }

        let hooks = std::mem::take(&mut inner.start_hooks);
        debug!(hooks = hooks.len(), "running start hooks");
        for (index, hook) in hooks.into_iter().enumerate() {
            if let Err(source) = hook(&mut inner.state) {
                warn!(index, error = %source, "start hook failed");
                return Err(LifecycleError::StartHook { index, source });
            }
        }

        inner.phase = Phase::Running;
        info!(app = %self.id, "application started");
        Ok(())
    }

    /// Run stop hooks in registration order, exactly once.
    ///
    /// Later calls return `Ok` without running anything. Every hook runs even
    /// when an earlier one fails.
    pub fn shutdown(&self) -> Result<(), LifecycleError> {
        let span = lifecycle_span(self.id.as_u64(), "shutdown");
        let _guard = span.enter();

        let mut inner = self.inner.lock();
        if matches!(inner.phase, Phase::Stopping | Phase::Stopped) {
            debug!("shutdown already ran");
            return Ok(());
        }

        info!(app = %self.id, "shutting down application");
        inner.phase = Phase::Stopping;

        let hooks = std::mem::take(&mut inner.stop_hooks);
        let mut errors = Vec::new();
        for (index, hook) in hooks.into_iter().enumerate() {
            if let Err(e) = hook(&inner.state) {
                warn!(index, error = %e, "stop hook failed");
                errors.push(e);
            }
        }

        inner.phase = Phase::Stopped;
        info!(app = %self.id, "application stopped");

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::StopHooks(errors))
        }
    }

    /// Shared state of type `T`, if any was inserted.
    pub fn state<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner.lock().state.get::<T>()
    }

    /// Store `value`, returning the previous value of the same type.
    pub fn insert_state<T: Any + Send + Sync>(&self, value: T) -> Option<Arc<T>> {
        self.inner.lock().state.insert(value)
    }

    pub(crate) fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .finish()
    }
}

/// An application that owns a [`Lifecycle`].
pub trait HostApp {
    /// The application's lifecycle.
    fn lifecycle(&self) -> &Lifecycle;
}

impl HostApp for Lifecycle {
    fn lifecycle(&self) -> &Lifecycle {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) + Clone) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, move |entry| sink.lock().push(entry))
    }

    #[test]
    fn test_app_ids_are_unique() {
        assert_ne!(Lifecycle::new().id(), Lifecycle::new().id());
    }

    #[test]
    fn test_start_hooks_run_in_order_and_share_state() {
        let lifecycle = Lifecycle::new();
        let (log, record) = recorder();

        let r = record.clone();
        lifecycle
            .on_start(move |state| {
                r("first");
                state.insert("connection".to_string());
                Ok(())
            })
            .unwrap();
        lifecycle
            .on_start(move |state| {
                assert_eq!(state.get::<String>().unwrap().as_str(), "connection");
                record("second");
                Ok(())
            })
            .unwrap();

        lifecycle.startup().unwrap();
        assert_eq!(*log.lock(), vec!["first", "second"]);
        assert_eq!(lifecycle.phase(), Phase::Running);
        assert_eq!(lifecycle.state::<String>().unwrap().as_str(), "connection");
    }

    #[test]
    fn test_failed_start_hook_stops_startup() {
        let lifecycle = Lifecycle::new();
        lifecycle.on_start(|_| Err(HookError::msg("boom"))).unwrap();

        match lifecycle.startup() {
            Err(LifecycleError::StartHook { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected StartHook error, got {:?}", other),
        }
        assert_eq!(lifecycle.phase(), Phase::Created);
    }

    #[test]
    fn test_startup_twice_fails() {
        let lifecycle = Lifecycle::new();
        lifecycle.startup().unwrap();
        assert!(matches!(
            lifecycle.startup(),
            Err(LifecycleError::InvalidPhase { phase: Phase::Running, .. })
        ));
        assert!(lifecycle.on_start(|_| Ok(())).is_err());
    }

    #[test]
    fn test_stop_hooks_run_once_in_order() {
        let lifecycle = Lifecycle::new();
        let (log, record) = recorder();

        let r = record.clone();
        lifecycle
            .on_stop(move |_| {
                r("app cleanup");
                Ok(())
            })
            .unwrap();
        lifecycle
            .on_stop(move |_| {
                record("pool drain");
                Ok(())
            })
            .unwrap();

        lifecycle.startup().unwrap();
        lifecycle.shutdown().unwrap();
        lifecycle.shutdown().unwrap();

        assert_eq!(*log.lock(), vec!["app cleanup", "pool drain"]);
        assert_eq!(lifecycle.phase(), Phase::Stopped);
    }

    #[test]
    fn test_every_stop_hook_runs_despite_failures() {
        let lifecycle = Lifecycle::new();
        let (log, record) = recorder();

        lifecycle.on_stop(|_| Err(HookError::msg("first failed"))).unwrap();
        lifecycle
            .on_stop(move |_| {
                record("ran");
                Ok(())
            })
            .unwrap();
        lifecycle.on_stop(|_| Err(HookError::msg("third failed"))).unwrap();

        match lifecycle.shutdown() {
            Err(LifecycleError::StopHooks(errors)) => {
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected StopHooks error, got {:?}", other),
        }
        assert_eq!(*log.lock(), vec!["ran"]);
        assert!(lifecycle.on_stop(|_| Ok(())).is_err());
    }

    #[test]
    fn test_clones_share_lifecycle() {
        let lifecycle = Lifecycle::new();
        let clone = lifecycle.clone();
        clone.insert_state(7_u32);
        assert_eq!(*lifecycle.state::<u32>().unwrap(), 7);
        assert_eq!(clone.id(), lifecycle.id());
    }
}
