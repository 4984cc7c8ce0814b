//! Async runtime utilities.
//!
//! [`run_isolated`] is the only place in the workspace that creates a
//! per-task runtime: it builds a current-thread runtime, drives one future to
//! completion, and tears the runtime down before returning.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::broadcast;
use tracing::trace;

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The calling thread is already inside a tokio runtime.
    #[error("cannot drive a future to completion on a thread that is already running an async runtime")]
    NestedRuntime,

    /// The runtime could not be built.
    #[error("failed to build async runtime: {0}")]
    Build(#[from] std::io::Error),
}

/// Configuration for a host runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of worker threads (0 = num_cpus).
    pub worker_threads: usize,
    /// Thread name prefix.
    pub thread_name: String,
    /// Enable I/O driver.
    pub enable_io: bool,
    /// Enable time driver.
    pub enable_time: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0, // Use num_cpus
            thread_name: "partials".to_string(),
            enable_io: true,
            enable_time: true,
        }
    }
}

/// Build a configured multi-threaded Tokio runtime.
pub fn build_runtime(config: RuntimeConfig) -> std::io::Result<Runtime> {
    let mut builder = Builder::new_multi_thread();

    if config.worker_threads > 0 {
        builder.worker_threads(config.worker_threads);
    }

    builder.thread_name(&config.thread_name);

    if config.enable_io {
        builder.enable_io();
    }

    if config.enable_time {
        builder.enable_time();
    }

    builder.build()
}

/// Build a single-threaded runtime owned by the calling thread.
pub fn build_isolated_runtime() -> std::io::Result<Runtime> {
    Builder::new_current_thread().enable_all().build()
}

/// Whether the calling thread is inside a tokio runtime context.
pub fn in_runtime_context() -> bool {
    Handle::try_current().is_ok()
}

/// Drive `future` to completion on a fresh runtime private to this call.
///
/// The runtime, and anything spawned onto it, is dropped before this returns,
/// whether the future succeeded or not. Fails with
/// [`RuntimeError::NestedRuntime`] when called from inside a runtime.
pub fn run_isolated<F>(future: F) -> Result<F::Output, RuntimeError>
where
    F: Future,
{
    if in_runtime_context() {
        return Err(RuntimeError::NestedRuntime);
    }

    let runtime = build_isolated_runtime()?;
    trace!("isolated runtime started");
    let output = runtime.block_on(future);
    drop(runtime);
    trace!("isolated runtime torn down");

    Ok(output)
}

/// A handle for coordinating graceful shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: broadcast::Sender<()>,
    fired: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Create a new shutdown handle.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a receiver for shutdown signals.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Signal shutdown to all receivers.
    pub fn shutdown(&self) {
        self.fired.store(true, Ordering::SeqCst);
        let _ = self.sender.send(());
    }

    /// Whether shutdown has been signalled.
    pub fn is_shutdown(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown is signalled, including signals sent earlier.
    pub async fn signalled(&self) {
        let mut rx = self.sender.subscribe();
        if self.is_shutdown() {
            return;
        }
        let _ = rx.recv().await;
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_run_isolated_returns_output() {
        let result = run_isolated(async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            42
        });
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_run_isolated_supports_blocking_pool() {
        let result = run_isolated(async {
            tokio::task::spawn_blocking(|| "from blocking pool").await.unwrap()
        });
        assert_eq!(result.unwrap(), "from blocking pool");
    }

    #[test]
    fn test_run_isolated_drops_spawned_tasks() {
        let flag = Arc::new(AtomicBool::new(false));
        let f = flag.clone();

        run_isolated(async move {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                f.store(true, Ordering::SeqCst);
            });
        })
        .unwrap();

        // The runtime is gone, so is the leftover task.
        assert!(!in_runtime_context());
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_run_isolated_refuses_nested_runtime() {
        let result = run_isolated(async { 1 });
        assert!(matches!(result, Err(RuntimeError::NestedRuntime)));
    }

    #[test]
    fn test_in_runtime_context() {
        assert!(!in_runtime_context());
        let runtime = build_isolated_runtime().unwrap();
        runtime.block_on(async { assert!(in_runtime_context()) });
    }

    #[test]
    fn test_runtime_config_default() {
        let config = RuntimeConfig::default();
        assert_eq!(config.worker_threads, 0);
        assert_eq!(config.thread_name, "partials");
        assert!(config.enable_io);
        assert!(config.enable_time);
    }

    #[test]
    fn test_runtime_build() {
        let config = RuntimeConfig {
            worker_threads: 2,
            thread_name: "test-runtime".to_string(),
            enable_io: true,
            enable_time: true,
        };

        let runtime = build_runtime(config).expect("Should build runtime");
        let result = runtime.block_on(async { tokio::spawn(async { 42 }).await.unwrap() });
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn test_shutdown_handle() {
        let handle = ShutdownHandle::new();
        let mut rx = handle.subscribe();

        tokio::spawn({
            let handle = handle.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                handle.shutdown();
            }
        });

        let _ = rx.recv().await;
        assert!(handle.is_shutdown());
    }

    #[test]
    fn test_signalled_after_shutdown_resolves() {
        let handle = ShutdownHandle::new();
        handle.shutdown();
        tokio_test::block_on(handle.signalled());
    }
}
