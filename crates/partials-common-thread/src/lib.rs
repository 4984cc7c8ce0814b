//! Thread management utilities.
//!
//! This crate provides utilities for managing threads including:
//! - Named thread spawning with shutdown coordination
//! - Worker pools that drain admitted work before shutting down
//! - Panic handling utilities

#![warn(missing_docs)]

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, UnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Default number of workers in a pool.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Default thread name prefix for pool workers.
pub const DEFAULT_THREAD_NAME: &str = "partials-worker";

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // Id of the pool owning the current thread, 0 when not a pool worker.
    static CURRENT_POOL: Cell<u64> = const { Cell::new(0) };
}

/// Worker pool errors.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool finished shutting down.
    #[error("worker pool `{0}` is shut down")]
    ShutDown(String),

    /// The pool is draining and admits no new work.
    #[error("worker pool `{0}` is draining and does not accept new tasks")]
    Draining(String),

    /// The task panicked while running.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was dropped without producing a result.
    #[error("task result channel closed before completion")]
    Disconnected,

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Shutdown was requested from a thread owned by the pool.
    #[error("worker pool `{0}` cannot be shut down from one of its own workers")]
    ShutdownFromWorker(String),

    /// A pool needs at least one worker.
    #[error("worker pool capacity must be at least 1")]
    ZeroCapacity,
}

/// A handle to a named, managed thread.
pub struct ManagedThread {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    name: String,
}

impl ManagedThread {
    /// Spawn a new named thread.
    pub fn spawn<F>(name: impl Into<String>, f: F) -> std::io::Result<Self>
    where
        F: FnOnce(ShutdownSignal) + Send + 'static,
    {
        let name = name.into();
        let shutdown = Arc::new(AtomicBool::new(false));
        let signal = ShutdownSignal(shutdown.clone());

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || f(signal))?;

        Ok(Self {
            handle: Some(handle),
            shutdown,
            name,
        })
    }

    /// Signal the thread to shut down.
    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Wait for the thread to complete.
    pub fn join(mut self) -> thread::Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }

    /// Signal shutdown and wait.
    pub fn shutdown(self) -> thread::Result<()> {
        self.signal_shutdown();
        self.join()
    }

    /// Get the thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if shutdown was requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl Drop for ManagedThread {
    fn drop(&mut self) {
        self.signal_shutdown();
        // Note: We don't join in Drop to avoid blocking
    }
}

impl std::fmt::Debug for ManagedThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedThread")
            .field("name", &self.name)
            .field("shutdown_requested", &self.is_shutdown_requested())
            .finish()
    }
}

/// A signal to check for shutdown requests.
#[derive(Debug, Clone)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    /// Check if shutdown was requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle state of a [`WorkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Accepting and running tasks.
    Running,
    /// No new tasks admitted; admitted tasks still running.
    Draining,
    /// Every worker has exited.
    ShutDown,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Draining,
            _ => Self::ShutDown,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Draining => 1,
            Self::ShutDown => 2,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub max_workers: usize,
    /// Thread name prefix; workers are named `{prefix}-{index}`.
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl PoolConfig {
    /// Config with the given capacity and the default thread name.
    pub fn with_workers(max_workers: usize) -> Self {
        Self {
            max_workers,
            ..Self::default()
        }
    }

    /// Set the thread name prefix.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolMetrics {
    /// Worker capacity.
    pub capacity: usize,
    /// Tasks admitted but not yet finished.
    pub pending: usize,
    /// Tasks finished, including ones that panicked.
    pub completed: u64,
}

#[derive(Debug, Default)]
struct PoolCounters {
    pending: AtomicUsize,
    completed: AtomicU64,
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size thread pool for blocking work.
///
/// Tasks queue without limit once every worker is busy. [`WorkerPool::shutdown`]
/// stops admission, lets every admitted task finish, then joins the workers.
pub struct WorkerPool {
    id: u64,
    name: String,
    capacity: usize,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<ManagedThread>>,
    state: AtomicU8,
    shutdown_lock: Mutex<()>,
    counters: Arc<PoolCounters>,
}

impl WorkerPool {
    /// Create a new pool with the given number of workers.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::with_workers(size))
    }

    /// Create a new pool from a config.
    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        if config.max_workers == 0 {
            return Err(PoolError::ZeroCapacity);
        }

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();

        let mut workers = Vec::with_capacity(config.max_workers);
        for i in 0..config.max_workers {
            let rx = receiver.clone();
            let worker = ManagedThread::spawn(format!("{}-{}", config.thread_name, i), move |signal| {
                worker_loop(id, rx, signal)
            })?;
            workers.push(worker);
        }

        debug!(
            pool = %config.thread_name,
            workers = config.max_workers,
            "worker pool started"
        );

        Ok(Self {
            id,
            name: config.thread_name,
            capacity: config.max_workers,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            state: AtomicU8::new(PoolState::Running.as_u8()),
            shutdown_lock: Mutex::new(()),
            counters: Arc::new(PoolCounters::default()),
        })
    }

    /// Submit a task to the pool.
    ///
    /// Fails once shutdown has begun. The returned handle yields the task's
    /// result, or [`PoolError::Panicked`] if it panicked.
    pub fn submit<F, T>(&self, task: F) -> Result<TaskHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            return Err(self.rejection());
        };

        let (tx, rx) = crossbeam_channel::bounded(1);
        let counters = Arc::clone(&self.counters);
        counters.pending.fetch_add(1, Ordering::SeqCst);

        let job: Job = Box::new(move || {
            let outcome = catch_panic(AssertUnwindSafe(task));
            counters.pending.fetch_sub(1, Ordering::SeqCst);
            counters.completed.fetch_add(1, Ordering::SeqCst);
            // The caller may have dropped its handle.
            let _ = tx.send(outcome);
        });

        if sender.send(job).is_err() {
            self.counters.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(PoolError::ShutDown(self.name.clone()));
        }

        Ok(TaskHandle { rx })
    }

    /// Stop admitting tasks, wait for admitted tasks, and join every worker.
    ///
    /// Calling this again after it returned is a no-op. Concurrent callers
    /// all return only once the workers are joined.
    pub fn shutdown(&self) -> Result<(), PoolError> {
        if self.is_current_worker() {
            return Err(PoolError::ShutdownFromWorker(self.name.clone()));
        }

        let _serialized = self.shutdown_lock.lock();
        if self.state() == PoolState::ShutDown {
            return Ok(());
        }

        {
            let mut sender = self.sender.lock();
            self.set_state(PoolState::Draining);
            // Workers finish the queued jobs, then see the channel disconnect.
            sender.take();
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        debug!(pool = %self.name, workers = workers.len(), "draining worker pool");

        for worker in workers {
            let name = worker.name().to_string();
            if worker.join().is_err() {
                warn!(pool = %self.name, worker = %name, "worker thread panicked during shutdown");
            }
        }

        self.set_state(PoolState::ShutDown);
        debug!(pool = %self.name, "worker pool shut down");
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the pool still admits tasks.
    pub fn is_running(&self) -> bool {
        self.state() == PoolState::Running
    }

    /// Whether the calling thread is one of this pool's workers.
    pub fn is_current_worker(&self) -> bool {
        CURRENT_POOL.with(|current| current.get() == self.id)
    }

    /// Unique pool id within the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Pool name (thread name prefix).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Worker capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the pool counters.
    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            capacity: self.capacity,
            pending: self.counters.pending.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
        }
    }

    fn set_state(&self, state: PoolState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn rejection(&self) -> PoolError {
        match self.state() {
            PoolState::Draining => PoolError::Draining(self.name.clone()),
            _ => PoolError::ShutDown(self.name.clone()),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("state", &self.state())
            .finish()
    }
}

fn worker_loop(pool_id: u64, rx: Receiver<Job>, signal: ShutdownSignal) {
    CURRENT_POOL.with(|current| current.set(pool_id));

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(job) => job(),
            Err(RecvTimeoutError::Timeout) => {
                if signal.is_requested() && rx.is_empty() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    CURRENT_POOL.with(|current| current.set(0));
}

/// Handle to a task submitted to a [`WorkerPool`].
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: Receiver<Result<T, String>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task finishes and return its result.
    pub fn join(self) -> Result<T, PoolError> {
        match self.rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(PoolError::Panicked(message)),
            Err(_) => Err(PoolError::Disconnected),
        }
    }

    /// Whether the task has produced its result.
    pub fn is_finished(&self) -> bool {
        !self.rx.is_empty()
    }
}

/// Id of the pool owning the current thread, if any.
pub fn current_pool_id() -> Option<u64> {
    CURRENT_POOL.with(|current| match current.get() {
        0 => None,
        id => Some(id),
    })
}

/// Catch panics and convert to Result.
pub fn catch_panic<F, T>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T + UnwindSafe,
{
    std::panic::catch_unwind(f).map_err(|e| panic_message(e.as_ref()))
}

/// Render a panic payload as text.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
