//! Binding a dedicated worker pool to an application's lifecycle.

use std::sync::Arc;

use partials_common_log::spans::pool_span;
use partials_common_log::timed;
use partials_common_thread::{PoolConfig, PoolError, WorkerPool};
use tracing::{debug, info};

use crate::hooks::HookError;
use crate::lifecycle::{HostApp, LifecycleError, Phase};

/// The pool bound to an application, kept in its lifecycle state.
#[derive(Debug, Clone)]
pub struct BoundPool {
    pool: Arc<WorkerPool>,
    max_workers: usize,
}

impl BoundPool {
    /// The pool bound to the application.
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Worker count requested when the pool was bound.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }
}

/// Pool factory used when the caller has no preference.
pub fn default_factory(max_workers: usize) -> Result<WorkerPool, PoolError> {
    WorkerPool::with_config(PoolConfig::with_workers(max_workers).thread_name("partials-app"))
}

/// Bind a worker pool to `app`'s lifecycle.
///
/// The first call creates the pool with `factory(max_workers)`, records it as
/// [`BoundPool`] state, appends a start hook that fails if the pool is no
/// longer running, and appends a stop hook that drains the pool. Existing
/// hooks are kept. Later calls for the same application return the pool
/// already bound and do not call `factory`. Binding a new pool is only
/// possible before startup.
pub fn bind_lifecycle<F>(app: &dyn HostApp, max_workers: usize, factory: F) -> Result<Arc<WorkerPool>, LifecycleError>
where
    F: FnOnce(usize) -> Result<WorkerPool, PoolError>,
{
    let lifecycle = app.lifecycle();
    let app_id = lifecycle.id();

    lifecycle.with_inner(|inner| {
        if let Some(bound) = inner.state.get::<BoundPool>() {
            debug!(app = %app_id, pool = %bound.pool.name(), "application already has a bound pool");
            return Ok(Arc::clone(&bound.pool));
        }

        if inner.phase != Phase::Created {
            return Err(LifecycleError::InvalidPhase {
                operation: "bind a worker pool",
                phase: inner.phase,
            });
        }

        let pool = Arc::new(factory(max_workers)?);

        let on_start = Arc::clone(&pool);
        inner.push_start(Box::new(move |_| {
            if on_start.is_running() {
                Ok(())
            } else {
                Err(HookError::msg(format!(
                    "worker pool `{}` is {:?}; it cannot serve renders",
                    on_start.name(),
                    on_start.state()
                )))
            }
        }))?;

        let on_stop = Arc::clone(&pool);
        inner.push_stop(Box::new(move |_| {
            let span = pool_span(on_stop.name(), "drain");
            let _guard = span.enter();
            info!(pool = %on_stop.name(), "draining bound worker pool");
            timed!("pool_drain", on_stop.shutdown())?;
            Ok(())
        }))?;

        inner.state.insert(BoundPool {
            pool: Arc::clone(&pool),
            max_workers,
        });
        info!(app = %app_id, pool = %pool.name(), max_workers, "bound worker pool to application lifecycle");
        Ok(pool)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Lifecycle;
    use partials_common_thread::PoolState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use test_case::test_case;

    #[test]
    fn test_binding_creates_pool_and_state() {
        let app = Lifecycle::new();
        let pool = bind_lifecycle(&app, 2, default_factory).unwrap();

        assert_eq!(pool.capacity(), 2);
        let bound = app.state::<BoundPool>().unwrap();
        assert!(Arc::ptr_eq(bound.pool(), &pool));
        assert_eq!(bound.max_workers(), 2);
    }

    #[test]
    fn test_binding_twice_reuses_pool() {
        let app = Lifecycle::new();
        let calls = AtomicUsize::new(0);
        let counting = |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            default_factory(n)
        };

        let first = bind_lifecycle(&app, 4, counting).unwrap();
        let second = bind_lifecycle(&app, 4, counting).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_drains_in_flight_work() {
        let app = Lifecycle::new();
        let pool = bind_lifecycle(&app, 2, default_factory).unwrap();
        app.startup().unwrap();

        let handle = pool
            .submit(|| {
                std::thread::sleep(Duration::from_millis(50));
                "done"
            })
            .unwrap();

        app.shutdown().unwrap();
        assert_eq!(handle.join().unwrap(), "done");
        assert_eq!(pool.state(), PoolState::ShutDown);
        assert!(matches!(pool.submit(|| ()), Err(PoolError::ShutDown(_))));
    }

    #[test]
    fn test_app_stop_hooks_registered_first_see_a_live_pool() {
        let app = Lifecycle::new();
        let observed = Arc::new(parking_lot::Mutex::new(None));

        let seen = Arc::clone(&observed);
        app.on_stop(move |state| {
            let bound = state.get::<BoundPool>().ok_or_else(|| HookError::msg("no pool"))?;
            *seen.lock() = Some(bound.pool().is_running());
            Ok(())
        })
        .unwrap();

        let pool = bind_lifecycle(&app, 1, default_factory).unwrap();
        app.shutdown().unwrap();

        assert_eq!(*observed.lock(), Some(true));
        assert!(!pool.is_running());
    }

    #[test]
    fn test_start_hook_rejects_dead_pool() {
        let app = Lifecycle::new();
        let pool = bind_lifecycle(&app, 1, default_factory).unwrap();
        pool.shutdown().unwrap();

        assert!(matches!(app.startup(), Err(LifecycleError::StartHook { .. })));
        assert_eq!(app.phase(), Phase::Created);
    }

    #[test]
    fn test_independent_apps_get_independent_pools() {
        let a = Lifecycle::new();
        let b = Lifecycle::new();
        let pool_a = bind_lifecycle(&a, 1, default_factory).unwrap();
        let pool_b = bind_lifecycle(&b, 1, default_factory).unwrap();

        a.shutdown().unwrap();
        assert!(!pool_a.is_running());
        assert!(pool_b.is_running());
        b.shutdown().unwrap();
    }

    #[test]
    fn test_binding_after_shutdown_fails() {
        let app = Lifecycle::new();
        app.shutdown().unwrap();
        assert!(matches!(
            bind_lifecycle(&app, 1, default_factory),
            Err(LifecycleError::InvalidPhase { .. })
        ));
        assert!(app.state::<BoundPool>().is_none());
    }

    #[test_case(1)]
    #[test_case(4)]
    fn test_capacity_follows_max_workers(max_workers: usize) {
        let app = Lifecycle::new();
        let pool = bind_lifecycle(&app, max_workers, default_factory).unwrap();
        assert_eq!(pool.capacity(), max_workers);
        app.shutdown().unwrap();
    }

    #[test]
    fn test_factory_error_propagates() {
        let app = Lifecycle::new();
        let result = bind_lifecycle(&app, 0, default_factory);
        assert!(matches!(result, Err(LifecycleError::Pool(PoolError::ZeroCapacity))));
    }
}
