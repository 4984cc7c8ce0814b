//! Running template renders from synchronous code.
//!
//! Template functions are plain synchronous calls, so a partial on an async
//! engine cannot await its render. [`render_blocking`] hands the render to a
//! worker pool thread, which drives it on a fresh single-threaded runtime
//! owned by that one task, and blocks until the result is back.

use std::cell::Cell;
use std::sync::Arc;
use std::thread;

use minijinja::{ErrorKind, Value};
use once_cell::sync::OnceCell;
use partials_common_async::run_isolated;
use partials_common_log::spans::{partial_span, record_error, Timer};
use partials_common_thread::{panic_message, PoolConfig, PoolError, WorkerPool};
use partials_core::{PartialsError, RenderFuture, TemplateEngine};
use tracing::{debug, trace};

/// Capacity of the process-wide default pool.
pub const DEFAULT_POOL_WORKERS: usize = 4;

/// Thread name prefix of the default pool.
pub const DEFAULT_POOL_NAME: &str = "partials-default";

static DEFAULT_POOL: OnceCell<Arc<WorkerPool>> = OnceCell::new();

thread_local! {
    // Pool id an overflow thread is standing in for, 0 otherwise.
    static OVERFLOW_FOR: Cell<u64> = const { Cell::new(0) };
}

/// The process-wide pool used when no application lifecycle is bound.
///
/// Created on first use and never shut down.
pub fn default_pool() -> Result<Arc<WorkerPool>, PoolError> {
    DEFAULT_POOL
        .get_or_try_init(|| {
            debug!(workers = DEFAULT_POOL_WORKERS, "starting default partials pool");
            let config = PoolConfig::with_workers(DEFAULT_POOL_WORKERS).thread_name(DEFAULT_POOL_NAME);
            WorkerPool::with_config(config).map(Arc::new)
        })
        .map(Arc::clone)
}

/// Render `name` with `data` and return the text, blocking the caller.
///
/// Sync engines render inline. Async engines render on `pool` inside an
/// isolated runtime. Errors other than "template not found" pass through the
/// engine's render-error hook.
pub fn render_blocking<E>(engine: &E, pool: &WorkerPool, name: &str, data: Value) -> Result<String, PartialsError>
where
    E: TemplateEngine + ?Sized,
{
    let mode = if engine.is_async() { "async" } else { "sync" };
    let span = partial_span(name, mode);
    let _guard = span.enter();
    let timer = Timer::start("render_partial");

    let result = if engine.is_async() {
        run_on_pool(pool, engine.render_template_async(name, data))
    } else {
        engine.render_template(name, data).map_err(PartialsError::from)
    };

    let result = result.map_err(|err| match err {
        PartialsError::Template(e) if e.kind() != ErrorKind::TemplateNotFound => {
            PartialsError::Template(engine.handle_render_error(e))
        }
        other => other,
    });

    if let Err(e) = &result {
        record_error(e);
    }
    timer.finish();
    result
}

fn run_on_pool(pool: &WorkerPool, future: RenderFuture) -> Result<String, PartialsError> {
    if pool.is_current_worker() || OVERFLOW_FOR.with(|id| id.get()) == pool.id() {
        return run_on_overflow_thread(pool, future);
    }

    trace!(pool = %pool.name(), "submitting async render");
    let handle = pool.submit(move || drive(future))?;
    handle.join()?
}

// The caller already occupies a worker of this pool. Waiting for another
// worker could deadlock once nesting is deeper than the pool, so the nested
// render gets its own short-lived thread.
fn run_on_overflow_thread(pool: &WorkerPool, future: RenderFuture) -> Result<String, PartialsError> {
    let pool_id = pool.id();
    trace!(pool = %pool.name(), "nested async render on overflow thread");

    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name(format!("{}-overflow", pool.name()))
            .spawn_scoped(scope, move || {
                OVERFLOW_FOR.with(|id| id.set(pool_id));
                drive(future)
            })
            .map_err(PoolError::Spawn)?;

        handle
            .join()
            .map_err(|payload| PartialsError::Pool(PoolError::Panicked(panic_message(&*payload))))?
    })
}

fn drive(future: RenderFuture) -> Result<String, PartialsError> {
    let output = run_isolated(future)?;
    Ok(output?)
}
