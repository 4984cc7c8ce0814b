//! axum integration.
//!
//! [`AxumApp`] pairs a router with a [`Lifecycle`] so registration can bind a
//! worker pool that drains after the server stops. [`Templates`] renders full
//! pages from handlers without blocking the runtime.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Router;
use minijinja::Value;
use partials_common_async::ShutdownHandle;
use partials_common_thread::WorkerPool;
use partials_core::PartialsError;
use partials_jinja::JinjaEngine;
use partials_lifecycle::{HostApp, Lifecycle, LifecycleError};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tracing::{error, info};

use crate::adapter::render_blocking;

/// Errors from [`AxumApp::serve`].
#[derive(Debug, Error)]
pub enum ServeError {
    /// Accepting or serving connections failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    /// A start or stop hook failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The shutdown task panicked.
    #[error("shutdown task failed: {0}")]
    Join(#[from] JoinError),
}

/// An axum router with an application lifecycle.
#[derive(Debug, Clone)]
pub struct AxumApp {
    router: Router,
    lifecycle: Lifecycle,
}

impl AxumApp {
    /// Wrap a router. Lifecycle hooks are added by registration.
    pub fn new(router: Router) -> Self {
        Self {
            router,
            lifecycle: Lifecycle::new(),
        }
    }

    /// The router that `serve` runs.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Swap the router, keeping the lifecycle and everything bound to it.
    pub fn with_router(self, router: Router) -> Self {
        Self { router, ..self }
    }

    /// Serve until `shutdown` fires.
    ///
    /// Runs start hooks first and stop hooks after the last connection
    /// closes. Stop hooks run on a blocking thread because draining a pool
    /// waits for its workers.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownHandle) -> Result<(), ServeError> {
        self.lifecycle.startup()?;

        let addr = listener.local_addr()?;
        info!(%addr, app = %self.lifecycle.id(), "serving");

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.signalled().await })
            .await;

        let lifecycle = self.lifecycle.clone();
        let stopped = tokio::task::spawn_blocking(move || lifecycle.shutdown()).await;

        served?;
        stopped??;
        info!(%addr, "server stopped");
        Ok(())
    }
}

impl HostApp for AxumApp {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

/// Page render failure, answered with a 500.
#[derive(Debug, Error)]
pub enum PageError {
    /// The page template failed to render.
    #[error(transparent)]
    Render(#[from] PartialsError),

    /// The blocking render task panicked.
    #[error("render task failed: {0}")]
    Join(#[from] JoinError),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        error!(error = %self, "page render failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

/// Shared page renderer for handlers.
#[derive(Debug, Clone)]
pub struct Templates {
    engine: JinjaEngine,
    pool: Arc<WorkerPool>,
}

impl Templates {
    /// `pool` is usually the one returned by registration.
    pub fn new(engine: JinjaEngine, pool: Arc<WorkerPool>) -> Self {
        Self { engine, pool }
    }

    /// The engine pages render with.
    pub fn engine(&self) -> &JinjaEngine {
        &self.engine
    }

    /// Render a full page on a blocking thread.
    pub async fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<Html<String>, PageError> {
        let ctx = Value::from_serialize(ctx);
        let engine = self.engine.clone();
        let pool = Arc::clone(&self.pool);
        let name = name.to_string();

        let rendered = tokio::task::spawn_blocking(move || render_blocking(&engine, &pool, &name, ctx)).await?;
        Ok(Html(rendered?))
    }
}
