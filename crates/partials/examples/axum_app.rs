//! An axum application rendering a page of partials with an async engine.
//!
//! ```sh
//! cargo run -p partials --features axum --example axum_app
//! ```
//!
//! Ctrl-C stops the server; the partials pool drains once the last
//! connection closes.

use std::path::PathBuf;

use anyhow::Result;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use partials::axum::{AxumApp, PageError, Templates};
use partials::{register_axum_extensions, JinjaEngine, RegisterOptions, RenderMode};
use partials_common_async::{build_runtime, RuntimeConfig, ShutdownHandle};
use partials_common_log::{init, LogConfig};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Serialize)]
struct Item {
    title: &'static str,
    author: &'static str,
    views: u32,
    tag: &'static str,
}

async fn index(State(templates): State<Templates>) -> Result<Html<String>, PageError> {
    let items = [
        Item { title: "Rust Basics", author: "Alice", views: 12500, tag: "beginner" },
        Item { title: "Async Patterns", author: "Bob", views: 8750, tag: "advanced" },
        Item { title: "Web Development", author: "Carol", views: 23100, tag: "intermediate" },
    ];
    templates.render("home/index.html", minijinja::context! { items }).await
}

fn main() -> Result<()> {
    init(LogConfig::from_env())?;

    let runtime = build_runtime(RuntimeConfig {
        thread_name: "axum-app".to_string(),
        ..RuntimeConfig::default()
    })?;
    runtime.block_on(run())
}

async fn run() -> Result<()> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("examples/templates");
    let engine = JinjaEngine::builder().mode(RenderMode::Async).directory(dir).build()?;

    // Handlers need the pool, which only exists once the app is registered.
    let app = AxumApp::new(Router::new());
    let pool = register_axum_extensions(&app, &engine, &RegisterOptions::default())?;

    let router = Router::new()
        .route("/", get(index))
        .with_state(Templates::new(engine, pool));
    let app = app.with_router(router);

    let listener = TcpListener::bind("127.0.0.1:10001").await?;
    info!("listening on http://127.0.0.1:10001");

    let shutdown = ShutdownHandle::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.shutdown();
        }
    });

    app.serve(listener, shutdown).await?;
    Ok(())
}
