//! Async-mode engines: partials are rendered on pool threads from inside
//! synchronous template calls.

use std::sync::Arc;
use std::thread;

use minijinja::context;
use partials::{register_environment, register_host_extensions, render_partial, JinjaEngine, Lifecycle, RegisterOptions, RenderMode};
use partials_test_utils::{assert_contains, assert_ok, async_test, fixture_dir};

const CHAIN: &str = "{% if depth > 0 %}[{{ render_partial('chain.html', depth=depth - 1) }}]{% else %}x{% endif %}";

fn chain_engine() -> JinjaEngine {
    JinjaEngine::builder()
        .mode(RenderMode::Async)
        .template("chain.html", CHAIN)
        .build()
        .unwrap()
}

#[test]
fn nesting_deeper_than_the_pool() {
    let app = Lifecycle::new();
    let engine = chain_engine();
    register_host_extensions(&app, &engine, &RegisterOptions::default().max_workers(1)).unwrap();
    app.startup().unwrap();

    let html = assert_ok!(render_partial(&engine, "chain.html", context! { depth => 5 }));
    assert_eq!(html, "[[[[[x]]]]]");

    app.shutdown().unwrap();
}

#[test]
fn more_callers_than_workers() {
    let app = Lifecycle::new();
    let dir = fixture_dir();
    let engine = JinjaEngine::builder()
        .mode(RenderMode::Async)
        .directory(dir.path())
        .build()
        .unwrap();
    let max_workers = 2;
    register_host_extensions(&app, &engine, &RegisterOptions::default().max_workers(max_workers)).unwrap();
    app.startup().unwrap();

    let engine = Arc::new(engine);
    let callers: Vec<_> = (0..=max_workers)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || render_partial(&*engine, "render/with_data.html", context! { name => "Sarah", age => i }))
        })
        .collect();

    for (i, caller) in callers.into_iter().enumerate() {
        let html = assert_ok!(caller.join().unwrap());
        assert_contains!(html, &format!("Your name is Sarah and age is {}", i));
    }

    app.shutdown().unwrap();
}

async_test!(blocking_call_inside_a_runtime, {
    let dir = fixture_dir();
    let engine = JinjaEngine::builder()
        .mode(RenderMode::Async)
        .directory(dir.path())
        .build()
        .unwrap();
    register_environment(&engine, &RegisterOptions::default()).unwrap();

    let html = assert_ok!(render_partial(
        &engine,
        "render/recursive.html",
        context! { message => "outer", inner => "inner" }
    ));
    assert_contains!(html, "<div>outer</div>");
    assert_contains!(html, "<p class=\"inner\">inner</p>");
});

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn engine_render_async_with_nested_partials() {
    let engine = chain_engine();
    register_environment(&engine, &RegisterOptions::default()).unwrap();

    let html = engine.render_async("chain.html", context! { depth => 2 }).await.unwrap();
    assert_eq!(html, "[[x]]");
}

#[test]
fn sync_render_refused_on_async_engine() {
    let engine = chain_engine();
    let err = engine.render("chain.html", context! { depth => 0 }).unwrap_err();
    assert_eq!(err.kind(), minijinja::ErrorKind::InvalidOperation);
}
