//! Registration against the capability registry and the engine globals.

use minijinja::context;
use partials::{
    register_environment, register_host_extensions, render_partial, render_partial_with, CapabilityRegistry,
    Framework, JinjaEngine, Lifecycle, PartialRequest, PartialsError, RegisterOptions, Registrar, TemplateEngine,
};
use partials_common_config::{ConfigLoader, CONFIG_FILE};
use partials_lifecycle::BoundPool;
use partials_test_utils::{assert_contains, assert_err, assert_ok, temp_dir, write_fixtures};

fn engine() -> JinjaEngine {
    JinjaEngine::builder()
        .template("bold.html", "<b>{{ word }}</b>")
        .template("page.html", "<p>{{ render_partial('bold.html', word=word) }}</p>")
        .template("aliased.html", "<p>{{ partial('bold.html', word=word) }}</p>")
        .build()
        .unwrap()
}

#[test]
fn missing_integration_changes_nothing() {
    let registry = CapabilityRegistry::detect().without(Framework::Host);
    let app = Lifecycle::new();
    let engine = engine();

    let err = assert_err!(Registrar::new(&registry).host(&app, &engine, &RegisterOptions::default()));
    match &err {
        PartialsError::MissingIntegration { framework, .. } => assert_eq!(framework, "host"),
        other => panic!("expected MissingIntegration, got {:?}", other),
    }

    assert!(!engine.renderer_slot().is_registered());
    assert!(app.state::<BoundPool>().is_none());
    // The template global was never published.
    assert!(engine.render("page.html", context! { word => "x" }).is_err());
}

#[cfg(not(feature = "axum"))]
#[test]
fn axum_needs_its_feature() {
    let app = Lifecycle::new();
    let err = assert_err!(partials::register_axum_extensions(&app, &engine(), &RegisterOptions::default()));
    match err {
        PartialsError::MissingIntegration { framework, feature } => {
            assert_eq!(framework, "axum");
            assert_eq!(feature, "axum");
        }
        other => panic!("expected MissingIntegration, got {:?}", other),
    }
}

#[test]
fn template_global_renders_markup() {
    let engine = engine();
    register_environment(&engine, &RegisterOptions::default()).unwrap();
    let html = assert_ok!(engine.render("page.html", context! { word => "hi" }));
    assert_eq!(html, "<p><b>hi</b></p>");
}

#[test]
fn registering_again_replaces_the_renderer() {
    let engine = engine();
    register_environment(&engine, &RegisterOptions::default()).unwrap();
    let first = engine.renderer_slot().get().unwrap();

    register_environment(&engine, &RegisterOptions::default().markup(false)).unwrap();
    let second = engine.renderer_slot().get().unwrap();
    assert!(!first.renderer().ptr_eq(second.renderer()));
    assert!(first.markup());
    assert!(!second.markup());

    let html = assert_ok!(engine.render("page.html", context! { word => "hi" }));
    assert!(html.starts_with("<p>&lt;b&gt;hi"), "{}", html);
    assert!(!html.contains("<b>"));

    let partial = assert_ok!(render_partial(&engine, "bold.html", context! { word => "hi" }));
    assert!(!partial.is_markup());
}

#[test]
fn registered_markup_default_applies_to_rust_callers() {
    let engine = engine();
    register_environment(&engine, &RegisterOptions::default().markup(false)).unwrap();

    let plain = assert_ok!(render_partial(&engine, "bold.html", context! { word => "hi" }));
    assert!(!plain.is_markup());
    assert_eq!(plain, "<b>hi</b>");

    let request = PartialRequest::new("bold.html").data(context! { word => "hi" }).markup(true);
    assert!(assert_ok!(render_partial_with(&engine, request)).is_markup());
}

#[test]
fn reset_clears_rust_side_registration_only() {
    let engine = engine();
    register_environment(&engine, &RegisterOptions::default()).unwrap();
    assert!(engine.renderer_slot().reset().is_some());

    let err = assert_err!(render_partial(&engine, "bold.html", context! { word => "hi" }));
    assert!(matches!(err, PartialsError::NotRegistered));
    // The published global keeps its own bound renderer.
    assert_eq!(assert_ok!(engine.render("page.html", context! { word => "hi" })), "<p><b>hi</b></p>");
}

#[test]
fn custom_global_name() {
    let engine = engine();
    register_environment(&engine, &RegisterOptions::default().global_name("partial")).unwrap();

    let html = assert_ok!(engine.render("aliased.html", context! { word => "hi" }));
    assert_eq!(html, "<p><b>hi</b></p>");
}

#[test]
fn host_then_environment_keeps_the_bound_pool() {
    let app = Lifecycle::new();
    let engine = engine();
    let pool = register_host_extensions(&app, &engine, &RegisterOptions::default()).unwrap();
    register_environment(&engine, &RegisterOptions::default()).unwrap();

    let bound = app.state::<BoundPool>().unwrap();
    assert!(std::sync::Arc::ptr_eq(bound.pool(), &pool));
    assert_ok!(render_partial(&engine, "bold.html", context! { word => "x" }));
}

#[test]
fn registration_from_config_file() -> anyhow::Result<()> {
    let project = temp_dir();
    write_fixtures(&project.path().join("templates"));

    let config_path = project.path().join(CONFIG_FILE);
    std::fs::create_dir_all(config_path.parent().unwrap())?;
    std::fs::write(
        &config_path,
        "render:\n  markup: true\n  global_name: render_partial\npool:\n  max_workers: 2\ntemplates:\n  directory: templates\n  mode: async\n",
    )?;

    let config = ConfigLoader::new(project.path()).load()?;
    let engine = JinjaEngine::from_config(&config.templates)?;
    assert!(engine.is_async());

    let app = Lifecycle::new();
    let pool = register_host_extensions(&app, &engine, &RegisterOptions::from_config(&config))?;
    assert_eq!(pool.capacity(), 2);
    app.startup()?;

    let html = render_partial(&engine, "render/recursive.html", context! { message => "a", inner => "b" })?;
    assert_contains!(html, "<p class=\"inner\">b</p>");

    app.shutdown()?;
    Ok(())
}
