//! Registers partials on a bare engine and renders a page built from them.
//!
//! ```sh
//! cargo run -p partials --example environment_demo
//! ```

use anyhow::Result;
use minijinja::context;
use partials::{EngineBuilderExt, JinjaEngine, RegisterOptions};
use partials_common_log::{init, LogConfig};

const MAIN: &str = r#"<html>
<head><title>{{ title }}</title></head>
<body>
    <h1>{{ title }}</h1>
    <div class="content">
        {{ render_partial('content.html', message=message) }}
    </div>
    <footer>
        {{ render_partial('footer.html', year=year) }}
    </footer>
</body>
</html>"#;

const CONTENT: &str = r#"<div class="message">
    <p>{{ message }}</p>
    <p>This content was rendered as a partial!</p>
</div>"#;

const FOOTER: &str = r#"<div class="footer">
    <p>&copy; {{ year }} - Powered by partials</p>
</div>"#;

fn main() -> Result<()> {
    init(LogConfig::from_env())?;

    let engine = JinjaEngine::builder()
        .template("main.html", MAIN)
        .template("content.html", CONTENT)
        .template("footer.html", FOOTER)
        .build_with_partials(&RegisterOptions::default())?;

    let html = engine.render(
        "main.html",
        context! {
            title => "Welcome to partials!",
            message => "Hello from the partial template system!",
            year => 2024,
        },
    )?;

    println!("{}", html);

    let available = engine
        .environment()
        .render_str("{{ render_partial is defined }}", context! {})?;
    println!("\nrender_partial is available: {}", available);
    Ok(())
}
