mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use positron::{App, CallbackResult, MemorySink, PositronConfig, WindowError, WindowId};
use positron_common::PositronError;
use positron_devserver::DevServer;
use positron_webview::HeadlessEngine;

use cli::{Args, Source};

/// Page shown when no URL, file or dev server is given.
const BUILTIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Positron</title></head>
<body>
  <h1>Positron</h1>
  <p id="status">waiting for host...</p>
  <script>
    window.ipcRenderer.invoke("ping", "page").then(function (reply) {
      document.getElementById("status").textContent = JSON.stringify(reply);
    });
  </script>
</body>
</html>
"#;

fn load_config(args: &Args) -> (PositronConfig, Option<String>) {
    let loaded = match &args.config {
        Some(path) => positron_config::load_config_from(path),
        None => positron_config::load_config(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (PositronConfig::default(), Some(e.to_string())),
    }
}

fn init_logging(args: &Args, config: &PositronConfig) {
    let directive = args.log_directive(config.logging.level.directive());
    let mut filter = EnvFilter::from_default_env();
    match directive.parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("ignoring invalid log directive '{directive}': {e}"),
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Channels every window can reach.
fn register_handlers(app: &App) {
    app.ipc().handle("ping", |event, args| {
        Ok(json!({ "pong": args, "window": event.sender().id().0 }))
    });

    let name = app.name().to_string();
    let version = app.version().to_string();
    app.ipc().handle("app:info", move |_, _| {
        Ok(json!({ "name": name, "version": version }))
    });
}

fn open_window(app: &mut App, source: &Source) -> Result<WindowId, WindowError> {
    let id = app.create_default_window()?;
    let window = app.window_mut(id).ok_or(WindowError::UnknownWindow(id))?;
    match source {
        Source::Url(url) => window.load_url(url)?,
        Source::File(path) => window.load_file(path)?,
        Source::DevServer | Source::Builtin => window.load_html(BUILTIN_PAGE, None)?,
    }
    Ok(id)
}

/// Ready callback that opens the first window, quitting if it cannot.
fn open_on_ready(source: Source) -> impl Fn(&mut App) -> CallbackResult + 'static {
    move |app| {
        if let Err(e) = open_window(app, &source) {
            app.quit();
            return Err(e.into());
        }
        Ok(())
    }
}

/// Open the first window, then round-trip an invoke through its page.
fn self_check(
    runtime: &tokio::runtime::Runtime,
    app: &mut App,
    engine: &HeadlessEngine,
) -> positron_common::Result<Value> {
    app.start();
    let id = app
        .window_ids()
        .first()
        .copied()
        .ok_or_else(|| PositronError::Other("no window could be opened".into()))?;
    app.pump();

    let bridge = engine
        .page(id)
        .and_then(|page| page.bridge())
        .ok_or(WindowError::Closed(id))?;
    let invocation = bridge.invoke("ping", vec![json!("positron")]);
    let reply = runtime.block_on(app.drive(invocation.response()))?;
    Ok(reply)
}

fn run_headless(runtime: &tokio::runtime::Runtime, config: PositronConfig, source: Source) -> ExitCode {
    let engine = HeadlessEngine::new();
    let sink = MemorySink::default();
    let mut app = App::with_sink(config, Box::new(engine.clone()), Arc::new(sink.clone()));
    register_handlers(&app);
    app.when_ready(open_on_ready(source));

    let result = self_check(runtime, &mut app, &engine);
    app.quit();

    for diagnostic in sink.entries() {
        tracing::warn!(%diagnostic, "diagnostic during self-check");
    }
    match result {
        Ok(reply) => {
            tracing::info!(%reply, "Bridge self-check passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Bridge self-check failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Turn `--dev` into the dev server's URL, starting the server.
fn resolve_source(
    runtime: &tokio::runtime::Runtime,
    args: &Args,
    config: &PositronConfig,
) -> positron_common::Result<(Source, Option<DevServer>)> {
    match args.source() {
        Source::DevServer => {
            let mut server = DevServer::new(config.dev_server.clone());
            runtime.block_on(server.start())?;
            Ok((Source::Url(server.url()), Some(server)))
        }
        other => Ok((other, None)),
    }
}

#[cfg(feature = "native")]
fn run_native(config: PositronConfig, source: Source) -> ExitCode {
    use positron::runtime::NativeRuntime;
    use positron_webview::native::NativeEngine;
    use winit::event_loop::EventLoop;

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            tracing::error!("Failed to create event loop: {e}");
            return ExitCode::FAILURE;
        }
    };

    let engine = NativeEngine::new();
    let mut app = App::new(config, Box::new(engine.clone()));
    register_handlers(&app);
    app.when_ready(open_on_ready(source));

    let mut runtime = NativeRuntime::new(app, engine);
    tracing::info!("Entering event loop");
    if let Err(e) = event_loop.run_app(&mut runtime) {
        tracing::error!("Event loop error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(not(feature = "native"))]
fn run_native(_config: PositronConfig, _source: Source) -> ExitCode {
    tracing::error!("Built without the `native` feature; run with --headless");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let args = cli::parse();

    let (config, config_error) = load_config(&args);
    init_logging(&args, &config);
    tracing::info!("Positron v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Some(e) = config_error {
        tracing::warn!("Config load failed, using defaults: {e}");
    }
    if let Some(path) = &args.config {
        tracing::info!("Using config override: {}", path.display());
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (source, dev_server) = match resolve_source(&runtime, &args, &config) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::error!("Dev server failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let code = if args.headless {
        run_headless(&runtime, config, source)
    } else {
        // Handlers run on the event loop; the runtime stays up for the dev
        // server's output readers.
        let _guard = runtime.enter();
        run_native(config, source)
    };

    if let Some(mut server) = dev_server {
        runtime.block_on(server.stop());
    }
    tracing::info!("Shutdown complete");
    code
}
